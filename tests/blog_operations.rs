//! End-to-end tests of the blog core over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tagged_blog::store::InMemoryDocumentStore;
use tagged_blog::{
    AccessState, Blog, BlogConfig, BlogError, ContentItem, ItemDraft, ItemId, PageSize,
};

const TEST_SECRET: &[u8] = b"test_secret_for_blog_operations";

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn config() -> BlogConfig {
    BlogConfig::new("admin", "correct horse", TEST_SECRET.to_vec())
        .with_title("Field Notes")
        .with_page_size(PageSize::new(2).unwrap())
        .with_token_ttl(Duration::from_secs(3600))
}

fn seeded_item(id: i64, tags: &str) -> ContentItem {
    ContentItem::from_draft(
        ItemId::new(id),
        ItemDraft::new("seeded", "body", tags).unwrap(),
        DateTime::<Utc>::from_timestamp(1_000 + id, 0).unwrap(),
    )
}

fn blog_with(items: Vec<ContentItem>) -> Blog<InMemoryDocumentStore> {
    Blog::new(Arc::new(InMemoryDocumentStore::with_items(items)), &config())
}

async fn login(blog: &Blog<InMemoryDocumentStore>) -> AccessState {
    let token = blog.authenticate("admin", "correct horse").unwrap();
    blog.access(Some(token.as_str()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Creation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_normalizes_tags_and_continues_sequence() {
    let blog = blog_with(vec![seeded_item(3, "x"), seeded_item(17, "y")]);
    let access = login(&blog).await;

    let id = blog
        .create_item(access, "Hello", "<p>world</p>", "Foo foo BAR")
        .await
        .unwrap();

    assert_eq!(id, ItemId::new(18));
    let item = blog.get_item(id).await.unwrap();
    assert_eq!(item.tags.as_slice(), &["foo".to_string(), "bar".to_string()]);
}

#[tokio::test]
async fn created_item_is_listed_first() {
    let blog = blog_with(vec![seeded_item(1, "foo")]);
    let access = login(&blog).await;

    let id = blog.create_item(access, "New", "b", "foo").await.unwrap();
    let page = blog.list_items("foo", 1).await.unwrap();

    assert_eq!(page.items[0].item.id, id);
    assert_eq!(page.title, "Field Notes");
}

#[tokio::test]
async fn ids_are_never_reused_after_delete() {
    let blog = blog_with(vec![]);
    let access = login(&blog).await;

    let first = blog.create_item(access, "a", "", "").await.unwrap();
    blog.delete_item(first, access).await.unwrap();
    let second = blog.create_item(access, "b", "", "").await.unwrap();

    assert!(second > first);
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Gate
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let blog = blog_with(vec![]);

    assert_eq!(
        blog.authenticate("admin", "wrong").unwrap_err(),
        BlogError::Unauthorized
    );
    assert_eq!(
        blog.authenticate("root", "correct horse").unwrap_err(),
        BlogError::Unauthorized
    );
}

#[tokio::test]
async fn mutations_without_valid_token_are_denied() {
    let blog = blog_with(vec![seeded_item(1, "a")]);

    for presented in [None, Some(""), Some("not-a-token"), Some("1.2.3.4")] {
        let access = blog.access(presented);
        assert_eq!(access, AccessState::Anonymous);

        assert_eq!(
            blog.create_item(access, "valid title", "valid body", "a").await,
            Err(BlogError::Unauthorized)
        );
        assert_eq!(
            blog.update_item(ItemId::new(1), access, "t", "b", "a").await,
            Err(BlogError::Unauthorized)
        );
        assert_eq!(
            blog.delete_item(ItemId::new(1), access).await,
            Err(BlogError::Unauthorized)
        );
        assert_eq!(
            blog.item_form(ItemId::new(1), access).await,
            Err(BlogError::Unauthorized)
        );
    }

    // Nothing changed and no id was consumed.
    assert_eq!(blog.store().len(), 1);
    assert_eq!(blog.store().sequence_value(), None);
    assert_eq!(blog.get_item(ItemId::new(1)).await.unwrap().title, "seeded");
}

#[tokio::test]
async fn token_from_another_deployment_is_denied() {
    let blog = blog_with(vec![]);
    let other = Blog::new(
        Arc::new(InMemoryDocumentStore::new()),
        &BlogConfig::new("admin", "correct horse", b"different secret".to_vec()),
    );

    let foreign = other.authenticate("admin", "correct horse").unwrap();
    assert_eq!(blog.access(Some(foreign.as_str())), AccessState::Anonymous);
}

#[tokio::test]
async fn reads_need_no_session() {
    let blog = blog_with(vec![seeded_item(1, "a")]);

    assert!(blog.get_item(ItemId::new(1)).await.is_ok());
    assert_eq!(blog.list_items("", 1).await.unwrap().items.len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Update / Delete
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_overwrites_every_field() {
    let blog = blog_with(vec![seeded_item(5, "old tags")]);
    let access = login(&blog).await;
    let before = blog.get_item(ItemId::new(5)).await.unwrap();

    blog.update_item(ItemId::new(5), access, "Renamed", "new body", "New NEW")
        .await
        .unwrap();

    let after = blog.get_item(ItemId::new(5)).await.unwrap();
    assert_eq!(after.title, "Renamed");
    assert_eq!(after.body, "new body");
    assert_eq!(after.tags.as_slice(), &["new".to_string()]);
    assert!(after.published_at > before.published_at);
}

#[tokio::test]
async fn update_of_missing_item_is_not_found() {
    let blog = blog_with(vec![]);
    let access = login(&blog).await;

    assert_eq!(
        blog.update_item(ItemId::new(40), access, "t", "b", "").await,
        Err(BlogError::NotFound(ItemId::new(40)))
    );
}

#[tokio::test]
async fn delete_removes_item_and_is_idempotent() {
    let blog = blog_with(vec![seeded_item(2, "a")]);
    let access = login(&blog).await;

    blog.delete_item(ItemId::new(2), access).await.unwrap();
    assert_eq!(
        blog.get_item(ItemId::new(2)).await,
        Err(BlogError::NotFound(ItemId::new(2)))
    );
    assert!(blog.delete_item(ItemId::new(2), access).await.is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Faults
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn store_fault_is_a_per_request_error() {
    let blog = blog_with(vec![seeded_item(1, "a")]);
    let access = login(&blog).await;

    blog.store().set_unavailable(true);
    assert!(blog.list_items("a", 1).await.unwrap_err().is_infrastructure());
    assert!(blog.get_item(ItemId::new(1)).await.unwrap_err().is_infrastructure());
    assert!(blog
        .create_item(access, "t", "b", "")
        .await
        .unwrap_err()
        .is_infrastructure());

    // The same core keeps serving once the store recovers.
    blog.store().set_unavailable(false);
    assert_eq!(blog.list_items("a", 1).await.unwrap().items.len(), 1);
    assert_eq!(blog.store().len(), 1);
}
