//! HTTP tests for the blog router.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::util::ServiceExt;

use tagged_blog::service::{create_router, ServiceState};
use tagged_blog::store::InMemoryDocumentStore;
use tagged_blog::{Blog, BlogConfig, ContentItem, ItemDraft, ItemId, PageSize};

struct TestHarness {
    store: Arc<InMemoryDocumentStore>,
    router: Router,
}

impl TestHarness {
    fn setup() -> Self {
        let seed = ContentItem::from_draft(
            ItemId::new(1),
            ItemDraft::new("Seed", "<p>seed</p>", "rust web").unwrap(),
            DateTime::<Utc>::from_timestamp(1_000, 0).unwrap(),
        );
        let store = Arc::new(InMemoryDocumentStore::with_items([seed]));
        let config = BlogConfig::new("admin", "pw", b"route_test_secret".to_vec())
            .with_title("Routes")
            .with_page_size(PageSize::new(5).unwrap());
        let router = create_router(ServiceState::new(Blog::new(Arc::clone(&store), &config)));
        Self { store, router }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.expect("response")
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
    }

    async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).expect("request"))
            .await
    }

    /// Log in and return the `auth=...` cookie pair.
    async fn login(&self) -> String {
        let response = self.post_form("/admin/auth", "login=admin&password=pw", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin");

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie")
            .to_str()
            .expect("ascii cookie");
        set_cookie.split(';').next().expect("cookie pair").to_string()
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
}

async fn decode_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

// ─────────────────────────────────────────────────────────────────────────────
// Public Reads
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn index_redirects_to_first_page() {
    let harness = TestHarness::setup();
    let response = harness.get("/").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/page/1");
}

#[tokio::test]
async fn listing_returns_ranked_page() {
    let harness = TestHarness::setup();
    let response = harness.get("/page/1?tags=Rust%20go").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = decode_json(response).await;
    assert_eq!(body["title"], "Routes");
    assert_eq!(body["page_count"], 1);
    assert_eq!(body["tags"], serde_json::json!(["rust", "go"]));
    assert_eq!(body["items"][0]["id"], 1);
    assert_eq!(body["items"][0]["commonality"], 1);
}

#[tokio::test]
async fn malformed_numbers_are_bad_requests() {
    let harness = TestHarness::setup();

    assert_eq!(harness.get("/post/abc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.get("/post/-1").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.get("/page/two").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let harness = TestHarness::setup();
    let response = harness.get("/post/99").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = decode_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Gate
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymous_mutation_redirects_to_login() {
    let harness = TestHarness::setup();

    let response = harness
        .post_form("/admin/create", "title=Hi&body=b&tags=x", None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/auth");

    let response = harness
        .post_form("/admin/remove/1", "", Some("auth=forged.token.value.00"))
        .await;
    assert_eq!(location(&response), "/admin/auth");

    // Unparseable bodies are still denials, not body errors.
    let response = harness
        .send(
            Request::builder()
                .method("POST")
                .uri("/admin/create")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"Hi"}"#))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/auth");

    let response = harness.post_form("/admin/create", "title=a&title=b", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/auth");

    let response = harness
        .post_form("/admin/change/1", "title=a&title=b", Some("auth=forged.token.value.00"))
        .await;
    assert_eq!(location(&response), "/admin/auth");

    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.store.sequence_value(), None);
}

#[tokio::test]
async fn authenticated_bad_body_is_bad_request() {
    let harness = TestHarness::setup();
    let cookie = harness.login().await;

    let response = harness
        .send(
            Request::builder()
                .method("POST")
                .uri("/admin/create")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(Body::from(r#"{"title":"Hi"}"#))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(decode_json(response).await["code"], "INVALID_INPUT");
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn wrong_password_sets_no_cookie() {
    let harness = TestHarness::setup();
    let response = harness
        .post_form("/admin/auth", "login=admin&password=nope", None)
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/auth");
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_then_create_update_delete() {
    let harness = TestHarness::setup();
    let cookie = harness.login().await;

    let created = harness
        .post_form("/admin/create", "title=Hello&body=World&tags=Foo+foo+BAR", Some(&cookie))
        .await;
    assert_eq!(created.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&created), "/post/2");

    let item = decode_json(harness.get("/post/2").await).await;
    assert_eq!(item["tags"], serde_json::json!(["foo", "bar"]));

    let updated = harness
        .post_form("/admin/change/2", "title=Renamed&body=B&tags=baz", Some(&cookie))
        .await;
    assert_eq!(location(&updated), "/post/2");
    let item = decode_json(harness.get("/post/2").await).await;
    assert_eq!(item["title"], "Renamed");

    let removed = harness.post_form("/admin/remove/2", "", Some(&cookie)).await;
    assert_eq!(location(&removed), "/admin");
    assert_eq!(harness.get("/post/2").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bearer_token_opens_admin_view() {
    let harness = TestHarness::setup();
    let cookie = harness.login().await;
    let token = cookie.trim_start_matches("auth=");

    let response = harness
        .send(
            Request::builder()
                .uri("/admin")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = decode_json(response).await;
    assert_eq!(body["blog_title"], "Routes");
    assert_eq!(body["item_count"], 1);
}

#[tokio::test]
async fn bearer_token_used_when_cookie_is_stale() {
    let harness = TestHarness::setup();
    let cookie = harness.login().await;
    let token = cookie.trim_start_matches("auth=").to_string();

    let response = harness
        .send(
            Request::builder()
                .uri("/admin")
                .header(header::COOKIE, "auth=1.2.abcdef.00112233445566778899aabbccddeeff")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .send(
            Request::builder()
                .uri("/admin")
                .header(header::COOKIE, "auth=1.2.abcdef.00112233445566778899aabbccddeeff")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(location(&response), "/admin/auth");
}

#[tokio::test]
async fn edit_form_is_prefilled() {
    let harness = TestHarness::setup();
    let cookie = harness.login().await;

    let response = harness
        .send(
            Request::builder()
                .uri("/admin/change/1")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = decode_json(response).await;
    assert_eq!(body["tags"], "rust web");
    assert_eq!(body["title"], "Seed");
}

#[tokio::test]
async fn missing_title_is_bad_request() {
    let harness = TestHarness::setup();
    let cookie = harness.login().await;

    let response = harness.post_form("/admin/create", "body=b", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.store.len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Health / Faults
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn store_fault_is_service_unavailable() {
    let harness = TestHarness::setup();
    assert_eq!(harness.get("/health/ready").await.status(), StatusCode::OK);

    harness.store.set_unavailable(true);
    let response = harness.get("/page/1").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = decode_json(response).await;
    assert_eq!(body["code"], "STORE_UNAVAILABLE");

    assert_eq!(
        harness.get("/health/ready").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(harness.get("/health/live").await.status(), StatusCode::OK);
}
