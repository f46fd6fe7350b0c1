//! Tag normalization.
//!
//! Tags are compared case-insensitively. A raw query such as `"Go Go LANG go"`
//! normalizes to `["go", "lang"]`: tokens are split on whitespace, lower-cased
//! and deduplicated, keeping the order in which each tag was first seen.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalize a whitespace-delimited string into an ordered list of unique tags.
///
/// Pure and total: empty or whitespace-only input yields an empty list.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    normalize_tokens(raw.split_whitespace())
}

fn normalize_tokens<'a, I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut tags = Vec::new();

    for token in tokens {
        let tag = token.trim().to_lowercase();
        if tag.is_empty() || seen.contains(&tag) {
            continue;
        }
        seen.insert(tag.clone());
        tags.push(tag);
    }

    tags
}

/// Canonical, ordered set of tags.
///
/// Always normalized: lower-case, no duplicates, first-occurrence order.
/// Deserializing re-runs normalization so stored data cannot break the invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Parse a raw whitespace-delimited tag string.
    pub fn parse(raw: &str) -> Self {
        Self(normalize_tags(raw))
    }

    /// The empty tag set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tags in canonical order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterate over tags in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.0.iter().any(|t| *t == tag)
    }

    /// Size of the intersection with `other`.
    pub fn intersection_count(&self, other: &TagSet) -> usize {
        // Both sides are already lower-cased and unique.
        self.0.iter().filter(|t| other.0.contains(t)).count()
    }

    /// Whether the two sets share at least one tag.
    pub fn intersects(&self, other: &TagSet) -> bool {
        self.0.iter().any(|t| other.0.contains(t))
    }

    /// Space-separated form, suitable for prefilling an edit form.
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }

    /// Consume into the underlying list.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        Self(normalize_tokens(tags.iter().map(String::as_str)))
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}
