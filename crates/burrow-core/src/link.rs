use crate::error::ValidationError;
use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier assigned to a link when it is created. Never reused.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(String);

impl LinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: LinkId,
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The caller that created the link. Empty for anonymous records.
    pub owner_id: String,
    /// Soft-delete flag. Flips at most once, from `false` to `true`.
    pub is_deleted: bool,
}

impl LinkRecord {
    /// Creates a new, not deleted, link record.
    pub fn new(
        id: LinkId,
        short_code: ShortCode,
        original_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            short_code,
            original_url: original_url.into(),
            owner_id: owner_id.into(),
            is_deleted: false,
        }
    }

    /// Returns `true` if `owner_id` may soft-delete this record.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Outcome of persisting a single link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredLink {
    /// The record was written as given.
    Inserted(LinkRecord),
    /// The original URL is already stored under another short code.
    Existing(ShortCode),
}

/// A request to soft-delete a link, honoured only when the owner matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub short_code: ShortCode,
    pub owner_id: String,
}

impl DeleteRequest {
    pub fn new(short_code: ShortCode, owner_id: impl Into<String>) -> Self {
        Self {
            short_code,
            owner_id: owner_id.into(),
        }
    }
}

/// Counters computed on demand by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of stored records, deleted ones included.
    pub urls: usize,
    /// Number of distinct owners.
    pub users: usize,
}

impl Stats {
    pub fn new(urls: usize, users: usize) -> Self {
        Self { urls, users }
    }
}

/// Validates that `input` is a URL with a scheme and a host.
pub fn validate_url(input: &str) -> Result<(), ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let parsed = url::Url::parse(input).map_err(|e| ValidationError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme().is_empty() || parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl {
            url: input.to_string(),
            reason: "url must contain scheme and host".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_urls_with_scheme_and_host() {
        assert!(validate_url("http://a.test").is_ok());
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url("ftp://files.example.com").is_ok());
    }

    #[test]
    fn rejects_empty_url() {
        assert_eq!(validate_url(""), Err(ValidationError::EmptyUrl));
    }

    #[test]
    fn rejects_url_without_scheme() {
        assert!(matches!(
            validate_url("example.com"),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn rejects_url_without_host() {
        assert!(matches!(
            validate_url("mailto:someone@example.com"),
            Err(ValidationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("file:///etc/hosts"),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn new_record_is_not_deleted() {
        let record = LinkRecord::new(
            LinkId::new("id-1"),
            ShortCode::new_unchecked("abcdefgh"),
            "http://a.test",
            "u1",
        );
        assert!(!record.is_deleted);
        assert!(record.is_owned_by("u1"));
        assert!(!record.is_owned_by("u2"));
    }
}
