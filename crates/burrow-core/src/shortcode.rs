use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A short code identifying a shortened URL.
///
/// Short codes are exactly [`ShortCode::LENGTH`] ASCII alphanumeric characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Length of every short code handed out by the service.
    pub const LENGTH: usize = 8;

    /// Creates a `ShortCode` after validating the input.
    pub fn parse(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (generators, rows read back from a backend).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), ValidationError> {
        if code.is_empty() {
            return Err(ValidationError::InvalidShortCode(
                "short code should not be empty".to_string(),
            ));
        }

        let len = code.chars().count();
        if len != Self::LENGTH {
            return Err(ValidationError::InvalidShortCode(format!(
                "length must be {}, got {}",
                Self::LENGTH,
                len
            )));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidShortCode(format!(
                "must contain only alphanumeric characters: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
