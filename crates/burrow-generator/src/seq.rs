use crate::Generator;
use burrow_core::{ShortCode, ValidationError};
use std::sync::atomic::{AtomicU64, Ordering};

/// A short code generator using sequential counters.
///
/// This generator produces codes like "wh000000", "wh000001", etc, always
/// [`ShortCode::LENGTH`] characters long. The counter wraps around once it
/// needs more digits than the prefix leaves, so codes are unique within a
/// single instance for `10^(8 - prefix.len())` calls.
///
/// For multi-node deployments each node should use a unique prefix.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
        }
    }
}

impl SeqGenerator {
    /// Creates a new sequential generator with a custom prefix.
    ///
    /// The prefix must be alphanumeric and leave room for at least one digit.
    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self, ValidationError> {
        Self::with_offset(prefix, 0)
    }

    /// Creates a new sequential generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across nodes.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Result<Self, ValidationError> {
        let prefix = prefix.into();
        if prefix.len() >= ShortCode::LENGTH || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidShortCode(format!(
                "generator prefix must be alphanumeric and shorter than {}: '{}'",
                ShortCode::LENGTH,
                prefix
            )));
        }

        Ok(Self {
            counter: AtomicU64::new(offset),
            prefix,
        })
    }
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let width = ShortCode::LENGTH - self.prefix.len();
        let count = count % 10u64.pow(width as u32);
        let code = format!("{}{:0width$}", self.prefix, count, width = width);
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_sequential_codes() {
        let generator = SeqGenerator::with_prefix("wh").unwrap();

        assert_eq!(generator.generate().as_str(), "wh000000");
        assert_eq!(generator.generate().as_str(), "wh000001");
        assert_eq!(generator.generate().as_str(), "wh000002");
    }

    #[test]
    fn pads_to_fixed_length() {
        let generator = SeqGenerator::with_prefix("node").unwrap();

        let code = generator.generate();
        assert_eq!(code.as_str(), "node0000");
        assert!(ShortCode::parse(code.as_str()).is_ok());
    }

    #[test]
    fn with_offset() {
        let generator = SeqGenerator::with_offset("wh", 1000).unwrap();

        assert_eq!(generator.generate().as_str(), "wh001000");
        assert_eq!(generator.generate().as_str(), "wh001001");
    }

    #[test]
    fn wraps_when_digits_run_out() {
        let generator = SeqGenerator::with_offset("wh", 999_999).unwrap();

        assert_eq!(generator.generate().as_str(), "wh999999");
        let wrapped = generator.generate();
        assert_eq!(wrapped.as_str(), "wh000000");
        assert_eq!(wrapped.as_str().len(), ShortCode::LENGTH);

        let narrow = SeqGenerator::with_offset("abcdefg", 9).unwrap();
        assert_eq!(narrow.generate().as_str(), "abcdefg9");
        assert_eq!(narrow.generate().as_str(), "abcdefg0");
    }

    #[test]
    fn rejects_invalid_prefix() {
        assert!(SeqGenerator::with_prefix("toolongxx").is_err());
        assert!(SeqGenerator::with_prefix("abcdefgh").is_err());
        assert!(SeqGenerator::with_prefix("n-a").is_err());
    }

    #[test]
    fn clone_preserves_counter_state() {
        let generator = SeqGenerator::with_prefix("wh").unwrap();
        generator.generate();
        generator.generate();

        let cloned = generator.clone();

        assert_eq!(generator.generate().as_str(), "wh000002");
        assert_eq!(cloned.generate().as_str(), "wh000002");
    }
}
