pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use burrow_core::{LinkId, ShortCode};
use uuid::Uuid;

/// Trait for generating short codes and record identifiers.
///
/// Implementations are pure generators that don't interact with storage.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a fixed-length short code.
    fn generate(&self) -> Self::Output;

    /// Generates a fresh record identifier.
    fn link_id(&self) -> LinkId {
        LinkId::new(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_link_ids_are_unique_uuids() {
        let generator = RandomGenerator::new();
        let first = generator.link_id();
        let second = generator.link_id();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }
}
