use crate::Generator;
use burrow_core::ShortCode;
use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates random short codes of [`ShortCode::LENGTH`] ASCII letters.
///
/// Codes are drawn from the thread-local CSPRNG. Uniqueness is probabilistic:
/// 52^8 possible codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..ShortCode::LENGTH)
            .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
