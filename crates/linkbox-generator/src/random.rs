use crate::Generator;
use linkbox_core::ShortCode;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// The 62 symbols codes are drawn from.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Code length used when none is configured. 62^4 is about 14.8M codes.
pub const DEFAULT_CODE_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("code length must be at least 1")]
    ZeroLength,
}

/// Draws fixed-length codes uniformly from [`ALPHABET`].
///
/// Each call seeds a fresh non-cryptographic [`SmallRng`] from the thread
/// RNG. Codes are not secret, only spread out.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new(length: usize) -> Result<Self, GeneratorError> {
        if length == 0 {
            return Err(GeneratorError::ZeroLength);
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let mut rng = SmallRng::from_rng(&mut rand::rng());
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alphabet_has_62_distinct_symbols() {
        let distinct: HashSet<_> = ALPHABET.iter().collect();
        assert_eq!(distinct.len(), 62);
        assert!(ALPHABET.iter().all(u8::is_ascii_alphanumeric));
    }

    #[test]
    fn generates_exact_length_from_alphabet() {
        for length in [1, 4, 8, 32] {
            let generator = RandomGenerator::new(length).unwrap();
            for _ in 0..200 {
                let code = generator.generate();
                assert_eq!(code.as_str().len(), length);
                assert!(code.as_str().bytes().all(|b| ALPHABET.contains(&b)));
            }
        }
    }

    #[test]
    fn generated_codes_pass_validation() {
        let generator = RandomGenerator::default();
        let code = generator.generate();
        assert!(ShortCode::new(code.as_str()).is_ok());
    }

    #[test]
    fn codes_vary_between_calls() {
        let generator = RandomGenerator::new(8).unwrap();
        let codes: HashSet<_> = (0..100).map(|_| generator.generate()).collect();
        assert!(codes.len() > 90);
    }

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(
            RandomGenerator::new(0).unwrap_err(),
            GeneratorError::ZeroLength
        );
    }

    #[test]
    fn default_length_is_four() {
        assert_eq!(RandomGenerator::default().length(), DEFAULT_CODE_LENGTH);
        assert_eq!(RandomGenerator::default().generate().as_str().len(), 4);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomGenerator>();
    }
}
