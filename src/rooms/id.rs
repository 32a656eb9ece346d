use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated room ids
pub const ROOM_ID_LENGTH: usize = 32;

/// Produces candidate room ids.
///
/// Uniqueness is not the generator's job: the registry checks every
/// candidate against the live rooms and asks again on a collision.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Draws ids uniformly from `[A-Za-z0-9]` using the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlphanumericIdGenerator;

impl IdGenerator for AlphanumericIdGenerator {
    fn generate(&self, length: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_length() {
        let generator = AlphanumericIdGenerator;
        assert_eq!(generator.generate(ROOM_ID_LENGTH).len(), 32);
        assert_eq!(generator.generate(6).len(), 6);
        assert!(generator.generate(0).is_empty());
    }

    #[test]
    fn test_only_alphanumeric_symbols() {
        let generator = AlphanumericIdGenerator;
        for _ in 0..100 {
            let id = generator.generate(ROOM_ID_LENGTH);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()), "bad id {}", id);
        }
    }

    #[test]
    fn test_alphabet_is_covered() {
        // 62 symbols; 20k draws leave each one a vanishing chance of missing.
        let generator = AlphanumericIdGenerator;
        let seen: HashSet<char> = generator.generate(20_000).chars().collect();
        assert_eq!(seen.len(), 62);
    }
}
