//! Clan identifier generation
//!
//! Identifiers are shared secrets: anyone holding one can read that clan's
//! configuration through the API. They are drawn from the OS CSPRNG over the
//! 36-symbol alphabet `A-Z0-9`.

use std::collections::HashSet;

use rand::rngs::OsRng;
use rand::Rng;

/// Identifier alphabet: uppercase ASCII letters then digits
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated identifiers
pub const IDENTIFIER_LENGTH: usize = 8;

/// Upper bound on draws before giving up.
///
/// At length 8 a collision needs ~2.8e12 identifiers in use, so hitting this
/// means the existing set (or the requested length) is degenerate.
pub const MAX_GENERATION_ATTEMPTS: usize = 100_000;

/// Identifier generation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("Identifier length must be at least 1")]
    ZeroLength,

    #[error("No unused identifier of length {length} found after {attempts} attempts")]
    Exhausted { length: usize, attempts: usize },
}

/// Draw a single random identifier of `length` characters.
pub fn random_identifier(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate an identifier not present in `existing`.
pub fn generate(existing: &HashSet<String>, length: usize) -> Result<String, GenerateError> {
    if length == 0 {
        return Err(GenerateError::ZeroLength);
    }

    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = random_identifier(length);
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }

    Err(GenerateError::Exhausted {
        length,
        attempts: MAX_GENERATION_ATTEMPTS,
    })
}

/// Whether every character is in [`ALPHABET`]
pub fn is_valid_alphabet(candidate: &str) -> bool {
    candidate
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
