//! Session identifier generation.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Generate a random alphanumeric session ID of `length` characters.
///
/// Uses the thread-local generator, which is a CSPRNG seeded from the OS.
/// At the default length of 64 characters collisions are negligible, so IDs
/// are not checked against the store.
pub fn generate_session_id(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Check that an inbound identifier looks like one produced by
/// [`generate_session_id`].
pub fn is_valid_session_id(id: &str, length: usize) -> bool {
    id.len() == length && id.bytes().all(|b| b.is_ascii_alphanumeric())
}
