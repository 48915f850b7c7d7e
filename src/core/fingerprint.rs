use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a fingerprint (16 hex characters).
pub const FINGERPRINT_BYTES: usize = 8;

/// Pseudonymous client key: truncated SHA-256 of the contact email, lowercase hex.
pub fn client_fingerprint(email: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}
