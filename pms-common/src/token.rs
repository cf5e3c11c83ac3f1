//! Bearer token helpers
//!
//! Session tokens are never stored in clear text; the sessions table keys
//! on the SHA-256 hex digest of the presented token.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Hash a bearer token for storage or lookup (64 lowercase hex chars)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Generate a random 256-bit bearer token as hex
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Extract the credential from an `Authorization: Bearer <token>` header value
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
