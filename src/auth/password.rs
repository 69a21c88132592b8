//! Password digests.
//!
//! Stored format: `sha256$<iterations>$<salt hex>$<digest hex>`.

use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";

fn digest(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut out: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize()
        .into();
    for _ in 1..iterations.max(1) {
        out = Sha256::new()
            .chain_update(out)
            .chain_update(salt)
            .finalize()
            .into();
    }
    out
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let salt: [u8; 16] = rand::random();
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(digest(password, &salt, iterations))
    )
}

/// Check `password` against a stored digest. Malformed digests never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    constant_time_eq(&digest(password, &salt, iterations), &expected)
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
