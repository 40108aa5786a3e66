//! Salted password digests, stored as `hex(salt):hex(sha256(salt || password))`

use rand::Rng;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

/// Digest a password with a fresh random salt
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::rng().random();
    format!("{}:{}", hex::encode(salt), hex::encode(digest(&salt, password)))
}

/// Check a password against a stored digest
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    hex::encode(digest(&salt, password)) == digest_hex
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}
