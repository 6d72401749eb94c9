//! Canonical message construction.
//!
//! Two layers are signed:
//!
//! ```text
//! message = METHOD ":" path [ ":" body ]
//! digest  = SHA-256( publicKey ":" timestamp ":" nonce ":" message )
//! ```
//!
//! The client signs the 32-byte digest, so verification cost does not grow
//! with the body.

use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};

use super::models::Credential;
use super::signature::{public_key_hex, sign_hex};

/// Build the request message bound into a signature.
///
/// An empty body is treated as absent.
pub fn request_message(method: &str, path: &str, body: Option<&str>) -> String {
    match body {
        Some(body) if !body.is_empty() => format!("{}:{}:{}", method, path, body),
        _ => format!("{}:{}", method, path),
    }
}

/// Hash the credential fields into the digest that gets signed.
pub fn signing_digest(public_key: &str, timestamp: i64, nonce: &str, message: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(public_key.as_bytes());
    hasher.update(b":");
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(nonce.as_bytes());
    hasher.update(b":");
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Produce a signed credential (client side).
pub fn sign_credential(
    signing_key: &SigningKey,
    timestamp: i64,
    nonce: impl Into<String>,
    message: impl Into<String>,
) -> Credential {
    let public_key = public_key_hex(signing_key);
    let nonce = nonce.into();
    let message = message.into();
    let digest = signing_digest(&public_key, timestamp, &nonce, &message);
    Credential {
        signature: sign_hex(signing_key, &digest),
        public_key,
        timestamp,
        nonce,
        message,
    }
}

/// Fresh random nonce: 16 bytes, hex encoded.
pub fn generate_nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
