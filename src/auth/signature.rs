//! Ed25519 signature verification.
//!
//! The server only ever holds public keys; signing helpers here exist for
//! clients and tests.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use super::models::{PUBLIC_KEY_LEN, SIGNATURE_LEN};

/// Verify an Ed25519 signature.
///
/// # Arguments
/// * `public_key` - 32-byte Ed25519 public key
/// * `digest` - The message digest that was signed
/// * `signature` - 64-byte Ed25519 signature
///
/// # Returns
/// `true` if signature is valid, `false` otherwise.
pub fn verify_ed25519(public_key: &[u8], digest: &[u8], signature: &[u8]) -> bool {
    let pk_bytes: [u8; PUBLIC_KEY_LEN] = match public_key.try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };

    let sig_bytes: [u8; SIGNATURE_LEN] = match signature.try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };

    // Rejects encodings that are not a curve point
    let verifying_key = match VerifyingKey::from_bytes(&pk_bytes) {
        Ok(k) => k,
        Err(_) => return false,
    };

    let sig = Signature::from_bytes(&sig_bytes);
    verifying_key.verify(digest, &sig).is_ok()
}

/// Verify a hex-encoded signature. Malformed hex is a failed verification.
pub fn verify_hex_signature(public_key: &[u8], digest: &[u8], signature_hex: &str) -> bool {
    let mut sig_bytes = [0u8; SIGNATURE_LEN];
    if hex::decode_to_slice(signature_hex, &mut sig_bytes).is_err() {
        return false;
    }
    verify_ed25519(public_key, digest, &sig_bytes)
}

/// Generate a new Ed25519 signing key.
pub fn generate_signing_key() -> SigningKey {
    use rand::rngs::OsRng;
    SigningKey::generate(&mut OsRng)
}

/// Hex form of the signing key's public half.
pub fn public_key_hex(signing_key: &SigningKey) -> String {
    hex::encode(signing_key.verifying_key().as_bytes())
}

/// Sign a digest and return the hex-encoded signature.
pub fn sign_hex(signing_key: &SigningKey, digest: &[u8]) -> String {
    hex::encode(signing_key.sign(digest).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_valid_signature() {
        let key = generate_signing_key();
        let digest = [7u8; 32];
        let sig = key.sign(&digest).to_bytes();

        assert!(verify_ed25519(key.verifying_key().as_bytes(), &digest, &sig));
    }

    #[test]
    fn test_verify_invalid_signature() {
        let key = generate_signing_key();
        assert!(!verify_ed25519(
            key.verifying_key().as_bytes(),
            &[7u8; 32],
            &[0u8; 64]
        ));
    }

    #[test]
    fn test_verify_wrong_digest() {
        let key = generate_signing_key();
        let sig = key.sign(&[1u8; 32]).to_bytes();
        assert!(!verify_ed25519(
            key.verifying_key().as_bytes(),
            &[2u8; 32],
            &sig
        ));
    }

    #[test]
    fn test_verify_wrong_key() {
        let key = generate_signing_key();
        let other = generate_signing_key();
        let sig = key.sign(&[1u8; 32]).to_bytes();
        assert!(!verify_ed25519(
            other.verifying_key().as_bytes(),
            &[1u8; 32],
            &sig
        ));
    }

    #[test]
    fn test_invalid_lengths() {
        let key = generate_signing_key();
        let pk = key.verifying_key();
        assert!(!verify_ed25519(&[0u8; 16], b"x", &[0u8; 64]));
        assert!(!verify_ed25519(pk.as_bytes(), b"x", &[0u8; 32]));
        assert!(!verify_ed25519(pk.as_bytes(), b"x", &[0u8; 128]));
    }

    #[test]
    fn test_hex_round_trip() {
        let key = generate_signing_key();
        let digest = [9u8; 32];
        let sig_hex = sign_hex(&key, &digest);
        assert_eq!(sig_hex.len(), SIGNATURE_LEN * 2);
        assert!(verify_hex_signature(
            key.verifying_key().as_bytes(),
            &digest,
            &sig_hex
        ));
        assert!(!verify_hex_signature(
            key.verifying_key().as_bytes(),
            &digest,
            "zz"
        ));
        assert_eq!(public_key_hex(&key).len(), PUBLIC_KEY_LEN * 2);
    }
}
