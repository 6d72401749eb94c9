//! Credential, identity and key types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use super::error::{AuthError, AuthErrorCode};

/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A structurally valid Ed25519 public key.
///
/// Keeps the hex text exactly as presented: it is part of the signed digest
/// and admin matching is case-sensitive on that text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    hex: String,
    bytes: [u8; PUBLIC_KEY_LEN],
}

impl PublicKey {
    /// Parse a 64-character hex string into a key.
    pub fn parse(hex_str: &str) -> Result<Self, AuthError> {
        if hex_str.len() != PUBLIC_KEY_LEN * 2 {
            return Err(AuthError::new(
                AuthErrorCode::InvalidPublicKey,
                format!(
                    "Public key must be {} hex characters, got {}",
                    PUBLIC_KEY_LEN * 2,
                    hex_str.len()
                ),
            ));
        }
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|_| AuthError::from_code(AuthErrorCode::InvalidPublicKey))?;
        Ok(Self {
            hex: hex_str.to_string(),
            bytes,
        })
    }

    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.bytes
    }

    /// Short prefix safe to put in logs.
    pub fn short(&self) -> &str {
        &self.hex[..8]
    }
}

// Only the prefix: full keys stay out of logs.
impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", self.short())
    }
}

/// Signed request credential, minted fresh by the client for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// 64 hex chars
    pub public_key: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Opaque single-use token
    pub nonce: String,
    /// 128 hex chars (64-byte Ed25519 signature)
    pub signature: String,
    /// Application context bound into the signature, may be empty
    #[serde(default)]
    pub message: String,
}

/// Permission granted to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Admin,
    Read,
    Write,
    Delete,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }

    /// Permissions of an admin key.
    pub fn admin_set() -> BTreeSet<Permission> {
        BTreeSet::from([Self::Admin, Self::Read, Self::Write, Self::Delete])
    }

    /// Permissions of any other valid key.
    pub fn default_set() -> BTreeSet<Permission> {
        BTreeSet::from([Self::Read])
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown permission: {}", other)),
        }
    }
}

/// Authenticated caller, derived per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub public_key: String,
    pub is_admin: bool,
    pub permissions: BTreeSet<Permission>,
}

impl Identity {
    /// Build an identity, deriving permissions from the admin flag.
    pub fn new(public_key: impl Into<String>, is_admin: bool) -> Self {
        let permissions = if is_admin {
            Permission::admin_set()
        } else {
            Permission::default_set()
        };
        Self {
            public_key: public_key.into(),
            is_admin,
            permissions,
        }
    }

    /// Classify a verified key against the admin set.
    pub fn classify(key: &PublicKey, admins: &AdminKeySet) -> Self {
        Self::new(key.as_hex(), admins.contains(key.as_hex()))
    }

    /// Check a single permission. The admin permission satisfies every check.
    pub fn has_permission(&self, required: Permission) -> bool {
        self.permissions.contains(&Permission::Admin) || self.permissions.contains(&required)
    }

    /// Check that every permission in `required` is granted.
    pub fn has_all(&self, required: &[Permission]) -> bool {
        required.iter().all(|p| self.has_permission(*p))
    }
}

/// Outcome of [`AuthService::validate`](super::service::AuthService::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub success: bool,
    pub error: Option<AuthErrorCode>,
    pub identity: Option<Identity>,
}

impl AuthResult {
    pub fn ok(identity: Identity) -> Self {
        Self {
            success: true,
            error: None,
            identity: Some(identity),
        }
    }

    pub fn fail(code: AuthErrorCode) -> Self {
        Self {
            success: false,
            error: Some(code),
            identity: None,
        }
    }

    /// Convert into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<Identity, AuthError> {
        match (self.success, self.identity, self.error) {
            (true, Some(identity), _) => Ok(identity),
            (false, _, Some(code)) => Err(AuthError::from_code(code)),
            _ => Err(AuthError::from_code(AuthErrorCode::InternalError)),
        }
    }
}

/// Configured admin entry that is not a valid public key.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("admin key #{index} is not a {expected}-character hex public key")]
pub struct InvalidAdminKey {
    pub index: usize,
    pub expected: usize,
}

/// Immutable set of admin public keys, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct AdminKeySet {
    keys: HashSet<String>,
}

impl AdminKeySet {
    /// Build the set, rejecting any entry that is not a structurally valid key.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, InvalidAdminKey>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for (index, key) in keys.into_iter().enumerate() {
            let key = key.as_ref();
            if PublicKey::parse(key).is_err() {
                return Err(InvalidAdminKey {
                    index,
                    expected: PUBLIC_KEY_LEN * 2,
                });
            }
            set.insert(key.to_string());
        }
        Ok(Self { keys: set })
    }

    /// Exact, case-sensitive match on the hex text.
    pub fn contains(&self, public_key: &str) -> bool {
        self.keys.contains(public_key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
