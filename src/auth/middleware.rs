//! Request authentication for Axum.
//!
//! Turns a request envelope into a [`Credential`], validates it and applies an
//! [`AuthPolicy`]. The resulting identity is handed to the handler through
//! request extensions:
//!
//! - `Required`, `AdminOnly`, `Permissions` insert [`Identity`]
//! - `Optional` inserts `Option<Identity>`

use axum::{
    body::{Body, to_bytes},
    extract::{OriginalUri, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use super::{
    canonical::request_message,
    error::{AuthError, AuthErrorCode},
    models::{Credential, Identity, Permission},
    service::AuthService,
};

pub const HEADER_PUBLIC_KEY: &str = "x-public-key";
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
pub const HEADER_NONCE: &str = "x-nonce";
pub const HEADER_SIGNATURE: &str = "x-signature";

/// Largest body the middleware buffers for signing.
pub const MAX_SIGNED_BODY_BYTES: usize = 1024 * 1024;

/// Transport-neutral view of an incoming request.
#[derive(Debug, Clone, Copy)]
pub struct RequestEnvelope<'a> {
    pub method: &'a str,
    /// Path including query string
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub body: Option<&'a str>,
}

/// Decision layer applied after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Valid credential required
    Required,
    /// Valid credential from an admin key required
    AdminOnly,
    /// Anonymous allowed; invalid credentials are logged and ignored
    Optional,
    /// Valid credential holding every listed permission required
    Permissions(Vec<Permission>),
}

/// True when any credential header is present.
pub fn has_credential_headers(headers: &HeaderMap) -> bool {
    [
        HEADER_PUBLIC_KEY,
        HEADER_TIMESTAMP,
        HEADER_NONCE,
        HEADER_SIGNATURE,
    ]
    .iter()
    .any(|name| headers.contains_key(*name))
}

/// Read the credential headers.
///
/// Returns `Ok(None)` when no credential header is present at all, and
/// `missing_headers` when the set is partial or unreadable.
pub fn extract_credential(envelope: &RequestEnvelope<'_>) -> Result<Option<Credential>, AuthError> {
    if !has_credential_headers(envelope.headers) {
        return Ok(None);
    }

    let public_key = header_str(envelope.headers, HEADER_PUBLIC_KEY)?;
    let timestamp = header_str(envelope.headers, HEADER_TIMESTAMP)?
        .parse::<i64>()
        .map_err(|_| {
            AuthError::new(
                AuthErrorCode::MissingHeaders,
                "Timestamp header must be an integer (ms)",
            )
        })?;
    let nonce = header_str(envelope.headers, HEADER_NONCE)?;
    let signature = header_str(envelope.headers, HEADER_SIGNATURE)?;

    Ok(Some(Credential {
        public_key: public_key.to_string(),
        timestamp,
        nonce: nonce.to_string(),
        signature: signature.to_string(),
        message: request_message(envelope.method, envelope.path, envelope.body),
    }))
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AuthError::new(
                AuthErrorCode::MissingHeaders,
                format!("Missing or unreadable {} header", name),
            )
        })
}

/// Validate the envelope and apply the policy.
///
/// `Ok(None)` only occurs under [`AuthPolicy::Optional`].
pub fn authorize(
    service: &AuthService,
    envelope: &RequestEnvelope<'_>,
    policy: &AuthPolicy,
) -> Result<Option<Identity>, AuthError> {
    let outcome = extract_credential(envelope)
        .inspect_err(|err| service.record_rejection(err.code))
        .and_then(|credential| match credential {
            Some(credential) => service.validate(&credential).into_result().map(Some),
            None => Ok(None),
        });
    apply_policy(service, envelope, policy, outcome)
}

/// Turn a validation outcome into the policy decision.
fn apply_policy(
    service: &AuthService,
    envelope: &RequestEnvelope<'_>,
    policy: &AuthPolicy,
    outcome: Result<Option<Identity>, AuthError>,
) -> Result<Option<Identity>, AuthError> {
    if *policy == AuthPolicy::Optional {
        return match outcome {
            Ok(identity) => Ok(identity),
            Err(err) => {
                // Optional auth never blocks the request
                warn!(
                    method = envelope.method,
                    path = envelope.path,
                    error = err.code.name(),
                    "Ignoring invalid credential on optional route"
                );
                Ok(None)
            }
        };
    }

    let Some(identity) = outcome? else {
        service.record_rejection(AuthErrorCode::MissingHeaders);
        return Err(AuthError::from_code(AuthErrorCode::MissingHeaders));
    };
    enforce(policy, &identity).inspect_err(|err| service.record_rejection(err.code))?;
    Ok(Some(identity))
}

/// Policy checks on an already validated identity.
pub fn enforce(policy: &AuthPolicy, identity: &Identity) -> Result<(), AuthError> {
    match policy {
        AuthPolicy::Required | AuthPolicy::Optional => Ok(()),
        AuthPolicy::AdminOnly if identity.is_admin => Ok(()),
        AuthPolicy::AdminOnly => Err(AuthError::from_code(AuthErrorCode::NotAdmin)),
        AuthPolicy::Permissions(required) if identity.has_all(required) => Ok(()),
        AuthPolicy::Permissions(required) => {
            let names: Vec<&str> = required.iter().map(|p| p.as_str()).collect();
            Err(AuthError::new(
                AuthErrorCode::InsufficientPermission,
                format!("Requires permissions: {}", names.join(", ")),
            ))
        }
    }
}

/// Middleware state: the service plus the policy for one route group.
#[derive(Clone)]
pub struct PolicyState {
    pub auth: Arc<AuthService>,
    pub policy: AuthPolicy,
}

impl PolicyState {
    pub fn new(auth: Arc<AuthService>, policy: AuthPolicy) -> Self {
        Self { auth, policy }
    }
}

/// Axum middleware applying a [`PolicyState`].
///
/// Buffers the body (up to [`MAX_SIGNED_BODY_BYTES`]) so it can be bound into
/// the signed message, then hands an identical request to the handler.
/// Anonymous requests on optional routes are passed through unbuffered.
pub async fn auth_layer(
    State(state): State<PolicyState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();

    if state.policy == AuthPolicy::Optional && !has_credential_headers(&parts.headers) {
        parts.extensions.insert(None::<Identity>);
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let buffered = to_bytes(body, MAX_SIGNED_BODY_BYTES).await;
    let body_text = match &buffered {
        Ok(bytes) => std::str::from_utf8(bytes).map_err(|_| {
            AuthError::new(
                AuthErrorCode::InvalidSignature,
                "Signed request body must be UTF-8",
            )
        }),
        Err(_) => Err(AuthError::new(
            AuthErrorCode::InvalidSignature,
            "Request body unreadable or larger than the signing limit",
        )),
    };

    // Nested routers strip prefixes from the URI; sign over the original
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| parts.uri.clone());
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(uri.path());

    let identity = match body_text {
        Ok(text) => {
            let envelope = RequestEnvelope {
                method: parts.method.as_str(),
                path,
                headers: &parts.headers,
                body: Some(text),
            };
            authorize(&state.auth, &envelope, &state.policy)
        }
        Err(err) => {
            // The signed message cannot be rebuilt; settle it like any other rejection
            state.auth.record_rejection(err.code);
            let envelope = RequestEnvelope {
                method: parts.method.as_str(),
                path,
                headers: &parts.headers,
                body: None,
            };
            apply_policy(&state.auth, &envelope, &state.policy, Err(err))
        }
    }?;

    match (&state.policy, identity) {
        (AuthPolicy::Optional, identity) => {
            parts.extensions.insert(identity);
        }
        (_, Some(identity)) => {
            parts.extensions.insert(identity);
        }
        (_, None) => return Err(AuthError::from_code(AuthErrorCode::InternalError)),
    }

    // An over-limit body was consumed while buffering; only optional routes get here with one
    let body = buffered.map(Body::from).unwrap_or_else(|_| Body::empty());
    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::canonical::sign_credential;
    use crate::auth::clock::ManualClock;
    use crate::auth::signature::{generate_signing_key, public_key_hex};
    use crate::config::AuthConfig;
    use axum::http::HeaderValue;
    use ed25519_dalek::SigningKey;

    const T0: i64 = 1_700_000_000_000;

    fn service(admins: Vec<String>) -> AuthService {
        let config = AuthConfig {
            admin_keys: admins,
            ..AuthConfig::default()
        };
        AuthService::with_clock(&config, Arc::new(ManualClock::new(T0))).unwrap()
    }

    fn signed_headers(key: &SigningKey, nonce: &str, message: &str) -> HeaderMap {
        let cred = sign_credential(key, T0, nonce, message);
        let mut headers = HeaderMap::new();
        headers.insert(
            HEADER_PUBLIC_KEY,
            HeaderValue::from_str(&cred.public_key).unwrap(),
        );
        headers.insert(
            HEADER_TIMESTAMP,
            HeaderValue::from_str(&cred.timestamp.to_string()).unwrap(),
        );
        headers.insert(HEADER_NONCE, HeaderValue::from_str(&cred.nonce).unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            HeaderValue::from_str(&cred.signature).unwrap(),
        );
        headers
    }

    fn envelope<'a>(headers: &'a HeaderMap, body: Option<&'a str>) -> RequestEnvelope<'a> {
        RequestEnvelope {
            method: "GET",
            path: "/api/users",
            headers,
            body,
        }
    }

    #[test]
    fn test_extract_no_headers() {
        let headers = HeaderMap::new();
        assert_eq!(extract_credential(&envelope(&headers, None)), Ok(None));
    }

    #[test]
    fn test_extract_partial_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_NONCE, HeaderValue::from_static("abc"));
        let err = extract_credential(&envelope(&headers, None)).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::MissingHeaders);
    }

    #[test]
    fn test_extract_bad_timestamp() {
        let mut headers = signed_headers(&generate_signing_key(), "n", "GET:/api/users");
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("soon"));
        let err = extract_credential(&envelope(&headers, None)).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::MissingHeaders);
    }

    #[test]
    fn test_extract_builds_message() {
        let headers = signed_headers(&generate_signing_key(), "n", "");
        let cred = extract_credential(&envelope(&headers, Some(r#"{"x":1}"#)))
            .unwrap()
            .unwrap();
        assert_eq!(cred.message, r#"GET:/api/users:{"x":1}"#);
        assert_eq!(cred.timestamp, T0);
    }

    #[test]
    fn test_required_accepts_valid() {
        let service = service(vec![]);
        let key = generate_signing_key();
        let headers = signed_headers(&key, "n1", "GET:/api/users");

        let identity = authorize(&service, &envelope(&headers, None), &AuthPolicy::Required)
            .unwrap()
            .unwrap();
        assert_eq!(identity.public_key, public_key_hex(&key));
    }

    #[test]
    fn test_required_rejects_missing() {
        let service = service(vec![]);
        let headers = HeaderMap::new();
        let err = authorize(&service, &envelope(&headers, None), &AuthPolicy::Required)
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::MissingHeaders);
    }

    #[test]
    fn test_signature_bound_to_route() {
        let service = service(vec![]);
        let headers = signed_headers(&generate_signing_key(), "n1", "GET:/api/other");
        let err = authorize(&service, &envelope(&headers, None), &AuthPolicy::Required)
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidSignature);
    }

    #[test]
    fn test_signature_bound_to_body() {
        let service = service(vec![]);
        let headers = signed_headers(&generate_signing_key(), "n1", "GET:/api/users:{\"a\":1}");
        let err = authorize(
            &service,
            &envelope(&headers, Some("{\"a\":2}")),
            &AuthPolicy::Required,
        )
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidSignature);
    }

    #[test]
    fn test_admin_only() {
        let admin = generate_signing_key();
        let user = generate_signing_key();
        let service = service(vec![public_key_hex(&admin)]);

        let headers = signed_headers(&user, "n1", "GET:/api/users");
        let err = authorize(&service, &envelope(&headers, None), &AuthPolicy::AdminOnly)
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::NotAdmin);

        let headers = signed_headers(&admin, "n2", "GET:/api/users");
        let identity = authorize(&service, &envelope(&headers, None), &AuthPolicy::AdminOnly)
            .unwrap()
            .unwrap();
        assert!(identity.is_admin);
    }

    #[test]
    fn test_optional_anonymous_and_invalid() {
        let service = service(vec![]);

        let headers = HeaderMap::new();
        assert_eq!(
            authorize(&service, &envelope(&headers, None), &AuthPolicy::Optional),
            Ok(None)
        );

        // Present but invalid: still proceeds, anonymously
        let headers = signed_headers(&generate_signing_key(), "n1", "GET:/wrong");
        assert_eq!(
            authorize(&service, &envelope(&headers, None), &AuthPolicy::Optional),
            Ok(None)
        );
    }

    #[test]
    fn test_optional_valid_identity() {
        let service = service(vec![]);
        let headers = signed_headers(&generate_signing_key(), "n1", "GET:/api/users");
        let identity =
            authorize(&service, &envelope(&headers, None), &AuthPolicy::Optional).unwrap();
        assert!(identity.is_some());
    }

    #[test]
    fn test_policy_rejections_counted() {
        let user = generate_signing_key();
        let config = AuthConfig {
            enable_metrics: true,
            ..AuthConfig::default()
        };
        let service =
            AuthService::with_clock(&config, Arc::new(ManualClock::new(T0))).unwrap();

        let headers = HeaderMap::new();
        let _ = authorize(&service, &envelope(&headers, None), &AuthPolicy::Required);
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_NONCE, HeaderValue::from_static("abc"));
        let _ = authorize(&service, &envelope(&headers, None), &AuthPolicy::Required);
        let headers = signed_headers(&user, "n1", "GET:/api/users");
        let _ = authorize(&service, &envelope(&headers, None), &AuthPolicy::AdminOnly);
        let headers = signed_headers(&user, "n2", "GET:/api/users");
        let policy = AuthPolicy::Permissions(vec![Permission::Delete]);
        let _ = authorize(&service, &envelope(&headers, None), &policy);

        let snap = service.metrics().unwrap();
        assert_eq!(snap.failures.get("missing_headers"), Some(&2));
        assert_eq!(snap.failures.get("not_admin"), Some(&1));
        assert_eq!(snap.failures.get("insufficient_permission"), Some(&1));
        // Only the two signed requests reached validate()
        assert_eq!(snap.attempts, 2);
        assert_eq!(snap.successes, 2);
    }

    #[test]
    fn test_permission_check() {
        let admin = generate_signing_key();
        let user = generate_signing_key();
        let service = service(vec![public_key_hex(&admin)]);
        let policy = AuthPolicy::Permissions(vec![Permission::Write]);

        let headers = signed_headers(&user, "n1", "GET:/api/users");
        let err = authorize(&service, &envelope(&headers, None), &policy).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InsufficientPermission);
        assert!(err.message.contains("write"));

        let headers = signed_headers(&admin, "n1", "GET:/api/users");
        assert!(authorize(&service, &envelope(&headers, None), &policy).is_ok());

        let read = AuthPolicy::Permissions(vec![Permission::Read]);
        let headers = signed_headers(&user, "n2", "GET:/api/users");
        assert!(authorize(&service, &envelope(&headers, None), &read).is_ok());
    }
}
