//! HTTP Basic authentication
//!
//! Credentials come from a static table (`TUTOR_USERS`). Passwords are kept
//! only as SHA-256 digests and compared digest to digest.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

const REALM: &str = "Basic realm=\"Math Tutor\", charset=\"UTF-8\"";

/// Decides whether a username/password pair may use the service
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("Credential entry {0} is not in user:password form")]
    Malformed(usize),
    #[error("Credential entry {0} has an empty username")]
    EmptyUser(usize),
}

/// Fixed username to password table
#[derive(Default)]
pub struct StaticCredentials {
    users: HashMap<String, [u8; 32]>,
}

impl StaticCredentials {
    /// Parse `user:pass,user:pass`. Passwords may contain `:`; whitespace
    /// around entries is ignored.
    pub fn parse(table: &str) -> Result<Self, CredentialsError> {
        let mut users = HashMap::new();
        for (idx, entry) in table
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .enumerate()
        {
            let (user, pass) = entry
                .split_once(':')
                .ok_or(CredentialsError::Malformed(idx + 1))?;
            if user.is_empty() {
                return Err(CredentialsError::EmptyUser(idx + 1));
            }
            users.insert(user.to_string(), digest(pass));
        }
        Ok(Self { users })
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| *expected == digest(password))
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Username of the authenticated caller, placed in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Extract `(username, password)` from an `Authorization: Basic` header
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Reject requests without valid Basic credentials
pub async fn require_basic_auth(
    State(verifier): State<Arc<dyn CredentialVerifier>>,
    mut req: Request,
    next: Next,
) -> Response {
    match basic_credentials(req.headers()) {
        Some((user, pass)) if verifier.verify(&user, &pass) => {
            req.extensions_mut().insert(AuthenticatedUser(user));
            next.run(req).await
        }
        Some((user, _)) => {
            tracing::warn!(user = %user, path = %req.uri().path(), "Rejected credentials");
            challenge()
        }
        None => challenge(),
    }
}

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM))],
        "Unauthorized",
    )
        .into_response()
}
