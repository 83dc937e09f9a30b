//! OAuth-style bearer token acquisition and caching.
//!
//! Providers that authenticate with short-lived bearer tokens (FCM) go
//! through [`exchange_service_account`]: an RS256-signed assertion is traded
//! for a bearer token in a single form-encoded POST to the token endpoint.
//! [`TokenCache`] holds the current token for the adapter's lifetime and
//! refreshes it lazily once it falls inside the skew window.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapters::sanitize_error_text;
use crate::credentials::ServiceAccount;

/// Token lifetime requested in the assertion, in seconds.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600; // 1 hour

/// Safety margin subtracted from a token's expiry before reuse, in seconds.
///
/// Covers clock drift between us and the token server plus in-flight request
/// latency. The assertion's `iat` is backdated by the same amount.
pub const DEFAULT_TOKEN_SKEW_SECS: i64 = 60; // 1 minute

/// OAuth grant type for signed-JWT assertion exchange.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Errors raised while acquiring a bearer token.
///
/// Any of these aborts the whole send: no batch request is issued without
/// valid authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint could not be reached.
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned status {status}: {body}")]
    Endpoint {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// The assertion could not be signed with the provided key material.
    #[error("assertion signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    /// The token endpoint's response did not match the expected schema.
    #[error("token response parse error: {0}")]
    Parse(String),
}

/// A bearer token together with its validity window.
#[derive(Clone)]
pub struct AccessToken {
    /// The bearer token string.
    pub token: String,
    /// When the token was obtained.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being valid per the provider's claims.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Whether the token is still usable right now.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    /// Whether the token is still usable at `now`, leaving the skew margin
    /// before the actual expiry.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let guard = self
            .expires_at
            .checked_sub_signed(Duration::seconds(DEFAULT_TOKEN_SKEW_SECS))
            .unwrap_or(self.expires_at);
        now < guard
    }
}

/// Read-mostly cache for one adapter's bearer token.
///
/// Many concurrent `send` calls check freshness under a read lock; a stale
/// token sends the caller through the write lock, where the freshness check
/// repeats before refreshing. Concurrent refreshes may race (each signs its
/// own assertion), but a stale token is never returned.
#[derive(Default)]
pub struct TokenCache {
    slot: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a fresh bearer token string, invoking `refresh` if the cached
    /// token is missing or inside the skew window.
    ///
    /// # Errors
    ///
    /// Propagates the [`AuthError`] from `refresh`; the cache keeps its
    /// previous contents on failure.
    pub async fn bearer<F, Fut>(&self, refresh: F) -> Result<String, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, AuthError>>,
    {
        {
            let slot = self.slot.read().await;
            if let Some(token) = slot.as_ref() {
                if token.is_fresh() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut slot = self.slot.write().await;
        // A sibling writer may have refreshed while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            if token.is_fresh() {
                return Ok(token.token.clone());
            }
        }

        let token = refresh().await?;
        debug!(expires_at = %token.expires_at, "bearer token refreshed");
        let bearer = token.token.clone();
        *slot = Some(token);
        Ok(bearer)
    }
}

#[derive(Serialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Exchange a service account's signed assertion for a bearer token.
///
/// The assertion claims `iss` (the service-account email), the requested
/// `scope`, `aud` (the token endpoint itself), an `iat` backdated by the
/// skew margin, and an `exp` one lifetime ahead. The signing key lives only
/// for the duration of the signing call.
///
/// # Errors
///
/// Returns [`AuthError`] when signing fails, the endpoint is unreachable,
/// answers non-2xx, or its response cannot be parsed.
pub async fn exchange_service_account(
    client: &reqwest::Client,
    account: &ServiceAccount,
    token_url: &str,
    scope: &str,
) -> Result<AccessToken, AuthError> {
    let now = Utc::now();
    let issued_at = now
        .checked_sub_signed(Duration::seconds(DEFAULT_TOKEN_SKEW_SECS))
        .unwrap_or(now);
    let expires = now
        .checked_add_signed(Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
        .unwrap_or(now);

    let claims = AssertionClaims {
        iss: account.client_email.clone(),
        scope: scope.to_owned(),
        aud: token_url.to_owned(),
        iat: issued_at.timestamp(),
        exp: expires.timestamp(),
    };

    let assertion = sign_assertion(&claims, account.private_key())?;

    let response = client
        .post(token_url)
        .form(&[
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(AuthError::Endpoint {
            status: status.as_u16(),
            body: sanitize_error_text(&body),
        });
    }

    let parsed: TokenEndpointResponse =
        serde_json::from_str(&body).map_err(|e| AuthError::Parse(e.to_string()))?;
    let lifetime = parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    let expires_at = now
        .checked_add_signed(Duration::seconds(lifetime))
        .unwrap_or(now);

    Ok(AccessToken {
        token: parsed.access_token,
        issued_at: now,
        expires_at,
    })
}

/// Sign the assertion claims with the account's RSA key.
///
/// The [`EncodingKey`] is scoped to this function; it is dropped before the
/// token request goes out and is never cached.
fn sign_assertion(claims: &AssertionClaims, private_key_pem: &str) -> Result<String, AuthError> {
    let header = Header::new(Algorithm::RS256);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
    Ok(jsonwebtoken::encode(&header, claims, &key)?)
}
