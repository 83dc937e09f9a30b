//! Provider credential types and environment loading.
//!
//! Each adapter owns its credentials exclusively. `Debug` implementations
//! redact secret material so credentials can appear in logs without leaking,
//! and nothing in this module ever logs a secret value.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

/// Google service-account key material used to sign OAuth assertions.
///
/// Parsed from the service-account JSON file Google Cloud issues. The
/// private key is only readable inside the crate and is redacted from
/// `Debug` output.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    /// Cloud project the key belongs to; becomes part of the send URL.
    pub project_id: String,
    /// Service-account email, used as the assertion issuer.
    pub client_email: String,
    private_key: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServiceAccount {
    /// Parse service-account key material from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or missing the
    /// `project_id`, `client_email`, or `private_key` fields.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("failed to parse service account JSON: {e}"))
    }

    /// Load from the `FCM_SERVICE_ACCOUNT_JSON` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error when the variable is missing or its value is not
    /// valid service-account JSON.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_json(&require_env("FCM_SERVICE_ACCOUNT_JSON")?)
    }

    /// PEM-encoded RSA private key for assertion signing.
    pub(crate) fn private_key(&self) -> &str {
        &self.private_key
    }
}

/// Twilio account credentials: account SID plus auth token.
#[derive(Clone)]
pub struct TwilioCredentials {
    /// Account SID; appears in the API path and the Basic-auth user.
    pub account_sid: String,
    auth_token: String,
}

impl std::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl TwilioCredentials {
    /// Create credentials from an account SID and auth token.
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Load from `TWILIO_ACCOUNT_SID` and `TWILIO_AUTH_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns an error when either variable is missing.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::new(
            require_env("TWILIO_ACCOUNT_SID")?,
            require_env("TWILIO_AUTH_TOKEN")?,
        ))
    }

    /// `Authorization` header value for Basic auth with these credentials.
    pub(crate) fn basic_auth(&self) -> String {
        basic_auth_header(&self.account_sid, &self.auth_token)
    }
}

/// Mailgun API credentials: API key plus sending domain.
#[derive(Clone)]
pub struct MailgunCredentials {
    /// Sending domain; appears in the API path.
    pub domain: String,
    api_key: String,
}

impl std::fmt::Debug for MailgunCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunCredentials")
            .field("domain", &self.domain)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl MailgunCredentials {
    /// Create credentials from an API key and sending domain.
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            api_key: api_key.into(),
        }
    }

    /// Load from `MAILGUN_API_KEY` and `MAILGUN_DOMAIN`.
    ///
    /// # Errors
    ///
    /// Returns an error when either variable is missing.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::new(
            require_env("MAILGUN_API_KEY")?,
            require_env("MAILGUN_DOMAIN")?,
        ))
    }

    /// `Authorization` header value for Basic auth as the `api` user.
    pub(crate) fn basic_auth(&self) -> String {
        basic_auth_header("api", &self.api_key)
    }
}

fn basic_auth_header(user: &str, secret: &str) -> String {
    let encoded = BASE64.encode(format!("{user}:{secret}"));
    format!("Basic {encoded}")
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("missing required credential: {key}"))
}
