//! Provider adapter contract.
//!
//! Defines the [`Adapter`] trait and the [`SendError`] taxonomy shared by
//! all provider implementations.
//!
//! Three adapters are implemented:
//! - [`fcm::FcmAdapter`] — Firebase Cloud Messaging v1 push
//! - [`twilio::TwilioAdapter`] — Twilio SMS
//! - [`mailgun::MailgunAdapter`] — Mailgun email
//!
//! Every adapter runs the same fixed sequence inside `send`: validate the
//! message, acquire authorization where the provider needs it (failing the
//! whole send if that fails), build the payload fragments shared across
//! recipients, batch recipients by the adapter's per-request limit, dispatch
//! all chunk requests, and reconcile the raw results into one
//! [`DeliveryResponse`](crate::response::DeliveryResponse). What varies per
//! adapter is data: the name, the limit, the payload mapping, and the error
//! classification.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::auth::AuthError;
use crate::response::{ChannelKind, DeliveryResponse};

pub mod fcm;
pub mod mailgun;
pub mod twilio;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that abort a `send` call outright.
///
/// Per-chunk transport failures and provider rejections do not appear here;
/// they fold into the response's per-recipient results instead.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The message failed local validation; nothing was sent.
    #[error("invalid message: {0}")]
    Validation(String),
    /// Authorization could not be acquired; nothing was sent.
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),
    /// The batch deadline elapsed with requests still in flight.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A binding from the normalized message model to one provider's wire
/// protocol.
///
/// Implementations must be `Send + Sync`; one adapter instance serves
/// concurrent `send` calls and shares nothing mutable between them except
/// its token cache.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The channel message type this adapter delivers.
    type Message;

    /// Provider name, e.g. `"FCM"`.
    fn name(&self) -> &'static str;

    /// The channel this adapter serves.
    fn kind(&self) -> ChannelKind;

    /// Maximum recipients the provider accepts in a single request.
    fn max_messages_per_request(&self) -> usize;

    /// Deliver `message` to every recipient, returning one result per
    /// recipient in original order.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] for validation, authorization, or deadline
    /// failures. Per-recipient provider rejections are reported inside the
    /// response, not as errors.
    async fn send(&self, message: &Self::Message) -> Result<DeliveryResponse, SendError>;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Reject messages with no recipients before any network activity.
pub(crate) fn require_recipients(to: &[String]) -> Result<(), SendError> {
    if to.is_empty() {
        return Err(SendError::Validation("recipient list is empty".to_owned()));
    }
    Ok(())
}

/// Collapse, redact, and truncate provider error text before it lands in an
/// error value or a log line.
pub fn sanitize_error_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"ya29\.[A-Za-z0-9_\-.]{10,}",
        r"key-[A-Za-z0-9]{20,}",
        r"Bearer [A-Za-z0-9_\-./+=]+",
        r"assertion=[A-Za-z0-9_\-.%]+",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
