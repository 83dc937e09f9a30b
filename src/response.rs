//! Normalized delivery response shared by all adapters.
//!
//! Whatever the provider's wire format, a send resolves to one
//! [`DeliveryResponse`]: the channel kind, a delivered count, and one
//! [`RecipientResult`] per original recipient, in the original order.

use serde::{Deserialize, Serialize};

/// The channel a message was dispatched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Push notification.
    Push,
    /// SMS.
    Sms,
    /// Email.
    Email,
}

impl ChannelKind {
    /// The lowercase wire name of this channel.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

/// Outcome for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientResult {
    /// The destination identifier exactly as it appeared in the message.
    pub recipient: String,
    /// Failure reason. Absent when the provider accepted the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The normalized result of one `send` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    /// Channel the message went out on.
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Number of recipients the provider accepted the message for.
    #[serde(rename = "deliveredTo")]
    pub delivered_to: usize,
    /// Per-recipient outcomes in original recipient order.
    pub results: Vec<RecipientResult>,
}

impl DeliveryResponse {
    /// Create an empty response for the given channel.
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            delivered_to: 0,
            results: Vec::new(),
        }
    }

    /// Record a recipient the provider accepted.
    pub fn record_delivered(&mut self, recipient: impl Into<String>) {
        self.delivered_to = self.delivered_to.saturating_add(1);
        self.results.push(RecipientResult {
            recipient: recipient.into(),
            error: None,
        });
    }

    /// Record a recipient the provider rejected, with the failure reason.
    pub fn record_failed(&mut self, recipient: impl Into<String>, error: impl Into<String>) {
        self.results.push(RecipientResult {
            recipient: recipient.into(),
            error: Some(error.into()),
        });
    }
}
