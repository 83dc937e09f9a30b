//! Channel message value objects.
//!
//! One struct per channel ([`PushMessage`], [`SmsMessage`], [`EmailMessage`]).
//! The dispatch engine only reads the ordered recipient list; every other
//! field is opaque data the owning adapter maps onto its provider's wire
//! schema. Recipient order is significant — per-recipient results come back
//! in the same order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Delivery priority hint for push notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Deliver with normal priority.
    Normal,
    /// Deliver immediately, waking the device if needed.
    High,
}

/// A push notification addressed to one or more device tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Device tokens to deliver to. Must be non-empty.
    pub to: Vec<String>,
    /// Notification title.
    pub title: Option<String>,
    /// Notification body text.
    pub body: Option<String>,
    /// Custom key-value payload delivered alongside the notification.
    pub data: Option<BTreeMap<String, String>>,
    /// Action identifier (Android click action / APNs category).
    pub action: Option<String>,
    /// Image URL shown with the notification.
    pub image: Option<String>,
    /// Android notification icon resource.
    pub icon: Option<String>,
    /// Android notification accent color.
    pub color: Option<String>,
    /// Android notification tag for stacking.
    pub tag: Option<String>,
    /// Notification sound name.
    pub sound: Option<String>,
    /// iOS badge count.
    pub badge: Option<u32>,
    /// iOS content-available flag for background delivery.
    pub content_available: Option<bool>,
    /// Mark the notification as critical (bypasses mute on iOS).
    pub critical: Option<bool>,
    /// Delivery priority hint.
    pub priority: Option<Priority>,
}

impl PushMessage {
    /// Create a push message to the given device tokens with no content set.
    pub fn new(to: Vec<String>) -> Self {
        Self {
            to,
            ..Self::default()
        }
    }
}

/// An SMS addressed to one or more phone numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Destination phone numbers in E.164 form. Must be non-empty.
    pub to: Vec<String>,
    /// Message text.
    pub content: String,
    /// Sender number or identity. Adapters may override this with their own
    /// configured sender.
    pub from: Option<String>,
}

impl SmsMessage {
    /// Create an SMS to the given numbers with the given text.
    pub fn new(to: Vec<String>, content: impl Into<String>) -> Self {
        Self {
            to,
            content: content.into(),
            from: None,
        }
    }
}

/// An email addressed to one or more mailboxes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Destination addresses. Must be non-empty.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub content: String,
    /// Sender address.
    pub from: String,
    /// Whether `content` is HTML rather than plain text.
    pub html: bool,
}

impl EmailMessage {
    /// Create a plain-text email.
    pub fn new(
        to: Vec<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            to,
            subject: subject.into(),
            content: content.into(),
            from: from.into(),
            html: false,
        }
    }
}
