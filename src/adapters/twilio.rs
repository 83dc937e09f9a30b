//! Twilio SMS adapter.
//!
//! Twilio's Messages API takes exactly one destination per request, so a
//! multi-recipient message degenerates to one form-encoded request per
//! number, dispatched concurrently under Basic auth.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::{require_recipients, Adapter, SendError};
use crate::batch::chunk_recipients;
use crate::credentials::TwilioCredentials;
use crate::dispatch::{dispatch_all, DispatchOptions, Payload, RawResult, WireRequest};
use crate::message::SmsMessage;
use crate::reconcile::{reconcile, ExpiredCodes, EXPIRED_DESTINATION, UNKNOWN_ERROR};
use crate::response::{ChannelKind, DeliveryResponse};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio error codes for numbers that can never receive this message:
/// 21211 (invalid 'To' number) and 21614 (not a mobile number).
const INVALID_NUMBER_CODES: [&str; 2] = ["21211", "21614"];

/// Twilio SMS adapter.
pub struct TwilioAdapter {
    credentials: TwilioCredentials,
    from: Option<String>,
    client: reqwest::Client,
    api_base: String,
    options: DispatchOptions,
    expired_codes: ExpiredCodes,
}

impl TwilioAdapter {
    /// Create an adapter with the given account credentials.
    pub fn new(credentials: TwilioCredentials) -> Self {
        Self {
            credentials,
            from: None,
            client: reqwest::Client::new(),
            api_base: TWILIO_API_BASE.to_owned(),
            options: DispatchOptions::default(),
            expired_codes: ExpiredCodes::new(&INVALID_NUMBER_CODES),
        }
    }

    /// Set a default sender number, taking priority over the message's
    /// `from` field.
    #[must_use]
    pub fn with_sender(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Override the API endpoint. Tests point this at a local mock server.
    #[must_use]
    pub fn with_endpoint(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override dispatch tuning (concurrency bound, batch deadline).
    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }
}

// ---------------------------------------------------------------------------
// Wire builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build the form body for one destination number.
#[doc(hidden)]
pub fn build_form(to: &str, from: &str, content: &str) -> Vec<(String, String)> {
    vec![
        ("To".to_owned(), to.to_owned()),
        ("From".to_owned(), from.to_owned()),
        ("Body".to_owned(), content.to_owned()),
    ]
}

/// Pull an error message out of a failed Twilio response.
///
/// Permanently invalid destination numbers collapse to the canonical
/// expired-destination message; anything else passes Twilio's text through.
#[doc(hidden)]
pub fn extract_error(result: &RawResult, expired_codes: &ExpiredCodes) -> String {
    let code = match result.body.get("code") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    if let Some(code) = code {
        if expired_codes.contains(&code) {
            return EXPIRED_DESTINATION.to_owned();
        }
    }
    result
        .body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_owned())
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for TwilioAdapter {
    type Message = SmsMessage;

    fn name(&self) -> &'static str {
        "Twilio"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn max_messages_per_request(&self) -> usize {
        1
    }

    async fn send(&self, message: &SmsMessage) -> Result<DeliveryResponse, SendError> {
        require_recipients(&message.to)?;

        // Adapter-level sender wins over the message's own.
        let from = self
            .from
            .as_deref()
            .or(message.from.as_deref())
            .ok_or_else(|| {
                SendError::Validation(
                    "no sender number: set one on the adapter or the message".to_owned(),
                )
            })?;

        let chunks = chunk_recipients(&message.to, self.max_messages_per_request());
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.credentials.account_sid
        );

        let requests: Vec<WireRequest> = chunks
            .iter()
            .map(|chunk| {
                let to = chunk.recipients.first().map(String::as_str).unwrap_or_default();
                WireRequest {
                    url: url.clone(),
                    payload: Payload::Form(build_form(to, from, &message.content)),
                }
            })
            .collect();

        let headers = [("authorization", self.credentials.basic_auth())];
        let results =
            dispatch_all(&self.client, Method::POST, &headers, requests, &self.options).await?;

        Ok(reconcile(self.kind(), &chunks, &results, |result| {
            extract_error(result, &self.expired_codes)
        }))
    }
}
