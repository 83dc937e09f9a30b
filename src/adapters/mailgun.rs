//! Mailgun email adapter.
//!
//! Mailgun accepts up to 1000 recipients per request as repeated `to` form
//! fields, so large recipient lists split into a handful of chunk requests.
//! Failures are reported per chunk; Mailgun has no expired-destination code
//! class, so provider error text passes through as-is.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::{require_recipients, Adapter, SendError};
use crate::batch::{chunk_recipients, RecipientChunk};
use crate::credentials::MailgunCredentials;
use crate::dispatch::{dispatch_all, DispatchOptions, Payload, RawResult, WireRequest};
use crate::message::EmailMessage;
use crate::reconcile::{reconcile, UNKNOWN_ERROR};
use crate::response::{ChannelKind, DeliveryResponse};

const MAILGUN_API_BASE: &str = "https://api.mailgun.net";
const MAILGUN_EU_API_BASE: &str = "https://api.eu.mailgun.net";

const MAX_RECIPIENTS_PER_REQUEST: usize = 1000;

/// Mailgun email adapter.
pub struct MailgunAdapter {
    credentials: MailgunCredentials,
    client: reqwest::Client,
    api_base: String,
    options: DispatchOptions,
}

impl MailgunAdapter {
    /// Create an adapter with the given API credentials, using the US
    /// region endpoint.
    pub fn new(credentials: MailgunCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
            api_base: MAILGUN_API_BASE.to_owned(),
            options: DispatchOptions::default(),
        }
    }

    /// Use the EU region endpoint.
    #[must_use]
    pub fn with_eu_region(mut self) -> Self {
        self.api_base = MAILGUN_EU_API_BASE.to_owned();
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

/// Build the form body for one recipient chunk. Each recipient becomes its
/// own repeated `to` field.
#[doc(hidden)]
pub fn build_form(message: &EmailMessage, chunk: &RecipientChunk) -> Vec<(String, String)> {
    let mut form = Vec::with_capacity(chunk.len().saturating_add(3));
    form.push(("from".to_owned(), message.from.clone()));
    for recipient in &chunk.recipients {
        form.push(("to".to_owned(), recipient.clone()));
    }
    form.push(("subject".to_owned(), message.subject.clone()));
    let content_field = if message.html { "html" } else { "text" };
    form.push((content_field.to_owned(), message.content.clone()));
    form
}

/// Pull an error message out of a failed Mailgun response.
#[doc(hidden)]
pub fn extract_error(result: &RawResult) -> String {
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
impl Adapter for MailgunAdapter {
    type Message = EmailMessage;

    fn name(&self) -> &'static str {
        "Mailgun"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn max_messages_per_request(&self) -> usize {
        MAX_RECIPIENTS_PER_REQUEST
    }

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryResponse, SendError> {
        require_recipients(&message.to)?;

        let chunks = chunk_recipients(&message.to, self.max_messages_per_request());
        let url = format!("{}/v3/{}/messages", self.api_base, self.credentials.domain);

        let requests: Vec<WireRequest> = chunks
            .iter()
            .map(|chunk| WireRequest {
                url: url.clone(),
                payload: Payload::Form(build_form(message, chunk)),
            })
            .collect();

        let headers = [("authorization", self.credentials.basic_auth())];
        let results =
            dispatch_all(&self.client, Method::POST, &headers, requests, &self.options).await?;

        Ok(reconcile(self.kind(), &chunks, &results, extract_error))
    }
}
