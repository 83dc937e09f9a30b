//! Firebase Cloud Messaging v1 push adapter.
//!
//! Auth is a signed-JWT OAuth exchange against Google's token endpoint; the
//! bearer token is cached for the adapter's lifetime. Each device token gets
//! its own `messages:send` request, so a multi-recipient message fans out
//! into concurrent wire requests.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use super::{require_recipients, Adapter, SendError};
use crate::auth::{exchange_service_account, TokenCache};
use crate::batch::chunk_recipients;
use crate::credentials::ServiceAccount;
use crate::dispatch::{dispatch_all, DispatchOptions, Payload, RawResult, WireRequest};
use crate::message::{Priority, PushMessage};
use crate::reconcile::{reconcile, ExpiredCodes, EXPIRED_DESTINATION, UNKNOWN_ERROR};
use crate::response::{ChannelKind, DeliveryResponse};

/// Google's OAuth token endpoint for service-account assertion exchange.
pub const GOOGLE_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";

const FCM_API_BASE: &str = "https://fcm.googleapis.com";
const FIREBASE_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// FCM error statuses that mean the device token is permanently gone.
const EXPIRED_TOKEN_CODES: [&str; 2] = ["UNREGISTERED", "NOT_FOUND"];

/// Firebase Cloud Messaging adapter.
pub struct FcmAdapter {
    account: ServiceAccount,
    client: reqwest::Client,
    tokens: TokenCache,
    token_url: String,
    api_base: String,
    options: DispatchOptions,
    expired_codes: ExpiredCodes,
}

impl FcmAdapter {
    /// Create an adapter for the given service account.
    pub fn new(account: ServiceAccount) -> Self {
        Self {
            account,
            client: reqwest::Client::new(),
            tokens: TokenCache::new(),
            token_url: GOOGLE_TOKEN_URL.to_owned(),
            api_base: FCM_API_BASE.to_owned(),
            options: DispatchOptions::default(),
            expired_codes: ExpiredCodes::new(&EXPIRED_TOKEN_CODES),
        }
    }

    /// Override the token and API endpoints. Tests point these at a local
    /// mock server.
    #[must_use]
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.token_url = token_url.into();
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

/// Build the payload fragment shared by every recipient of `message`.
///
/// Mirrors FCM's v1 schema: notification fields, the custom data map, and
/// the Android/APNs platform blocks, each emitted only when the source field
/// is set.
#[doc(hidden)]
pub fn build_shared_payload(message: &PushMessage) -> Value {
    let mut root = Map::new();
    let mut notification = Map::new();
    let mut android = Map::new();
    let mut android_notification = Map::new();
    let mut apns = Map::new();
    let mut apns_headers = Map::new();
    let mut aps = Map::new();
    let mut fcm_options = Map::new();

    if let Some(title) = &message.title {
        notification.insert("title".to_owned(), Value::String(title.clone()));
    }
    if let Some(body) = &message.body {
        notification.insert("body".to_owned(), Value::String(body.clone()));
    }
    if let Some(data) = &message.data {
        let map: Map<String, Value> = data
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        root.insert("data".to_owned(), Value::Object(map));
    }
    if let Some(action) = &message.action {
        android_notification.insert("click_action".to_owned(), Value::String(action.clone()));
        aps.insert("category".to_owned(), Value::String(action.clone()));
    }
    if let Some(image) = &message.image {
        android_notification.insert("image".to_owned(), Value::String(image.clone()));
        aps.insert("mutable-content".to_owned(), Value::from(1));
        fcm_options.insert("image".to_owned(), Value::String(image.clone()));
    }
    let critical = message.critical == Some(true);
    if let Some(sound) = &message.sound {
        android_notification.insert("sound".to_owned(), Value::String(sound.clone()));
        if critical {
            aps.insert(
                "sound".to_owned(),
                serde_json::json!({ "critical": 1, "name": sound }),
            );
        } else {
            aps.insert("sound".to_owned(), Value::String(sound.clone()));
        }
    } else if critical {
        aps.insert("sound".to_owned(), serde_json::json!({ "critical": 1 }));
    }
    if let Some(icon) = &message.icon {
        android_notification.insert("icon".to_owned(), Value::String(icon.clone()));
    }
    if let Some(color) = &message.color {
        android_notification.insert("color".to_owned(), Value::String(color.clone()));
    }
    if let Some(tag) = &message.tag {
        android_notification.insert("tag".to_owned(), Value::String(tag.clone()));
    }
    if let Some(badge) = message.badge {
        aps.insert("badge".to_owned(), Value::from(badge));
    }
    if let Some(content_available) = message.content_available {
        aps.insert(
            "content-available".to_owned(),
            Value::from(i32::from(content_available)),
        );
    }
    if let Some(priority) = message.priority {
        let (android_priority, apns_priority) = match priority {
            Priority::High => ("high", "10"),
            Priority::Normal => ("normal", "5"),
        };
        android.insert(
            "priority".to_owned(),
            Value::String(android_priority.to_owned()),
        );
        apns_headers.insert(
            "apns-priority".to_owned(),
            Value::String(apns_priority.to_owned()),
        );
    }

    if !notification.is_empty() {
        root.insert("notification".to_owned(), Value::Object(notification));
    }
    if !android_notification.is_empty() {
        android.insert("notification".to_owned(), Value::Object(android_notification));
    }
    if !android.is_empty() {
        root.insert("android".to_owned(), Value::Object(android));
    }
    if !aps.is_empty() {
        apns.insert(
            "payload".to_owned(),
            serde_json::json!({ "aps": Value::Object(aps) }),
        );
    }
    if !apns_headers.is_empty() {
        apns.insert("headers".to_owned(), Value::Object(apns_headers));
    }
    if !fcm_options.is_empty() {
        apns.insert("fcm_options".to_owned(), Value::Object(fcm_options));
    }
    if !apns.is_empty() {
        root.insert("apns".to_owned(), Value::Object(apns));
    }

    serde_json::json!({ "message": Value::Object(root) })
}

/// Merge the shared payload with one device token.
#[doc(hidden)]
pub fn build_chunk_body(shared: &Value, device_token: &str) -> Value {
    let mut body = shared.clone();
    if let Some(message) = body.get_mut("message").and_then(Value::as_object_mut) {
        message.insert("token".to_owned(), Value::String(device_token.to_owned()));
    }
    body
}

/// Pull an error message out of a failed FCM response.
///
/// `UNREGISTERED` and `NOT_FOUND` statuses collapse to the canonical
/// expired-destination message; anything else passes FCM's own text through.
#[doc(hidden)]
pub fn extract_error(result: &RawResult, expired_codes: &ExpiredCodes) -> String {
    if let Some(status) = result.body.pointer("/error/status").and_then(Value::as_str) {
        if expired_codes.contains(status) {
            return EXPIRED_DESTINATION.to_owned();
        }
    }
    result
        .body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_owned())
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for FcmAdapter {
    type Message = PushMessage;

    fn name(&self) -> &'static str {
        "FCM"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn max_messages_per_request(&self) -> usize {
        1
    }

    async fn send(&self, message: &PushMessage) -> Result<DeliveryResponse, SendError> {
        require_recipients(&message.to)?;

        let bearer = self
            .tokens
            .bearer(|| {
                exchange_service_account(
                    &self.client,
                    &self.account,
                    &self.token_url,
                    FIREBASE_MESSAGING_SCOPE,
                )
            })
            .await?;

        let shared = build_shared_payload(message);
        let chunks = chunk_recipients(&message.to, self.max_messages_per_request());
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base, self.account.project_id
        );

        let requests: Vec<WireRequest> = chunks
            .iter()
            .map(|chunk| {
                let device_token = chunk.recipients.first().map(String::as_str).unwrap_or_default();
                WireRequest {
                    url: url.clone(),
                    payload: Payload::Json(build_chunk_body(&shared, device_token)),
                }
            })
            .collect();

        let headers = [("authorization", format!("Bearer {bearer}"))];
        let results =
            dispatch_all(&self.client, Method::POST, &headers, requests, &self.options).await?;

        Ok(reconcile(self.kind(), &chunks, &results, |result| {
            extract_error(result, &self.expired_codes)
        }))
    }
}
