//! Courier — multi-provider message dispatch.
//!
//! One abstract message (push, SMS, or email) goes in; provider-specific
//! wire requests go out, split into batched HTTP calls where the provider
//! caps recipients per request; one normalized per-recipient response comes
//! back, in the original recipient order.
//!
//! Adapters implemented: FCM (push), Twilio (SMS), Mailgun (email).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod logging;
pub mod message;
pub mod response;

pub mod auth;
pub mod batch;
pub mod dispatch;
pub mod reconcile;

pub mod adapters;
