//! Result reconciliation.
//!
//! Maps raw per-chunk HTTP results back onto the original recipient list.
//! Reconciliation is total: every recipient appears exactly once, in
//! original order, either delivered or carrying a non-empty error. Provider
//! codes that mean "this destination is permanently gone" are rewritten to
//! one canonical message so callers can purge dead recipients without
//! knowing provider vocabulary.

use std::collections::HashSet;

use crate::batch::RecipientChunk;
use crate::dispatch::RawResult;
use crate::response::{ChannelKind, DeliveryResponse, RecipientResult};

/// Canonical error recorded for destinations the provider reports as
/// permanently invalid, across all providers.
pub const EXPIRED_DESTINATION: &str = "Expired or invalid destination";

/// Fallback error when a failed response carries no usable diagnostic.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Whether a status code counts as provider acceptance.
pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

/// Provider error codes that mark a destination permanently invalid.
///
/// Held as data on each adapter rather than branched in code, so adding a
/// provider means supplying its code list.
#[derive(Debug, Clone, Default)]
pub struct ExpiredCodes(HashSet<String>);

impl ExpiredCodes {
    /// Build the set from provider code strings.
    pub fn new(codes: &[&str]) -> Self {
        Self(codes.iter().map(|code| (*code).to_owned()).collect())
    }

    /// An empty set: no code is treated as expired.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether `code` marks the destination permanently invalid.
    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }
}

/// Merge raw results back onto the recipients they originated from.
///
/// Each result resolves through its index to one chunk; a success-range
/// status delivers every recipient in that chunk, anything else fails them
/// all with the text `extract_error` pulls from the response (adapters pass
/// their provider-specific extraction, canonicalizing expired-class codes).
/// Recipients whose chunk produced no result — which the dispatcher's
/// sentinel contract should prevent — fail with [`UNKNOWN_ERROR`], keeping
/// the output total.
pub fn reconcile<F>(
    kind: ChannelKind,
    chunks: &[RecipientChunk],
    results: &[RawResult],
    extract_error: F,
) -> DeliveryResponse
where
    F: Fn(&RawResult) -> String,
{
    let total: usize = chunks.iter().fold(0, |n, c| n.saturating_add(c.len()));
    let mut slots: Vec<Option<RecipientResult>> = Vec::new();
    slots.resize_with(total, || None);

    for result in results {
        let Some(chunk) = chunks.get(result.index) else {
            continue;
        };
        let error = if is_success(result.status) {
            None
        } else {
            let text = extract_error(result);
            Some(if text.is_empty() {
                UNKNOWN_ERROR.to_owned()
            } else {
                text
            })
        };
        for (position, recipient) in chunk.recipients.iter().enumerate() {
            let index = chunk.offset.saturating_add(position);
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(RecipientResult {
                    recipient: recipient.clone(),
                    error: error.clone(),
                });
            }
        }
    }

    let mut response = DeliveryResponse::new(kind);
    for (slot, recipient) in slots.into_iter().zip(original_order(chunks)) {
        match slot {
            Some(RecipientResult { recipient, error: None }) => {
                response.record_delivered(recipient);
            }
            Some(RecipientResult {
                recipient,
                error: Some(error),
            }) => response.record_failed(recipient, error),
            None => response.record_failed(recipient.clone(), UNKNOWN_ERROR),
        }
    }
    response
}

fn original_order(chunks: &[RecipientChunk]) -> impl Iterator<Item = &String> {
    chunks.iter().flat_map(|chunk| chunk.recipients.iter())
}
