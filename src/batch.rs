//! Recipient batching.
//!
//! Providers cap how many recipients fit in one request. The batcher
//! partitions the ordered recipient list into chunks no larger than that
//! cap, keeping the original position of each recipient so per-chunk results
//! can be correlated back after dispatch.

/// A contiguous slice of the original recipient list, bound for one wire
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientChunk {
    /// Index of this chunk's first recipient in the original list.
    pub offset: usize,
    /// The recipients in this chunk, in original order.
    pub recipients: Vec<String>,
}

impl RecipientChunk {
    /// Number of recipients in this chunk.
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    /// Whether the chunk is empty. Never true for batcher output.
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Partition `recipients` into chunks of at most `limit` entries.
///
/// Order is preserved and every recipient lands in exactly one chunk, so the
/// output covers the input with no duplication. A `limit` of zero is treated
/// as one. Callers validate non-emptiness before batching; an empty input
/// yields an empty chunk list here.
pub fn chunk_recipients(recipients: &[String], limit: usize) -> Vec<RecipientChunk> {
    let limit = limit.max(1);
    let mut chunks = Vec::with_capacity(recipients.len().div_ceil(limit));
    let mut offset = 0usize;
    for slice in recipients.chunks(limit) {
        chunks.push(RecipientChunk {
            offset,
            recipients: slice.to_vec(),
        });
        offset = offset.saturating_add(slice.len());
    }
    chunks
}
