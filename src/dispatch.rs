//! Multi-request dispatcher.
//!
//! Chunk requests are independent, so they run concurrently under a
//! semaphore bound. Completion order is irrelevant to callers: results are
//! re-ordered to match the input request order before returning, because the
//! reconciler correlates by position. A transport failure on one request
//! becomes a sentinel result rather than aborting its siblings.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::adapters::SendError;

/// Default bound on concurrently in-flight requests per dispatch.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Sentinel status recorded when a request never completed (connection
/// error, timeout). Outside every HTTP success range, so reconciliation
/// treats it as a failure.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// One provider-specific request body bound for one URL.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Full request URL.
    pub url: String,
    /// Request body.
    pub payload: Payload,
}

/// Request body encoding.
#[derive(Debug, Clone)]
pub enum Payload {
    /// JSON body (`application/json`).
    Json(Value),
    /// Form body (`application/x-www-form-urlencoded`). Keys may repeat.
    Form(Vec<(String, String)>),
}

/// Raw outcome of one wire request, positionally tied to its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// HTTP status code, or [`TRANSPORT_FAILURE_STATUS`] when the request
    /// never completed.
    pub status: u16,
    /// Parsed response body, `Null` when absent or unparseable.
    pub body: Value,
    /// Index of the originating request in the dispatched batch.
    pub index: usize,
}

/// Tuning for one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Maximum requests in flight at once.
    pub concurrency: usize,
    /// Overall deadline for the whole batch. Hitting it abandons in-flight
    /// requests and fails the send.
    pub timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
        }
    }
}

/// Issue every request and return one [`RawResult`] per request, in input
/// order regardless of completion order.
///
/// # Errors
///
/// Returns [`SendError::Timeout`] when `options.timeout` elapses before all
/// requests complete. Individual transport failures do not error; they
/// surface as sentinel results.
pub async fn dispatch_all(
    client: &reqwest::Client,
    method: Method,
    headers: &[(&str, String)],
    requests: Vec<WireRequest>,
    options: &DispatchOptions,
) -> Result<Vec<RawResult>, SendError> {
    let total = requests.len();
    debug!(requests = total, concurrency = options.concurrency, "dispatching batch");

    let owned_headers: Arc<Vec<(String, String)>> = Arc::new(
        headers
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect(),
    );
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));

    let mut join_set = JoinSet::new();
    for (index, request) in requests.into_iter().enumerate() {
        let client = client.clone();
        let method = method.clone();
        let headers = Arc::clone(&owned_headers);
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let (status, body) = execute(&client, method, &headers, &request).await;
            RawResult { status, body, index }
        });
    }

    let collect = async {
        let mut slots: Vec<Option<RawResult>> = Vec::new();
        slots.resize_with(total, || None);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    let index = result.index;
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(e) => warn!(error = %e, "dispatch task failed to join"),
            }
        }
        slots
    };

    let slots = match options.timeout {
        Some(deadline) => tokio::time::timeout(deadline, collect)
            .await
            .map_err(|_| SendError::Timeout(deadline))?,
        None => collect.await,
    };

    Ok(slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or(RawResult {
                status: TRANSPORT_FAILURE_STATUS,
                body: Value::Null,
                index,
            })
        })
        .collect())
}

/// Run one request to completion, degrading transport failures into the
/// sentinel status instead of erroring.
async fn execute(
    client: &reqwest::Client,
    method: Method,
    headers: &[(String, String)],
    request: &WireRequest,
) -> (u16, Value) {
    let mut builder = client.request(method, &request.url);
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder = match &request.payload {
        Payload::Json(body) => builder.json(body),
        Payload::Form(pairs) => builder.form(pairs),
    };

    match builder.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            (status, body)
        }
        Err(e) => {
            warn!(error = %e, url = %request.url, "request failed in transit");
            (TRANSPORT_FAILURE_STATUS, Value::Null)
        }
    }
}
