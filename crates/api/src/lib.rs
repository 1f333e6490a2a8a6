//! JSON-RPC client for Anvil-compatible nodes.
//!
//! This crate provides a lightweight HTTP client that speaks JSON-RPC 2.0:
//!
//! - Constructing an HTTP client with a request timeout and sensible headers
//! - Validating the configured endpoint (plain `http` only; the client is
//!   built without a TLS backend)
//! - Wrapping positional parameters in a request envelope with a fresh id
//! - Mapping HTTP and JSON-RPC failures onto [`SendError`]
//! - Returning the `result` member as the exact text the node sent
//!
//! The client never retries. A failed call is reported once and it is up to
//! the caller to submit again.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use anvil_console_api::NodeClient;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = NodeClient::new("http://127.0.0.1:8545".parse()?, Duration::from_secs(30))?;
//! let block_number = client.call("eth_blockNumber", vec![]).await?;
//! println!("{}", block_number.as_str());
//! # Ok(())
//! # }
//! ```

use std::{
    env,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use anvil_console_types::{RpcError, RpcResult, SendError, TransportError};
use anvil_console_util::truncate_for_summary;
use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode, Url, header};
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue as RawJson;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Hostnames treated as local development nodes.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "[::1]", "0.0.0.0"];
const BODY_PREVIEW_LIMIT: usize = 200;

/// Thin wrapper around a configured `reqwest::Client` bound to one node endpoint.
#[derive(Debug)]
pub struct NodeClient {
    endpoint: Url,
    http: Client,
    user_agent: String,
    next_id: AtomicU64,
}

impl NodeClient {
    /// Build a client for `endpoint`. Only `http` endpoints are accepted.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        validate_endpoint(&endpoint)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            endpoint,
            http,
            user_agent: format!("anvil-console/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Allocate the id for the next request envelope.
    pub fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one JSON-RPC request and return its `result` member.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcResult, SendError> {
        let id = self.next_request_id();
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(%method, id, endpoint = %self.endpoint.host_str().unwrap_or_default(), "sending JSON-RPC request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(header::USER_AGENT, &self.user_agent)
            .json(&envelope)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_reqwest_error)?;
        debug!(%method, id, status = status.as_u16(), body_len = text.len(), "received JSON-RPC response");
        parse_response(status, &text, id)
    }
}

/// Validate that an endpoint is usable by the client.
///
/// Rules:
/// - the scheme must be `http`; `https` is rejected up front because the
///   client carries no TLS backend
/// - a host is required
/// - plain `http` to a non-local host is allowed but logged, since Anvil is
///   frequently reached through container hostnames
fn validate_endpoint(endpoint: &Url) -> Result<()> {
    let scheme = endpoint.scheme();
    if scheme == "https" {
        return Err(anyhow!(
            "https RPC endpoints are not supported; use an http endpoint such as a local Anvil node or a TLS-terminating proxy"
        ));
    }
    if scheme != "http" {
        return Err(anyhow!("RPC endpoint must use http; got '{scheme}://'"));
    }
    let host_name = endpoint.host_str().ok_or_else(|| anyhow!("RPC endpoint must include a host"))?;
    let is_local = LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed));
    if !is_local {
        warn!(host = %host_name, "RPC endpoint uses plain http for a non-local host");
    }
    Ok(())
}

fn classify_reqwest_error(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        return TransportError::Timeout.into();
    }
    if error.is_connect() || error.is_request() {
        return TransportError::Unreachable(error.to_string()).into();
    }
    TransportError::InvalidResponse(error.to_string()).into()
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    id: Value,
    #[serde(default, deserialize_with = "present_raw")]
    result: Option<Box<RawJson>>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Distinguishes `"result": null` (raw `null`) from a missing member (None).
fn present_raw<'de, D>(deserializer: D) -> Result<Option<Box<RawJson>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawJson>::deserialize(deserializer).map(Some)
}

/// Interpret a node's HTTP response to the request with id `expected_id`.
///
/// A JSON-RPC `error` member wins over the HTTP status because some nodes
/// report method errors with 4xx/5xx codes. Anything else that is not a
/// well-formed response with a matching id is an invalid response.
pub fn parse_response(status: StatusCode, text: &str, expected_id: u64) -> Result<RpcResult, SendError> {
    let envelope = match serde_json::from_str::<ResponseEnvelope>(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            let detail = if status.is_success() {
                format!("malformed JSON-RPC response: {error}; body preview: {}", preview(text))
            } else {
                format!("HTTP {}: {}", status.as_u16(), preview(text))
            };
            return Err(TransportError::InvalidResponse(detail).into());
        }
    };

    if let Some(error) = envelope.error {
        return Err(error.into());
    }
    if !status.is_success() {
        return Err(TransportError::InvalidResponse(format!("HTTP {}: {}", status.as_u16(), preview(text))).into());
    }
    if envelope.id.as_u64() != Some(expected_id) {
        return Err(TransportError::InvalidResponse(format!("response id {} does not match request id {expected_id}", envelope.id)).into());
    }
    envelope
        .result
        .map(RpcResult::from_raw)
        .ok_or_else(|| TransportError::InvalidResponse("response has neither result nor error".into()).into())
}

fn preview(text: &str) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }
    truncate_for_summary(text, BODY_PREVIEW_LIMIT)
}
