//! Transport seam between the dispatcher and a node.

use anvil_console_api::NodeClient;
use anvil_console_types::{RpcResult, SendError};
use anvil_console_util::ConsoleConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Sends one positional JSON-RPC call and resolves with its result text.
///
/// Implementations own connection handling. The dispatcher calls `send`
/// exactly once per invocation and never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method_name: &str, ordered_args: Vec<Value>) -> Result<RpcResult, SendError>;
}

/// HTTP transport backed by [`NodeClient`].
#[derive(Debug)]
pub struct HttpTransport {
    client: NodeClient,
}

impl HttpTransport {
    pub fn new(client: NodeClient) -> Self {
        Self { client }
    }

    /// Build a transport for the endpoint and timeout in `config`.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        let endpoint = config.rpc_endpoint()?;
        let client = NodeClient::new(endpoint, config.timeout()).context("could not create the JSON-RPC client")?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &NodeClient {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method_name: &str, ordered_args: Vec<Value>) -> Result<RpcResult, SendError> {
        self.client.call(method_name, ordered_args).await
    }
}
