mod coreln;
mod eclair;
mod lnd;
mod source;

pub use coreln::CorelnRequests;
pub use eclair::EclairRequests;
pub use lnd::LndRequests;
pub use source::{collect_snapshots, Collected, ConfiguredNodes, NodeProvider, NodeSource};

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use api::{ConnectionConfig, NodeKind};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, ClientBuilder, Method, RequestBuilder};
use serde_json::Value;

/// REST calls every supported lightning implementation answers, in its own json shape.
#[async_trait]
pub trait NodeRequests: Send + Sync {
    /// Always a json array of channels.
    async fn fetch_channels(&self) -> Result<Value>;
    async fn fetch_info(&self) -> Result<Value>;
    async fn fetch_balance(&self) -> Result<Value>;
    async fn fetch_specific_node_info(&self, pubkey: &str) -> Result<Value>;
}

pub fn node_requests(
    connection: &ConnectionConfig,
    timeout: Duration,
) -> Result<Arc<dyn NodeRequests + Send + Sync>> {
    Ok(match connection.kind {
        NodeKind::Lnd => Arc::new(LndRequests::new(
            &connection.host,
            &connection.macaroon,
            timeout,
        )?),
        NodeKind::Coreln => Arc::new(CorelnRequests::new(
            &connection.host,
            &connection.rune,
            &connection.macaroon,
            timeout,
        )?),
        NodeKind::Eclair => Arc::new(EclairRequests::new(
            &connection.host,
            &connection.password,
            timeout,
        )?),
    })
}

/// Builds a client that trusts the self signed certificates doppler generates for every node.
pub(crate) fn insecure_client(headers: HeaderMap, timeout: Duration) -> Result<Client> {
    Ok(ClientBuilder::new()
        .danger_accept_invalid_certs(true)
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

pub struct RequestHandler {
    base_url: String,
    client: Client,
}

impl RequestHandler {
    pub fn new(base_url: &str, headers: HeaderMap, timeout: Duration) -> Result<RequestHandler> {
        Ok(RequestHandler {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: insecure_client(headers, timeout)?,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let request = request.build()?;
        let url = request.url().to_string();
        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("failed to request {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{url} responded with {status}"));
        }
        response
            .json()
            .await
            .with_context(|| format!("invalid json from {url}"))
    }
}

/// `value[field]` when it is an array, otherwise an empty array.
pub(crate) fn array_field(value: Value, field: &str) -> Value {
    match value {
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Array(items)) => Value::Array(items),
            _ => Value::Array(vec![]),
        },
        Value::Array(items) => Value::Array(items),
        _ => Value::Array(vec![]),
    }
}
