use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Method,
};
use serde_json::Value;

use super::{array_field, NodeRequests, RequestHandler};

/// Eclair API (https://acinq.github.io/eclair/). All calls are form encoded POSTs
/// with basic auth and an empty user name.
pub struct EclairRequests {
    handler: RequestHandler,
}

impl EclairRequests {
    pub fn new(base_url: &str, password: &str, timeout: Duration) -> Result<EclairRequests> {
        let credentials = general_purpose::STANDARD.encode(format!(":{password}"));
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {credentials}"))?,
        );
        Ok(EclairRequests {
            handler: RequestHandler::new(base_url, headers, timeout)?,
        })
    }

    async fn call(&self, path: &str, form: &[(&str, &str)]) -> Result<Value> {
        self.handler
            .send(self.handler.request(Method::POST, path).form(form))
            .await
    }
}

#[async_trait]
impl NodeRequests for EclairRequests {
    async fn fetch_channels(&self) -> Result<Value> {
        Ok(array_field(self.call("/channels", &[]).await?, "channels"))
    }

    async fn fetch_info(&self) -> Result<Value> {
        self.call("/getinfo", &[]).await
    }

    async fn fetch_balance(&self) -> Result<Value> {
        self.call("/globalbalance", &[]).await
    }

    async fn fetch_specific_node_info(&self, pubkey: &str) -> Result<Value> {
        self.call("/node", &[("nodeId", pubkey)]).await
    }
}
