use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::{json, Value};

use super::{array_field, NodeRequests, RequestHandler};

/// Core lightning REST plugin. Every JSON-RPC command is a POST to /v1/{command}
/// (https://docs.corelightning.org/reference/get_list_methods_resource).
pub struct CorelnRequests {
    handler: RequestHandler,
}

impl CorelnRequests {
    /// Authenticates with the rune, or with the hex macaroon of older clnrest versions.
    pub fn new(base_url: &str, rune: &str, macaroon: &str, timeout: Duration) -> Result<CorelnRequests> {
        let mut headers = HeaderMap::new();
        if !rune.is_empty() {
            headers.insert("Rune", HeaderValue::from_str(rune)?);
        } else {
            headers.insert("macaroon", HeaderValue::from_str(macaroon)?);
            headers.insert("encodingtype", HeaderValue::from_static("hex"));
        }
        Ok(CorelnRequests {
            handler: RequestHandler::new(base_url, headers, timeout)?,
        })
    }

    async fn command(&self, command: &str, params: Value) -> Result<Value> {
        self.handler
            .send(
                self.handler
                    .request(Method::POST, &format!("/v1/{command}"))
                    .json(&params),
            )
            .await
    }
}

#[async_trait]
impl NodeRequests for CorelnRequests {
    async fn fetch_channels(&self) -> Result<Value> {
        let channels = self.command("listpeerchannels", json!({})).await?;
        Ok(array_field(channels, "channels"))
    }

    async fn fetch_info(&self) -> Result<Value> {
        self.command("getinfo", json!({})).await
    }

    async fn fetch_balance(&self) -> Result<Value> {
        self.command("listfunds", json!({})).await
    }

    async fn fetch_specific_node_info(&self, pubkey: &str) -> Result<Value> {
        self.command("listnodes", json!({ "id": pubkey })).await
    }
}
