use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::Value;

use super::{array_field, NodeRequests, RequestHandler};

/// LND REST API (https://lightning.engineering/api-docs/api/lnd/index.html).
pub struct LndRequests {
    handler: RequestHandler,
}

impl LndRequests {
    pub fn new(base_url: &str, macaroon: &str, timeout: Duration) -> Result<LndRequests> {
        let mut headers = HeaderMap::new();
        headers.insert("Grpc-Metadata-macaroon", HeaderValue::from_str(macaroon)?);
        Ok(LndRequests {
            handler: RequestHandler::new(base_url, headers, timeout)?,
        })
    }
}

#[async_trait]
impl NodeRequests for LndRequests {
    async fn fetch_channels(&self) -> Result<Value> {
        let channels = self
            .handler
            .send(self.handler.request(Method::GET, "/v1/channels"))
            .await?;
        Ok(array_field(channels, "channels"))
    }

    async fn fetch_info(&self) -> Result<Value> {
        self.handler
            .send(self.handler.request(Method::GET, "/v1/getinfo"))
            .await
    }

    async fn fetch_balance(&self) -> Result<Value> {
        self.handler
            .send(self.handler.request(Method::GET, "/v1/balance/blockchain"))
            .await
    }

    async fn fetch_specific_node_info(&self, pubkey: &str) -> Result<Value> {
        self.handler
            .send(
                self.handler
                    .request(Method::GET, &format!("/v1/graph/node/{pubkey}")),
            )
            .await
    }
}
