use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use axum::{
    body::Bytes,
    http::{HeaderMap, Method},
    response::IntoResponse,
    Extension, Json,
};
use log::debug;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::nodes::insecure_client;

use super::{bad_gateway, bad_request, ApiError};

pub const TARGET_HEADER: &str = "target";

// Hop by hop and recomputed headers, never forwarded.
const SKIPPED_HEADERS: [&str; 5] = [
    TARGET_HEADER,
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
];

/// Forwards browser requests to node REST endpoints, which use self signed certificates.
pub struct ProxyClient {
    client: Client,
}

impl ProxyClient {
    pub fn new(timeout: Duration) -> Result<ProxyClient> {
        Ok(ProxyClient {
            client: insecure_client(reqwest::header::HeaderMap::new(), timeout)?,
        })
    }
}

pub(crate) async fn proxy(
    Extension(proxy_client): Extension<Arc<ProxyClient>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let target = headers
        .get(TARGET_HEADER)
        .and_then(|t| t.to_str().ok())
        .ok_or_else(|| {
            bad_request(anyhow!(
                "'{TARGET_HEADER}' header is required to proxy a request"
            ))
        })?;
    let url = Url::parse(target).map_err(bad_request)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(bad_request(anyhow!("cannot proxy to {target}")));
    }

    let mut forwarded = HeaderMap::new();
    for (name, value) in headers.iter() {
        if !SKIPPED_HEADERS.contains(&name.as_str()) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    debug!("Proxying {method} {url}");
    let mut request = proxy_client
        .client
        .request(method.clone(), url)
        .headers(forwarded);
    if method != Method::GET {
        request = request.body(body);
    }
    let response = request
        .send()
        .await
        .map_err(|e| bad_gateway(anyhow!("failed to reach {target}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(bad_gateway(anyhow!("{target} responded with {status}")));
    }
    let payload: Value = response
        .json()
        .await
        .map_err(|e| bad_gateway(anyhow!("invalid json from {target}: {e}")))?;
    Ok(Json(payload))
}
