mod graph;
mod logs;
mod proxy;
mod scripts;

pub use proxy::ProxyClient;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use api::routes;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_server::{
    tls_rustls::{RustlsAcceptor, RustlsConfig},
    Handle, Server,
};
use futures::{future::Shared, Future};
use log::{error, info, warn};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{nodes::NodeSource, runner::ScriptRunner};

use self::{
    graph::{get_connections, get_graph, map_graph},
    logs::stream_logs,
    proxy::proxy,
    scripts::{download_script, list_scripts, reset, run_script, save_script},
};

enum Listener {
    Plain(Server),
    Tls(Server<RustlsAcceptor>),
}

pub struct RestApi {
    listener: Listener,
}

/// Binds the listener. No certs dir means plain http, which is how the ui normally runs locally.
pub async fn bind_api_server(listen_address: String, certs_dir: String) -> Result<RestApi> {
    let addr: SocketAddr = listen_address
        .parse()
        .with_context(|| format!("invalid listen address {listen_address}"))?;
    let listener = if certs_dir.is_empty() {
        info!("Starting REST API on http://{addr}");
        Listener::Plain(axum_server::bind(addr))
    } else {
        let rustls_config = config(&certs_dir)
            .await
            .context("failed to load tls configuration")?;
        info!("Starting REST API on https://{addr}");
        Listener::Tls(axum_server::bind_rustls(addr, rustls_config))
    };
    Ok(RestApi { listener })
}

impl RestApi {
    pub async fn serve(
        self,
        node_source: Arc<dyn NodeSource + Send + Sync>,
        runner: Arc<ScriptRunner>,
        proxy_client: Arc<ProxyClient>,
        quit_signal: Shared<impl Future<Output = ()>>,
    ) -> Result<()> {
        let cors = CorsLayer::permissive();
        let handle = Handle::new();

        let routes = Router::new()
            .route(routes::ROOT, get(root))
            .route(routes::CONNECTIONS, get(get_connections))
            .route(routes::GRAPH, get(get_graph).post(map_graph))
            .route(routes::PROXY, get(proxy).post(proxy))
            .route(routes::LOGS, get(stream_logs))
            .route(routes::SCRIPTS, get(list_scripts))
            .route(routes::DOWNLOAD, get(download_script))
            .route(routes::SAVE, post(save_script))
            .route(routes::RUN, post(run_script))
            .route(routes::RESET, post(reset))
            .fallback(handler_404)
            .layer(cors)
            .layer(Extension(node_source))
            .layer(Extension(runner))
            .layer(Extension(proxy_client));

        let listener = self.listener;
        let server_handle = handle.clone();
        let server = async move {
            match listener {
                Listener::Plain(server) => {
                    server
                        .handle(server_handle)
                        .serve(routes.into_make_service())
                        .await
                }
                Listener::Tls(server) => {
                    server
                        .handle(server_handle)
                        .serve(routes.into_make_service())
                        .await
                }
            }
        };

        tokio::select!(
            result = server => {
                if let Err(e) = result {
                    error!("API server shutdown unexpectedly: {}", e);
                } else {
                    info!("API server shutdown successfully.");
                }
            }
            _ = quit_signal => {
                handle.graceful_shutdown(Some(Duration::from_secs(30)));
            }
        );
        Ok(())
    }
}

async fn root() -> Result<impl IntoResponse, ApiError> {
    Ok(())
}

async fn handler_404() -> impl IntoResponse {
    ApiError::NotFound("No such method".to_string())
}

async fn config(certs_dir: &str) -> Result<RustlsConfig> {
    let cert = format!("{certs_dir}/doppler-ui.crt");
    let key = format!("{certs_dir}/doppler-ui.key");
    RustlsConfig::from_pem_file(&cert, &key)
        .await
        .with_context(|| format!("failed to load certificates ({cert}) and private key ({key})"))
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub enum ApiError {
    NotFound(String),
    BadRequest(BoxError),
    InternalServerError(BoxError),
    BadGateway(BoxError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(s) => build_api_error(StatusCode::NOT_FOUND, s),
            ApiError::BadRequest(e) => build_api_error(StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InternalServerError(e) => {
                build_api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::BadGateway(e) => build_api_error(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    }
}

fn build_api_error(status_code: StatusCode, detail: String) -> Response {
    let error = api::Error {
        status: status_code.to_string(),
        detail,
    };
    if let Ok(value) = serde_json::to_value(error) {
        (status_code, Json(value)).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": StatusCode::INTERNAL_SERVER_ERROR.to_string()})),
        )
            .into_response()
    }
}

pub fn not_found(e: impl Into<anyhow::Error>) -> ApiError {
    let anyhow_err = e.into();
    info!("{}", anyhow_err);
    ApiError::NotFound(anyhow_err.to_string())
}

pub fn internal_server(e: impl Into<anyhow::Error>) -> ApiError {
    let anyhow_err = e.into();
    warn!("{:#}", anyhow_err);
    ApiError::InternalServerError(anyhow_err.into())
}

pub fn bad_request(e: impl Into<anyhow::Error>) -> ApiError {
    let anyhow_err = e.into();
    info!("{}", anyhow_err);
    ApiError::BadRequest(anyhow_err.into())
}

pub fn bad_gateway(e: impl Into<anyhow::Error>) -> ApiError {
    let anyhow_err = e.into();
    warn!("{:#}", anyhow_err);
    ApiError::BadGateway(anyhow_err.into())
}
