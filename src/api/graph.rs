use std::sync::Arc;

use axum::{response::IntoResponse, Extension, Json};
use log::debug;

use crate::{
    mapper::{ChannelMapper, GraphRequest},
    nodes::NodeSource,
};

use super::{internal_server, ApiError};

pub(crate) async fn get_connections(
    Extension(node_source): Extension<Arc<dyn NodeSource + Send + Sync>>,
) -> Result<impl IntoResponse, ApiError> {
    let connections = node_source.connections().await.map_err(internal_server)?;
    Ok(Json(connections))
}

/// Fetches fresh snapshots from every configured node and maps them.
pub(crate) async fn get_graph(
    Extension(node_source): Extension<Arc<dyn NodeSource + Send + Sync>>,
) -> Result<impl IntoResponse, ApiError> {
    let collected = node_source.collect().await.map_err(internal_server)?;
    debug!("Collected snapshots from {} nodes", collected.nodes.len());
    let graph = ChannelMapper::new().process_node_data(&collected.nodes, &collected.known);
    Ok(Json(graph))
}

/// Maps snapshots the browser already fetched through the proxy.
pub(crate) async fn map_graph(
    Json(request): Json<GraphRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let graph = ChannelMapper::new().process_node_data(&request.nodes, &request.known);
    Ok(Json(graph))
}
