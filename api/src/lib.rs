mod graph;
pub mod routes;
mod scripts;

use std::collections::BTreeMap;

pub use graph::*;
pub use scripts::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// REST endpoint of the node, e.g. https://localhost:8081
    pub host: String,
    /// Hex encoded macaroon (lnd, or coreln when no rune is configured).
    #[serde(default)]
    pub macaroon: String,
    /// Eclair API password.
    #[serde(default)]
    pub password: String,
    /// Core lightning rune.
    #[serde(default)]
    pub rune: String,
    /// Identity pubkey, if doppler wrote it into the config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2p_port: Option<String>,
}

/// Keyed by the node alias (the ini section name).
pub type Connections = BTreeMap<String, ConnectionConfig>;

#[derive(Serialize, Deserialize, Debug)]
pub struct Error {
    pub status: String,
    pub detail: String,
}
