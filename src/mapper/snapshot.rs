use std::collections::BTreeMap;

use api::NodeKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::adapter::adapter_for;

/// Everything fetched from one configured node, in the node's own json shapes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub info: Value,
    #[serde(default)]
    pub channels: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Value>,
}

impl NodeSnapshot {
    pub fn offline(kind: NodeKind) -> NodeSnapshot {
        NodeSnapshot {
            kind,
            online: false,
            info: Value::Null,
            channels: vec![],
            balance: None,
        }
    }

    /// The node's self reported identity pubkey.
    pub fn pubkey(&self) -> Option<String> {
        adapter_for(self.kind).node_id(&self.info)
    }

    /// Remote pubkeys of all channels in the snapshot, without duplicates.
    pub fn peer_ids(&self) -> Vec<String> {
        let adapter = adapter_for(self.kind);
        let mut peers: Vec<String> = self
            .channels
            .iter()
            .filter_map(|c| adapter.peer_id(c))
            .collect();
        peers.sort();
        peers.dedup();
        peers
    }
}

/// Snapshots keyed by the alias the node was configured with.
pub type NodeData = BTreeMap<String, NodeSnapshot>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KnownConnection {
    pub pubkey: String,
    pub alias: String,
}

/// Body of a POST to the graph route.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct GraphRequest {
    #[serde(default)]
    pub nodes: NodeData,
    #[serde(default)]
    pub known: Vec<KnownConnection>,
}
