use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lightning implementation a node snapshot was fetched from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Lnd,
    Coreln,
    Eclair,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NodeKind::Lnd => "lnd",
            NodeKind::Coreln => "coreln",
            NodeKind::Eclair => "eclair",
        })
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lnd" => Ok(NodeKind::Lnd),
            "coreln" | "cln" => Ok(NodeKind::Coreln),
            "eclair" => Ok(NodeKind::Eclair),
            other => Err(format!("node type {other} not supported")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Identity pubkey.
    pub id: String,
    pub alias: String,
    /// Unset for peers that were never queried directly.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    /// Reported by the channel initiator.
    Source,
    Target,
}

/// One node's report of a channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChannelView {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub alias: String,
    pub perspective: Perspective,
    pub channel: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Pubkey of the initiator when known.
    pub source: String,
    pub target: String,
    pub channel_id: String,
    /// Satoshis.
    pub capacity: u64,
    /// Satoshis on the source side.
    pub local_balance: u64,
    /// Satoshis on the target side.
    pub remote_balance: u64,
    /// True once the initiator itself has reported the channel.
    pub initiator: bool,
    /// True only while every view reports the channel active.
    pub active: bool,
    pub views: Vec<ChannelView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, channel_id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.channel_id == channel_id)
    }
}
