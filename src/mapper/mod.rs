mod adapter;
mod snapshot;

pub use adapter::{
    adapter_for, ChannelAdapter, ChannelIdentity, ChannelKey, ChannelPoint, CoreLn, Eclair, Lnd,
};
pub use snapshot::{GraphRequest, KnownConnection, NodeData, NodeSnapshot};

use std::collections::{HashMap, HashSet};

use api::{ChannelView, Graph, GraphEdge, GraphNode, NodeKind, Perspective};
use log::{debug, trace};
use serde_json::Value;

/// Reconciles node snapshots from different lightning implementations into
/// one graph. Nodes are registered first, then channels, and a channel seen
/// from both of its endpoints ends up as a single edge.
///
/// The working maps only live for one call to [`ChannelMapper::process_node_data`].
#[derive(Default)]
pub struct ChannelMapper {
    known: HashMap<String, String>,
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    /// Merged identity of every edge, same order as `edges`.
    identities: Vec<ChannelIdentity>,
    edge_keys: HashMap<ChannelKey, usize>,
}

impl ChannelMapper {
    pub fn new() -> ChannelMapper {
        ChannelMapper::default()
    }

    pub fn process_node_data(
        &mut self,
        node_data: &NodeData,
        known_connections: &[KnownConnection],
    ) -> Graph {
        self.clear();
        self.known = known_connections
            .iter()
            .map(|k| (k.pubkey.clone(), k.alias.clone()))
            .collect();

        self.discover_nodes(node_data);
        self.discover_channels(node_data);
        self.register_peers();

        debug!(
            "Mapped {} nodes and {} channels from {} snapshots",
            self.nodes.len(),
            self.edges.len(),
            node_data.len()
        );
        Graph {
            nodes: std::mem::take(&mut self.nodes),
            edges: std::mem::take(&mut self.edges),
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    fn clear(&mut self) {
        self.known.clear();
        self.nodes.clear();
        self.node_index.clear();
        self.edges.clear();
        self.identities.clear();
        self.edge_keys.clear();
    }

    /// Registers a node for every online snapshot that reports its own pubkey.
    pub fn discover_nodes(&mut self, node_data: &NodeData) {
        for (alias, snapshot) in node_data.iter().filter(|(_, s)| s.online) {
            match snapshot.pubkey() {
                Some(pubkey) => self.add_node(pubkey, alias, Some(snapshot)),
                None => debug!("Skipping node {alias}, no pubkey in its {} info", snapshot.kind),
            }
        }
    }

    /// Registers an edge for every identifiable channel of every online snapshot.
    pub fn discover_channels(&mut self, node_data: &NodeData) {
        for (alias, snapshot) in node_data.iter().filter(|(_, s)| s.online) {
            let Some(local) = snapshot.pubkey() else {
                continue;
            };
            let reporter = self.alias_of(&local).unwrap_or_else(|| alias.clone());
            for channel in &snapshot.channels {
                self.map_channel(snapshot.kind, &local, &reporter, channel);
            }
        }
        self.assign_channel_ids();
    }

    fn add_node(&mut self, pubkey: String, alias: &str, snapshot: Option<&NodeSnapshot>) {
        if let Some(&i) = self.node_index.get(&pubkey) {
            let node = &mut self.nodes[i];
            if let Some(snapshot) = snapshot {
                node.kind = Some(snapshot.kind);
                if node.info.is_none() {
                    node.info = Some(snapshot.info.clone());
                }
                if node.balance.is_none() {
                    node.balance = snapshot.balance.clone();
                }
            }
            return;
        }
        let alias = self
            .known
            .get(&pubkey)
            .cloned()
            .unwrap_or_else(|| alias.to_string());
        self.node_index.insert(pubkey.clone(), self.nodes.len());
        self.nodes.push(GraphNode {
            id: pubkey,
            alias,
            kind: snapshot.map(|s| s.kind),
            info: snapshot.map(|s| s.info.clone()),
            balance: snapshot.and_then(|s| s.balance.clone()),
        });
    }

    fn alias_of(&self, pubkey: &str) -> Option<String> {
        self.node_index
            .get(pubkey)
            .map(|&i| self.nodes[i].alias.clone())
            .or_else(|| self.known.get(pubkey).cloned())
    }

    fn map_channel(&mut self, kind: NodeKind, local: &str, reporter: &str, channel: &Value) {
        let adapter = adapter_for(kind);
        let Some(remote) = adapter.peer_id(channel) else {
            trace!("Skipping {kind} channel of {reporter} without a peer");
            return;
        };
        if remote == local {
            return;
        }
        let Some(identity) = adapter.channel_identity(local, &remote, channel) else {
            trace!("Skipping {kind} channel of {reporter} to {remote} without an id");
            return;
        };

        let initiator = adapter.is_initiator(channel);
        let active = adapter.is_active(channel);
        let capacity = adapter.capacity(channel);
        let (local_balance, remote_balance) =
            (adapter.local_balance(channel), adapter.remote_balance(channel));
        // Edges point from the initiator and carry its side's balance first.
        let (source, target, source_balance, target_balance) = if initiator {
            (local.to_string(), remote, local_balance, remote_balance)
        } else {
            (remote, local.to_string(), remote_balance, local_balance)
        };
        let view = ChannelView {
            kind,
            alias: reporter.to_string(),
            perspective: if initiator {
                Perspective::Source
            } else {
                Perspective::Target
            },
            channel: channel.clone(),
        };

        let keys = identity.keys();
        let Some(i) = keys.iter().find_map(|key| self.edge_keys.get(key).copied()) else {
            let i = self.edges.len();
            for key in keys {
                self.edge_keys.insert(key, i);
            }
            self.edges.push(GraphEdge {
                source,
                target,
                channel_id: identity.to_string(),
                capacity,
                local_balance: source_balance,
                remote_balance: target_balance,
                initiator,
                active,
                views: vec![view],
            });
            self.identities.push(identity);
            return;
        };

        // Keys another edge already claimed stay with that edge.
        for key in keys {
            self.edge_keys.entry(key).or_insert(i);
        }
        self.identities[i].merge(&identity);
        let edge = &mut self.edges[i];
        if !edge
            .views
            .iter()
            .any(|v| v.kind == view.kind && v.alias == view.alias)
        {
            edge.views.push(view);
        }
        edge.active = edge.active && active;
        if initiator {
            edge.source = source;
            edge.target = target;
            edge.capacity = capacity;
            edge.local_balance = source_balance;
            edge.remote_balance = target_balance;
            edge.initiator = true;
        } else if edge.capacity == 0 {
            edge.capacity = capacity;
        }
    }

    /// Suffixes the rare id two edges derived alike, so every edge id stays unique.
    fn assign_channel_ids(&mut self) {
        let mut taken = HashSet::new();
        for (i, edge) in self.edges.iter_mut().enumerate() {
            let mut channel_id = self.identities[i].to_string();
            if taken.contains(&channel_id) {
                channel_id = format!("{channel_id}#{i}");
            }
            taken.insert(channel_id.clone());
            edge.channel_id = channel_id;
        }
    }

    /// Adds nodes for channel endpoints that have no snapshot of their own.
    fn register_peers(&mut self) {
        let endpoints: Vec<String> = self
            .edges
            .iter()
            .flat_map(|e| [e.source.clone(), e.target.clone()])
            .filter(|pubkey| !self.node_index.contains_key(pubkey))
            .collect();
        for pubkey in endpoints {
            let alias = self.alias_of(&pubkey).unwrap_or_else(|| pubkey.clone());
            self.add_node(pubkey, &alias, None);
        }
    }
}
