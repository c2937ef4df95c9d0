use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use api::{ConnectionConfig, Connections};
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use serde_json::Value;

use super::{node_requests, NodeRequests};
use crate::{
    config::load_connections,
    mapper::{adapter_for, KnownConnection, NodeData, NodeSnapshot},
};

/// One configured node and the client used to query it.
pub struct NodeProvider {
    pub alias: String,
    pub connection: ConnectionConfig,
    pub requests: Arc<dyn NodeRequests + Send + Sync>,
}

#[derive(Debug, Default, Clone)]
pub struct Collected {
    pub nodes: NodeData,
    pub known: Vec<KnownConnection>,
}

/// Where the server gets its node connections and snapshots from.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn connections(&self) -> Result<Connections>;

    async fn collect(&self) -> Result<Collected>;
}

/// Nodes listed in the info.conf.ini doppler writes. The file is re-read on every
/// call as doppler rewrites it whenever the network changes.
pub struct ConfiguredNodes {
    info_conf_path: PathBuf,
    timeout: Duration,
}

impl ConfiguredNodes {
    pub fn new(info_conf_path: &Path, timeout: Duration) -> ConfiguredNodes {
        ConfiguredNodes {
            info_conf_path: info_conf_path.to_path_buf(),
            timeout,
        }
    }
}

#[async_trait]
impl NodeSource for ConfiguredNodes {
    async fn connections(&self) -> Result<Connections> {
        if !self.info_conf_path.exists() {
            debug!(
                "{} does not exist, no nodes configured",
                self.info_conf_path.display()
            );
            return Ok(Connections::new());
        }
        load_connections(&self.info_conf_path)
    }

    async fn collect(&self) -> Result<Collected> {
        let providers = self
            .connections()
            .await?
            .into_iter()
            .map(|(alias, connection)| {
                Ok(NodeProvider {
                    requests: node_requests(&connection, self.timeout)?,
                    alias,
                    connection,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(collect_snapshots(providers).await)
    }
}

/// Queries every provider concurrently. Failures degrade the snapshot instead of failing
/// the collection: no info means offline, missing channels or balance are left empty.
pub async fn collect_snapshots(providers: Vec<NodeProvider>) -> Collected {
    let snapshots = join_all(providers.iter().map(snapshot)).await;

    let mut collected = Collected::default();
    let mut seen = HashSet::new();
    for (provider, snapshot) in providers.iter().zip(snapshots) {
        let pubkeys = [provider.connection.pubkey.clone(), snapshot.pubkey()];
        for pubkey in pubkeys.into_iter().flatten() {
            if seen.insert(pubkey.clone()) {
                collected.known.push(KnownConnection {
                    pubkey,
                    alias: provider.alias.clone(),
                });
            }
        }
        collected.nodes.insert(provider.alias.clone(), snapshot);
    }

    let mut unknown = vec![];
    for provider in &providers {
        let Some(snapshot) = collected.nodes.get(&provider.alias) else {
            continue;
        };
        for peer in snapshot.peer_ids() {
            if !seen.contains(&peer) {
                seen.insert(peer.clone());
                unknown.push((provider, peer));
            }
        }
    }
    let resolved = join_all(
        unknown
            .iter()
            .map(|(provider, peer)| resolve_alias(provider, peer)),
    )
    .await;
    for ((_, pubkey), alias) in unknown.into_iter().zip(resolved) {
        if let Some(alias) = alias {
            collected.known.push(KnownConnection { pubkey, alias });
        }
    }
    collected
}

async fn snapshot(provider: &NodeProvider) -> NodeSnapshot {
    let kind = provider.connection.kind;
    let info = match provider.requests.fetch_info().await {
        Ok(info) => info,
        Err(e) => {
            warn!("Node {} ({kind}) is offline: {e:#}", provider.alias);
            return NodeSnapshot::offline(kind);
        }
    };
    let (channels, balance) = futures::join!(
        provider.requests.fetch_channels(),
        provider.requests.fetch_balance()
    );
    let channels = match channels {
        Ok(Value::Array(channels)) => channels,
        Ok(other) => {
            warn!("Node {} returned channels that are not a list: {other}", provider.alias);
            vec![]
        }
        Err(e) => {
            warn!("Failed to fetch channels from {}: {e:#}", provider.alias);
            vec![]
        }
    };
    let balance = match balance {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!("Failed to fetch balance from {}: {e:#}", provider.alias);
            None
        }
    };
    NodeSnapshot {
        kind,
        online: true,
        info,
        channels,
        balance,
    }
}

async fn resolve_alias(provider: &NodeProvider, pubkey: &str) -> Option<String> {
    match provider.requests.fetch_specific_node_info(pubkey).await {
        Ok(info) => adapter_for(provider.connection.kind).node_alias(&info),
        Err(e) => {
            debug!("{} could not look up peer {pubkey}: {e:#}", provider.alias);
            None
        }
    }
}
