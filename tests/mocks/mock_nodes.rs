use anyhow::Result;
use api::{ConnectionConfig, Connections, NodeKind};
use async_trait::async_trait;
use doppler_ui::{
    mapper::{KnownConnection, NodeData, NodeSnapshot},
    nodes::{Collected, NodeSource},
};
use test_utils::fixtures::{
    node_info, ChannelFixture, ALICE_PUBKEY, BOB_PUBKEY, CAROL_PUBKEY, DAVE_PUBKEY,
    FUNDING_TXID, OTHER_FUNDING_TXID,
};

/// Alice (lnd) opened a channel to bob (core lightning) and one to dave, who is not
/// configured. Carol (eclair) is offline.
pub struct MockNodes {
    pub connections: Connections,
    pub collected: Collected,
}

pub fn alice_bob_channel() -> ChannelFixture {
    ChannelFixture::new(BOB_PUBKEY, FUNDING_TXID)
        .capacity(1_000_000)
        .local(600_000)
}

pub fn alice_dave_channel() -> ChannelFixture {
    ChannelFixture::new(DAVE_PUBKEY, OTHER_FUNDING_TXID)
        .vout(1)
        .capacity(500_000)
        .local(500_000)
}

pub fn fixture_nodes() -> NodeData {
    let mut nodes = NodeData::new();
    nodes.insert(
        "alice".to_string(),
        NodeSnapshot {
            kind: NodeKind::Lnd,
            online: true,
            info: node_info(NodeKind::Lnd, ALICE_PUBKEY, "alice"),
            channels: vec![alice_bob_channel().lnd(), alice_dave_channel().lnd()],
            balance: None,
        },
    );
    nodes.insert(
        "bob".to_string(),
        NodeSnapshot {
            kind: NodeKind::Coreln,
            online: true,
            info: node_info(NodeKind::Coreln, BOB_PUBKEY, "bob"),
            channels: vec![alice_bob_channel().mirror(ALICE_PUBKEY).coreln()],
            balance: None,
        },
    );
    nodes.insert("carol".to_string(), NodeSnapshot::offline(NodeKind::Eclair));
    nodes
}

pub fn fixture_known() -> Vec<KnownConnection> {
    [
        (ALICE_PUBKEY, "alice"),
        (BOB_PUBKEY, "bob"),
        (CAROL_PUBKEY, "carol"),
    ]
    .into_iter()
    .map(|(pubkey, alias)| KnownConnection {
        pubkey: pubkey.to_string(),
        alias: alias.to_string(),
    })
    .collect()
}

fn connection(kind: NodeKind, port: u16) -> ConnectionConfig {
    ConnectionConfig {
        kind,
        host: format!("https://localhost:{port}"),
        macaroon: if kind == NodeKind::Lnd { "0201".to_string() } else { String::new() },
        password: if kind == NodeKind::Eclair { "secret".to_string() } else { String::new() },
        rune: if kind == NodeKind::Coreln { "rune".to_string() } else { String::new() },
        pubkey: None,
        rpc_port: None,
        p2p_port: None,
    }
}

impl Default for MockNodes {
    fn default() -> Self {
        let connections = Connections::from([
            ("alice".to_string(), connection(NodeKind::Lnd, 8081)),
            ("bob".to_string(), connection(NodeKind::Coreln, 3010)),
            ("carol".to_string(), connection(NodeKind::Eclair, 8283)),
        ]);
        MockNodes {
            connections,
            collected: Collected {
                nodes: fixture_nodes(),
                known: fixture_known(),
            },
        }
    }
}

#[async_trait]
impl NodeSource for MockNodes {
    async fn connections(&self) -> Result<Connections> {
        Ok(self.connections.clone())
    }

    async fn collect(&self) -> Result<Collected> {
        Ok(self.collected.clone())
    }
}
