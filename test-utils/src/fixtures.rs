use api::NodeKind;
use serde_json::{json, Value};

pub const ALICE_PUBKEY: &str = "02aa3c3d9c3b1dbbba29dd36fd0e0b3c7d6a54a5a38b5e3b1f6b8c8a2cd5b0a1e4";
pub const BOB_PUBKEY: &str = "03bb9f3e1e7ac4a18b536f183ea4f2f0883e2f1a46a5b4d4d1ec4c44a1a6a2f0c1";
pub const CAROL_PUBKEY: &str = "02cc44f3c65e35cb9d2781c1d4a8992c9da2d1f1fd2cf6954dbf0a9d8cba8e9f70";
pub const DAVE_PUBKEY: &str = "03dd7c4f3b1e0bc3c7bba8c0a6996312de87fa3b3d3d0efd2fa5e3fe84bf6f9c2a";

pub const FUNDING_TXID: &str = "6f3b0c4ea9b8d1f2e3c4b5a69788796a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0e";
pub const OTHER_FUNDING_TXID: &str = "1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f809";

/// One side of a channel, rendered in the json of each implementation.
#[derive(Debug, Clone)]
pub struct ChannelFixture {
    pub remote: String,
    pub txid: String,
    pub vout: u32,
    pub capacity: u64,
    pub local: u64,
    pub initiator: bool,
    pub active: bool,
    pub native_id: String,
}

impl ChannelFixture {
    pub fn new(remote: &str, txid: &str) -> ChannelFixture {
        ChannelFixture {
            remote: remote.to_string(),
            txid: txid.to_string(),
            vout: 0,
            capacity: 1_000_000,
            local: 600_000,
            initiator: true,
            active: true,
            native_id: txid.chars().rev().take(16).collect(),
        }
    }

    /// The same channel as seen from the other end.
    pub fn mirror(&self, local_pubkey: &str) -> ChannelFixture {
        ChannelFixture {
            remote: local_pubkey.to_string(),
            local: self.capacity - self.local,
            initiator: !self.initiator,
            ..self.clone()
        }
    }

    pub fn vout(mut self, vout: u32) -> ChannelFixture {
        self.vout = vout;
        self
    }

    pub fn capacity(mut self, capacity: u64) -> ChannelFixture {
        self.capacity = capacity;
        self
    }

    pub fn local(mut self, local: u64) -> ChannelFixture {
        self.local = local;
        self
    }

    pub fn initiator(mut self, initiator: bool) -> ChannelFixture {
        self.initiator = initiator;
        self
    }

    pub fn active(mut self, active: bool) -> ChannelFixture {
        self.active = active;
        self
    }

    pub fn render(&self, kind: NodeKind) -> Value {
        match kind {
            NodeKind::Lnd => self.lnd(),
            NodeKind::Coreln => self.coreln(),
            NodeKind::Eclair => self.eclair(),
        }
    }

    pub fn lnd(&self) -> Value {
        json!({
            "active": self.active,
            "remote_pubkey": self.remote,
            "channel_point": format!("{}:{}", self.txid, self.vout),
            "chan_id": self.native_id,
            "capacity": self.capacity.to_string(),
            "local_balance": self.local.to_string(),
            "remote_balance": (self.capacity - self.local).to_string(),
            "initiator": self.initiator,
        })
    }

    pub fn coreln(&self) -> Value {
        json!({
            "peer_id": self.remote,
            "peer_connected": true,
            "state": if self.active { "CHANNELD_NORMAL" } else { "CHANNELD_AWAITING_LOCKIN" },
            "opener": if self.initiator { "local" } else { "remote" },
            "funding_txid": self.txid,
            "funding_outnum": self.vout,
            "channel_id": self.native_id,
            "to_us_msat": self.local * 1000,
            "total_msat": self.capacity * 1000,
        })
    }

    pub fn eclair(&self) -> Value {
        json!({
            "nodeId": self.remote,
            "channelId": self.native_id,
            "state": if self.active { "NORMAL" } else { "OFFLINE" },
            "data": {"commitments": {
                "params": {
                    "channelId": self.native_id,
                    "localParams": {"isInitiator": self.initiator},
                },
                "active": [{
                    "fundingTx": {
                        "outPoint": format!("{}:{}", self.txid, self.vout),
                        "amountSatoshis": self.capacity,
                    },
                    "localCommit": {"spec": {
                        "toLocal": self.local * 1000,
                        "toRemote": (self.capacity - self.local) * 1000,
                    }},
                }],
            }},
        })
    }
}

/// Node info as returned by getinfo of each implementation.
pub fn node_info(kind: NodeKind, pubkey: &str, alias: &str) -> Value {
    match kind {
        NodeKind::Lnd => json!({"identity_pubkey": pubkey, "alias": alias}),
        NodeKind::Coreln => json!({"id": pubkey, "alias": alias}),
        NodeKind::Eclair => json!({"nodeId": pubkey, "alias": alias}),
    }
}
