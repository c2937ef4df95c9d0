use std::{fmt::Display, str::FromStr};

use api::NodeKind;
use serde_json::Value;

/// Funding outpoint of a channel, `txid:vout`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelPoint {
    pub txid: String,
    pub vout: u32,
}

impl FromStr for ChannelPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| format!("channel point {s} is missing the output index"))?;
        if txid.is_empty() {
            return Err(format!("channel point {s} is missing the txid"));
        }
        let vout = vout
            .parse()
            .map_err(|e| format!("invalid output index in {s}: {e}"))?;
        Ok(ChannelPoint {
            txid: txid.to_lowercase(),
            vout,
        })
    }
}

impl Display for ChannelPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// Everything one report tells about which channel it describes. Reports of the same
/// channel from its two endpoints share at least one key, even when one implementation
/// leaves out the output index or the funding transaction altogether.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    /// Endpoint pubkeys, sorted.
    pub endpoints: (String, String),
    pub point: Option<ChannelPoint>,
    pub funding_txid: Option<String>,
    pub native_id: Option<String>,
}

/// Lookup key of an edge. Funding txids and native ids are only unique per endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Point(ChannelPoint),
    FundingTx((String, String), String),
    Native((String, String), String),
}

impl ChannelIdentity {
    pub fn new(local: &str, remote: &str) -> ChannelIdentity {
        let endpoints = if local <= remote {
            (local.to_string(), remote.to_string())
        } else {
            (remote.to_string(), local.to_string())
        };
        ChannelIdentity {
            endpoints,
            point: None,
            funding_txid: None,
            native_id: None,
        }
    }

    pub fn keys(&self) -> Vec<ChannelKey> {
        let mut keys = vec![];
        if let Some(point) = &self.point {
            keys.push(ChannelKey::Point(point.clone()));
        }
        if let Some(txid) = &self.funding_txid {
            keys.push(ChannelKey::FundingTx(self.endpoints.clone(), txid.clone()));
        }
        if let Some(id) = &self.native_id {
            keys.push(ChannelKey::Native(self.endpoints.clone(), id.clone()));
        }
        keys
    }

    /// Fills in what `other` knows and this identity does not.
    pub fn merge(&mut self, other: &ChannelIdentity) {
        if self.point.is_none() {
            self.point = other.point.clone();
        }
        if self.funding_txid.is_none() {
            self.funding_txid = other.funding_txid.clone();
        }
        if self.native_id.is_none() {
            self.native_id = other.native_id.clone();
        }
    }
}

/// The channel point when known. Otherwise the native id or funding txid, qualified
/// with the endpoint pair.
impl Display for ChannelIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (first, second) = &self.endpoints;
        match (&self.point, &self.native_id, &self.funding_txid) {
            (Some(point), _, _) => point.fmt(f),
            (None, Some(id), _) | (None, None, Some(id)) => write!(f, "{id}@{first}-{second}"),
            (None, None, None) => write!(f, "{first}-{second}"),
        }
    }
}

/// Reads the implementation specific shapes of `getinfo`, channel list entries and node info.
/// Every accessor is best effort: missing or malformed fields give `None`, `false` or `0`.
pub trait ChannelAdapter: Send + Sync {
    fn node_id(&self, info: &Value) -> Option<String>;
    fn peer_id(&self, channel: &Value) -> Option<String>;
    fn is_initiator(&self, channel: &Value) -> bool;
    fn is_active(&self, channel: &Value) -> bool;
    fn capacity(&self, channel: &Value) -> u64;
    fn local_balance(&self, channel: &Value) -> u64;
    fn remote_balance(&self, channel: &Value) -> u64;
    fn channel_point(&self, channel: &Value) -> Option<ChannelPoint>;
    fn funding_txid(&self, channel: &Value) -> Option<String> {
        self.channel_point(channel).map(|point| point.txid)
    }
    fn native_channel_id(&self, channel: &Value) -> Option<String>;
    /// Alias from the response to a node lookup by pubkey.
    fn node_alias(&self, node_info: &Value) -> Option<String>;

    /// `None` when the report carries nothing to match it by.
    fn channel_identity(&self, local: &str, remote: &str, channel: &Value) -> Option<ChannelIdentity> {
        let mut identity = ChannelIdentity::new(local, remote);
        identity.point = self.channel_point(channel);
        identity.funding_txid = self.funding_txid(channel);
        identity.native_id = self.native_channel_id(channel);
        if identity.keys().is_empty() {
            None
        } else {
            Some(identity)
        }
    }
}

pub fn adapter_for(kind: NodeKind) -> &'static dyn ChannelAdapter {
    match kind {
        NodeKind::Lnd => &Lnd,
        NodeKind::Coreln => &CoreLn,
        NodeKind::Eclair => &Eclair,
    }
}

/// LND REST, `/v1/getinfo` and `/v1/channels`. Amounts are satoshis encoded as strings.
pub struct Lnd;

impl ChannelAdapter for Lnd {
    fn node_id(&self, info: &Value) -> Option<String> {
        string_at(info, "/identity_pubkey")
    }

    fn peer_id(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/remote_pubkey")
    }

    fn is_initiator(&self, channel: &Value) -> bool {
        bool_at(channel, "/initiator")
    }

    fn is_active(&self, channel: &Value) -> bool {
        bool_at(channel, "/active")
    }

    fn capacity(&self, channel: &Value) -> u64 {
        amount_at(channel, "/capacity").unwrap_or_default()
    }

    fn local_balance(&self, channel: &Value) -> u64 {
        amount_at(channel, "/local_balance").unwrap_or_default()
    }

    fn remote_balance(&self, channel: &Value) -> u64 {
        amount_at(channel, "/remote_balance").unwrap_or_default()
    }

    fn channel_point(&self, channel: &Value) -> Option<ChannelPoint> {
        string_at(channel, "/channel_point")?.parse().ok()
    }

    fn funding_txid(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/channel_point").map(|point| txid_of(&point))
    }

    fn native_channel_id(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/chan_id").filter(|id| id != "0")
    }

    fn node_alias(&self, node_info: &Value) -> Option<String> {
        string_at(node_info, "/node/alias")
    }
}

/// Core lightning REST, `getinfo` and `listpeerchannels`. Amounts are millisatoshis.
pub struct CoreLn;

impl ChannelAdapter for CoreLn {
    fn node_id(&self, info: &Value) -> Option<String> {
        string_at(info, "/id")
    }

    fn peer_id(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/peer_id")
    }

    fn is_initiator(&self, channel: &Value) -> bool {
        string_at(channel, "/opener").as_deref() == Some("local")
    }

    fn is_active(&self, channel: &Value) -> bool {
        string_at(channel, "/state").as_deref() == Some("CHANNELD_NORMAL")
    }

    fn capacity(&self, channel: &Value) -> u64 {
        msat_at(channel, "/total_msat")
    }

    fn local_balance(&self, channel: &Value) -> u64 {
        msat_at(channel, "/to_us_msat")
    }

    fn remote_balance(&self, channel: &Value) -> u64 {
        msat_at(channel, "/total_msat").saturating_sub(msat_at(channel, "/to_us_msat"))
    }

    fn channel_point(&self, channel: &Value) -> Option<ChannelPoint> {
        let txid = string_at(channel, "/funding_txid")?;
        let vout = channel.pointer("/funding_outnum")?.as_u64()?;
        Some(ChannelPoint {
            txid: txid.to_lowercase(),
            vout: u32::try_from(vout).ok()?,
        })
    }

    fn funding_txid(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/funding_txid").map(|txid| txid.to_lowercase())
    }

    fn native_channel_id(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/channel_id")
    }

    fn node_alias(&self, node_info: &Value) -> Option<String> {
        string_at(node_info, "/nodes/0/alias")
    }
}

/// Eclair, `/getinfo` and `/channels`. Balances are millisatoshis, the funding amount satoshis.
pub struct Eclair;

const ECLAIR_COMMITMENT: &str = "/data/commitments/active/0";
// Older eclair releases keep the funding input at the top of the commitments.
const ECLAIR_OUTPOINTS: [&str; 2] = [
    "/data/commitments/active/0/fundingTx/outPoint",
    "/data/commitments/commitInput/outPoint",
];

impl ChannelAdapter for Eclair {
    fn node_id(&self, info: &Value) -> Option<String> {
        string_at(info, "/nodeId")
    }

    fn peer_id(&self, channel: &Value) -> Option<String> {
        string_at(channel, "/nodeId")
    }

    fn is_initiator(&self, channel: &Value) -> bool {
        first_bool(
            channel,
            &[
                "/data/commitments/params/localParams/isInitiator",
                "/data/commitments/localParams/isInitiator",
            ],
        )
    }

    fn is_active(&self, channel: &Value) -> bool {
        string_at(channel, "/state").as_deref() == Some("NORMAL")
    }

    fn capacity(&self, channel: &Value) -> u64 {
        amount_at(channel, &format!("{ECLAIR_COMMITMENT}/fundingTx/amountSatoshis"))
            .unwrap_or_default()
    }

    fn local_balance(&self, channel: &Value) -> u64 {
        msat_at(channel, &format!("{ECLAIR_COMMITMENT}/localCommit/spec/toLocal"))
    }

    fn remote_balance(&self, channel: &Value) -> u64 {
        msat_at(channel, &format!("{ECLAIR_COMMITMENT}/localCommit/spec/toRemote"))
    }

    fn channel_point(&self, channel: &Value) -> Option<ChannelPoint> {
        first_string(channel, &ECLAIR_OUTPOINTS)?.parse().ok()
    }

    fn funding_txid(&self, channel: &Value) -> Option<String> {
        first_string(channel, &ECLAIR_OUTPOINTS).map(|outpoint| txid_of(&outpoint))
    }

    fn native_channel_id(&self, channel: &Value) -> Option<String> {
        first_string(
            channel,
            &[
                "/data/commitments/params/channelId",
                "/data/commitments/channelId",
                "/channelId",
            ],
        )
    }

    fn node_alias(&self, node_info: &Value) -> Option<String> {
        first_string(node_info, &["/announcement/alias", "/alias"])
    }
}

fn txid_of(outpoint: &str) -> String {
    outpoint
        .split_once(':')
        .map_or(outpoint, |(txid, _)| txid)
        .to_lowercase()
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_string(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| string_at(value, p))
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value
        .pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or_default()
}

fn first_bool(value: &Value, pointers: &[&str]) -> bool {
    pointers
        .iter()
        .find_map(|p| value.pointer(p).and_then(Value::as_bool))
        .unwrap_or_default()
}

fn amount_at(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(parse_amount)
}

/// Millisatoshis at `pointer`, floored to satoshis.
fn msat_at(value: &Value, pointer: &str) -> u64 {
    amount_at(value, pointer).unwrap_or_default() / 1000
}

/// Accepts JSON numbers, decimal strings and the legacy core lightning "<n>msat" strings.
fn parse_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().trim_end_matches("msat").parse().ok(),
        _ => None,
    }
}
