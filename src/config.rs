use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use api::{ConnectionConfig, Connections, NodeKind};
use ini::{Ini, Properties};
use log::{debug, warn};

/// Folders and binaries from the `[paths]` section of server.conf.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPaths {
    pub logs_folder: PathBuf,
    pub doppler_scripts_folder: PathBuf,
    pub doppler_binary_path: PathBuf,
    /// Holds reset.sh
    pub scripts_folder: PathBuf,
    pub current_working_directory: PathBuf,
}

impl ServerPaths {
    pub fn load(path: &Path) -> Result<ServerPaths> {
        let ini = Ini::load_from_file(path)
            .with_context(|| format!("failed to read server config {}", path.display()))?;
        ServerPaths::from_ini(&ini)
    }

    pub fn from_ini(ini: &Ini) -> Result<ServerPaths> {
        let paths = ini
            .section(Some("paths"))
            .ok_or_else(|| anyhow!("server config has no [paths] section"))?;
        let path = |key: &str| -> Result<PathBuf> {
            value(paths, key)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("server config is missing paths.{key}"))
        };
        Ok(ServerPaths {
            logs_folder: path("logsFolder")?,
            doppler_scripts_folder: path("dopplerScriptsFolder")?,
            doppler_binary_path: path("dopplerBinaryPath")?,
            scripts_folder: path("scriptsFolder")?,
            current_working_directory: path("currentWorkingDirectory")?,
        })
    }
}

/// Reads the node connection file doppler writes for the ui. Credentials
/// stored as files (macaroons) are loaded and hex encoded.
pub fn load_connections(path: &Path) -> Result<Connections> {
    let ini = Ini::load_from_file(path)
        .with_context(|| format!("failed to read connections from {}", path.display()))?;
    parse_connections(&ini)
}

pub fn parse_connections(ini: &Ini) -> Result<Connections> {
    let mut connections = Connections::new();
    for (section, properties) in ini.iter() {
        let Some(alias) = section.map(str::trim) else {
            continue;
        };
        let Some(node_type) = value(properties, "TYPE") else {
            warn!("Section {alias} has no TYPE, skipping");
            continue;
        };
        let kind = match node_type.as_str() {
            "bitcoind" | "esplora" => {
                debug!("Section {alias} is a {node_type} service, skipping");
                continue;
            }
            other => match other.parse::<NodeKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!("Section {alias}: {e}");
                    continue;
                }
            },
        };
        // Doppler may still be writing credentials of a node it is starting.
        match connection_config(alias, kind, properties) {
            Ok(connection) => {
                connections.insert(alias.to_string(), connection);
            }
            Err(e) => warn!("Section {alias} skipped: {e:#}"),
        }
    }
    Ok(connections)
}

fn connection_config(alias: &str, kind: NodeKind, properties: &Properties) -> Result<ConnectionConfig> {
    let host = value(properties, "API_ENDPOINT")
        .ok_or_else(|| anyhow!("{alias} has no API_ENDPOINT"))?;
    let mut connection = ConnectionConfig {
        kind,
        host,
        macaroon: String::new(),
        password: String::new(),
        rune: String::new(),
        pubkey: value(properties, "PUBKEY"),
        rpc_port: value(properties, "RPC_PORT"),
        p2p_port: value(properties, "P2P_PORT"),
    };
    match kind {
        NodeKind::Lnd => {
            let path = value(properties, "ADMIN_MACAROON_PATH")
                .ok_or_else(|| anyhow!("{alias} has no ADMIN_MACAROON_PATH"))?;
            connection.macaroon = read_hex(&path)?;
        }
        NodeKind::Coreln => {
            if let Some(rune) = value(properties, "RUNE") {
                connection.rune = rune;
            } else if let Some(path) = value(properties, "ACCESS_MACAROON_PATH") {
                connection.macaroon = read_hex(&path)?;
            } else {
                return Err(anyhow!("{alias} has neither RUNE nor ACCESS_MACAROON_PATH"));
            }
        }
        NodeKind::Eclair => {
            connection.password = value(properties, "API_PASSWORD")
                .ok_or_else(|| anyhow!("{alias} has no API_PASSWORD"))?;
        }
    }
    Ok(connection)
}

fn read_hex(path: &str) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read macaroon {path}"))?;
    Ok(hex::encode(bytes))
}

/// Trimmed, non empty value. Doppler writes a trailing space after every value.
fn value(properties: &Properties, key: &str) -> Option<String> {
    properties
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
