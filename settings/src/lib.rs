use std::path::PathBuf;

use clap::{builder::OsStr, Parser};

pub const SERVER_CONF_FILE: &str = "server.conf.ini";
pub const INFO_CONF_FILE: &str = "info.conf.ini";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Directory holding server.conf.ini and the info.conf.ini written by doppler.
    #[arg(long, default_value = "ui_config", env = "UI_CONFIG_PATH")]
    pub ui_config_path: String,
    #[arg(long, default_value = "127.0.0.1:5173", env = "DOPPLER_UI_REST_API_ADDRESS")]
    pub rest_api_address: String,
    /// Directory with doppler-ui.crt and doppler-ui.key. Plain http when empty.
    #[arg(long, default_value = "", env = "DOPPLER_UI_CERTS_DIR")]
    pub certs_dir: String,
    #[arg(long, default_value = "info", env = "DOPPLER_UI_LOG_LEVEL")]
    pub log_level: String,
    /// Written into every log line.
    #[arg(long, default_value = "doppler-ui", env = "DOPPLER_UI_INSTANCE_NAME")]
    pub instance_name: String,
    /// Timeout for requests to lightning nodes, proxied or direct.
    #[arg(long, default_value = "30", env = "DOPPLER_UI_PROXY_TIMEOUT_SECS")]
    pub proxy_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Settings {
        Settings::parse()
    }

    pub fn server_conf_path(&self) -> PathBuf {
        PathBuf::from(&self.ui_config_path).join(SERVER_CONF_FILE)
    }

    pub fn info_conf_path(&self) -> PathBuf {
        PathBuf::from(&self.ui_config_path).join(INFO_CONF_FILE)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::parse_from::<Vec<OsStr>, OsStr>(vec![])
    }
}
