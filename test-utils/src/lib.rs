pub mod fixtures;
pub mod ports;

use std::path::Path;

use clap::{builder::OsStr, Parser};
use reqwest::Client;
use settings::Settings;

pub struct TestSettingsBuilder {
    settings: Settings,
}

impl TestSettingsBuilder {
    pub fn new() -> TestSettingsBuilder {
        let settings = Settings::parse_from::<Vec<OsStr>, OsStr>(vec![]);
        TestSettingsBuilder { settings }
    }

    pub fn with_ui_config_path(mut self, ui_config_path: &Path) -> TestSettingsBuilder {
        self.settings.ui_config_path = ui_config_path.display().to_string();
        self
    }

    pub fn with_rest_api_address(mut self, rest_api_address: &str) -> TestSettingsBuilder {
        self.settings.rest_api_address = rest_api_address.to_string();
        self
    }

    pub fn with_proxy_timeout(mut self, secs: u64) -> TestSettingsBuilder {
        self.settings.proxy_timeout_secs = secs;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

impl Default for TestSettingsBuilder {
    fn default() -> Self {
        TestSettingsBuilder::new()
    }
}

pub fn http_client() -> Client {
    reqwest::ClientBuilder::new()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

#[macro_export]
macro_rules! poll {
    ($secs: expr, $func: expr) => {
        let mut ellapsed = 0;
        while ellapsed < $secs {
            if $func {
                break;
            };
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            ellapsed += 1;
        }
        if ellapsed == $secs {
            panic!("Timed out polling for result");
        }
    };
}
