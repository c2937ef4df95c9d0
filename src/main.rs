use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use doppler_ui::{
    api::{bind_api_server, ProxyClient},
    config::ServerPaths,
    logs::LogStreams,
    nodes::ConfiguredNodes,
    quit_signal,
    runner::ScriptRunner,
    VERSION,
};
use futures::FutureExt;
use log::{error, info};
use logger::DopplerLogger;
use settings::Settings;

pub fn main() {
    let settings = Arc::new(Settings::load());
    DopplerLogger::init(
        &settings.instance_name,
        settings.log_level.parse().expect("Invalid log level"),
    );

    info!("Starting {VERSION}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("could not create runtime");

    let exit_code = if let Err(e) = runtime.block_on(run_server(settings)) {
        error!("Fatal error encountered: {e}");
        for cause in e.chain() {
            error!("{}", cause);
        }
        error!("{}", e.backtrace());
        1
    } else {
        0
    };

    info!("Shutting down");
    runtime.shutdown_timeout(Duration::from_secs(30));
    info!("Stopped all threads. Process finished.");
    std::process::exit(exit_code);
}

async fn run_server(settings: Arc<Settings>) -> Result<()> {
    let quit_signal = quit_signal().shared();
    let timeout = Duration::from_secs(settings.proxy_timeout_secs);

    let paths = ServerPaths::load(&settings.server_conf_path())
        .context("cannot load server paths")?;
    info!(
        "Scripts in {}, logs in {}",
        paths.doppler_scripts_folder.display(),
        paths.logs_folder.display()
    );

    let streams = Arc::new(LogStreams::new());
    tokio::spawn(streams.clone().sweep(quit_signal.clone()));

    let runner = Arc::new(ScriptRunner::new(
        paths,
        settings.info_conf_path(),
        streams,
    ));
    let node_source = Arc::new(ConfiguredNodes::new(&settings.info_conf_path(), timeout));
    let proxy_client = Arc::new(ProxyClient::new(timeout).context("cannot create proxy client")?);

    bind_api_server(settings.rest_api_address.clone(), settings.certs_dir.clone())
        .await?
        .serve(node_source, runner, proxy_client, quit_signal)
        .await
}
