use tokio::signal::unix::SignalKind;

pub mod api;
pub mod config;
pub mod logs;
pub mod mapper;
pub mod nodes;
pub mod runner;
pub mod scripts;

pub const VERSION: &str = concat!("Doppler UI v", env!("CARGO_PKG_VERSION"));

/// Resolves on SIGQUIT or ctrl-c.
pub async fn quit_signal() {
    match tokio::signal::unix::signal(SignalKind::quit()) {
        Ok(mut quit) => {
            tokio::select!(
                _ = quit.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            );
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGQUIT: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
