use std::{
    io,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use tokio::{
    fs,
    io::{AsyncBufReadExt, AsyncRead, BufReader},
};
use uuid::Uuid;

use crate::{
    config::ServerPaths,
    logs::{clean_line, log_file, LogStreams},
    scripts::confine,
};

pub const RESET_SCRIPT: &str = "reset.sh";

/// Starts doppler and the reset script as detached processes and copies their output
/// into log files the ui can tail.
pub struct ScriptRunner {
    paths: ServerPaths,
    info_conf_path: PathBuf,
    streams: Arc<LogStreams>,
}

impl ScriptRunner {
    pub fn new(paths: ServerPaths, info_conf_path: PathBuf, streams: Arc<LogStreams>) -> ScriptRunner {
        ScriptRunner {
            paths,
            info_conf_path,
            streams,
        }
    }

    pub fn paths(&self) -> &ServerPaths {
        &self.paths
    }

    pub fn script_path(&self, full_path: &str) -> Result<PathBuf> {
        confine(&self.paths.doppler_scripts_folder, full_path)
    }

    pub fn log_path(&self, id: &str) -> Result<PathBuf> {
        log_file(&self.paths.logs_folder, id)
    }

    /// The reset log is named after the request id, or a fresh time ordered uuid.
    pub fn reset_log_path(&self, id: Option<&str>) -> Result<PathBuf> {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => self.log_path(id),
            None => Ok(self
                .paths
                .logs_folder
                .join(format!("reset_{}.log", Uuid::now_v7()))),
        }
    }

    /// Runs `script` with doppler, returns the pid.
    pub async fn run_script(&self, script: &Path, log: &Path) -> Result<u32> {
        fs::create_dir_all(&self.paths.doppler_scripts_folder).await?;
        fs::create_dir_all(&self.paths.logs_folder).await?;
        let mut command = Command::new(absolute(&self.paths.doppler_binary_path)?);
        command
            .arg("-f")
            .arg(absolute(script)?)
            .arg("-r")
            .arg("--ui-config-path")
            .arg(absolute(&self.info_conf_path)?)
            .args(["--level", "debug"]);
        info!("Running script {}", script.display());
        self.spawn_logged(command, log, true)
    }

    /// Removes the node connections of the current network and runs the reset script.
    pub async fn reset(&self, log: &Path) -> Result<u32> {
        match fs::remove_file(&self.info_conf_path).await {
            Ok(()) => info!("Deleted {}", self.info_conf_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => debug!(
                "{} not found, skipping deletion",
                self.info_conf_path.display()
            ),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to delete {}", self.info_conf_path.display()))
            }
        }
        fs::create_dir_all(&self.paths.logs_folder).await?;
        let command = Command::new(absolute(&self.paths.scripts_folder.join(RESET_SCRIPT))?);
        info!("Resetting network");
        self.spawn_logged(command, log, false)
    }

    fn spawn_logged(&self, mut command: Command, log: &Path, clean: bool) -> Result<u32> {
        command
            .current_dir(&self.paths.current_working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Own process group, so signals to the server do not reach the script.
            .process_group(0);
        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = tokio::process::Command::from(command)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        let pid = child
            .id()
            .ok_or_else(|| anyhow!("{program} exited before it was tracked"))?;
        info!("Process {program} spawned with pid {pid}");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let streams = self.streams.clone();
        let log = log.to_path_buf();
        tokio::spawn(async move {
            futures::join!(
                copy_lines(stdout, &streams, &log, clean),
                copy_lines(stderr, &streams, &log, clean)
            );
            let exit = match child.wait().await {
                Ok(status) => format!(
                    "Child process exited with code {}",
                    status
                        .code()
                        .map_or("null".to_string(), |code| code.to_string())
                ),
                Err(e) => format!("Error with process: {e}"),
            };
            info!("{program} ({pid}): {exit}");
            if let Err(e) = streams.append(&log, &exit).await {
                warn!("Failed to write to {}: {e:#}", log.display());
            }
        });
        Ok(pid)
    }
}

async fn copy_lines(
    output: Option<impl AsyncRead + Unpin>,
    streams: &LogStreams,
    log: &Path,
    clean: bool,
) {
    let Some(output) = output else {
        return;
    };
    let mut lines = BufReader::new(output).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = if clean { clean_line(&line) } else { line };
                if let Err(e) = streams.append(log, &line).await {
                    warn!("Failed to write to {}: {e:#}", log.display());
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read process output: {e}");
                break;
            }
        }
    }
}

/// The child runs in another working directory, so every path handed to it is made absolute.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
