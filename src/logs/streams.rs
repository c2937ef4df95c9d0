use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{debug, info};
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex as AsyncMutex,
};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const MAX_IDLE: Duration = Duration::from_secs(30 * 60);

struct Writer {
    file: Arc<AsyncMutex<File>>,
    last_used: Instant,
}

/// Append handles for log files, shared by every process writing to the same file.
#[derive(Default)]
pub struct LogStreams {
    writers: Mutex<HashMap<PathBuf, Writer>>,
}

impl LogStreams {
    pub fn new() -> LogStreams {
        LogStreams::default()
    }

    pub async fn get(&self, path: &Path) -> Result<Arc<AsyncMutex<File>>> {
        let existing = self.writers.lock().unwrap().get_mut(path).map(|writer| {
            writer.last_used = Instant::now();
            writer.file.clone()
        });
        if let Some(file) = existing {
            return Ok(file);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open log {}", path.display()))?;
        let mut writers = self.writers.lock().unwrap();
        // Another task may have opened the same file in the meantime.
        let writer = writers.entry(path.to_path_buf()).or_insert_with(|| Writer {
            file: Arc::new(AsyncMutex::new(file)),
            last_used: Instant::now(),
        });
        writer.last_used = Instant::now();
        Ok(writer.file.clone())
    }

    pub async fn append(&self, path: &Path, line: &str) -> Result<()> {
        let file = self.get(path).await?;
        let mut file = file.lock().await;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.writers.lock().unwrap().contains_key(path)
    }

    /// Closes writers unused for longer than `max_idle`, returns how many were closed.
    pub fn cleanup(&self, max_idle: Duration) -> usize {
        let mut writers = self.writers.lock().unwrap();
        let before = writers.len();
        writers.retain(|path, writer| {
            let keep = writer.last_used.elapsed() < max_idle;
            if !keep {
                debug!("Closing idle log {}", path.display());
            }
            keep
        });
        before - writers.len()
    }

    pub fn close_all(&self) {
        self.writers.lock().unwrap().clear();
    }

    /// Periodically closes idle writers until `quit_signal` resolves.
    pub async fn sweep(self: Arc<Self>, quit_signal: impl Future<Output = ()>) {
        tokio::pin!(quit_signal);
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select!(
                _ = interval.tick() => {
                    let closed = self.cleanup(MAX_IDLE);
                    if closed > 0 {
                        info!("Closed {closed} idle log streams");
                    }
                }
                _ = &mut quit_signal => break,
            );
        }
        self.close_all();
    }
}

#[cfg(test)]
mod test {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_append_shares_writer() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("run.log");
        let streams = LogStreams::new();

        streams.append(&path, "one").await?;
        streams.append(&path, "two").await?;
        assert!(streams.is_open(&path));
        assert_eq!(1, streams.writers.lock().unwrap().len());
        assert_eq!("one\ntwo\n", std::fs::read_to_string(&path)?);
        Ok(())
    }

    #[tokio::test]
    async fn test_cleanup_closes_idle_writers() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("run.log");
        let streams = LogStreams::new();
        streams.append(&path, "line").await?;

        assert_eq!(0, streams.cleanup(Duration::from_secs(60)));
        assert!(streams.is_open(&path));
        assert_eq!(1, streams.cleanup(Duration::ZERO));
        assert!(!streams.is_open(&path));

        streams.append(&path, "again").await?;
        assert_eq!("line\nagain\n", std::fs::read_to_string(&path)?);
        Ok(())
    }
}
