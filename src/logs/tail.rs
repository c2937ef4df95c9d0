use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};

/// Follows a file that other processes append to.
pub struct LogTail {
    path: PathBuf,
    position: u64,
    // Bytes after the last newline, held until the line is complete.
    pending: Vec<u8>,
}

impl LogTail {
    pub fn new(path: &Path) -> LogTail {
        LogTail {
            path: path.to_path_buf(),
            position: 0,
            pending: vec![],
        }
    }

    /// Complete, non blank lines written since the last poll. A file that shrank
    /// was truncated and is read again from the start.
    pub async fn poll(&mut self) -> Result<Vec<String>> {
        let mut file = File::open(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let len = file.metadata().await?.len();
        if len < self.position {
            self.position = 0;
            self.pending.clear();
        }
        if len == self.position {
            return Ok(vec![]);
        }
        file.seek(SeekFrom::Start(self.position)).await?;
        let mut read = Vec::new();
        (&mut file)
            .take(len - self.position)
            .read_to_end(&mut read)
            .await?;
        self.position += read.len() as u64;
        self.pending.extend_from_slice(&read);

        let mut lines = vec![];
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let bytes: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok(lines)
    }
}
