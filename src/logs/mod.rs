mod streams;
mod tail;

pub use streams::LogStreams;
pub use tail::LogTail;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Doppler prefixes its lines with `[<timestamp> <ansi colour><LEVEL><ansi reset>]`.
static LEVEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z\s+\x1b\[\d+m([A-Z]+)\x1b\[0m\]")
        .expect("valid regex")
});

/// Trims a doppler log line and rewrites its coloured level prefix to a plain `[LEVEL]`.
pub fn clean_line(line: &str) -> String {
    LEVEL_PREFIX.replace(line.trim(), "[$1]").into_owned()
}

/// Log file for a run id. Ids are file stems, anything that could leave the folder is refused.
pub fn log_file(logs_folder: &Path, id: &str) -> Result<PathBuf> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        bail!("invalid log id {id}");
    }
    Ok(logs_folder.join(format!("{id}.log")))
}
