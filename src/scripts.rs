use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use api::FileTree;
use log::{info, warn};

/// Joins `relative` onto `root`, refusing anything that could resolve outside of it.
pub fn confine(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative = relative.trim();
    if relative.is_empty() {
        bail!("empty path");
    }
    let mut confined = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => confined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("path {relative} leaves {}", root.display())
            }
        }
    }
    if confined == root {
        bail!("path {relative} names no file");
    }
    Ok(confined)
}

/// Folder listing as shown in the script picker. A missing folder has no children,
/// an empty one has none listed. Entries are sorted by name.
pub fn directory_tree(path: &Path) -> Result<FileTree> {
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Directory not found: {}", path.display());
            return Ok(FileTree {
                label,
                children: Some(vec![]),
            });
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    if !metadata.is_dir() {
        return Ok(FileTree {
            label,
            children: None,
        });
    }
    let mut entries = fs::read_dir(path)
        .with_context(|| format!("failed to list {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    let mut children = vec![];
    for entry in entries {
        match directory_tree(&entry) {
            Ok(child) => children.push(child),
            Err(e) => warn!("Error accessing {}: {e:#}", entry.display()),
        }
    }
    Ok(FileTree {
        label,
        children: if children.is_empty() { None } else { Some(children) },
    })
}

pub fn read_script(scripts_folder: &Path, script_path: &str) -> Result<Option<String>> {
    let path = confine(scripts_folder, script_path)?;
    if !path.is_file() {
        return Ok(None);
    }
    let script = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(script))
}

/// Writes the script below the scripts folder, creating missing directories.
pub fn save_script(scripts_folder: &Path, full_path: &str, script: &str) -> Result<PathBuf> {
    let path = confine(scripts_folder, full_path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, script).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Saved script {}", path.display());
    Ok(path)
}
