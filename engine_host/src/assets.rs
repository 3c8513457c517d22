//! Asset directory polling.
//!
//! Every `*.json` file under the asset directory holds one host payload
//! (an envelope or an array of envelopes). A file is reported again whenever
//! its modification time or length changes, which is how edits hot reload.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::Context;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

/// Tracks which payload files changed since the last scan.
#[derive(Debug)]
pub struct AssetDirectory {
    root: PathBuf,
    seen: HashMap<PathBuf, FileStamp>,
    missing_reported: bool,
}

impl AssetDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seen: HashMap::new(),
            missing_reported: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files that are new or changed since the previous scan, sorted by path.
    ///
    /// A missing directory yields nothing (and is logged once).
    pub fn scan(&mut self) -> anyhow::Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            if !self.missing_reported {
                warn!(dir = %self.root.display(), "asset directory does not exist");
                self.missing_reported = true;
            }
            return Ok(Vec::new());
        }
        self.missing_reported = false;

        let mut files = Vec::new();
        collect_json_files(&self.root, &mut files)?;
        files.sort();

        let mut changed = Vec::new();
        for path in files {
            let meta = fs::metadata(&path)
                .with_context(|| format!("failed to stat {}", path.display()))?;
            let stamp = FileStamp {
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                len: meta.len(),
            };
            if self.seen.insert(path.clone(), stamp) != Some(stamp) {
                debug!(file = %path.display(), "asset file changed");
                changed.push(path);
            }
        }
        Ok(changed)
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}
