use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::record::RepoRecord;

#[derive(Serialize)]
struct StateFileRef<'a> {
    repos: &'a BTreeMap<String, RepoRecord>,
}

#[derive(Deserialize)]
struct StateFile {
    repos: BTreeMap<String, RepoRecord>,
}

/// Load persisted repository state.
///
/// A missing file is the normal first-run case and a malformed file must
/// never take the backup down, so both yield an empty map; the outcome is
/// logged instead of returned. Record names are restored from the map keys.
pub fn load(path: &Path) -> BTreeMap<String, RepoRecord> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::info!(path = %path.display(), %err, "no prior backup state, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<StateFile>(&raw) {
        Ok(state) => {
            tracing::info!(path = %path.display(), repos = state.repos.len(), "loaded backup state");
            state
                .repos
                .into_iter()
                .map(|(name, mut record)| {
                    record.name = name.clone();
                    (name, record)
                })
                .collect()
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "unreadable backup state, starting empty");
            BTreeMap::new()
        }
    }
}

use tempfile::NamedTempFile;

/// Write repository state as JSON, atomically: the new content lands in a
/// temp file next to the target and replaces it by rename, so readers never
/// observe a torn file.
pub fn save(path: &Path, records: &BTreeMap<String, RepoRecord>) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("state path has no parent directory: {}", path.display()))?;
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp state file in {}", dir.display()))?;
    serde_json::to_writer_pretty(tmp.as_file(), &StateFileRef { repos: records })
        .context("failed to serialize backup state")?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace state file {}", path.display()))?;
    Ok(())
}
