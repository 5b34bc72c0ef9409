use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util;

const MANIFEST_FILE: &str = "manifest.json";
const BACKUP_SUBDIR: &str = "backups";

/// Persisted record for one tracked file: the hash of the file as it should
/// currently be on disk, and where its pristine copy lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchState {
    pub hash: String,
    pub backup: String,
}

/// Content-addressable backup store: decides whether a file is pristine,
/// already patched, or externally modified, and holds the pristine copies
/// that every patch is recomputed from.
///
/// The manifest is rewritten after every mutation so an interrupted run
/// leaves at most the last file's state ambiguous.
pub struct BackupStore {
    game_dir: PathBuf,
    data_dir: PathBuf,
    entries: BTreeMap<String, PatchState>,
}

impl BackupStore {
    pub fn open(game_dir: &Path, data_dir: &Path) -> Result<Self> {
        let manifest = data_dir.join(MANIFEST_FILE);
        let entries = if manifest.is_file() {
            let raw = util::read_file(&manifest)?;
            serde_json::from_slice(&raw).map_err(|e| Error::Parse {
                path: manifest.clone(),
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            })?
        } else {
            BTreeMap::new()
        };
        Ok(BackupStore {
            game_dir: game_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
            entries,
        })
    }

    /// True iff no state is recorded for `rel` -- the file is assumed
    /// untouched by the tool.
    pub fn is_pristine(&self, rel: &str) -> bool {
        !self.entries.contains_key(rel)
    }

    /// All tracked relative paths, in manifest order.
    pub fn tracked_paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Check the live file's hash against the recorded one. Pristine files
    /// pass trivially; a tracked file whose hash differs was modified
    /// outside the tool (most likely a game update).
    pub fn verify_unmodified(&self, rel: &str) -> Result<()> {
        let Some(state) = self.entries.get(rel) else {
            return Ok(());
        };
        let live = util::join_rel(&self.game_dir, rel);
        let current = util::hash_file(&live)?;
        if current != state.hash {
            debug!("hash mismatch for '{rel}': stored {} != current {current}", state.hash);
            return Err(Error::IntegrityMismatch { path: live });
        }
        Ok(())
    }

    /// Copy the live file into the backup area. A no-op when a backup
    /// already exists, unless `force`: overwriting then is intentional and
    /// commits to the current on-disk content as the new original.
    pub fn backup(&mut self, rel: &str, force: bool) -> Result<()> {
        let live = util::join_rel(&self.game_dir, rel);
        let backup = self.backup_path(rel);
        if backup.is_file() && !force {
            return Ok(());
        }
        if force && backup.is_file() {
            info!("re-baselining '{rel}': current file becomes the new original");
        }
        util::copy_file(&live, &backup)?;
        debug!("backed up '{}' to '{}'", live.display(), backup.display());
        Ok(())
    }

    /// Path of the pristine backup copy of `rel`, erroring when none exists.
    /// Large binaries are memory-mapped from this path rather than read whole.
    pub fn backup_file(&self, rel: &str) -> Result<PathBuf> {
        let backup = self.backup_path(rel);
        if !backup.is_file() {
            return Err(Error::BackupMissing {
                path: util::join_rel(&self.game_dir, rel),
            });
        }
        Ok(backup)
    }

    /// Read the pristine (backup) content of a tracked-or-just-backed-up file.
    pub fn original_bytes(&self, rel: &str) -> Result<Vec<u8>> {
        util::read_file(&self.backup_file(rel)?)
    }

    /// Record the post-patch hash for `rel` and persist the manifest.
    pub fn record(&mut self, rel: &str, hash: String) -> Result<()> {
        let backup = format!("{BACKUP_SUBDIR}/{rel}");
        self.entries.insert(rel.to_string(), PatchState { hash, backup });
        self.persist()
    }

    /// Copy the backup over the live file, drop the entry, and persist.
    pub fn restore(&mut self, rel: &str) -> Result<()> {
        let live = util::join_rel(&self.game_dir, rel);
        let backup = self.backup_path(rel);
        if !backup.is_file() {
            // Drop the stale entry so a later run does not trip over it again.
            self.entries.remove(rel);
            self.persist()?;
            return Err(Error::BackupMissing { path: live });
        }
        util::copy_file(&backup, &live)?;
        std::fs::remove_file(&backup).map_err(|e| Error::io("remove", &backup, e))?;
        self.entries.remove(rel);
        self.persist()?;
        info!("restored '{}'", live.display());
        Ok(())
    }

    /// True when nothing is tracked any more.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn backup_path(&self, rel: &str) -> PathBuf {
        util::join_rel(&self.data_dir.join(BACKUP_SUBDIR), rel)
    }

    fn persist(&self) -> Result<()> {
        let manifest = self.data_dir.join(MANIFEST_FILE);
        let raw = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| Error::io("serialize", &manifest, std::io::Error::other(e)))?;
        util::write_file(&manifest, &raw)
    }
}
