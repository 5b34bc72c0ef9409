use std::path::Path;

use log::warn;

use crate::error::{Error, Result};
use crate::luamod;
use crate::patch::DATA_DIR;
use crate::store::BackupStore;

pub struct RestoreSummary {
    pub restored: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl RestoreSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Restore every tracked file from its backup and remove the installed mod
/// package. Best-effort: a missing backup is reported but does not stop the
/// remaining files from being restored.
pub fn run_restore(game_dir: &Path) -> Result<RestoreSummary> {
    let data_dir = game_dir.join(DATA_DIR);
    let mut store = BackupStore::open(game_dir, &data_dir)?;

    let mut summary = RestoreSummary {
        restored: Vec::new(),
        failed: Vec::new(),
    };
    for rel in store.tracked_paths() {
        match store.restore(&rel) {
            Ok(()) => summary.restored.push(rel),
            Err(err) => {
                warn!("failed to restore '{rel}': {err}");
                summary.failed.push((rel, err));
            }
        }
    }

    luamod::uninstall(game_dir)?;

    // Nothing tracked and nothing pending: the data directory is spent.
    if store.is_empty() && summary.is_clean() {
        let _ = std::fs::remove_dir_all(store.data_dir());
    }
    Ok(summary)
}
