use std::collections::BTreeSet;
use std::path::Path;

use log::{info, warn};

use crate::binary::{self, Engine, ENGINES};
use crate::error::{Error, Result};
use crate::luamod;
use crate::resource::{self, RecomputeContext};
use crate::store::BackupStore;
use crate::util;
use crate::viewport::{
    compute_viewport, Resolution, ScaleFactors, ScalingMode, Viewport, REFERENCE,
};

/// Directory holding the manifest and backups, created inside the game
/// installation so everything the tool owns lives in one place.
pub const DATA_DIR: &str = "widepatch-data";

/// Content subdirectories scanned for SJSON resource files.
const RESOURCE_DIRS: &[&str] = &["Content/Game/GUI", "Content/Game/Animations"];

/// Subdirectories every supported game installation has.
const REQUIRED_DIRS: &[&str] = &["Content", "x64", "x64Vk", "x86"];

pub fn validate_game_dir(game_dir: &Path) -> Result<()> {
    for dir in REQUIRED_DIRS {
        if !game_dir.join(dir).is_dir() {
            return Err(Error::InvalidGameDir {
                path: game_dir.to_path_buf(),
                missing: dir,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct PatchOptions {
    pub resolution: Resolution,
    pub scaling: ScalingMode,
    pub force: bool,
    pub center_hud: bool,
}

#[derive(Debug)]
pub struct PatchSummary {
    pub viewport: Viewport,
    pub patched: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl PatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

enum TargetKind {
    Engine(&'static Engine),
    Resource,
    HookScript,
}

struct Target {
    rel: String,
    kind: TargetKind,
}

fn enumerate_targets(game_dir: &Path) -> Result<Vec<Target>> {
    let mut targets = Vec::new();
    for engine in ENGINES {
        targets.push(Target {
            rel: engine.path.to_string(),
            kind: TargetKind::Engine(engine),
        });
    }
    for dir in RESOURCE_DIRS {
        for rel in util::find_sjson_files(game_dir, dir)? {
            targets.push(Target { rel, kind: TargetKind::Resource });
        }
    }
    targets.push(Target {
        rel: luamod::HOOK_SCRIPT.to_string(),
        kind: TargetKind::HookScript,
    });
    Ok(targets)
}

/// Patch the whole installation for one target resolution.
///
/// Runs a verification pre-pass over every tracked target first: a single
/// externally-modified file aborts the run before anything is written,
/// because binary and resource patches must stay mutually consistent for one
/// viewport. With `--force`, modified files are re-baselined instead --
/// their current on-disk content becomes the new original. Per-file patch
/// failures (`PatternNotFound`, `ParseError`) are collected and reported;
/// files already committed in this run stay patched.
pub fn run_patch(game_dir: &Path, opts: &PatchOptions) -> Result<PatchSummary> {
    validate_game_dir(game_dir)?;
    let viewport = compute_viewport(REFERENCE, opts.resolution, opts.scaling)?;
    let scale = ScaleFactors::new(REFERENCE, viewport);
    info!(
        "computed patch viewport {viewport} from resolution {}x{}",
        opts.resolution.width, opts.resolution.height
    );

    let data_dir = game_dir.join(DATA_DIR);
    let mut store = BackupStore::open(game_dir, &data_dir)?;
    let targets = enumerate_targets(game_dir)?;

    // Verification pre-pass: fail fast before any mutation.
    let mut rebaseline = BTreeSet::new();
    for target in &targets {
        match store.verify_unmodified(&target.rel) {
            Ok(()) => {}
            Err(Error::IntegrityMismatch { path }) if opts.force => {
                warn!(
                    "'{}' changed outside the tool; '--force' given, re-baselining",
                    path.display()
                );
                rebaseline.insert(target.rel.clone());
            }
            Err(err) => return Err(err),
        }
    }

    let ctx = RecomputeContext::new(viewport);
    let mut summary = PatchSummary {
        viewport,
        patched: Vec::new(),
        failed: Vec::new(),
    };
    for target in &targets {
        let force_this = rebaseline.contains(&target.rel);
        match patch_target(game_dir, &mut store, target, viewport, &ctx, force_this) {
            Ok(()) => summary.patched.push(target.rel.clone()),
            Err(err) => {
                warn!("failed to patch '{}': {err}", target.rel);
                summary.failed.push((target.rel.clone(), err));
            }
        }
    }

    luamod::install(game_dir, viewport, scale, opts.center_hud)?;
    Ok(summary)
}

/// Backup-then-patch-then-record for one file. Patches always start from the
/// pristine backup content, never from an already-patched live file, so
/// re-running can never compound transforms.
fn patch_target(
    game_dir: &Path,
    store: &mut BackupStore,
    target: &Target,
    viewport: Viewport,
    ctx: &RecomputeContext,
    force: bool,
) -> Result<()> {
    let live = util::join_rel(game_dir, &target.rel);
    store.backup(&target.rel, force)?;

    let new_bytes = match &target.kind {
        TargetKind::Engine(engine) => {
            // Engine images run to tens of megabytes; map the pristine copy
            // instead of reading it into a second buffer.
            let original = util::mmap_file(&store.backup_file(&target.rel)?)?;
            binary::patch_engine(&original, engine, viewport, &live)?
        }
        TargetKind::Resource => {
            let original = store.original_bytes(&target.rel)?;
            let text = decode_utf8(&original, &live)?;
            let (patched, changed) = resource::patch_resource(&text, ctx).map_err(|e| {
                Error::Parse {
                    path: live.clone(),
                    line: e.line,
                    column: e.column,
                    message: e.message,
                }
            })?;
            if changed == 0 {
                warn!("no positional keys found in '{}'", live.display());
            }
            patched.into_bytes()
        }
        TargetKind::HookScript => {
            let original = store.original_bytes(&target.rel)?;
            let text = decode_utf8(&original, &live)?;
            match luamod::patch_hook_script(&text) {
                Some(patched) => patched.into_bytes(),
                None => text.into_bytes(),
            }
        }
    };

    util::write_file(&live, &new_bytes)?;
    store.record(&target.rel, util::hash_bytes(&new_bytes))?;
    info!("patched '{}'", live.display());
    Ok(())
}

fn decode_utf8(bytes: &[u8], path: &Path) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        line: 1,
        column: e.utf8_error().valid_up_to() + 1,
        message: "file is not valid UTF-8".to_string(),
    })
}
