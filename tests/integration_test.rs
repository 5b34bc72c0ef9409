use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use widepatch::binary::{find_matches, signatures, ENGINES};
use widepatch::error::Error;
use widepatch::luamod;
use widepatch::patch::{run_patch, PatchOptions, DATA_DIR};
use widepatch::restore::run_restore;
use widepatch::viewport::{Resolution, ScalingMode, Viewport};

fn temp_install(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("widepatch_e2e_{name}"));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    build_install(&root);
    root
}

/// Build a synthetic installation: engine binaries containing exactly the
/// expected number of occurrences of every signature, a couple of SJSON GUI
/// resources, and the script entry point.
fn build_install(root: &Path) {
    for engine in ENGINES {
        let mut image = vec![0xCC; 16];
        // The viewport passed here only shapes replacements, not patterns.
        for sig in signatures(engine, Viewport { width: 2580, height: 1080 }) {
            for _ in 0..sig.expected {
                image.extend(sig.pattern.iter().map(|b| b.unwrap_or(0x90)));
                image.extend([0xCC; 16]);
            }
        }
        write_file(&root.join(engine.path), &image);
    }

    write_file(
        &root.join("Content/Game/GUI/AboutScreen.sjson"),
        concat!(
            "AboutScreen = {\n",
            "\t// full-screen backing\n",
            "\tBack = { Width = 1920 Height = 1080 }\n",
            "\tAnimatedBackground = { X = 960 Y = 540 }\n",
            "\tTitleText = { X = 960 Y = 220 }\n",
            "\tCancelButton = { X = 1325 Y = 930.5 }\n",
            "}\n"
        )
        .as_bytes(),
    );
    write_file(
        &root.join("Content/Game/Animations/Fx.sjson"),
        b"Animations = [\n{ Name = \"Vignette\" ScaleX = 1.0 ScaleY = 1.0 }\n]\n",
    );
    write_file(
        &root.join(luamod::HOOK_SCRIPT),
        b"-- room manager\nSetupRooms()\n",
    );
}

fn write_file(path: &Path, data: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn opts(width: u32, height: u32, scaling: ScalingMode, force: bool) -> PatchOptions {
    PatchOptions {
        resolution: Resolution::new(width, height).unwrap(),
        scaling,
        force,
        center_hud: false,
    }
}

/// Hash every file under the game dir except the tool's own data directory
/// and installed mod package.
fn snapshot(root: &Path) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    snapshot_recursive(root, root, &mut hashes);
    hashes
}

fn snapshot_recursive(root: &Path, current: &Path, hashes: &mut BTreeMap<String, String>) {
    for entry in fs::read_dir(current).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .unwrap()
            .to_str()
            .unwrap()
            .replace('\\', "/");
        if rel.starts_with(DATA_DIR) || rel.starts_with("Content/Mods") {
            continue;
        }
        if path.is_dir() {
            snapshot_recursive(root, &path, hashes);
        } else {
            hashes.insert(rel, widepatch::util::hash_bytes(&fs::read(&path).unwrap()));
        }
    }
}

#[test]
fn test_patch_then_restore_round_trip() {
    let root = temp_install("round_trip");
    let pristine = snapshot(&root);

    let summary = run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();
    assert!(summary.is_clean(), "failures: {:?}", summary.failed);
    assert_eq!(summary.viewport, Viewport { width: 2580, height: 1080 });

    // Everything tracked got rewritten.
    assert_ne!(snapshot(&root), pristine);
    assert!(root.join(DATA_DIR).join("manifest.json").is_file());
    assert!(root.join(luamod::MOD_DIR).join(luamod::MOD_CONFIG).is_file());
    let hook = fs::read_to_string(root.join(luamod::HOOK_SCRIPT)).unwrap();
    assert!(hook.contains(luamod::IMPORT_STATEMENT));

    let summary = run_restore(&root).unwrap();
    assert!(summary.is_clean());
    assert_eq!(
        snapshot(&root),
        pristine,
        "restore must return every tracked file to its original hash"
    );
    assert!(!root.join(luamod::MOD_DIR).exists());
    assert!(!root.join(DATA_DIR).exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_repatch_is_byte_identical() {
    let root = temp_install("idempotent");

    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();
    let first = snapshot(&root);

    // Same resolution again, with and without --force.
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();
    assert_eq!(snapshot(&root), first);
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, true)).unwrap();
    assert_eq!(snapshot(&root), first);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_repatch_with_new_resolution_does_not_compound() {
    let root = temp_install("repatch");

    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();
    let summary = run_patch(&root, &opts(2560, 1080, ScalingMode::HorPlus, false)).unwrap();
    assert!(summary.is_clean(), "failures: {:?}", summary.failed);
    assert_eq!(summary.viewport, Viewport { width: 2560, height: 1080 });

    // Recomputed from the pristine backup: 960 maps to the 2560-wide
    // center, not to a doubly-shifted value.
    let about = fs::read_to_string(root.join("Content/Game/GUI/AboutScreen.sjson")).unwrap();
    assert!(about.contains("X = 1280"), "got: {about}");
    // And only one hook import, despite two patch runs.
    let hook = fs::read_to_string(root.join(luamod::HOOK_SCRIPT)).unwrap();
    assert_eq!(hook.matches(luamod::IMPORT_STATEMENT).count(), 1);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_pixel_based_viewport_is_verbatim() {
    let root = temp_install("pixel");
    let summary = run_patch(&root, &opts(3440, 1440, ScalingMode::PixelBased, false)).unwrap();
    assert_eq!(summary.viewport, Viewport { width: 3440, height: 1440 });
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_resource_recentering_math() {
    let root = temp_install("recenter");
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();

    let about = fs::read_to_string(root.join("Content/Game/GUI/AboutScreen.sjson")).unwrap();
    // Old center 960 lands on the new center 1290; +365 offset is kept.
    assert!(about.contains("X = 1290"), "got: {about}");
    assert!(about.contains("X = 1655"), "got: {about}");
    // Height untouched, width follows the viewport.
    assert!(about.contains("Width = 2580"));
    assert!(about.contains("Height = 1080"));
    // Comments survive the rewrite.
    assert!(about.contains("// full-screen backing"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_engine_constants_are_substituted() {
    let root = temp_install("engines");
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();

    for engine in ENGINES {
        let image = fs::read(root.join(engine.path)).unwrap();
        // No signature still matches its default-resolution pattern.
        for sig in signatures(engine, Viewport { width: 2580, height: 1080 }) {
            if sig.expected > 0 {
                assert!(
                    find_matches(&image, &sig.pattern).is_empty(),
                    "'{}' still present in {}",
                    sig.name,
                    engine.path
                );
            }
        }
        // The patched width constant is in there.
        let needle = 2580i32.to_le_bytes();
        assert!(image.windows(4).any(|w| w == needle));
    }

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_tampered_file_aborts_run_without_mutation() {
    let root = temp_install("tamper");
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();

    // Simulate a game update touching one engine binary.
    let target = root.join(ENGINES[0].path);
    let mut data = fs::read(&target).unwrap();
    data.extend(b"update");
    fs::write(&target, &data).unwrap();
    let after_tamper = snapshot(&root);

    let err = run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap_err();
    assert!(matches!(err, Error::IntegrityMismatch { .. }), "got: {err}");
    // Fail-fast: nothing was written.
    assert_eq!(snapshot(&root), after_tamper);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_force_rebaselines_modified_files() {
    let root = temp_install("force");
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();

    // Replace one engine with fresh "updated" content that carries pristine
    // signatures again (as a real game update would).
    let engine = &ENGINES[1];
    let mut image = vec![0xAB; 32];
    for sig in signatures(engine, Viewport { width: 2580, height: 1080 }) {
        for _ in 0..sig.expected {
            image.extend(sig.pattern.iter().map(|b| b.unwrap_or(0x90)));
            image.extend([0xCC; 16]);
        }
    }
    write_file(&root.join(engine.path), &image);

    let summary = run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, true)).unwrap();
    assert!(summary.is_clean(), "failures: {:?}", summary.failed);

    // The updated image became the new baseline: restore brings it back,
    // not the pre-update original.
    run_restore(&root).unwrap();
    assert_eq!(fs::read(root.join(engine.path)).unwrap(), image);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_incompatible_binary_fails_that_file_only() {
    let root = temp_install("partial");
    // Break one engine before the first patch: wrong signature counts.
    write_file(&root.join(ENGINES[2].path), &vec![0u8; 4096]);

    let summary = run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, ENGINES[2].path);
    assert!(matches!(summary.failed[0].1, Error::PatternNotFound { .. }));
    // The other targets were still patched.
    assert!(summary.patched.iter().any(|p| p == ENGINES[0].path));
    assert!(summary.patched.iter().any(|p| p.ends_with(".sjson")));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_restore_is_best_effort_when_backup_missing() {
    let root = temp_install("best_effort");
    run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap();

    // Corrupt the store: drop one backup.
    let missing = root.join(DATA_DIR).join("backups").join(ENGINES[0].path);
    fs::remove_file(&missing).unwrap();

    let summary = run_restore(&root).unwrap();
    assert_eq!(summary.failed.len(), 1);
    assert!(matches!(summary.failed[0].1, Error::BackupMissing { .. }));
    // Every other tracked file still came back.
    let hook = fs::read_to_string(root.join(luamod::HOOK_SCRIPT)).unwrap();
    assert!(!hook.contains(luamod::IMPORT_STATEMENT));
    assert!(summary.restored.iter().any(|p| p.ends_with(".sjson")));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_invalid_game_dir_is_rejected() {
    let root = std::env::temp_dir().join("widepatch_e2e_not_a_game");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    let err = run_patch(&root, &opts(3440, 1440, ScalingMode::HorPlus, false)).unwrap_err();
    assert!(matches!(err, Error::InvalidGameDir { .. }));

    let _ = fs::remove_dir_all(&root);
}
