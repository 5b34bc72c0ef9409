use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::viewport::{ScaleFactors, Viewport};

/// Game-relative directory the mod package is installed into. The package is
/// fully regenerated on every patch run, so it is never hash-tracked.
pub const MOD_DIR: &str = "Content/Mods/Widepatch";

/// Gameplay script that loads first and gets the import hook appended.
pub const HOOK_SCRIPT: &str = "Content/Scripts/RoomManager.lua";

pub const MOD_ENTRY: &str = "Widepatch.lua";
pub const MOD_CONFIG: &str = "WidepatchConfig.lua";
pub const IMPORT_STATEMENT: &str = "Import \"../Mods/Widepatch/Widepatch.lua\"";

/// Static package files shipped inside the patcher binary.
const MOD_FILES: &[(&str, &str)] = &[(MOD_ENTRY, include_str!("../lua/Widepatch.lua"))];

/// Install the mod package: write the static files, then generate the
/// configuration script from the computed viewport. Overwrites any previous
/// installation.
pub fn install(
    game_dir: &Path,
    viewport: Viewport,
    scale: ScaleFactors,
    center_hud: bool,
) -> Result<PathBuf> {
    let mod_dir = game_dir.join(MOD_DIR);
    std::fs::create_dir_all(&mod_dir).map_err(|e| Error::io("create directory", &mod_dir, e))?;
    for (name, content) in MOD_FILES {
        let path = mod_dir.join(name);
        std::fs::write(&path, content).map_err(|e| Error::io("write", &path, e))?;
        debug!("installed '{}'", path.display());
    }
    let config_path = mod_dir.join(MOD_CONFIG);
    std::fs::write(&config_path, render_config(viewport, scale, center_hud))
        .map_err(|e| Error::io("write", &config_path, e))?;
    info!("installed mod package to '{}' for viewport {viewport}", mod_dir.display());
    Ok(mod_dir)
}

/// Remove the installed mod package, if any.
pub fn uninstall(game_dir: &Path) -> Result<()> {
    let mod_dir = game_dir.join(MOD_DIR);
    if mod_dir.is_dir() {
        std::fs::remove_dir_all(&mod_dir).map_err(|e| Error::io("remove", &mod_dir, e))?;
        info!("removed mod package at '{}'", mod_dir.display());
    }
    Ok(())
}

/// Render the generated configuration script read by the mod at game
/// runtime.
pub fn render_config(viewport: Viewport, scale: ScaleFactors, center_hud: bool) -> String {
    format!(
        "-- Generated by widepatch; regenerated on every patch run. Do not edit.\n\
         Widepatch.ScreenWidth = {width}\n\
         Widepatch.ScreenHeight = {height}\n\
         Widepatch.ScreenCenterX = {center_x:?}\n\
         Widepatch.ScreenCenterY = {center_y:?}\n\
         Widepatch.ScaleFactorX = {scale_x:?}\n\
         Widepatch.ScaleFactorY = {scale_y:?}\n\
         Widepatch.CenterHud = {center_hud}\n",
        width = viewport.width,
        height = viewport.height,
        center_x = viewport.center_x(),
        center_y = viewport.center_y(),
        scale_x = scale.x,
        scale_y = scale.y,
    )
}

/// Append the mod import to the entry-point script, once. Returns `None`
/// when the statement is already present (exact string match), so repeated
/// patching never stacks imports.
pub fn patch_hook_script(original: &str) -> Option<String> {
    if original.contains(IMPORT_STATEMENT) {
        return None;
    }
    Some(format!("{original}\n\n-- Widepatch hook\n{IMPORT_STATEMENT}\n"))
}
