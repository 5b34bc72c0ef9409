use anyhow::bail;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use widepatch::patch::{run_patch, PatchOptions};
use widepatch::restore::run_restore;
use widepatch::viewport::{Resolution, ScalingMode};

#[derive(Parser)]
#[command(
    name = "widepatch",
    about = "Patch a fixed-viewport game installation for arbitrary display resolutions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the game installation directory
    #[arg(long, default_value = ".", global = true)]
    game_dir: PathBuf,
    /// Verbosity level ('-v': info, '-vv': debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch binaries, UI resources, and scripts for a display resolution
    Patch {
        /// Display resolution width
        width: u32,
        /// Display resolution height
        height: u32,
        /// Scaling algorithm
        #[arg(short, long, value_enum, default_value_t = ScalingArg::HorPlus)]
        scaling: ScalingArg,
        /// HUD placement under the widened viewport
        #[arg(long, value_enum, default_value_t = HudArg::Expand)]
        hud: HudArg,
        /// Bypass the hash check and re-baseline externally modified files
        /// (useful after a game update)
        #[arg(short, long)]
        force: bool,
    },
    /// Restore the installation to its pre-patch state
    Restore,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScalingArg {
    /// Preserve vertical FOV, expand horizontal
    #[value(name = "hor+")]
    HorPlus,
    /// Use the target resolution verbatim
    #[value(name = "pixel")]
    Pixel,
}

#[derive(Clone, Copy, ValueEnum)]
enum HudArg {
    /// Keep HUD elements pinned to the (now wider) screen edges
    Expand,
    /// Recenter HUD elements within the original 16:9 area
    Center,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let _ = simplelog::SimpleLogger::init(level, simplelog::Config::default());

    match cli.command {
        Commands::Patch { width, height, scaling, hud, force } => {
            let opts = PatchOptions {
                resolution: Resolution::new(width, height)?,
                scaling: match scaling {
                    ScalingArg::HorPlus => ScalingMode::HorPlus,
                    ScalingArg::Pixel => ScalingMode::PixelBased,
                },
                force,
                center_hud: matches!(hud, HudArg::Center),
            };
            let summary = run_patch(&cli.game_dir, &opts)?;

            println!("Patched for viewport {}", summary.viewport);
            println!("  Files patched: {}", summary.patched.len());
            if !summary.failed.is_empty() {
                println!("  Files failed: {}", summary.failed.len());
                for (rel, err) in &summary.failed {
                    println!("    {rel}: {err}");
                }
                bail!("{} file(s) could not be patched", summary.failed.len());
            }
        }
        Commands::Restore => {
            let summary = run_restore(&cli.game_dir)?;

            println!("Restore complete");
            println!("  Files restored: {}", summary.restored.len());
            if !summary.failed.is_empty() {
                println!("  Files failed: {}", summary.failed.len());
                for (rel, err) in &summary.failed {
                    println!("    {rel}: {err}");
                }
                bail!("{} file(s) could not be restored", summary.failed.len());
            }
        }
    }

    Ok(())
}
