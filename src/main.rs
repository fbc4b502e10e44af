use std::path::Path;
use std::process;

use anyhow::{Context, Result, bail};

use spin_viewer::{
    assets::{FrameResolver, SnapshotResolver},
    config::ViewerConfig,
    engine::SpinViewer,
    player::Player,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const VIEW_USAGE: &str = "spin-viewer view <snap-dir> [--config <file>]";
const FRAMES_USAGE: &str = "spin-viewer frames <snap-dir> [--config <file>]";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("view") => {
            let config = load_config(args, VIEW_USAGE)?;
            view(config)
        }
        Some("frames") => {
            let config = load_config(args, FRAMES_USAGE)?;
            frames(&config)
        }
        _ => bail!(
            "Spin viewer: drag to rotate a ring of product snapshots\n\nUsage:\n  {VIEW_USAGE}\n  {FRAMES_USAGE}"
        ),
    }
}

/// Parse `<snap-dir> [--config <file>]` and load the matching config.
fn load_config(mut args: impl Iterator<Item = String>, usage: &str) -> Result<ViewerConfig> {
    let mut base_path = None;
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(args.next().context(usage.to_string())?),
            _ if base_path.is_none() => base_path = Some(arg),
            _ => bail!("Unexpected argument {arg}\n\nUsage: {usage}"),
        }
    }

    let mut config = match config_path {
        Some(path) => ViewerConfig::load_from(Path::new(&path))?,
        None => ViewerConfig::load()?,
    };
    config.base_path = base_path.context(usage.to_string())?;
    Ok(config)
}

fn view(config: ViewerConfig) -> Result<()> {
    let mut player = Player::new(config)?;
    player.play()
}

fn frames(config: &ViewerConfig) -> Result<()> {
    let viewer = SpinViewer::new(config)?;
    let resolver = SnapshotResolver;
    for index in 0..viewer.frame_count() {
        println!(
            "{index:>4}  batch {}  {}",
            viewer.load_batch(index),
            resolver.resolve(&config.base_path, index),
        );
    }
    Ok(())
}
