use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use penumbra::{app::PenumbraApp, config::Config};

/// Real-time variance shadow mapping demo
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding meshes and textures, overriding the configuration
    #[arg(short, long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(assets) = args.assets {
        config.assets = assets;
    }
    log::info!("Loading assets from {}", config.assets.display());

    PenumbraApp::new(config).run()
}
