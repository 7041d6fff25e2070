use anyhow::{bail, Result};
use awkit_core::config::{LoggerConfig, ToolConfig};
use awkit_core::Archive;
use clap::Parser;
use std::path::PathBuf;

use rebuild::Rebuilder;

mod rebuild;

/// Rebuild MEMLIST.BIN and the BANKxx files from edited resources
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// directory holding the original MEMLIST.BIN and BANKxx files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// directory with `{id:02x}_*.bin` files replacing the original resources
    #[arg(short, long)]
    resources: Option<PathBuf>,

    /// destination directory for the rebuilt files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// compress modified resources that were stored compressed
    #[arg(long)]
    recompress: bool,

    #[arg(short, long)]
    verbose: bool,

    /// tool configuration (defaults to `awkit.toml` when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logger(config: &LoggerConfig) {
    let directives = config.filter_directives(&["awkit_core", "packer"]);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(directives)).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ToolConfig::load_or_default(args.config.as_deref())?;
    let logger_config = if args.verbose {
        LoggerConfig::verbose()
    } else {
        config.logger_config.clone()
    };
    init_logger(&logger_config);

    let Some(data_dir) = args.data_dir.or(config.data_dir) else {
        bail!("no data directory: pass --data-dir or set data_dir in the config");
    };
    let Some(resources) = args.resources.or(config.resources_dir) else {
        bail!("no resource directory: pass --resources or set resources_dir in the config");
    };
    let Some(output) = args.output.or(config.output_dir) else {
        bail!("no output directory: pass --output or set output_dir in the config");
    };

    let archive = Archive::open(&data_dir)?;
    let mut rebuilder = Rebuilder::new(archive, args.recompress);
    rebuilder.rebuild(&resources)?;
    rebuilder.write(&output)?;

    log::info!("rebuilt resources written to {:?}", output);
    Ok(())
}
