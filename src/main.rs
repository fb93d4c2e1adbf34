extern crate log;
use storymap::story::{config::StoryConfig, runner::StoryRunner};
use anyhow::anyhow;
use clap::Parser;
use std::path::Path;

/// Render a scrollable story map into static map layers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the story config file.
    #[arg(short, long)]
    config_filepath: String,
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    let config_filepath = Path::new(&args.config_filepath);
    if !config_filepath.exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config = StoryConfig::from_file(config_filepath)?;
    let base_dir = config_filepath.parent().unwrap_or_else(|| Path::new(""));

    let manifest = StoryRunner::new(&config, base_dir).run()?;
    log::info!(
        "Rendered {} of {} sections into {:?}",
        manifest.sections.len() - manifest.failed_count(),
        manifest.sections.len(),
        config.output_dir
    );
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
