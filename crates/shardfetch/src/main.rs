//! shardfetch CLI - bulk-download images listed in a CSV manifest.
//!
//! Every row's image is fetched, scaled so its smaller side matches
//! `--min-dim`, and saved as `<OUTPUT>/<shard>/<ImageID>.jpg`. Failed items are
//! logged and skipped; the run itself only fails on a broken manifest or bad
//! configuration.
//!
//! # Usage
//!
//! ```bash
//! # Download with defaults (256px min side, 5 workers, 1000 sub-dirs)
//! shardfetch images.csv ./images
//!
//! # Full-size images, 32 workers, overwrite existing files
//! shardfetch --min-dim -1 --consumers 32 --force images.csv ./images
//!
//! # Record failures for a later retry
//! shardfetch --failures failed.jsonl images.csv ./images
//! ```

use clap::Parser;

mod cli;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let mut config = match &args.config {
        Some(path) => shardfetch_core::Config::load_from(path)?,
        None => match shardfetch_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Config path: {}",
                    shardfetch_core::Config::default_path().display()
                );
                shardfetch_core::Config::default()
            }
        },
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    logging::init_from_config(&config, args.verbose, args.quiet, args.json_logs);
    tracing::debug!("shardfetch v{}", shardfetch_core::VERSION);
    tracing::debug!("{:?}", args);

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    cli::run::execute(args, config).await
}
