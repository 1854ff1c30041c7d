//! tilewarm CLI - Command-line interface
//!
//! Warms a tile server's cache by requesting every tile that covers a region
//! over a range of zoom levels.

mod args;
mod error;
mod reporter;

use clap::Parser;
use tracing::{debug, info};

use tilewarm::config::{config_file_path, ConfigFile};
use tilewarm::coord::WebMercatorCover;
use tilewarm::http::ReqwestTileClient;
use tilewarm::logging::init_logging;
use tilewarm::warmer::Warmer;

use crate::args::{Args, Invocation};
use crate::error::CliError;
use crate::reporter::ConsoleReporter;

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let _logging_guard =
        init_logging(args.verbose, args.log_file.as_deref()).map_err(CliError::LoggingInit)?;

    let file = load_config_file(&args)?;
    let Invocation { config, region } = args.resolve(&file)?;

    let polygons = region.load()?;
    debug!(polygons = polygons.len(), region = ?region, "Region loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let summary = runtime.block_on(async {
        let client = ReqwestTileClient::new(&config.method, &config.headers, config.timeout)?;
        info!(method = %client.method(), template = %config.url_template, "Starting");

        let summary = Warmer::new(client)
            .run(&config, &polygons, &WebMercatorCover, &ConsoleReporter::new())
            .await?;
        Ok::<_, CliError>(summary)
    })?;

    // Failed tiles are reported, not fatal
    debug!(failed = summary.failed(), "Run complete");
    Ok(())
}

/// Loads the config file named by `--config`, or the default one if present.
fn load_config_file(args: &Args) -> Result<ConfigFile, CliError> {
    match &args.config {
        Some(path) if !path.exists() => Err(CliError::ConfigNotFound(path.clone())),
        Some(path) => Ok(ConfigFile::load(path)?),
        None => Ok(ConfigFile::load(&config_file_path())?),
    }
}
