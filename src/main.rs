use clap::Parser;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};

use blackhole::cli::{query_daemon, Args, Command};
use blackhole::{serve, ServerConfig};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (crate_level, other_level) = match args.verbose {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };

    match &args.cmd {
        Command::Run(options) => {
            Builder::new()
                .filter(Some("blackhole"), crate_level)
                .filter(Some("blackholed"), crate_level)
                .filter(None, other_level)
                .init();
            info!("Logging at levels {}/{}", crate_level, other_level);

            let config = match ServerConfig::from_file(&options.config_path) {
                Ok(config) => config,
                Err(err) => {
                    error!("Failed to load config {}: {}", options.config_path, err);
                    std::process::exit(1);
                }
            };
            debug!(
                "Found {} feeds and {} neighbors in {}",
                config.feeds.len(),
                config.neighbors.len(),
                options.config_path
            );

            info!("Starting BGP Blackhole Announcer");
            if let Err(err) = serve(config).await {
                error!("{}", err);
                std::process::exit(1);
            }
        }
        _ => query_daemon(&args).await,
    }
}
