mod cli;
mod config;
mod error;
mod output;

use std::process;

use clap::Parser;
use spaces_engine::{
    CancellationToken, DownloadOutcome, HttpFetcher, OutputSink, PollingConfig, SessionEnd,
    SpaceDownloader, create_client,
};
use spaces_platform::TwitterSpaces;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;
use crate::config::{AppConfig, Settings};
use crate::error::Result;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args).await {
        Ok(outcome) => {
            let end = match outcome.end {
                SessionEnd::Completed => "completed",
                SessionEnd::Stopped => "stopped",
            };
            info!(
                segments = outcome.stats.segments,
                bytes = outcome.stats.bytes,
                skipped = outcome.stats.skipped,
                elapsed = ?outcome.elapsed,
                "Recording {end}"
            );
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}

async fn run(args: Args) -> Result<DownloadOutcome> {
    let config = AppConfig::load(args.config.as_deref())?;
    let settings = Settings::resolve(&args, config)?;
    let client = create_client(&settings.downloader)?;

    let spaces = TwitterSpaces::new(args.url.as_str(), client.clone(), &settings.credentials);
    let space_id = spaces.extract_space_id()?;
    if !settings.credentials.is_logged_in() {
        warn!("No auth_token/ct0 configured, the API may reject anonymous requests");
    }

    let (playlist_url, space) = spaces.get_stream_url(space_id).await?;
    info!(
        space_id = %space.space_id,
        title = space.title.as_deref().unwrap_or("untitled"),
        state = %space.state,
        "Recording Space"
    );

    if let Some(parent) = settings.output.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let sink = OutputSink::create(&settings.output).await?;

    let token = CancellationToken::new();
    spawn_ctrl_c_handler(token.clone());

    let fetcher = HttpFetcher::new(client, &settings.downloader);
    let downloader = SpaceDownloader::new(fetcher, sink, PollingConfig::default())
        .with_cancellation_token(token);
    Ok(downloader.run(&playlist_url).await?)
}

/// Cancels `token` on Ctrl-C. Later presses are ignored.
fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !token.is_cancelled() {
                info!("Ctrl-C received, stopping download");
            }
            token.cancel();
        }
    });
}
