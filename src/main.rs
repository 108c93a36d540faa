//! CLI entry point for the GTFS-RT archive service.
//!
//! Serves live and archived arrivals over HTTP, polls the upstream feeds
//! into the snapshot archive, and inspects individual feed files.

use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use gtfs_rt_archive::arrivals::{ArrivalFilter, extract_arrivals};
use gtfs_rt_archive::cache::LiveCache;
use gtfs_rt_archive::config::AppConfig;
use gtfs_rt_archive::fetch::{BasicClient, fetch_bytes};
use gtfs_rt_archive::ingest::poll_once;
use gtfs_rt_archive::parser::{parse_feed, render_feed};
use gtfs_rt_archive::routes::RouteGroup;
use gtfs_rt_archive::server::{AppState, router};
use gtfs_rt_archive::store::SnapshotStore;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_archive")]
#[command(about = "Live and archived arrivals from the NYCT subway GTFS-RT feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides BIND_ADDR)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Fetch route group feeds and archive any new snapshots
    Ingest {
        /// Route group keys to poll (e.g. "ace", "number"); all groups if omitted
        #[arg(short = 'g', long = "group")]
        groups: Vec<String>,

        /// Seconds between polling passes
        #[arg(short = 'r', long, default_value_t = 30)]
        interval: u64,

        /// Number of polling passes (0 = until interrupted)
        #[arg(short = 'n', long, default_value_t = 1)]
        samples: usize,
    },
    /// Decode a feed from a file or URL and print its arrivals
    Inspect {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Only trips on this route
        #[arg(short, long)]
        route_id: Option<String>,

        /// Only these stops (repeatable)
        #[arg(short = 's', long = "stop-id")]
        stop_ids: Vec<String>,

        /// Print the whole decoded feed instead of arrivals
        #[arg(long, default_value_t = false)]
        dump: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing()?;
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await?,
        Commands::Ingest {
            groups,
            interval,
            samples,
        } => {
            let groups = parse_groups(&groups)?;
            ingest(&config, &groups, interval, samples).await?;
        }
        Commands::Inspect {
            source,
            route_id,
            stop_ids,
            dump,
        } => {
            let bytes = fetcher(&config, &source).await?;
            let feed = parse_feed(&bytes)?;
            if dump {
                println!("{}", render_feed(&feed));
            } else {
                let filter = ArrivalFilter { route_id, stop_ids };
                let rows = extract_arrivals(&feed, &filter, &config.timezone);
                info!(entities = feed.entity.len(), arrivals = rows.len(), "Feed decoded");
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }
    }

    Ok(())
}

/// Colored stderr plus a JSON daily-rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_rt_archive.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_archive.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

#[tracing::instrument(skip(config), fields(database = %config.database_url))]
async fn serve(config: AppConfig, bind: Option<SocketAddr>) -> Result<()> {
    let store = SnapshotStore::connect(&config.database_url).await?;
    let client = Arc::new(BasicClient::new(config.fetch_timeout)?);
    let cache = Arc::new(LiveCache::new(client, config.cache_ttl));

    let app = router(AppState {
        cache,
        store,
        timezone: config.timezone,
    });

    let addr = bind.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        timezone = %config.timezone,
        "HTTP API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}

/// Runs polling passes every `interval` seconds, `samples` times (0 = forever).
#[tracing::instrument(skip(config, groups), fields(groups = groups.len()))]
async fn ingest(
    config: &AppConfig,
    groups: &[RouteGroup],
    interval: u64,
    samples: usize,
) -> Result<()> {
    let store = SnapshotStore::connect(&config.database_url).await?;
    let client = BasicClient::new(config.fetch_timeout)?;

    if samples == 0 {
        info!(interval, "Polling until interrupted. Press Ctrl+C to stop.");
    } else {
        info!(samples, interval, "Starting polling");
    }

    let mut pass = 0;
    loop {
        pass += 1;
        info!(pass, "Starting polling pass");
        poll_once(&client, &store, groups).await;

        if samples > 0 && pass >= samples {
            break;
        }
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }

    info!(
        passes = pass,
        snapshots = store.count().await?,
        "Finished polling"
    );
    Ok(())
}

fn parse_groups(keys: &[String]) -> Result<Vec<RouteGroup>> {
    if keys.is_empty() {
        return Ok(RouteGroup::ALL.to_vec());
    }
    keys.iter()
        .map(|key| match RouteGroup::from_key(key) {
            Some(group) => Ok(group),
            None => bail!(
                "unknown route group {key:?}; expected one of: {}",
                RouteGroup::ALL.map(RouteGroup::key).join(", ")
            ),
        })
        .collect()
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(config), fields(source = %source))]
async fn fetcher(config: &AppConfig, source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new(config.fetch_timeout)?;
        fetch_bytes(&client, source).await?.to_vec()
    } else {
        std::fs::read(source)?
    };
    Ok(bytes)
}
