//! Shortcast worker binary.
//!
//! Usage: `shortcast-worker <thread-url-or-id>...`

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shortcast_media::{check_ffmpeg, check_ffprobe};
use shortcast_worker::{load_config, VideoFactory};

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "shortcast=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn init_metrics() -> anyhow::Result<()> {
    let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return Ok(());
    };

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("failed to install Prometheus exporter")?;
    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Returns the number of failed threads.
async fn run(inputs: Vec<String>) -> anyhow::Result<usize> {
    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;

    let config = load_config().await.context("failed to load configuration")?;
    info!(
        mode = %config.duration.mode,
        target_secs = config.duration.target_secs(),
        voice = %config.voice.voice,
        "Configuration loaded"
    );

    let factory = VideoFactory::new(config)
        .await
        .context("failed to create video factory")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            cancel_tx.send(true).ok();
        }
    });

    let mut failures = 0;
    for input in &inputs {
        if *cancel_rx.borrow() {
            warn!(remaining = %input, "Shutdown requested, stopping");
            break;
        }
        match factory.produce(input, Some(cancel_rx.clone())).await {
            Ok(video) => info!(output = %video.output.display(), "Video ready"),
            Err(e) if e.is_skip() => info!(input = %input, "{}", e),
            Err(e) => {
                error!(input = %input, retryable = e.is_retryable(), "Production failed: {}", e);
                failures += 1;
            }
        }
    }
    Ok(failures)
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        eprintln!("usage: shortcast-worker <thread-url-or-id>...");
        std::process::exit(2);
    }

    if let Err(e) = init_metrics() {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!(threads = inputs.len(), "Starting shortcast-worker");

    match run(inputs).await {
        Ok(0) => info!("All threads processed"),
        Ok(failures) => {
            error!(failures, "Some threads failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
