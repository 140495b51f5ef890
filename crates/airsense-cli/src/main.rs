use std::time::Duration;

use airsense_core::{
    correlation_matrix, Channel, FallbackConfig, FallbackManager, FeedConfig, FeedMonitor,
    ForecastEngine, HttpFeed, HttpTransportLink, JsonFileCacheStore, MonitorConfig, Observation,
    SampleWindow, TelemetryFeed, ThresholdConfig,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod exporter;
mod relay;
mod viewer;

#[derive(Debug, Parser)]
#[command(name = "airsensed")]
#[command(about = "Air quality telemetry monitor and analytics daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value = "https://api.thingspeak.com")]
    feed_url: String,

    #[arg(long, default_value = "2851845")]
    channel_id: String,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long, default_value = "Factory Floor")]
    default_location: String,

    #[arg(long, default_value_t = 30_000)]
    interval_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    poll_timeout_ms: u64,

    #[arg(long, default_value_t = 3)]
    error_threshold: u32,

    /// Feed entries requested per poll.
    #[arg(long, default_value_t = 50)]
    results: usize,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// One-shot dump of the recent feed entries.
    Fetch {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Single monitor tick: newest sample plus any threshold alerts.
    Once {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Continuous monitoring until ctrl-c.
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    /// Moving-average forecast over the recent window.
    Forecast {
        #[arg(long, default_value_t = 6)]
        horizon: usize,
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    /// Pairwise channel correlation matrix.
    Correlate {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Live terminal charts for all channels.
    View {
        #[arg(long, default_value_t = 900.0)]
        window_sec: f64,
    },
    /// Append observations to daily JSONL files.
    Export {
        #[arg(long, default_value = "./data/observations")]
        output_dir: String,
        #[arg(long, default_value_t = 90)]
        retention_days: u64,
    },
    /// Forward readings and alerts to a gateway, caching while offline.
    Relay {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        gateway_url: String,
        #[arg(long, default_value = "./data/offline-cache.json")]
        cache_path: String,
        #[arg(long, default_value_t = 1000)]
        max_cache: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = MonitorConfig {
        poll_interval: Duration::from_millis(cli.interval_ms),
        poll_timeout: Duration::from_millis(cli.poll_timeout_ms),
        error_threshold: cli.error_threshold,
        fetch_results: cli.results,
        ..MonitorConfig::default()
    };

    let mut feed = HttpFeed::new(FeedConfig {
        base_url: cli.feed_url.clone(),
        channel_id: cli.channel_id.clone(),
        api_key: cli.api_key.clone(),
        default_location: cli.default_location.clone(),
    });
    let thresholds = ThresholdConfig::default();

    match cli.command {
        Command::Fetch { format } => {
            let samples = feed
                .fetch_recent(cli.results)
                .await
                .context("fetching recent feed entries")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&samples)?),
                OutputFormat::Ndjson => {
                    for sample in &samples {
                        println!("{}", serde_json::to_string(sample)?);
                    }
                }
                OutputFormat::Human => {
                    for sample in &samples {
                        print_sample_line(sample);
                    }
                }
            }
        }
        Command::Once { format } => {
            let mut monitor = FeedMonitor::new(feed, config, thresholds);
            let observation = monitor.tick().await;
            print_observation(&observation, format)?;
        }
        Command::Watch { format } => {
            let mut monitor = FeedMonitor::new(feed, config, thresholds);
            stream_loop(&mut monitor, format).await?;
        }
        Command::Forecast { horizon, format } => {
            let samples = feed
                .fetch_recent(cli.results)
                .await
                .context("fetching history for forecasting")?;
            let window = SampleWindow::from_unordered(samples);
            let engine = ForecastEngine::new();
            let points = engine
                .forecast(&window, horizon)
                .context("forecasting requires a longer history; try --results 100")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&points)?),
                OutputFormat::Ndjson => {
                    for point in &points {
                        println!("{}", serde_json::to_string(point)?);
                    }
                }
                OutputFormat::Human => {
                    for point in &points {
                        println!(
                            "{}  confidence={:.2}  co={:.2} pm2_5={:.2} pm10={:.2} voc={:.1} ch4={:.2} temp={:.1} rh={:.1}",
                            point.timestamp.to_rfc3339(),
                            point.confidence,
                            point.predicted.co,
                            point.predicted.pm2_5,
                            point.predicted.pm10,
                            point.predicted.voc,
                            point.predicted.methane,
                            point.predicted.temperature,
                            point.predicted.humidity,
                        );
                        for issue in &point.issues {
                            println!("    ! {issue}");
                        }
                    }
                }
            }
        }
        Command::Correlate { format } => {
            let samples = feed
                .fetch_recent(cli.results)
                .await
                .context("fetching history for correlation")?;
            let window = SampleWindow::from_unordered(samples);
            let matrix = correlation_matrix(&window);
            match format {
                OutputFormat::Json | OutputFormat::Ndjson => {
                    println!("{}", serde_json::to_string_pretty(&matrix)?);
                }
                OutputFormat::Human => {
                    print!("{:>12}", "");
                    for channel in Channel::ALL {
                        print!("{:>12}", channel.as_str());
                    }
                    println!();
                    for a in Channel::ALL {
                        print!("{:>12}", a.as_str());
                        for b in Channel::ALL {
                            print!("{:>12.3}", matrix.get(a, b));
                        }
                        println!();
                    }
                }
            }
        }
        Command::View { window_sec } => {
            let mut monitor = FeedMonitor::new(feed, config, thresholds);
            viewer::run_viewer(&mut monitor, window_sec).await?;
        }
        Command::Export {
            output_dir,
            retention_days,
        } => {
            let mut monitor = FeedMonitor::new(feed, config, thresholds);
            exporter::run_exporter(&mut monitor, &output_dir, retention_days).await?;
        }
        Command::Relay {
            gateway_url,
            cache_path,
            max_cache,
        } => {
            let mut monitor = FeedMonitor::new(feed, config, thresholds);
            let mut manager = FallbackManager::new(
                HttpTransportLink::new(gateway_url),
                JsonFileCacheStore::new(cache_path),
                FallbackConfig {
                    max_cache_entries: max_cache,
                    ..FallbackConfig::default()
                },
            );
            relay::run_relay(&mut monitor, &mut manager).await?;
        }
    }

    Ok(())
}

async fn stream_loop<F: TelemetryFeed>(
    monitor: &mut FeedMonitor<F>,
    format: OutputFormat,
) -> Result<()> {
    let start = Instant::now() + Duration::from_millis(50);
    let mut ticker = interval_at(start, monitor.effective_interval());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            _ = ticker.tick() => {
                let observation = monitor.tick().await;
                print_observation(&observation, format)?;
                let next = monitor.effective_interval();
                ticker = interval_at(Instant::now() + next, next);
                info!(
                    effective_interval_ms = %next.as_millis(),
                    status = %observation.status.code,
                    alerts = %observation.alerts.len(),
                    "tick"
                );
            }
        }
    }

    Ok(())
}

fn print_observation(observation: &Observation, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(observation)?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(observation)?);
        }
        OutputFormat::Human => {
            println!("=== AirSense Observation ===");
            println!("Time:       {}", observation.ts.to_rfc3339());
            println!(
                "Feed:       status={} stale={} age_ms={} rtt_ms={}",
                observation.status.code,
                observation.feed.stale,
                observation.feed.age_ms,
                observation.feed.rtt_ms,
            );

            if !observation.status.failures.is_empty() {
                println!("Failures:   {}", observation.status.failures.join(", "));
            }

            if let Some(sample) = &observation.sample {
                println!(
                    "Location:   {}  ({})",
                    sample.location,
                    sample.timestamp.to_rfc3339()
                );
                print_sample_line(sample);
            } else {
                println!("Location:   no sample yet");
            }

            if observation.alerts.is_empty() {
                println!("Alerts:     none");
            } else {
                println!("Alerts:");
                for alert in &observation.alerts {
                    println!("  [{}] {}", alert.severity, alert.message);
                }
            }
        }
    }

    Ok(())
}

fn print_sample_line(sample: &airsense_core::Sample) {
    let show = |value: Option<f64>| match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    };
    println!(
        "  co={} pm2_5={} pm10={} voc={} ch4={} temp={} rh={}",
        show(sample.co),
        show(sample.pm2_5),
        show(sample.pm10),
        show(sample.voc),
        show(sample.methane),
        show(sample.temperature),
        show(sample.humidity),
    );
}
