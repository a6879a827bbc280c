use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wifiopt::analyzer::{NetworkAnalysis, NetworkAnalyzer};
use wifiopt::config::{OutputFormat, WifiOptConfig};
use wifiopt::network::Band;
use wifiopt::recommender::{ChannelRecommendation, ChannelRecommender, ChannelScore};
use wifiopt::snapshot::Snapshot;
use wifiopt::source::{JsonFileSource, NetworkSource, ProfilerSource};

#[derive(Parser)]
#[command(name = "wifiopt")]
#[command(about = "Wi-Fi channel recommendation and link analysis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Read a JSON snapshot instead of scanning")]
    input: Option<PathBuf>,

    #[arg(long, global = true, help = "Parse a saved system_profiler dump")]
    profiler_dump: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List visible networks")]
    Scan {
        #[arg(short, long, help = "Only show one band (2.4, 5, 6)")]
        band: Option<Band>,
    },

    #[command(about = "Recommend the quietest channel per band")]
    Recommend {
        #[arg(long, help = "Print JSON")]
        json: bool,

        #[arg(long, help = "Show every candidate channel's score")]
        scores: bool,
    },

    #[command(about = "Analyse the associated network")]
    Analyze {
        #[arg(long, help = "Network id or BSSID to analyse instead of the associated one")]
        current: Option<String>,

        #[arg(long, help = "Print JSON")]
        json: bool,
    },

    #[command(about = "Re-scan periodically until interrupted")]
    Watch {
        #[arg(long, help = "Seconds between scans")]
        interval: Option<u64>,

        #[arg(short, long, help = "Only consider one band (2.4, 5, 6)")]
        band: Option<Band>,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Validate configuration")]
    Validate,

    #[command(about = "Reset to defaults")]
    Reset,
}

#[derive(Serialize)]
struct RecommendReport {
    captured_at: chrono::DateTime<chrono::Utc>,
    recommendation: ChannelRecommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    scores: Option<Vec<BandScores>>,
}

#[derive(Serialize)]
struct BandScores {
    band: Band,
    channels: Vec<ChannelScore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = WifiOptConfig::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    init_logging(&cli, &config)?;

    debug!("wifiopt v{}", env!("CARGO_PKG_VERSION"));

    let source = build_source(&cli, &config)?;
    let format = config.output.format;
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Scan { band } => scan(source.as_ref(), band),
        Commands::Recommend { json, scores } => {
            recommend(source.as_ref(), json || format == OutputFormat::Json, scores)
        }
        Commands::Analyze { current, json } => analyze(
            source.as_ref(),
            current.as_deref(),
            json || format == OutputFormat::Json,
        ),
        Commands::Watch { interval, band } => {
            let seconds = interval.unwrap_or(config.watch.interval_seconds).max(1);
            watch(source, Duration::from_secs(seconds), band).await
        }
        Commands::Config { action } => handle_config(config_path, config, action).await,
    }
}

fn init_logging(cli: &Cli, config: &WifiOptConfig) -> Result<()> {
    let filter = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if let Some(log_file) = &cli.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }

    Ok(())
}

fn build_source(cli: &Cli, config: &WifiOptConfig) -> Result<Box<dyn NetworkSource + Send + Sync>> {
    if let Some(path) = &cli.input {
        return Ok(Box::new(JsonFileSource::new(path.clone())));
    }
    if let Some(path) = &cli.profiler_dump {
        return Ok(Box::new(ProfilerSource::dump(path.clone())));
    }
    config
        .source
        .build()
        .context("Failed to set up network source")
}

fn take_snapshot(source: &dyn NetworkSource) -> Result<Snapshot> {
    let mut snapshot = source
        .scan()
        .with_context(|| format!("Scan via {} failed", source.name()))?;
    snapshot.enrich();
    info!("Scanned {} networks via {}", snapshot.networks.len(), source.name());
    Ok(snapshot)
}

fn scan(source: &dyn NetworkSource, band: Option<Band>) -> Result<()> {
    let mut snapshot = take_snapshot(source)?;
    let current_id = snapshot.current_network().map(|n| n.id.clone());
    if let Some(band) = band {
        snapshot.filter_band(band);
    }

    let mut header = "Time\tSSID\tBSSID\tRSSI\tNoise\tSNR\tChannel\tBand\tWidth\tSecurity".to_string();
    if let Some(band) = band {
        header.push_str(&format!("\t(Filter: {})", band));
    }
    println!("{}", header);

    let timestamp = snapshot.captured_at.to_rfc3339();
    for network in snapshot.sorted_by_signal() {
        let star = if current_id.as_deref() == Some(network.id.as_str()) { "*" } else { " " };
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}{}",
            timestamp,
            network.display_name(),
            network.bssid.as_deref().unwrap_or("-"),
            network.rssi,
            network.noise,
            network.snr(),
            network.channel,
            network.band,
            network.bandwidth_mhz,
            network.security.label(),
            star
        );
    }

    Ok(())
}

fn recommend(source: &dyn NetworkSource, json: bool, with_scores: bool) -> Result<()> {
    let snapshot = take_snapshot(source)?;
    let recommendation = ChannelRecommender::recommend(&snapshot.networks);

    let scores = with_scores.then(|| {
        [Band::TwoPointFourGHz, Band::FiveGHz]
            .into_iter()
            .map(|band| BandScores {
                band,
                channels: ChannelRecommender::channel_scores(band, &snapshot.networks),
            })
            .collect::<Vec<_>>()
    });

    if json {
        let report = RecommendReport {
            captured_at: snapshot.captured_at,
            recommendation,
            scores,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Recommended channels:");
    println!("  2.4 GHz: {}", channel_or_none(recommendation.band_2_4));
    println!("  5 GHz:   {}", channel_or_none(recommendation.band_5));

    if let Some(scores) = scores {
        for band_scores in scores {
            println!("  {} candidates:", band_scores.band);
            for score in band_scores.channels {
                println!(
                    "    Channel {:>3}: score {:.3}, {} overlapping",
                    score.channel, score.score, score.overlaps
                );
            }
        }
    }

    Ok(())
}

fn analyze(source: &dyn NetworkSource, current: Option<&str>, json: bool) -> Result<()> {
    let snapshot = take_snapshot(source)?;

    let current_network = match current {
        Some(id) => {
            let found = snapshot.find(id);
            if found.is_none() {
                warn!("Network '{}' not found in snapshot", id);
            }
            found
        }
        None => snapshot.current_network(),
    };

    let analysis = NetworkAnalyzer::analyze(current_network, &snapshot.networks);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }

    Ok(())
}

fn print_analysis(analysis: &NetworkAnalysis) {
    let Some(network) = &analysis.current_network else {
        println!("Not associated with any network");
        return;
    };

    println!("Network: {} ({})", network.display_name(), network.id);
    println!(
        "  Channel {} on {}, {} MHz, {}",
        network.channel,
        network.band,
        network.bandwidth_mhz,
        network.security.label()
    );
    println!(
        "  Signal {} dBm, noise {} dBm, SNR {} dB",
        network.rssi,
        network.noise,
        network.snr()
    );
    println!("  Performance score: {:.0}/100", analysis.performance_score);
    println!(
        "  Signal quality: {} - {}",
        analysis.signal_quality.label(),
        analysis.signal_quality.description()
    );

    let metrics = &analysis.detailed_metrics;
    println!("  Metrics:");
    println!("    Channel utilization: {:.0}%", metrics.channel_utilization);
    println!("    Same-channel networks: {}", metrics.same_channel_networks);
    println!("    Nearby networks: {}", metrics.neighboring_networks);
    println!("    Overlapping channels: {}", metrics.overlapping_channels);
    println!("    Average neighbor signal: {:.1} dBm", metrics.average_neighbor_rssi);
    println!("    Congestion: {:?}", metrics.channel_congestion_level);

    if !analysis.interference_factors.is_empty() {
        println!("  Interference:");
        for factor in &analysis.interference_factors {
            println!("    - [{:?}] {}: {}", factor.severity, factor.description, factor.impact);
        }
    }

    if !analysis.recommendations.is_empty() {
        println!("  Recommendations:");
        for recommendation in &analysis.recommendations {
            println!(
                "    - [{:?}] {}: {} ({})",
                recommendation.priority,
                recommendation.title,
                recommendation.description,
                recommendation.expected_improvement
            );
        }
    }
}

fn channel_or_none(channel: Option<u16>) -> String {
    channel.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Runs a scan on the blocking pool; `system_profiler` can take seconds.
async fn scan_off_runtime(source: Arc<dyn NetworkSource + Send + Sync>) -> Result<Snapshot> {
    tokio::task::spawn_blocking(move || take_snapshot(source.as_ref()))
        .await
        .context("Scan task panicked")?
}

async fn watch(
    source: Box<dyn NetworkSource + Send + Sync>,
    interval: Duration,
    band: Option<Band>,
) -> Result<()> {
    info!("Watching every {:?} (Ctrl+C to stop)", interval);
    let source: Arc<dyn NetworkSource + Send + Sync> = Arc::from(source);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            },
            _ = ticker.tick() => {
                match scan_off_runtime(Arc::clone(&source)).await {
                    Ok(mut snapshot) => {
                        let analysis = NetworkAnalyzer::analyze(snapshot.current_network(), &snapshot.networks);
                        if let Some(band) = band {
                            snapshot.filter_band(band);
                        }
                        let recommendation = ChannelRecommender::recommend(&snapshot.networks);
                        println!(
                            "{}\tnetworks={}\t2.4GHz={}\t5GHz={}\tscore={:.0}\tquality={}",
                            snapshot.captured_at.to_rfc3339(),
                            snapshot.networks.len(),
                            channel_or_none(recommendation.band_2_4),
                            channel_or_none(recommendation.band_5),
                            analysis.performance_score,
                            analysis.signal_quality.label()
                        );
                    },
                    Err(e) => error!("Scan failed: {:#}", e),
                }
            }
        }
    }

    Ok(())
}

async fn handle_config(
    config_path: Option<PathBuf>,
    config: WifiOptConfig,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&config)?);
        },
        ConfigAction::Validate => {
            info!("Validating configuration...");
            config.validate().context("Configuration is invalid")?;
            println!("Configuration is valid");
        },
        ConfigAction::Reset => {
            warn!("Resetting configuration to defaults...");
            WifiOptConfig::default()
                .save(config_path.as_deref())
                .await
                .context("Failed to write configuration")?;
            println!("Configuration reset to defaults");
        },
    }

    Ok(())
}
