//! Lectio CLI entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lectio_core::{
    client::{AdvisoryQuota, AnalysisClient, AnalyzeResponse, DEFAULT_ENDPOINT},
    classify::whole_seconds,
    ApiServer, ServerConfig,
};
use std::path::PathBuf;
use tracing::{debug, warn, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "lectio")]
#[command(about = "Latin passage analysis backed by a generative language model", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP analysis server
    Serve {
        /// Server address (overrides LECTIO_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Analyze a passage using a running server
    Analyze {
        /// Latin text to analyze
        text: String,

        /// Analysis endpoint URL
        #[arg(long, env = "LECTIO_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Directory holding the device fingerprint and quota state
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Show the advisory quota for this device
    Quota {
        /// Directory holding the device fingerprint and quota state
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("lectio={level},lectio_core={level},tower_http={level}"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Lectio v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { addr } => serve(addr).await,
        Commands::Analyze {
            text,
            endpoint,
            state_dir,
        } => analyze(&text, &endpoint, state_dir).await,
        Commands::Quota { state_dir } => quota(state_dir).await,
    }
}

async fn serve(addr: Option<String>) -> Result<()> {
    let mut config = ServerConfig::from_env().context("Failed to load server configuration")?;
    if let Some(addr) = addr {
        config.addr = addr
            .parse()
            .with_context(|| format!("Invalid server address '{}'", addr))?;
    }

    ApiServer::new(config)?.serve().await
}

async fn analyze(text: &str, endpoint: &str, state_dir: Option<PathBuf>) -> Result<()> {
    let state_dir = state_dir.unwrap_or_else(AdvisoryQuota::default_state_dir);
    let quota = AdvisoryQuota::open(&state_dir)?;

    let status = quota.status().await;
    if status.limited {
        let wait = whole_seconds(status.reset_in);
        warn!("Advisory quota exhausted for device {}", quota.fingerprint());
        anyhow::bail!(
            "Request limit reached for this device. Try again in {} minutes.",
            wait.div_ceil(60)
        );
    }

    quota.record().await?;
    let client = AnalysisClient::new(endpoint);

    match client.analyze(text).await? {
        AnalyzeResponse::Success {
            result,
            cache_status,
        } => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            eprintln!(
                "{} words analyzed (cache: {})",
                result.words().len(),
                cache_status.as_deref().unwrap_or("unknown")
            );
            for word in result.word_views() {
                eprintln!(
                    "  {:<16} {:<16} {}",
                    word.word.as_deref().unwrap_or("?"),
                    word.lemma.as_deref().unwrap_or("-"),
                    word.short_meaning().unwrap_or_default()
                );
            }
            for sentence in result.sentence_views() {
                if let Some(translation) = &sentence.translation {
                    eprintln!("  \"{}\"", translation);
                }
            }
            Ok(())
        }
        AnalyzeResponse::Failed { status, error } => {
            eprintln!("Error {} ({}): {}", status, error.error_type, error.error);
            if let Some(details) = &error.details {
                eprintln!("  {}", details);
            }
            for suggestion in &error.suggestions {
                eprintln!("  - {}", suggestion);
            }
            if let Some(seconds) = error.reset_in_seconds {
                eprintln!("  Retry after {} seconds", seconds);
            }
            anyhow::bail!("Analysis failed")
        }
    }
}

async fn quota(state_dir: Option<PathBuf>) -> Result<()> {
    let state_dir = state_dir.unwrap_or_else(AdvisoryQuota::default_state_dir);
    let quota = AdvisoryQuota::open(&state_dir)?;
    let status = quota.status().await;

    println!("Device:    {}", quota.fingerprint());
    println!("Used:      {}", status.used);
    println!("Remaining: {}", status.remaining);
    if status.used > 0 {
        println!("Resets in: {} seconds", whole_seconds(status.reset_in));
    }
    Ok(())
}
