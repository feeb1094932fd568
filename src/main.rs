use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use chatguard::config::Config;

/// Sentences used by `classify` when none are given.
const SMOKE_SENTENCES: [&str; 3] = [
    "Hello friend, how are you?",
    "You are so dumb",
    "This is a test product",
];

/// chatguard: offensive-text classification service.
///
/// Loads a pre-trained sequence model, its tokenizer, and a word denylist,
/// then classifies text over HTTP or from the command line.
#[derive(Parser)]
#[command(name = "chatguard", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (POST /api/analyze, GET /api/health)
    Serve {
        /// Address to bind (default: CHATGUARD_BIND or 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (default: CHATGUARD_PORT or 5000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Classify texts offline (runs built-in smoke sentences if none given)
    Classify {
        /// Texts to classify
        texts: Vec<String>,

        /// Override the default threshold (must be a finite number)
        #[arg(long, value_parser = parse_threshold_arg)]
        threshold: Option<f64>,
    },

    /// Check that the model, tokenizer and denylist are present and load
    Check,
}

/// clap value parser sharing the config's threshold validation.
fn parse_threshold_arg(value: &str) -> Result<f64, String> {
    chatguard::config::parse_threshold(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("chatguard=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, port } => {
            let config = Config::load()?;
            let classifier = chatguard::artifacts::load_classifier(&config)?;
            if !classifier.model_ready() {
                warn!("Serving in degraded mode: /api/health reports model: unavailable");
            }

            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let port = port.unwrap_or(config.port);
            info!(policy = %config.policy, "Starting API server...");
            chatguard::web::run_server(classifier, &bind, port).await?;
        }

        Commands::Classify { texts, threshold } => {
            let config = Config::load()?;
            let classifier = chatguard::artifacts::load_classifier(&config)?;

            let texts: Vec<String> = if texts.is_empty() {
                SMOKE_SENTENCES.iter().map(|s| s.to_string()).collect()
            } else {
                texts
            };

            println!(
                "Classifying {} texts ({} policy, threshold {})...\n",
                texts.len(),
                classifier.policy(),
                threshold.unwrap_or(classifier.default_threshold()),
            );

            let mut results = Vec::with_capacity(texts.len());
            let mut failures = 0;
            for text in &texts {
                match classifier.analyze(text, threshold).await {
                    Ok(analysis) => {
                        chatguard::output::terminal::display_analysis(&analysis);
                        results.push(analysis);
                    }
                    Err(e) => {
                        failures += 1;
                        println!(
                            "  {:<60} -> {}",
                            format!("\"{}\"", chatguard::output::truncate_chars(text, 56)),
                            format!("Error: {e}").red(),
                        );
                    }
                }
            }

            chatguard::output::terminal::display_summary(&results, failures);
            if failures > 0 {
                anyhow::bail!("{failures} of {} texts could not be classified", texts.len());
            }
        }

        Commands::Check => {
            let config = Config::load()?;
            if !chatguard::status::show(&config)? {
                anyhow::bail!("One or more artifacts failed to load");
            }
            println!("\n{}", "All artifacts load.".green().bold());
        }
    }

    Ok(())
}
