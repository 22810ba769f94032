//! Pagesift CLI
//!
//! Renders a page in headless Chrome, cleans it, and prints the extraction
//! record as JSON or the cleaned Markdown alone.

use anyhow::Result;
use clap::Parser;
use pagesift_core::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pagesift")]
#[command(author, version, about = "Extract clean Markdown from rendered web pages", long_about = None)]
struct Cli {
    /// URL to extract
    url: String,

    /// Output format: json, markdown
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Also produce markdown of the raw pre-clean body
    #[arg(long)]
    include_body: bool,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 90)]
    timeout_secs: u64,

    /// Path to a Chrome/Chromium binary (otherwise discovered)
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_subscriber::EnvFilter::new("debug"))
            .init();
    }

    let config = PipelineConfig {
        navigation_timeout: Duration::from_secs(cli.timeout_secs),
        include_raw_body: cli.include_body,
        chrome_path: cli.chrome,
        ..Default::default()
    };

    let pipeline = Pipeline::new(config);
    let extraction = pipeline.extract(&cli.url).await?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&extraction)?);
        }
        OutputFormat::Markdown => {
            print!("{}", extraction.mdx_cleaned);
        }
    }

    Ok(())
}
