use anyhow::Context;
use clap::Parser;
use doc_converter::config::WorkerConfig;
use doc_converter::infrastructure::{converter, storage};
use doc_converter::logging;
use doc_converter::services::batch::BatchDriver;
use doc_converter::services::processor::ConversionProcessor;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// S3 event document to process ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    event: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = WorkerConfig::from_env()?;
    logging::init(&config);

    info!(
        "🚀 Starting document converter [output: {}, keep files: {}, timeout: {}s]",
        config.output_bucket, config.keep_files, config.conversion_timeout_secs
    );

    // 2. Collaborators
    let storage_service = storage::setup_storage(&config).await;
    let converter_service = converter::setup_converter(&config).await;

    let processor = Arc::new(ConversionProcessor::new(
        storage_service,
        converter_service,
        config,
    ));
    let driver = BatchDriver::new(processor);

    // 3. One batch per invocation
    let event = read_event(&args.event)?;
    match driver.handle_event(&event).await {
        Ok(summary) => {
            info!(
                "✅ Batch complete: {} converted, {} skipped",
                summary.converted, summary.skipped
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ Batch failed: {}", e);
            Err(e.into())
        }
    }
}

fn read_event(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event from {}", path.display()))?
    };

    serde_json::from_str(&raw).context("Event is not valid JSON")
}
