//! tablesnap
//!
//! Exports every row of a table into a JSON Lines backup file using
//! parallel segmented scans.
//!
//! # Usage
//!
//! ```bash
//! # Export with four parallel segments
//! tablesnap -t users --source users.json --segments 4 -o users.jsonl
//!
//! # Page size from a quarter of the provisioned read capacity
//! tablesnap -t users --source users.json --throughput-percent 0.25
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tablesnap::cli::{CliInterface, Commands};
use tablesnap::error::{ConfigError, Result};
use tablesnap::export::{ExportOptions, JsonLSink, ScanCoordinator, get_item};
use tablesnap::table::{MemoryTable, TableService};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        if let Some(detail) = e.service_error().and_then(|se| se.to_json_compact().ok()) {
            eprintln!("{}", detail);
        }
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the export
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    cli.config().validate()?;
    let service = connect_table_service(&cli)?;

    if let Some(Commands::GetItem { key }) = &cli.args().command {
        return run_get_item(&cli, service, key).await;
    }

    run_export(&cli, service).await
}

/// Create the table client shared by every component of the run
fn connect_table_service(cli: &CliInterface) -> Result<Arc<dyn TableService>> {
    let export = &cli.config().export;
    let source = export
        .source
        .as_ref()
        .ok_or_else(|| ConfigError::MissingField("export.source".to_string()))?;

    info!(
        "Opening table '{}' in {} from {}",
        export.table,
        export.region,
        source.display()
    );
    Ok(Arc::new(MemoryTable::from_dump_file(source)?))
}

/// Export the configured table into a JSON Lines file
async fn run_export(cli: &CliInterface, service: Arc<dyn TableService>) -> Result<()> {
    cli.print_banner();

    let output = cli.output_path();
    let sink = Arc::new(JsonLSink::new(&output).await?);

    // Ctrl+C stops every segment before its next page
    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ctrl_c_token.cancel(),
            Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    let coordinator = ScanCoordinator::new(
        service,
        sink.clone(),
        ExportOptions::from(&cli.config().export),
    )
    .with_cancellation(cancel_token);

    let result = coordinator.retrieve().await;
    ctrl_c_handle.abort();
    let summary = result?;

    if summary.cancelled {
        warn!("Export cancelled; {} is incomplete", output.display());
    }

    if !cli.args().quiet {
        println!(
            "Exported {} records ({} scanned, {} pages) to {} in {} ms",
            summary.records,
            summary.scanned,
            summary.pages,
            output.display(),
            summary.elapsed_ms
        );
    }
    Ok(())
}

/// Print a single item as tagged JSON
async fn run_get_item(
    cli: &CliInterface,
    service: Arc<dyn TableService>,
    key: &str,
) -> Result<()> {
    let key = CliInterface::parse_key(key)?;
    let item = get_item(service.as_ref(), &cli.config().export.table, &key).await?;
    println!("{}", serde_json::to_string_pretty(&item)?);
    Ok(())
}

/// Initialize logging system based on configuration
///
/// Logs go to stderr so that stdout stays clean for `get-item` output.
/// `RUST_LOG`, when set, replaces the configured level.
fn initialize_logging(cli: &CliInterface) {
    let logging = &cli.config().logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_tracing_level().to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
