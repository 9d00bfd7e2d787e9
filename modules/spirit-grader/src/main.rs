use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spirit_grader::report::format_averages;
use spirit_grader::{list_records, BatchRunner, ClaudeGrader, Cli, HttpImageLoader, ReportWriter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("spirit_grader=info".parse()?))
        .init();

    let config = Cli::parse().into_config(Local::now());

    if !config.directory.is_dir() {
        bail!("{} is not a valid directory", config.directory.display());
    }

    info!("Spirit grader starting...");
    config.log_redacted();

    let runner = BatchRunner::new(
        Arc::new(HttpImageLoader::new(config.timeout)?),
        Arc::new(ClaudeGrader::new(config.claude())),
        config.runner,
    );

    let paths = list_records(&config.directory)?;
    let mut writer = ReportWriter::create(&config.output).await?;
    let summary = runner.run(&paths, &mut writer).await?;

    info!("Batch complete. {summary}");

    println!("\nResults for directory: {}", config.directory.display());
    print!("{}", format_averages(&summary.averages));
    println!(
        "Evaluation complete. Results written to {}",
        config.output.display()
    );

    Ok(())
}
