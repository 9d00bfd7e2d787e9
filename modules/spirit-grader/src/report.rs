//! Line-oriented batch report.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::GradingError;
use crate::schema::{Category, ScoreDocument};

const ENTRY_SEPARATOR_WIDTH: usize = 50;

/// Writes report entries as they arrive, flushing after each one so an
/// interrupted run leaves a readable prefix behind.
pub struct ReportWriter<W: AsyncWrite + Unpin> {
    out: W,
}

impl ReportWriter<BufWriter<File>> {
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: AsyncWrite + Unpin> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub async fn header(&mut self, generated_at: DateTime<Local>) -> Result<()> {
        let entry = format!(
            "Spirit Evaluation Report\nGenerated on: {}\n=================\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        self.emit(&entry).await
    }

    /// Full entry for a graded spirit. The evaluation is dumped as the model
    /// returned it, extra keys included.
    pub async fn success(
        &mut self,
        file_name: &str,
        spirit_name: &str,
        document: &ScoreDocument,
    ) -> Result<()> {
        let pretty = document.to_pretty_json().context("Failed to serialize evaluation")?;
        let entry = format!(
            "File: {file_name}\nSpirit: {spirit_name}\nEvaluation:\n{pretty}\n{}\n\n",
            "-".repeat(ENTRY_SEPARATOR_WIDTH)
        );
        self.emit(&entry).await
    }

    pub async fn failure(&mut self, file_name: &str, error: &GradingError) -> Result<()> {
        let entry = format!("Error processing {file_name}: {}: {error}\n", error.kind());
        self.emit(&entry).await
    }

    pub async fn averages(&mut self, averages: &BTreeMap<Category, f64>) -> Result<()> {
        let entry = format!("\n{}", format_averages(averages));
        self.emit(&entry).await
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    async fn emit(&mut self, entry: &str) -> Result<()> {
        self.out
            .write_all(entry.as_bytes())
            .await
            .context("Failed to write report")?;
        self.out.flush().await.context("Failed to flush report")
    }
}

/// The averages block shared by the report file and stdout.
pub fn format_averages(averages: &BTreeMap<Category, f64>) -> String {
    let mut out = String::from("AVERAGE SCORES ACROSS ALL SPIRITS\n================================\n");
    for (category, average) in averages {
        let _ = writeln!(out, "{category}: {average:.2}");
    }
    out
}
