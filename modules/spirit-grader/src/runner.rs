use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use futures::stream::{self, StreamExt};
use tokio::io::AsyncWrite;
use tracing::{info, warn};

use crate::aggregate::AggregateReport;
use crate::error::GradingError;
use crate::grader::Grader;
use crate::imaging::{normalize, ImageLoader, ImageSource};
use crate::prompt;
use crate::record::SpiritRecord;
use crate::report::ReportWriter;
use crate::schema::{Category, ScoreDocument};

const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub target_long_edge: u32,
    pub encode_quality: u8,
    /// Records graded at the same time. Values below 1 are treated as 1.
    pub concurrency: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            target_long_edge: 1000,
            encode_quality: 85,
            concurrency: 1,
        }
    }
}

/// What happened to one record file.
#[derive(Debug)]
pub struct RecordOutcome {
    pub file_name: String,
    /// `None` when the record file itself could not be read.
    pub spirit_name: Option<String>,
    pub result: Result<ScoreDocument, GradingError>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// One entry per input record, in completion order.
    pub outcomes: Vec<RecordOutcome>,
    pub averages: BTreeMap<Category, f64>,
}

impl BatchSummary {
    pub fn graded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.graded()
    }

    pub fn failures_of_kind(&self, kind: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Err(e) if e.kind() == kind))
            .count()
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Grading Run Complete ===")?;
        writeln!(f, "Records:  {}", self.outcomes.len())?;
        writeln!(f, "Graded:   {}", self.graded())?;
        writeln!(f, "Failed:   {}", self.failed())?;
        if self.failed() > 0 {
            for kind in [
                "FetchError",
                "EncodeError",
                "TransportError",
                "SchemaError",
                "RecordError",
            ] {
                let count = self.failures_of_kind(kind);
                if count > 0 {
                    writeln!(f, "  {kind}: {count}")?;
                }
            }
        }
        Ok(())
    }
}

/// Every `*.json` file directly inside `dir`, in directory-listing order.
pub fn list_records(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read spirit directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list spirit directory {}", dir.display()))?
            .path();
        let is_record = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION);
        if is_record {
            paths.push(path);
        }
    }
    Ok(paths)
}

pub struct BatchRunner {
    loader: Arc<dyn ImageLoader>,
    grader: Arc<dyn Grader>,
    settings: RunnerSettings,
}

impl BatchRunner {
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        grader: Arc<dyn Grader>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            loader,
            grader,
            settings,
        }
    }

    /// Grade every record, writing one report entry each, then the averages.
    ///
    /// Only report I/O failures are returned as errors; per-record failures
    /// end up in the report and the summary.
    pub async fn run<W: AsyncWrite + Unpin>(
        &self,
        paths: &[PathBuf],
        writer: &mut ReportWriter<W>,
    ) -> Result<BatchSummary> {
        info!(records = paths.len(), concurrency = self.settings.concurrency, "Grading batch");
        writer.header(Local::now()).await?;

        let mut aggregate = AggregateReport::new();
        let mut outcomes = Vec::with_capacity(paths.len());

        let mut graded = stream::iter(paths)
            .map(|path| self.grade_record(path))
            .buffer_unordered(self.settings.concurrency.max(1));

        while let Some(outcome) = graded.next().await {
            match &outcome.result {
                Ok(document) => {
                    let spirit_name = outcome.spirit_name.as_deref().unwrap_or_default();
                    writer
                        .success(&outcome.file_name, spirit_name, document)
                        .await?;
                    aggregate.record(document);
                    info!(
                        file = outcome.file_name.as_str(),
                        spirit = spirit_name,
                        overall_grade = document.overall_grade,
                        "Spirit graded"
                    );
                }
                Err(e) => {
                    writer.failure(&outcome.file_name, e).await?;
                    warn!(
                        file = outcome.file_name.as_str(),
                        kind = e.kind(),
                        error = %e,
                        "Spirit not graded"
                    );
                }
            }
            outcomes.push(outcome);
        }

        let averages = aggregate.finalize();
        writer.averages(&averages).await?;

        Ok(BatchSummary { outcomes, averages })
    }

    /// Load and grade one record file. Never fails; the error is the outcome.
    pub async fn grade_record(&self, path: &Path) -> RecordOutcome {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let record = match SpiritRecord::load(path).await {
            Ok(record) => record,
            Err(e) => {
                return RecordOutcome {
                    file_name,
                    spirit_name: None,
                    result: Err(e),
                }
            }
        };

        RecordOutcome {
            file_name,
            spirit_name: Some(record.display_name().to_string()),
            result: self.grade_spirit(&record).await,
        }
    }

    pub async fn grade_spirit(&self, record: &SpiritRecord) -> Result<ScoreDocument, GradingError> {
        let prompt = prompt::build(record);
        let RunnerSettings {
            target_long_edge,
            encode_quality,
            ..
        } = self.settings;

        let (original, generated) = tokio::try_join!(
            normalize(
                self.loader.as_ref(),
                ImageSource::Url(record.original_image_url.clone()),
                target_long_edge,
                encode_quality,
            ),
            normalize(
                self.loader.as_ref(),
                ImageSource::Url(record.generated_image_url.clone()),
                target_long_edge,
                encode_quality,
            ),
        )?;

        let request = prompt.attach(original, generated);
        self.grader.grade(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_bytes, score_document_json, spirit, MockGrader, MockImageLoader};

    fn runner(loader: MockImageLoader, grader: MockGrader) -> BatchRunner {
        BatchRunner::new(
            Arc::new(loader),
            Arc::new(grader),
            RunnerSettings {
                target_long_edge: 16,
                ..RunnerSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn grade_spirit_sends_normalized_images() {
        let loader = MockImageLoader::new()
            .on_image("https://img/a", png_bytes(64, 32))
            .on_image("https://img/b", png_bytes(32, 64));
        let grader = MockGrader::new().on_grade("Owl", score_document_json(6.0));
        let grader = Arc::new(grader);

        let runner = BatchRunner::new(
            Arc::new(loader),
            grader.clone(),
            RunnerSettings {
                target_long_edge: 16,
                ..RunnerSettings::default()
            },
        );
        let doc = runner
            .grade_spirit(&spirit("Owl", "https://img/a", "https://img/b"))
            .await
            .unwrap();

        assert_eq!(doc.overall_grade, 6.0);
        let seen = grader.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].original, (16, 8));
        assert_eq!(seen[0].generated, (8, 16));
    }

    #[tokio::test]
    async fn missing_image_never_reaches_grader() {
        let loader = MockImageLoader::new().on_image("https://img/a", png_bytes(8, 8));
        let grader = Arc::new(MockGrader::new().on_grade("Owl", score_document_json(6.0)));
        let runner = BatchRunner::new(Arc::new(loader), grader.clone(), RunnerSettings::default());

        let err = runner
            .grade_spirit(&spirit("Owl", "https://img/a", "https://img/missing"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "FetchError");
        assert!(grader.requests().is_empty());
    }

    #[tokio::test]
    async fn unreadable_record_file_is_record_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let outcome = runner(MockImageLoader::new(), MockGrader::new())
            .grade_record(&path)
            .await;

        assert_eq!(outcome.file_name, "broken.json");
        assert!(outcome.spirit_name.is_none());
        assert_eq!(outcome.result.unwrap_err().kind(), "RecordError");
    }

    #[test]
    fn list_records_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.JSON.txt"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.md"), "hi").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let paths = list_records(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("a.json")]);
    }

    #[test]
    fn list_records_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_records(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn summary_counts_by_kind() {
        let summary = BatchSummary {
            outcomes: vec![
                RecordOutcome {
                    file_name: "a.json".into(),
                    spirit_name: Some("A".into()),
                    result: Err(GradingError::Fetch("x".into())),
                },
                RecordOutcome {
                    file_name: "b.json".into(),
                    spirit_name: Some("B".into()),
                    result: Err(GradingError::Transport("y".into())),
                },
            ],
            averages: BTreeMap::new(),
        };

        assert_eq!(summary.graded(), 0);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.failures_of_kind("FetchError"), 1);
        let text = summary.to_string();
        assert!(text.contains("Failed:   2"));
        assert!(text.contains("TransportError: 1"));
    }
}
