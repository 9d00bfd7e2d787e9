use std::path::{Path, PathBuf};
use std::time::Duration;

use ai_client::Claude;
use chrono::{DateTime, Local};
use clap::Parser;

use crate::runner::RunnerSettings;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const REPORT_DIR: &str = "scores";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "spirit-grader",
    about = "Grade a directory of generated spirits with a vision model"
)]
pub struct Cli {
    /// Directory of spirit JSON documents
    pub directory: PathBuf,

    /// Report path (default: scores/grade_<dir>_<timestamp>.txt)
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = 1500)]
    pub max_tokens: u32,

    /// Records graded at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Deadline for each image fetch and each grading call
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Long edge, in pixels, images are rescaled to
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pub long_edge: u32,

    /// JPEG quality for re-encoded images
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

impl Cli {
    pub fn into_config(self, started_at: DateTime<Local>) -> GraderConfig {
        let output = self
            .output
            .unwrap_or_else(|| default_output_path(&self.directory, started_at));

        GraderConfig {
            directory: self.directory,
            output,
            anthropic_api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
            runner: RunnerSettings {
                target_long_edge: self.long_edge,
                encode_quality: self.quality,
                concurrency: self.concurrency.max(1),
            },
        }
    }
}

/// Resolved settings for one grading run.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    pub directory: PathBuf,
    pub output: PathBuf,
    pub anthropic_api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub runner: RunnerSettings,
}

impl GraderConfig {
    pub fn claude(&self) -> Claude {
        Claude::new(&self.anthropic_api_key, &self.model)
            .with_timeout(self.timeout)
            .with_max_tokens(self.max_tokens)
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{head}...({} chars)", val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  directory: {}", self.directory.display());
        tracing::info!("  output: {}", self.output.display());
        tracing::info!("  model: {} (max_tokens {})", self.model, self.max_tokens);
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!(
            "  images: long edge {}px, quality {}",
            self.runner.target_long_edge,
            self.runner.encode_quality
        );
        tracing::info!(
            "  concurrency: {}, timeout: {}s",
            self.runner.concurrency,
            self.timeout.as_secs()
        );
    }
}

/// `scores/grade_<last path component>_<YYYYmmdd_HHMMSS>.txt`
pub fn default_output_path(directory: &Path, started_at: DateTime<Local>) -> PathBuf {
    let label = directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "spirits".to_string());
    PathBuf::from(REPORT_DIR).join(format!(
        "grade_{label}_{}.txt",
        started_at.format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("spirit-grader").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_apply() {
        let cli = parse(&["runs/base_mini_run_20", "--api-key", "sk-ant-xyz"]).unwrap();
        assert_eq!(cli.model, DEFAULT_MODEL);
        assert_eq!(cli.max_tokens, 1500);
        assert_eq!(cli.long_edge, 1000);
        assert_eq!(cli.quality, 85);
        assert_eq!(cli.concurrency, 1);
        assert_eq!(cli.timeout_secs, 120);
        assert!(cli.output.is_none());
    }

    #[test]
    fn quality_must_be_in_range() {
        assert!(parse(&["dir", "--api-key", "k", "--quality", "0"]).is_err());
        assert!(parse(&["dir", "--api-key", "k", "--quality", "101"]).is_err());
        assert!(parse(&["dir", "--api-key", "k", "--quality", "100"]).is_ok());
    }

    #[test]
    fn zero_long_edge_is_rejected() {
        assert!(parse(&["dir", "--api-key", "k", "--long-edge", "0"]).is_err());
    }

    #[test]
    fn default_output_uses_directory_name_and_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 10, 16, 14, 30, 5).unwrap();
        let path = default_output_path(Path::new("/photos/base_mini_run_20"), at);
        assert_eq!(
            path,
            PathBuf::from("scores/grade_base_mini_run_20_20261016_143005.txt")
        );
    }

    #[test]
    fn into_config_carries_settings() {
        let cli = parse(&[
            "dir",
            "--api-key",
            "k",
            "--output",
            "out.txt",
            "--concurrency",
            "0",
            "--long-edge",
            "512",
        ])
        .unwrap();
        let config = cli.into_config(Local::now());

        assert_eq!(config.output, PathBuf::from("out.txt"));
        assert_eq!(config.runner.concurrency, 1);
        assert_eq!(config.runner.target_long_edge, 512);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.claude().model(), DEFAULT_MODEL);
    }
}
