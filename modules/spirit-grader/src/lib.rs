pub mod aggregate;
pub mod config;
pub mod error;
pub mod grader;
pub mod imaging;
pub mod prompt;
pub mod record;
pub mod report;
pub mod runner;
pub mod schema;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregate::AggregateReport;
pub use config::{Cli, GraderConfig};
pub use error::{GradingError, SchemaViolation, ViolationKind};
pub use grader::{ClaudeGrader, Grader};
pub use imaging::{HttpImageLoader, ImageLoader, ImageSource, NormalizedImage};
pub use prompt::{GradingPrompt, GradingRequest};
pub use record::SpiritRecord;
pub use report::ReportWriter;
pub use runner::{list_records, BatchRunner, BatchSummary, RecordOutcome, RunnerSettings};
pub use schema::{Category, ScoreDocument};
