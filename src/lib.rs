pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod analysis;
pub mod storage;

pub use config::{AnalyzerConfig, Config, FetchPolicy};
pub use error::{Error, Result};
pub use github::{GitHubClient, RepositorySource};
pub use analysis::{analyze, build_report, RepositoryAnalyzer, ReportAggregator, ScoringEngine};
pub use storage::Storage;
