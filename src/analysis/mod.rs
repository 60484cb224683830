pub mod commits;
pub mod documentation;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod tree_signals;

pub use commits::CommitPatternAnalyzer;
pub use documentation::{language_breakdown, DocumentationScorer};
pub use pipeline::{AnalysisBatch, BatchCanceller, BatchOutcome, RepositoryAnalyzer};
pub use report::{build_report, ReportAggregator};
pub use scoring::ScoringEngine;
pub use tree_signals::{has_tests, TreeSignals};

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::models::RepositoryAnalysis;

/// Analyzes one repository with a fresh client for `auth_token`.
pub async fn analyze(
    owner_login: &str,
    repo_name: &str,
    auth_token: &str,
    config: &AnalyzerConfig,
) -> Result<RepositoryAnalysis> {
    let client = GitHubClient::new(auth_token)?;
    RepositoryAnalyzer::new(client, config.clone())
        .analyze(owner_login, repo_name)
        .await
}
