use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::analysis::{LanguageBreakdown, RepositoryAnalysis};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub account: String,
    pub name: String,
    /// Keys of the referenced analyses (see `RepositoryAnalysis::key`).
    pub repository_ids: BTreeSet<String>,
    pub total_repositories: u32,
    pub total_commits: u32,
    pub total_stars: u32,
    pub overall_score: u8,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub view_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub name: Option<String>,
    pub is_public: bool,
}

/// What a shared report page shows: the stored report plus figures derived
/// from the analyses it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report: Report,
    pub top_languages: Vec<LanguageBreakdown>,
    pub total_contributors: u32,
    pub average_documentation_score: u8,
    pub analyses: Vec<RepositoryAnalysis>,
}
