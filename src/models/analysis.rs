use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageBreakdown {
    pub name: String,
    pub bytes: u64,
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyCommitBucket {
    /// Two-digit month, "01" through "12".
    pub month: String,
    /// Four-digit year.
    pub year: String,
    pub commits: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CommitSummary {
    pub total: u32,
    pub user_commits: u32,
    pub by_month: Vec<MonthlyCommitBucket>,
    pub average_per_month: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CollaborationSummary {
    pub contributors: u32,
    pub issues: u32,
    pub pull_requests: u32,
    pub is_collaborative: bool,
}

impl CollaborationSummary {
    pub fn new(contributors: u32, issues: u32, pull_requests: u32) -> Self {
        Self {
            contributors,
            issues,
            pull_requests,
            is_collaborative: contributors > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CodeQualitySummary {
    pub has_readme: bool,
    pub has_license: bool,
    pub has_tests: bool,
    pub documentation_score: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RepositoryScores {
    pub code_quality: u8,
    pub collaboration: u8,
    pub consistency: u8,
}

impl RepositoryScores {
    /// Unrounded mean of the three sub-scores.
    pub fn mean(&self) -> f64 {
        (self.code_quality as f64 + self.collaboration as f64 + self.consistency as f64) / 3.0
    }
}

/// Scored snapshot of one repository, owned by the account that requested it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryAnalysis {
    pub account: String,
    pub owner: String,
    pub repository_name: String,
    pub repository_url: String,
    pub description: Option<String>,
    pub primary_language: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub languages: Vec<LanguageBreakdown>,
    pub commits: CommitSummary,
    pub collaboration: CollaborationSummary,
    pub code_quality: CodeQualitySummary,
    pub scores: RepositoryScores,
    pub analyzed_at: DateTime<Utc>,
}

impl RepositoryAnalysis {
    /// Identity a report uses to reference this analysis.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.repository_name)
    }
}
