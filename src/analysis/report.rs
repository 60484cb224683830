use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;

use crate::analysis::documentation::{percentage, sort_by_size};
use crate::error::{Error, Result};
use crate::models::{LanguageBreakdown, Report, ReportOptions, ReportSummary, RepositoryAnalysis};

const SHARE_TOKEN_LENGTH: usize = 10;
const TOP_LANGUAGES: usize = 5;

/// Combines per-repository analyses of one account into a report.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, analyses: &[RepositoryAnalysis], options: ReportOptions) -> Result<Report> {
        let overall_score = self.overall_score(analyses)?;
        let account = analyses[0].account.clone();

        let report = Report {
            name: options
                .name
                .unwrap_or_else(|| format!("Report for {}", account)),
            account,
            repository_ids: analyses.iter().map(RepositoryAnalysis::key).collect(),
            total_repositories: analyses.len() as u32,
            total_commits: analyses.iter().map(|a| a.commits.user_commits).sum(),
            total_stars: analyses.iter().map(|a| a.stars).sum(),
            overall_score,
            is_public: options.is_public,
            share_token: options.is_public.then(generate_share_token),
            view_count: 0,
            created_at: Utc::now(),
        };

        tracing::info!(
            "Built report over {} repositories, overall score {}",
            report.total_repositories,
            report.overall_score
        );
        Ok(report)
    }

    /// Mean over repositories of each repository's mean sub-score, so every
    /// repository weighs the same regardless of its activity.
    pub fn overall_score(&self, analyses: &[RepositoryAnalysis]) -> Result<u8> {
        if analyses.is_empty() {
            return Err(Error::EmptyInput);
        }

        let sum: f64 = analyses.iter().map(|a| a.scores.mean()).sum();
        Ok((sum / analyses.len() as f64).round().clamp(0.0, 100.0) as u8)
    }

    /// Bytes summed per language across analyses, re-percented, top five.
    pub fn merge_languages(&self, analyses: &[RepositoryAnalysis]) -> Vec<LanguageBreakdown> {
        let mut bytes_by_language: HashMap<&str, u64> = HashMap::new();
        for lang in analyses.iter().flat_map(|a| a.languages.iter()) {
            *bytes_by_language.entry(lang.name.as_str()).or_insert(0) += lang.bytes;
        }

        let total: u64 = bytes_by_language.values().sum();
        let mut merged: Vec<_> = bytes_by_language
            .into_iter()
            .map(|(name, bytes)| LanguageBreakdown {
                name: name.to_string(),
                bytes,
                percentage: percentage(bytes, total),
            })
            .collect();

        sort_by_size(&mut merged);
        merged.truncate(TOP_LANGUAGES);
        merged
    }

    pub fn summarize(&self, report: Report, analyses: Vec<RepositoryAnalysis>) -> ReportSummary {
        let average_documentation_score = if analyses.is_empty() {
            0
        } else {
            let sum: u32 = analyses
                .iter()
                .map(|a| a.code_quality.documentation_score as u32)
                .sum();
            (sum as f64 / analyses.len() as f64).round() as u8
        };

        ReportSummary {
            top_languages: self.merge_languages(&analyses),
            total_contributors: analyses.iter().map(|a| a.collaboration.contributors).sum(),
            average_documentation_score,
            report,
            analyses,
        }
    }
}

/// Private report with the default name.
pub fn build_report(analyses: &[RepositoryAnalysis]) -> Result<Report> {
    ReportAggregator::new().build(analyses, ReportOptions::default())
}

pub fn generate_share_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
