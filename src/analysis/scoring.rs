use crate::models::{
    CodeQualitySummary, CollaborationSummary, CommitSummary, MonthlyCommitBucket, RepositoryScores,
};

// Code quality
const README_POINTS: i64 = 25;
const LICENSE_POINTS: i64 = 20;
const TESTS_POINTS: i64 = 30;
const DOCUMENTATION_WEIGHT: f64 = 0.25;

// Collaboration
const COLLABORATION_BASELINE: i64 = 30;
const MULTIPLE_CONTRIBUTORS_POINTS: i64 = 20;
const MANY_CONTRIBUTORS_POINTS: i64 = 10;
const MANY_CONTRIBUTORS_THRESHOLD: u32 = 5;
const PULL_REQUESTS_POINTS: i64 = 20;
const ISSUES_POINTS: i64 = 10;
const RESOLUTION_POINTS: i64 = 10;

// Consistency
const VARIANCE_PENALTY: f64 = 20.0;
const VOLUME_TARGET: f64 = 50.0;
const REGULARITY_WEIGHT: f64 = 0.7;
const VOLUME_WEIGHT: f64 = 0.3;

/// The three per-repository sub-scores, each in 0..=100.
///
/// All constants are empirically chosen; changing any of them changes the
/// meaning of stored scores.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        code_quality: &CodeQualitySummary,
        collaboration: &CollaborationSummary,
        commits: &CommitSummary,
    ) -> RepositoryScores {
        RepositoryScores {
            code_quality: self.code_quality_score(code_quality),
            collaboration: self.collaboration_score(collaboration),
            consistency: self.consistency_score(&commits.by_month),
        }
    }

    pub fn code_quality_score(&self, quality: &CodeQualitySummary) -> u8 {
        let mut score = 0;
        if quality.has_readme {
            score += README_POINTS;
        }
        if quality.has_license {
            score += LICENSE_POINTS;
        }
        if quality.has_tests {
            score += TESTS_POINTS;
        }
        score += (quality.documentation_score as f64 * DOCUMENTATION_WEIGHT).round() as i64;

        clamp_score(score)
    }

    pub fn collaboration_score(&self, collaboration: &CollaborationSummary) -> u8 {
        let mut score = COLLABORATION_BASELINE;
        if collaboration.contributors > 1 {
            score += MULTIPLE_CONTRIBUTORS_POINTS;
        }
        if collaboration.contributors > MANY_CONTRIBUTORS_THRESHOLD {
            score += MANY_CONTRIBUTORS_POINTS;
        }
        if collaboration.pull_requests > 0 {
            score += PULL_REQUESTS_POINTS;
        }
        if collaboration.issues > 0 {
            score += ISSUES_POINTS;
        }
        // Resolution-oriented activity over open-ended reporting
        if collaboration.pull_requests > collaboration.issues {
            score += RESOLUTION_POINTS;
        }

        clamp_score(score)
    }

    /// Rewards regular monthly activity (70%) and overall volume (30%).
    pub fn consistency_score(&self, by_month: &[MonthlyCommitBucket]) -> u8 {
        if by_month.is_empty() {
            return 0;
        }

        let months = by_month.len() as f64;
        let total: f64 = by_month.iter().map(|b| b.commits as f64).sum();
        let average = total / months;
        let variance = by_month
            .iter()
            .map(|b| (b.commits as f64 - average).powi(2))
            .sum::<f64>()
            / months;

        let consistency_factor = if average == 0.0 {
            0.0
        } else {
            (100.0 - (variance / average) * VARIANCE_PENALTY).max(0.0)
        };
        let volume_factor = (total / VOLUME_TARGET).min(1.0) * 100.0;

        let score = (consistency_factor * REGULARITY_WEIGHT + volume_factor * VOLUME_WEIGHT).round();
        clamp_score(score as i64)
    }
}

fn clamp_score(score: i64) -> u8 {
    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn months(counts: &[u32]) -> Vec<MonthlyCommitBucket> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &commits)| MonthlyCommitBucket {
                month: format!("{:02}", i + 1),
                year: "2024".to_string(),
                commits,
            })
            .collect()
    }

    fn quality(readme: bool, license: bool, tests: bool, docs: u8) -> CodeQualitySummary {
        CodeQualitySummary {
            has_readme: readme,
            has_license: license,
            has_tests: tests,
            documentation_score: docs,
        }
    }

    #[test]
    fn test_code_quality_example() {
        let engine = ScoringEngine::new();
        assert_eq!(engine.code_quality_score(&quality(true, false, true, 80)), 75);
    }

    #[test]
    fn test_code_quality_bounds() {
        let engine = ScoringEngine::new();
        assert_eq!(engine.code_quality_score(&quality(false, false, false, 0)), 0);
        assert_eq!(engine.code_quality_score(&quality(true, true, true, 100)), 100);
        assert_eq!(engine.code_quality_score(&quality(true, true, true, 255)), 100);
    }

    #[test]
    fn test_collaboration_example() {
        let engine = ScoringEngine::new();
        assert_eq!(engine.collaboration_score(&CollaborationSummary::new(6, 2, 5)), 100);
    }

    #[test]
    fn test_collaboration_baseline_and_partial_credit() {
        let engine = ScoringEngine::new();
        assert_eq!(engine.collaboration_score(&CollaborationSummary::new(0, 0, 0)), 30);
        assert_eq!(engine.collaboration_score(&CollaborationSummary::new(1, 3, 0)), 40);
        assert_eq!(engine.collaboration_score(&CollaborationSummary::new(2, 0, 1)), 80);
        assert_eq!(engine.collaboration_score(&CollaborationSummary::new(5, 4, 4)), 80);
    }

    #[test]
    fn test_consistency_empty_and_idle() {
        let engine = ScoringEngine::new();
        assert_eq!(engine.consistency_score(&[]), 0);
        assert_eq!(engine.consistency_score(&months(&[0; 12])), 0);
    }

    #[test]
    fn test_consistency_perfectly_regular() {
        let engine = ScoringEngine::new();
        assert_eq!(engine.consistency_score(&months(&[5; 12])), 100);
        // Regular but low volume: 100 * 0.7 + (12 / 50) * 100 * 0.3
        assert_eq!(engine.consistency_score(&months(&[1; 12])), 77);
    }

    #[test]
    fn test_consistency_single_burst() {
        let engine = ScoringEngine::new();
        let mut counts = [0; 12];
        counts[11] = 1;
        // variance / average = 11/12, factor = 100 - 18.33
        assert_eq!(engine.consistency_score(&months(&counts)), 58);

        counts[11] = 60;
        // huge variance floors regularity at 0, volume saturates
        assert_eq!(engine.consistency_score(&months(&counts)), 30);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let engine = ScoringEngine::new();
        for contributors in [0, 1, 2, 6, 1000] {
            for issues in [0, 1, 50] {
                for prs in [0, 1, 50] {
                    let score = engine
                        .collaboration_score(&CollaborationSummary::new(contributors, issues, prs));
                    assert!((30..=100).contains(&score));
                }
            }
        }
        for counts in [[0u32; 12], [u32::MAX / 12; 12], [3, 0, 0, 9, 1, 0, 0, 0, 44, 0, 2, 7]] {
            assert!(engine.consistency_score(&months(&counts)) <= 100);
        }
    }
}
