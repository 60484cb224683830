use chrono::{DateTime, Datelike, Utc};

use crate::models::{CommitRecord, CommitSummary, MonthlyCommitBucket};

/// Buckets commits into a trailing window of calendar months.
#[derive(Debug, Clone)]
pub struct CommitPatternAnalyzer {
    window_months: u32,
}

impl CommitPatternAnalyzer {
    pub fn new(window_months: u32) -> Self {
        Self {
            window_months: window_months.max(1),
        }
    }

    pub fn window_months(&self) -> u32 {
        self.window_months
    }

    pub fn summarize(&self, commits: &[CommitRecord], username: &str) -> CommitSummary {
        self.summarize_at(commits, username, Utc::now())
    }

    /// Same as `summarize` with the window ending at the month of `now`.
    pub fn summarize_at(
        &self,
        commits: &[CommitRecord],
        username: &str,
        now: DateTime<Utc>,
    ) -> CommitSummary {
        let mut by_month = self.empty_window(now);
        let current = month_index(now);
        let window = self.window_months as i64;

        for date in commits.iter().filter_map(CommitRecord::authored_at) {
            let offset = current - month_index(date);
            if (0..window).contains(&offset) {
                by_month[(window - 1 - offset) as usize].commits += 1;
            }
        }

        let user_commits = commits
            .iter()
            .filter(|c| c.author_login() == Some(username))
            .count() as u32;

        CommitSummary {
            total: commits.len() as u32,
            user_commits,
            by_month,
            average_per_month: (user_commits as f64 / self.window_months as f64).round() as u32,
        }
    }

    /// Zeroed buckets, oldest first, ending at the month of `now`.
    pub fn empty_window(&self, now: DateTime<Utc>) -> Vec<MonthlyCommitBucket> {
        let current = month_index(now);
        (0..self.window_months as i64)
            .rev()
            .map(|back| {
                let index = current - back;
                MonthlyCommitBucket {
                    month: format!("{:02}", index.rem_euclid(12) + 1),
                    year: format!("{:04}", index.div_euclid(12)),
                    commits: 0,
                }
            })
            .collect()
    }
}

impl Default for CommitPatternAnalyzer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_WINDOW_MONTHS)
    }
}

/// Months since year 0.
fn month_index(date: DateTime<Utc>) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}
