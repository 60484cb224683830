use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{
    CodeQualitySummary, CollaborationSummary, CommitSummary, Report, RepositoryAnalysis,
    RepositoryScores,
};

pub struct Storage {
    conn: Connection,
}

const ANALYSIS_COLUMNS: &str = r#"
    account, owner, repository_name, repository_url, repository_description,
    primary_language, stars_count, forks_count, languages_json,
    total_commits, user_commits, commits_by_month_json, average_commits_per_month,
    contributors_count, issues_count, pull_requests_count,
    has_readme, has_license, has_tests, documentation_score,
    code_quality_score, collaboration_score, consistency_score, analyzed_at
"#;

const REPORT_COLUMNS: &str = r#"
    account, report_name, repository_ids_json, total_repositories, total_commits,
    total_stars, overall_score, is_public, share_token, view_count, created_at
"#;

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS repository_analyses (
                id INTEGER PRIMARY KEY,
                account TEXT NOT NULL,
                owner TEXT NOT NULL,
                repository_name TEXT NOT NULL,
                repository_url TEXT NOT NULL,
                repository_description TEXT,
                primary_language TEXT,
                stars_count INTEGER NOT NULL,
                forks_count INTEGER NOT NULL,
                languages_json TEXT NOT NULL,
                total_commits INTEGER NOT NULL,
                user_commits INTEGER NOT NULL,
                commits_by_month_json TEXT NOT NULL,
                average_commits_per_month INTEGER NOT NULL,
                contributors_count INTEGER NOT NULL,
                issues_count INTEGER NOT NULL,
                pull_requests_count INTEGER NOT NULL,
                has_readme INTEGER NOT NULL,
                has_license INTEGER NOT NULL,
                has_tests INTEGER NOT NULL,
                documentation_score INTEGER NOT NULL,
                code_quality_score INTEGER NOT NULL,
                collaboration_score INTEGER NOT NULL,
                consistency_score INTEGER NOT NULL,
                analyzed_at TEXT NOT NULL,
                UNIQUE(account, repository_name)
            );

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY,
                account TEXT NOT NULL,
                report_name TEXT NOT NULL,
                repository_ids_json TEXT NOT NULL,
                total_repositories INTEGER NOT NULL,
                total_commits INTEGER NOT NULL,
                total_stars INTEGER NOT NULL,
                overall_score INTEGER NOT NULL,
                is_public INTEGER NOT NULL,
                share_token TEXT UNIQUE,
                view_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analyses_account ON repository_analyses(account);
            CREATE INDEX IF NOT EXISTS idx_reports_account ON reports(account);
            "#,
        )?;

        Ok(())
    }

    /// Inserts or replaces the analysis for (account, repository name).
    pub fn save_analysis(&self, analysis: &RepositoryAnalysis) -> Result<()> {
        let languages_json = serde_json::to_string(&analysis.languages)?;
        let by_month_json = serde_json::to_string(&analysis.commits.by_month)?;

        self.conn.execute(
            &format!(
                r#"
                INSERT INTO repository_analyses ({})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                        ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)
                ON CONFLICT(account, repository_name) DO UPDATE SET
                    owner = excluded.owner,
                    repository_url = excluded.repository_url,
                    repository_description = excluded.repository_description,
                    primary_language = excluded.primary_language,
                    stars_count = excluded.stars_count,
                    forks_count = excluded.forks_count,
                    languages_json = excluded.languages_json,
                    total_commits = excluded.total_commits,
                    user_commits = excluded.user_commits,
                    commits_by_month_json = excluded.commits_by_month_json,
                    average_commits_per_month = excluded.average_commits_per_month,
                    contributors_count = excluded.contributors_count,
                    issues_count = excluded.issues_count,
                    pull_requests_count = excluded.pull_requests_count,
                    has_readme = excluded.has_readme,
                    has_license = excluded.has_license,
                    has_tests = excluded.has_tests,
                    documentation_score = excluded.documentation_score,
                    code_quality_score = excluded.code_quality_score,
                    collaboration_score = excluded.collaboration_score,
                    consistency_score = excluded.consistency_score,
                    analyzed_at = excluded.analyzed_at
                "#,
                ANALYSIS_COLUMNS
            ),
            params![
                analysis.account,
                analysis.owner,
                analysis.repository_name,
                analysis.repository_url,
                analysis.description,
                analysis.primary_language,
                analysis.stars,
                analysis.forks,
                languages_json,
                analysis.commits.total,
                analysis.commits.user_commits,
                by_month_json,
                analysis.commits.average_per_month,
                analysis.collaboration.contributors,
                analysis.collaboration.issues,
                analysis.collaboration.pull_requests,
                analysis.code_quality.has_readme,
                analysis.code_quality.has_license,
                analysis.code_quality.has_tests,
                analysis.code_quality.documentation_score,
                analysis.scores.code_quality,
                analysis.scores.collaboration,
                analysis.scores.consistency,
                analysis.analyzed_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    pub fn list_analyses(&self, account: &str) -> Result<Vec<RepositoryAnalysis>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM repository_analyses WHERE account = ?1 ORDER BY repository_name",
            ANALYSIS_COLUMNS
        ))?;

        let rows = stmt.query_map(params![account], analysis_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Stored analyses of `account` for the given repository names, in the
    /// order requested. Unknown names are skipped.
    pub fn get_analyses(&self, account: &str, names: &[String]) -> Result<Vec<RepositoryAnalysis>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM repository_analyses WHERE account = ?1 AND repository_name = ?2",
            ANALYSIS_COLUMNS
        ))?;

        let mut analyses = Vec::new();
        for name in names {
            if let Some(analysis) = stmt
                .query_row(params![account, name], analysis_from_row)
                .optional()?
            {
                analyses.push(analysis);
            }
        }
        Ok(analyses)
    }

    pub fn save_report(&self, report: &Report) -> Result<()> {
        let ids_json = serde_json::to_string(&report.repository_ids)?;
        self.conn.execute(
            &format!(
                "INSERT INTO reports ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                REPORT_COLUMNS
            ),
            params![
                report.account,
                report.name,
                ids_json,
                report.total_repositories,
                report.total_commits,
                report.total_stars,
                report.overall_score,
                report.is_public,
                report.share_token,
                report.view_count,
                report.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_reports(&self, account: &str) -> Result<Vec<Report>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reports WHERE account = ?1 ORDER BY created_at DESC, id DESC",
            REPORT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![account], report_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Loads a public report by share token and counts the view.
    pub fn open_public_report(&self, share_token: &str) -> Result<Report> {
        let updated = self.conn.execute(
            "UPDATE reports SET view_count = view_count + 1 WHERE share_token = ?1 AND is_public = 1",
            params![share_token],
        )?;
        if updated == 0 {
            return Err(Error::ReportNotFound(share_token.to_string()));
        }

        let report = self.conn.query_row(
            &format!("SELECT {} FROM reports WHERE share_token = ?1", REPORT_COLUMNS),
            params![share_token],
            report_from_row,
        )?;
        Ok(report)
    }
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryAnalysis> {
    let languages_json: String = row.get(8)?;
    let by_month_json: String = row.get(11)?;
    let analyzed_at: String = row.get(23)?;

    Ok(RepositoryAnalysis {
        account: row.get(0)?,
        owner: row.get(1)?,
        repository_name: row.get(2)?,
        repository_url: row.get(3)?,
        description: row.get(4)?,
        primary_language: row.get(5)?,
        stars: row.get(6)?,
        forks: row.get(7)?,
        languages: from_json(8, &languages_json)?,
        commits: CommitSummary {
            total: row.get(9)?,
            user_commits: row.get(10)?,
            by_month: from_json(11, &by_month_json)?,
            average_per_month: row.get(12)?,
        },
        collaboration: CollaborationSummary::new(row.get(13)?, row.get(14)?, row.get(15)?),
        code_quality: CodeQualitySummary {
            has_readme: row.get(16)?,
            has_license: row.get(17)?,
            has_tests: row.get(18)?,
            documentation_score: row.get(19)?,
        },
        scores: RepositoryScores {
            code_quality: row.get(20)?,
            collaboration: row.get(21)?,
            consistency: row.get(22)?,
        },
        analyzed_at: parse_timestamp(23, &analyzed_at)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    let ids_json: String = row.get(2)?;
    let created_at: String = row.get(10)?;

    Ok(Report {
        account: row.get(0)?,
        name: row.get(1)?,
        repository_ids: from_json(2, &ids_json)?,
        total_repositories: row.get(3)?,
        total_commits: row.get(4)?,
        total_stars: row.get(5)?,
        overall_score: row.get(6)?,
        is_public: row.get(7)?,
        share_token: row.get(8)?,
        view_count: row.get(9)?,
        created_at: parse_timestamp(10, &created_at)?,
    })
}

fn from_json<T: serde::de::DeserializeOwned>(column: usize, json: &str) -> rusqlite::Result<T> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}
