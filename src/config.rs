use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_WINDOW_MONTHS: u32 = 12;
pub const DEFAULT_DATABASE_PATH: &str = "devscore.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub github_username: Option<String>,
    pub api_base_url: String,
    pub database_path: String,
    pub window_months: u32,
    pub concurrency_limit: usize,
    pub max_pages: Option<usize>,
    pub requests_per_minute: u32,
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let github_token = env::var("GITHUB_TOKEN")
            .map_err(|_| Error::Config("GITHUB_TOKEN environment variable not set".to_string()))?;

        let github_username = env::var("GITHUB_USERNAME")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let api_base_url = env::var("GITHUB_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());

        let window_months = match env::var("WINDOW_MONTHS") {
            Ok(v) => v
                .parse()
                .map_err(|_| Error::Config(format!("WINDOW_MONTHS must be a number, got {:?}", v)))?,
            Err(_) => DEFAULT_WINDOW_MONTHS,
        };
        if window_months == 0 {
            return Err(Error::Config("WINDOW_MONTHS must be at least 1".to_string()));
        }

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let max_pages = parse_max_pages(env::var("MAX_PAGES").ok().as_deref())?;

        let requests_per_minute = env::var("REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let max_retries = env::var("MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            github_token,
            github_username,
            api_base_url,
            database_path,
            window_months,
            concurrency_limit,
            max_pages,
            requests_per_minute,
            max_retries,
        })
    }
}

/// Settings for a single analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Size of the trailing commit histogram.
    pub window_months: u32,
    /// Login that commits are attributed to. Falls back to the repository owner.
    pub username: Option<String>,
    pub concurrency_limit: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_months: DEFAULT_WINDOW_MONTHS,
            username: None,
            concurrency_limit: 5,
        }
    }
}

impl From<&Config> for AnalyzerConfig {
    fn from(config: &Config) -> Self {
        Self {
            window_months: config.window_months,
            username: config.github_username.clone(),
            concurrency_limit: config.concurrency_limit,
        }
    }
}

/// How the paginator walks a collection.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub max_pages: Option<usize>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for FetchPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_pages: config.max_pages,
            max_retries: config.max_retries,
            ..Self::default()
        }
    }
}

/// Unset or 0 follows every page.
fn parse_max_pages(value: Option<&str>) -> Result<Option<usize>> {
    match value.map(str::trim) {
        None | Some("") | Some("0") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("MAX_PAGES must be a number, got {:?}", v))),
    }
}
