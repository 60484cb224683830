use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::{Config, FetchPolicy, DEFAULT_API_BASE_URL};
use crate::error::{Error, Result};
use crate::github::paginator::{json_kind, Paginator};
use crate::github::rate_limiter::RateLimiter;
use crate::models::{CommitRecord, Contributor, GitHubUser, IssueRecord, Repository};

pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
    policy: FetchPolicy,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("devscore/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: FetchPolicy::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::with_base_url(&config.github_token, &config.api_base_url)?;
        client.rate_limiter = RateLimiter::new(config.requests_per_minute);
        client.policy = FetchPolicy::from(config);
        Ok(client)
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    fn paginator(&self) -> Paginator<'_> {
        Paginator::new(&self.client, &self.rate_limiter, &self.policy)
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, owner, repo, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.wait().await;
        tracing::debug!("Fetching: {}", url);

        let response = self.client.get(url).send().await?;
        self.rate_limiter.observe(response.headers()).await;
        let response = ensure_success(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::UnexpectedResponseShape(format!("{}: {}", url, e)))
    }

    pub async fn authenticated_user(&self) -> Result<GitHubUser> {
        self.get_json(&format!("{}/user", self.base_url)).await
    }

    /// Repositories the token owner owns, forks excluded.
    pub async fn owned_repositories(&self) -> Result<Vec<Repository>> {
        let url = format!(
            "{}/user/repos?affiliation=owner&sort=updated&per_page=100",
            self.base_url
        );
        tracing::info!("Fetching owned repositories");
        let repos: Vec<Repository> = self.paginator().fetch_all(&url).await?;
        Ok(repos.into_iter().filter(|r| !r.fork).collect())
    }

    pub async fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        match self.get_json(&self.repo_url(owner, repo, "")).await {
            Err(Error::UpstreamRequest { status: 404, .. }) => {
                Err(Error::RepoNotFound(format!("{}/{}", owner, repo)))
            }
            other => other,
        }
    }

    /// Language name to byte count.
    pub async fn languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>> {
        let value: Value = self.get_json(&self.repo_url(owner, repo, "/languages")).await?;
        if !value.is_object() {
            return Err(Error::UnexpectedResponseShape(format!(
                "languages: expected an object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| Error::UnexpectedResponseShape(format!("languages: {}", e)))
    }

    pub async fn commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRecord>> {
        tracing::debug!("Fetching commits for: {}/{}", owner, repo);
        self.paginator()
            .fetch_all(&self.repo_url(owner, repo, "/commits?per_page=100"))
            .await
    }

    pub async fn contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        self.paginator()
            .fetch_all(&self.repo_url(owner, repo, "/contributors?per_page=100"))
            .await
    }

    /// Issues and pull requests in any state.
    pub async fn issues(&self, owner: &str, repo: &str) -> Result<Vec<IssueRecord>> {
        self.paginator()
            .fetch_all(&self.repo_url(owner, repo, "/issues?state=all&per_page=100"))
            .await
    }

    /// Every path in the default branch's recursive tree.
    pub async fn tree_paths(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let url = self.repo_url(owner, repo, "/git/trees/HEAD?recursive=1");
        let value: Value = self.get_json(&url).await?;

        let entries = value
            .get("tree")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::UnexpectedResponseShape(format!(
                    "tree: expected an object with a tree array, got {}",
                    json_kind(&value)
                ))
            })?;

        if value.get("truncated").and_then(Value::as_bool).unwrap_or(false) {
            tracing::warn!("Tree listing for {}/{} was truncated", owner, repo);
        }

        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("path").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

/// Turns a non-2xx response into an error carrying the status and body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if (status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS)
        && RateLimiter::is_exhausted(response.headers())
    {
        return Err(Error::RateLimited(RateLimiter::seconds_until_reset(
            response.headers(),
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::UpstreamRequest {
        status: status.as_u16(),
        body,
    })
}
