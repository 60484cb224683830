use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::github::client::GitHubClient;
use crate::models::{CommitRecord, Contributor, IssueRecord, Repository};

/// Raw per-repository collections the analyzer needs.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn repository(&self, owner: &str, repo: &str) -> Result<Repository>;
    async fn languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>>;
    async fn commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRecord>>;
    async fn contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>>;
    async fn issues(&self, owner: &str, repo: &str) -> Result<Vec<IssueRecord>>;
    async fn tree_paths(&self, owner: &str, repo: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        GitHubClient::repository(self, owner, repo).await
    }

    async fn languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>> {
        GitHubClient::languages(self, owner, repo).await
    }

    async fn commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRecord>> {
        GitHubClient::commits(self, owner, repo).await
    }

    async fn contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        GitHubClient::contributors(self, owner, repo).await
    }

    async fn issues(&self, owner: &str, repo: &str) -> Result<Vec<IssueRecord>> {
        GitHubClient::issues(self, owner, repo).await
    }

    async fn tree_paths(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        GitHubClient::tree_paths(self, owner, repo).await
    }
}
