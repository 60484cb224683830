use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::{self, AbortHandle, JoinSet};

use crate::analysis::commits::CommitPatternAnalyzer;
use crate::analysis::documentation::{language_breakdown, DocumentationScorer};
use crate::analysis::scoring::ScoringEngine;
use crate::analysis::tree_signals::TreeSignals;
use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::github::RepositorySource;
use crate::models::{
    CodeQualitySummary, CollaborationSummary, CommitRecord, Contributor, IssueRecord, Repository,
    RepositoryAnalysis,
};

/// Raw collections fetched for one repository.
pub struct RawRepositoryData {
    pub repository: Repository,
    pub languages: HashMap<String, u64>,
    pub commits: Vec<CommitRecord>,
    pub contributors: Vec<Contributor>,
    pub issues: Vec<IssueRecord>,
    pub tree: TreeSignals,
}

#[derive(Clone)]
pub struct RepositoryAnalyzer {
    source: Arc<dyn RepositorySource>,
    commit_analyzer: CommitPatternAnalyzer,
    documentation: DocumentationScorer,
    scoring: ScoringEngine,
    config: AnalyzerConfig,
}

impl RepositoryAnalyzer {
    pub fn new(source: impl RepositorySource + 'static, config: AnalyzerConfig) -> Self {
        Self::with_source(Arc::new(source), config)
    }

    pub fn with_source(source: Arc<dyn RepositorySource>, config: AnalyzerConfig) -> Self {
        Self {
            source,
            commit_analyzer: CommitPatternAnalyzer::new(config.window_months),
            documentation: DocumentationScorer::new(),
            scoring: ScoringEngine::new(),
            config,
        }
    }

    pub async fn analyze(&self, owner: &str, repo: &str) -> Result<RepositoryAnalysis> {
        tracing::info!("Analyzing {}/{}", owner, repo);
        let raw = self.fetch(owner, repo).await?;
        let analysis = self.assemble(owner, raw, Utc::now());
        tracing::info!(
            "Scored {}/{}: quality {}, collaboration {}, consistency {}",
            owner,
            repo,
            analysis.scores.code_quality,
            analysis.scores.collaboration,
            analysis.scores.consistency
        );
        Ok(analysis)
    }

    /// Fetches every collection concurrently. The tree is optional; any other
    /// failure fails the whole fetch.
    pub async fn fetch(&self, owner: &str, repo: &str) -> Result<RawRepositoryData> {
        let source = self.source.as_ref();
        let tree = async { Ok::<_, Error>(TreeSignals::from_listing(source.tree_paths(owner, repo).await)) };

        let (repository, languages, commits, contributors, issues, tree) = tokio::try_join!(
            source.repository(owner, repo),
            source.languages(owner, repo),
            source.commits(owner, repo),
            source.contributors(owner, repo),
            source.issues(owner, repo),
            tree,
        )?;

        Ok(RawRepositoryData {
            repository,
            languages,
            commits,
            contributors,
            issues,
            tree,
        })
    }

    /// Turns raw collections into a scored analysis. Pure.
    pub fn assemble(&self, owner: &str, raw: RawRepositoryData, now: DateTime<Utc>) -> RepositoryAnalysis {
        let account = self
            .config
            .username
            .clone()
            .unwrap_or_else(|| owner.to_string());

        let languages = language_breakdown(&raw.languages);
        let commits = self.commit_analyzer.summarize_at(&raw.commits, &account, now);

        let pull_requests = raw.issues.iter().filter(|i| i.is_pull_request()).count() as u32;
        let collaboration = CollaborationSummary::new(
            raw.contributors.len() as u32,
            raw.issues.len() as u32 - pull_requests,
            pull_requests,
        );

        let code_quality = CodeQualitySummary {
            has_readme: raw.tree.has_readme,
            has_license: raw.tree.has_license,
            has_tests: raw.tree.has_tests,
            documentation_score: self.documentation.score(&languages),
        };

        let scores = self.scoring.score(&code_quality, &collaboration, &commits);

        RepositoryAnalysis {
            account,
            owner: owner.to_string(),
            repository_name: raw.repository.name,
            repository_url: raw.repository.html_url,
            description: raw.repository.description,
            primary_language: raw.repository.language,
            stars: raw.repository.stargazers_count,
            forks: raw.repository.forks_count,
            languages,
            commits,
            collaboration,
            code_quality,
            scores,
            analyzed_at: now,
        }
    }

    /// Starts one task per repository, at most `concurrency_limit` running at once.
    pub fn spawn_batch(&self, owner: &str, repos: &[String]) -> AnalysisBatch {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit.max(1)));
        let progress = ProgressBar::new(repos.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
        {
            progress.set_style(style.progress_chars("#>-"));
        }

        let mut tasks = JoinSet::new();
        let mut handles = HashMap::new();
        let mut names = HashMap::new();
        let mut order = Vec::new();

        for repo in repos {
            if handles.contains_key(repo) {
                continue;
            }
            let analyzer = self.clone();
            let sem = semaphore.clone();
            let owner = owner.to_string();
            let name = repo.clone();
            let pb = progress.clone();

            let handle = tasks.spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                let result = analyzer.analyze(&owner, &name).await;
                pb.inc(1);
                (name, result)
            });

            names.insert(handle.id(), repo.clone());
            handles.insert(repo.clone(), handle);
            order.push(repo.clone());
        }

        AnalysisBatch {
            tasks,
            canceller: BatchCanceller {
                handles: Arc::new(handles),
                cancelled: Arc::new(Mutex::new(HashSet::new())),
            },
            names,
            order,
            progress,
        }
    }
}

/// In-flight analyses started by `RepositoryAnalyzer::spawn_batch`.
pub struct AnalysisBatch {
    tasks: JoinSet<(String, Result<RepositoryAnalysis>)>,
    canceller: BatchCanceller,
    names: HashMap<task::Id, String>,
    order: Vec<String>,
    progress: ProgressBar,
}

/// Aborts analyses of a running batch. Cheap to clone and send to other tasks.
///
/// A cancelled repository is left out of the outcome even if its task had
/// already finished.
#[derive(Clone)]
pub struct BatchCanceller {
    handles: Arc<HashMap<String, AbortHandle>>,
    cancelled: Arc<Mutex<HashSet<String>>>,
}

impl BatchCanceller {
    /// Returns false if the repository is not part of the batch.
    pub fn cancel(&self, repo: &str) -> bool {
        match self.handles.get(repo) {
            Some(handle) => {
                tracing::info!("Cancelling analysis of {}", repo);
                self.mark(repo);
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (repo, handle) in self.handles.iter() {
            self.mark(repo);
            handle.abort();
        }
    }

    pub fn is_cancelled(&self, repo: &str) -> bool {
        self.cancelled_set().contains(repo)
    }

    fn mark(&self, repo: &str) {
        self.cancelled_set().insert(repo.to_string());
    }

    fn cancelled_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.cancelled.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Completed analyses in the order the repositories were requested.
    pub analyses: Vec<RepositoryAnalysis>,
    /// Failed analyses, including tasks that panicked.
    pub failures: Vec<(String, Error)>,
    /// Repositories cancelled before the batch was joined.
    pub cancelled: Vec<String>,
}

impl AnalysisBatch {
    pub fn canceller(&self) -> BatchCanceller {
        self.canceller.clone()
    }

    pub fn cancel(&self, repo: &str) -> bool {
        self.canceller.cancel(repo)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub async fn join(mut self) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut completed = Vec::new();

        while let Some(joined) = self.tasks.join_next_with_id().await {
            match joined {
                Ok((_, (name, _))) if self.canceller.is_cancelled(&name) => {}
                Ok((_, (name, Ok(analysis)))) => completed.push((name, analysis)),
                Ok((_, (name, Err(e)))) => {
                    tracing::warn!("Analysis of {} failed: {}", name, e);
                    outcome.failures.push((name, e));
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => match self.names.get(&e.id()) {
                    Some(name) if !self.canceller.is_cancelled(name) => {
                        tracing::error!("Analysis task for {} panicked: {}", name, e);
                        outcome.failures.push((name.clone(), Error::from(e)));
                    }
                    _ => {}
                },
            }
        }
        self.progress.finish_and_clear();

        let position: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        completed.sort_by_key(|(name, _)| position.get(name.as_str()).copied());
        outcome.analyses = completed.into_iter().map(|(_, analysis)| analysis).collect();

        outcome.cancelled = self
            .order
            .iter()
            .filter(|name| self.canceller.is_cancelled(name))
            .cloned()
            .collect();

        outcome
    }
}
