use futures::stream::{self, Stream, TryStreamExt};
use reqwest::header::LINK;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;

use crate::config::FetchPolicy;
use crate::error::{Error, Result};
use crate::github::client::ensure_success;
use crate::github::rate_limiter::RateLimiter;

/// Walks a paginated GitHub collection by following `rel="next"` links.
#[derive(Clone, Copy)]
pub struct Paginator<'a> {
    client: &'a Client,
    rate_limiter: &'a RateLimiter,
    policy: &'a FetchPolicy,
}

struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a Client, rate_limiter: &'a RateLimiter, policy: &'a FetchPolicy) -> Self {
        Self {
            client,
            rate_limiter,
            policy,
        }
    }

    /// Lazy stream of pages starting at `url`. Each page is requested only
    /// when the previous one has been consumed.
    pub fn pages<T>(self, url: &str) -> impl Stream<Item = Result<Vec<T>>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        let max_pages = self.policy.max_pages;

        stream::try_unfold((Some(url.to_string()), 0usize), move |(cursor, fetched)| async move {
            let Some(url) = cursor else {
                return Ok(None);
            };
            if max_pages.is_some_and(|max| fetched >= max) {
                tracing::warn!(
                    "Stopped after {} pages, results remain at {}",
                    fetched,
                    url
                );
                return Ok(None);
            }
            let page = self.fetch_page::<T>(&url).await?;
            Ok(Some((page.items, (page.next, fetched + 1))))
        })
    }

    /// Every element of the collection, page 1 elements first.
    pub async fn fetch_all<T>(self, url: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + 'a,
    {
        let items: Vec<T> = self.pages(url).try_concat().await?;
        tracing::debug!("Fetched {} items from {}", items.len(), url);
        Ok(items)
    }

    async fn fetch_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        let mut attempt = 0;
        loop {
            match self.request_page(url).await {
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.retry_backoff * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!("Retrying {} in {:?} (attempt {}): {}", url, delay, attempt, e);
                    sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn request_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        self.rate_limiter.wait().await;

        tracing::debug!("Fetching: {}", url);
        let response = self.client.get(url).send().await?;
        self.rate_limiter.observe(response.headers()).await;
        let response = ensure_success(response).await?;

        // GitHub answers 204 for collections of empty repositories
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Page {
                items: Vec::new(),
                next: None,
            });
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);

        let body = response.text().await?;
        let items = parse_items(&body)?;

        Ok(Page { items, next })
    }
}

/// Extracts the `rel="next"` target from a `Link` header value such as
/// `<https://api.github.com/x?page=2>; rel="next", <...>; rel="last"`.
pub fn next_link(header: &str) -> Option<String> {
    link_entries(header).into_iter().find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let target = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });

        is_next.then(|| target.to_string())
    })
}

/// Splits a `Link` header on the commas that separate entries. Commas inside
/// `<...>` belong to the target URL.
fn link_entries(header: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_target = false;
    let mut start = 0;

    for (i, c) in header.char_indices() {
        match c {
            '<' => in_target = true,
            '>' => in_target = false,
            ',' if !in_target => {
                entries.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&header[start..]);
    entries
}

fn parse_items<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::UnexpectedResponseShape(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Array(values) => values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|e| Error::UnexpectedResponseShape(format!("malformed element: {}", e))),
        other => Err(Error::UnexpectedResponseShape(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
