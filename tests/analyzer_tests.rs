use chrono::Utc;
use devscore::github::RateLimiter;
use devscore::{AnalyzerConfig, Error, GitHubClient, RepositoryAnalyzer};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

fn client(server: &ServerGuard) -> GitHubClient {
    GitHubClient::with_base_url("test-token", &server.url())
        .unwrap()
        .with_rate_limiter(RateLimiter::new(0))
}

async fn mock_json(server: &mut ServerGuard, path: &str, status: usize, body: serde_json::Value) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

/// Mocks stay registered only while alive.
async fn mock_repository(server: &mut ServerGuard, tree_status: usize) -> Vec<Mock> {
    let now = Utc::now().to_rfc3339();
    let mut mocks = Vec::new();

    mocks.push(mock_json(
        server,
        "/repos/alice/demo",
        200,
        json!({
            "id": 7,
            "name": "demo",
            "full_name": "alice/demo",
            "html_url": "https://github.com/alice/demo",
            "description": "A demo",
            "language": "Rust",
            "stargazers_count": 12,
            "forks_count": 3,
            "created_at": "2023-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "owner": { "login": "alice" }
        }),
    )
    .await);
    mocks.push(mock_json(
        server,
        "/repos/alice/demo/languages",
        200,
        json!({ "Rust": 900, "Markdown": 100 }),
    )
    .await);
    mocks.push(mock_json(
        server,
        "/repos/alice/demo/commits",
        200,
        json!([
            {
                "sha": "a1",
                "commit": { "message": "one", "author": { "name": "Alice", "email": "a@x", "date": now } },
                "author": { "login": "alice" }
            },
            {
                "sha": "b2",
                "commit": { "message": "two", "author": { "name": "Bob", "email": "b@x", "date": now } },
                "author": { "login": "bob" }
            },
            {
                "sha": "c3",
                "commit": { "message": "three", "author": { "name": "Alice", "email": "a@y", "date": now } },
                "author": null
            }
        ]),
    )
    .await);
    mocks.push(mock_json(
        server,
        "/repos/alice/demo/contributors",
        200,
        json!([
            { "login": "alice", "contributions": 2 },
            { "login": "bob", "contributions": 1 }
        ]),
    )
    .await);
    mocks.push(mock_json(
        server,
        "/repos/alice/demo/issues",
        200,
        json!([
            { "number": 1 },
            { "number": 2, "pull_request": { "url": "https://api.github.com/x" } }
        ]),
    )
    .await);

    let tree = if tree_status == 200 {
        json!({
            "sha": "HEAD",
            "tree": [
                { "path": "README.md", "type": "blob" },
                { "path": "LICENSE", "type": "blob" },
                { "path": "src/lib.rs", "type": "blob" },
                { "path": "tests", "type": "tree" },
                { "path": "tests/smoke.rs", "type": "blob" }
            ],
            "truncated": false
        })
    } else {
        json!({ "message": "Git Repository is empty." })
    };
    mocks.push(mock_json(server, "/repos/alice/demo/git/trees/HEAD", tree_status, tree).await);
    mocks
}

#[tokio::test]
async fn test_analyze_repository_end_to_end() {
    let mut server = Server::new_async().await;
    let _demo = mock_repository(&mut server, 200).await;

    let analyzer = RepositoryAnalyzer::new(client(&server), AnalyzerConfig::default());
    let analysis = analyzer.analyze("alice", "demo").await.unwrap();

    assert_eq!(analysis.key(), "alice/demo");
    assert_eq!(analysis.account, "alice");
    assert_eq!(analysis.stars, 12);
    assert_eq!(analysis.forks, 3);

    assert_eq!(analysis.commits.total, 3);
    assert_eq!(analysis.commits.user_commits, 1);
    assert_eq!(analysis.commits.by_month.len(), 12);
    assert_eq!(analysis.commits.by_month[11].commits, 3);

    assert_eq!(analysis.collaboration.contributors, 2);
    assert_eq!(analysis.collaboration.issues, 1);
    assert_eq!(analysis.collaboration.pull_requests, 1);

    assert!(analysis.code_quality.has_readme);
    assert!(analysis.code_quality.has_license);
    assert!(analysis.code_quality.has_tests);
    // Base plus Markdown, no mainstream-language bonus for Rust
    assert_eq!(analysis.code_quality.documentation_score, 80);

    assert_eq!(analysis.languages[0].name, "Rust");
    assert_eq!(analysis.languages[0].percentage, 90);

    // 25 + 20 + 30 + round(80 * 0.25)
    assert_eq!(analysis.scores.code_quality, 95);
    // 30 + 20 (contributors) + 20 (PRs) + 10 (issues)
    assert_eq!(analysis.scores.collaboration, 80);
}

#[tokio::test]
async fn test_tree_failure_means_no_tests() {
    let mut server = Server::new_async().await;
    let _demo = mock_repository(&mut server, 409).await;

    let analyzer = RepositoryAnalyzer::new(client(&server), AnalyzerConfig::default());
    let analysis = analyzer.analyze("alice", "demo").await.unwrap();

    assert!(!analysis.code_quality.has_tests);
    assert!(!analysis.code_quality.has_readme);
    assert_eq!(analysis.scores.code_quality, 20);
}

#[tokio::test]
async fn test_missing_repository() {
    let mut server = Server::new_async().await;
    let mut mocks = vec![];
    mocks.push(mock_json(
        &mut server,
        "/repos/alice/gone",
        404,
        json!({ "message": "Not Found" }),
    )
    .await);
    for path in [
        "/repos/alice/gone/languages",
        "/repos/alice/gone/commits",
        "/repos/alice/gone/contributors",
        "/repos/alice/gone/issues",
        "/repos/alice/gone/git/trees/HEAD",
    ] {
        mocks.push(mock_json(&mut server, path, 404, json!({ "message": "Not Found" })).await);
    }

    let err = client(&server).repository("alice", "gone").await.unwrap_err();
    assert!(matches!(err, Error::RepoNotFound(ref name) if name == "alice/gone"));

    let analyzer = RepositoryAnalyzer::new(client(&server), AnalyzerConfig::default());
    assert!(analyzer.analyze("alice", "gone").await.is_err());
}

#[tokio::test]
async fn test_owned_repositories_skip_forks() {
    let mut server = Server::new_async().await;
    let repo = |name: &str, fork: bool| {
        json!({
            "id": 1,
            "name": name,
            "full_name": format!("alice/{}", name),
            "html_url": format!("https://github.com/alice/{}", name),
            "description": null,
            "language": null,
            "stargazers_count": 0,
            "forks_count": 0,
            "fork": fork,
            "created_at": "2023-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "owner": { "login": "alice" }
        })
    };
    let _repos = mock_json(
        &mut server,
        "/user/repos",
        200,
        json!([repo("mine", false), repo("borrowed", true)]),
    )
    .await;

    let repos = client(&server).owned_repositories().await.unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].name, "mine");
}

#[tokio::test]
async fn test_batch_collects_successes_and_failures() {
    let mut server = Server::new_async().await;
    let _demo = mock_repository(&mut server, 200).await;
    let mut mocks = vec![];
    mocks.push(mock_json(
        &mut server,
        "/repos/alice/broken",
        500,
        json!({ "message": "Server Error" }),
    )
    .await);
    for path in [
        "/repos/alice/broken/languages",
        "/repos/alice/broken/commits",
        "/repos/alice/broken/contributors",
        "/repos/alice/broken/issues",
        "/repos/alice/broken/git/trees/HEAD",
    ] {
        mocks.push(mock_json(&mut server, path, 500, json!({ "message": "Server Error" })).await);
    }

    let analyzer = RepositoryAnalyzer::new(client(&server), AnalyzerConfig::default());
    let batch = analyzer.spawn_batch("alice", &["demo".to_string(), "broken".to_string()]);
    assert_eq!(batch.len(), 2);

    let outcome = batch.join().await;
    assert_eq!(outcome.analyses.len(), 1);
    assert_eq!(outcome.analyses[0].repository_name, "demo");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "broken");
    assert!(outcome.cancelled.is_empty());
}
