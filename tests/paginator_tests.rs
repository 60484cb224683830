use devscore::github::{Paginator, RateLimiter};
use devscore::{Error, FetchPolicy};
use futures::StreamExt;
use mockito::{Matcher, Server};
use reqwest::Client;
use serde_json::Value;

fn unthrottled() -> RateLimiter {
    RateLimiter::new(0)
}

#[tokio::test]
async fn test_single_page_without_link_header() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/items")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1}, {"id": 2}]"#)
        .expect(1)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let items: Vec<Value> = Paginator::new(&client, &limiter, &policy)
        .fetch_all(&format!("{}/items", server.url()))
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 1);
    page.assert_async().await;
}

#[tokio::test]
async fn test_follows_next_links_in_order() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let first = server
        .mock("GET", "/items")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_header(
            "link",
            &format!(r#"<{}/items?page=2>; rel="next", <{}/items?page=2>; rel="last""#, base, base),
        )
        .with_body("[1, 2, 3]")
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/items")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_header("link", &format!(r#"<{}/items?page=1>; rel="prev""#, base))
        .with_body("[4, 5]")
        .expect(1)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let items: Vec<u32> = Paginator::new(&client, &limiter, &policy)
        .fetch_all(&format!("{}/items?page=1", base))
        .await
        .unwrap();

    assert_eq!(items, vec![1, 2, 3, 4, 5]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_pages_are_requested_lazily() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let _first = server
        .mock("GET", "/items")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_header("link", &format!(r#"<{}/items?page=2>; rel="next""#, base))
        .with_body("[1]")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/items")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body("[2]")
        .expect(0)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let pages = Paginator::new(&client, &limiter, &policy).pages::<u32>(&format!("{}/items?page=1", base));
    futures::pin_mut!(pages);

    let first_page = pages.next().await.unwrap().unwrap();
    assert_eq!(first_page, vec![1]);
    second.assert_async().await;
}

#[tokio::test]
async fn test_default_policy_follows_every_page() {
    let mut server = Server::new_async().await;
    let base = server.url();
    let last_page = 14;

    let mut mocks = Vec::new();
    for page in 1..=last_page {
        let mut mock = server
            .mock("GET", "/commits")
            .match_query(Matcher::UrlEncoded("page".into(), page.to_string()))
            .with_status(200)
            .with_body(format!("[{}]", page));
        if page < last_page {
            mock = mock.with_header(
                "link",
                &format!(r#"<{}/commits?page={}>; rel="next""#, base, page + 1),
            );
        }
        mocks.push(mock.expect(1).create_async().await);
    }

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let items: Vec<u32> = Paginator::new(&client, &limiter, &policy)
        .fetch_all(&format!("{}/commits?page=1", base))
        .await
        .unwrap();

    assert_eq!(items, (1..=last_page).collect::<Vec<u32>>());
    for mock in &mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_max_pages_caps_the_walk() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let _looping = server
        .mock("GET", "/items")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("link", &format!(r#"<{}/items?page=next>; rel="next""#, base))
        .with_body("[7]")
        .expect(3)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy {
        max_pages: Some(3),
        ..FetchPolicy::default()
    };
    let items: Vec<u32> = Paginator::new(&client, &limiter, &policy)
        .fetch_all(&format!("{}/items", base))
        .await
        .unwrap();

    assert_eq!(items, vec![7, 7, 7]);
}

#[tokio::test]
async fn test_non_success_status_carries_body() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/items")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let err = Paginator::new(&client, &limiter, &policy)
        .fetch_all::<Value>(&format!("{}/items", server.url()))
        .await
        .unwrap_err();

    match err {
        Error::UpstreamRequest { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("Not Found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_object_body_is_rejected() {
    let mut server = Server::new_async().await;
    let _object = server
        .mock("GET", "/items")
        .with_status(200)
        .with_body(r#"{"total_count": 0, "items": []}"#)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let err = Paginator::new(&client, &limiter, &policy)
        .fetch_all::<Value>(&format!("{}/items", server.url()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedResponseShape(_)));
}

#[tokio::test]
async fn test_exhausted_rate_limit_is_reported() {
    let mut server = Server::new_async().await;
    let _limited = server
        .mock("GET", "/items")
        .with_status(403)
        .with_header("x-ratelimit-remaining", "0")
        .with_header("x-ratelimit-reset", "1")
        .with_body(r#"{"message": "API rate limit exceeded"}"#)
        .create_async()
        .await;

    let client = Client::new();
    let limiter = unthrottled();
    let policy = FetchPolicy::default();
    let err = Paginator::new(&client, &limiter, &policy)
        .fetch_all::<Value>(&format!("{}/items", server.url()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RateLimited(0)));
}
