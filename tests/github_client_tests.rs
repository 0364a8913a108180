//! `GitHubClient` against a wiremock server standing in for api.github.com.

use profile_metrics::config::Credential;
use profile_metrics::types::PullState;
use profile_metrics::{Account, FetchError, GitHubApi, GitHubClient, Settings};
use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account() -> Account {
    Account::from_slug("octo/profile").unwrap()
}

fn client(server: &MockServer) -> GitHubClient {
    let mut settings = Settings::new(account(), "metrics");
    settings.credential = Some(Credential::new("test-token"));
    settings.api_url = Some(server.uri());
    GitHubClient::new(&settings).expect("client should build")
}

#[tokio::test]
async fn test_lists_repositories_with_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/octo/repos"))
        .and(query_param("per_page", "5"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "alpha",
                "created_at": "2023-05-01T00:00:00Z",
                "pushed_at": "2025-01-05T00:00:00Z",
                "stargazers_count": 7,
                "topics": ["cli"]
            },
            { "name": "beta", "created_at": "2024-02-01T00:00:00Z", "pushed_at": null }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let repos = client(&server)
        .list_repositories(&account(), 5)
        .await
        .unwrap();

    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].name, "alpha");
    assert_eq!(repos[0].stargazers_count, 7);
    assert_eq!(repos[0].topics.as_deref(), Some(&["cli".to_string()][..]));
    assert!(repos[1].pushed_at.is_none());
    assert_eq!(repos[1].last_activity(), repos[1].created_at);
}

#[tokio::test]
async fn test_repeated_requests_are_memoized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/alpha/commits"))
        .and(query_param("per_page", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "sha": "abc",
                "commit": { "message": "Initial", "author": { "date": "2025-01-01T00:00:00Z" } }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let first = client.list_commits(&account(), "alpha", None).await.unwrap();
    let second = client.list_commits(&account(), "alpha", None).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second[0].sha, "abc");
}

#[tokio::test]
async fn test_distinct_queries_are_cached_separately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/alpha/pulls"))
        .and(query_param("state", "closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "number": 1, "state": "closed", "created_at": "2025-01-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/alpha/pulls"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "number": 1, "state": "closed", "created_at": "2025-01-01T00:00:00Z" },
            { "number": 2, "state": "open", "created_at": "2025-01-02T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let closed = client
        .list_pulls(&account(), "alpha", PullState::Closed)
        .await
        .unwrap();
    let all = client
        .list_pulls(&account(), "alpha", PullState::All)
        .await
        .unwrap();

    assert_eq!(closed.len(), 1);
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_missing_followers_is_a_shape_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/octo"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "login": "octo", "following": 2 })),
        )
        .mount(&server)
        .await;

    let err = client(&server).get_user(&account()).await.unwrap_err();

    assert!(matches!(err, FetchError::Shape { .. }));
    assert_eq!(err.route(), "/users/octo");
    assert!(err.to_string().contains("followers"));
}

#[tokio::test]
async fn test_not_found_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/missing/languages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .list_languages(&account(), "missing")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }));
    assert_eq!(err.route(), "/repos/octo/missing/languages");
}

#[tokio::test]
async fn test_topics_and_workflow_runs_unwrap_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/alpha/topics"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "names": ["hackathon", "rust"] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/alpha/actions/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "workflow_runs": [{ "event": "push", "conclusion": "failure" }]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let topics = client.list_topics(&account(), "alpha").await.unwrap();
    let runs = client.list_workflow_runs(&account(), "alpha").await.unwrap();

    assert_eq!(topics, vec!["hackathon", "rust"]);
    assert_eq!(runs.len(), 1);
    assert!(runs[0].failed());
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/octo/repos"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .list_repositories(&account(), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }));
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_branch_commits_pass_sha_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/alpha/commits"))
        .and(query_param("sha", "dev"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "sha": "d1",
                "commit": { "message": "Dev work", "author": { "date": "2025-01-03T00:00:00Z" } }
            },
            {
                "sha": "d2",
                "commit": { "message": "More dev work", "author": { "date": "2025-01-04T00:00:00Z" } }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let commits = client(&server)
        .list_commits(&account(), "alpha", Some("dev"))
        .await
        .unwrap();

    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].sha, "d1");
}
