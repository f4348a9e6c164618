//! `UnsplashClient` against a local stand-in for the search endpoint.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::{HeaderMap, StatusCode, Uri};
use serde_json::json;
use tokio::net::TcpListener;
use xiuxian_core::error::ImageLookupError;
use xiuxian_core::image::ImageSearch;
use xiuxian_unsplash::UnsplashClient;

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    query: String,
    authorization: Option<String>,
}

async fn serve(status: StatusCode, reply: String) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap| {
        let recorder = Arc::clone(&recorder);
        let reply = reply.clone();
        async move {
            recorder.lock().unwrap().push(Captured {
                path: uri.path().to_owned(),
                query: uri.query().unwrap_or_default().to_owned(),
                authorization: headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned),
            });
            (status, reply)
        }
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

#[tokio::test]
async fn test_search_returns_regular_urls() {
    // Arrange
    let reply = json!({
        "total": 2,
        "results": [
            { "id": "a", "urls": { "regular": "https://images.unsplash.com/a", "small": "s" } },
            { "id": "b", "urls": { "regular": "https://images.unsplash.com/b" } }
        ]
    });
    let (base_url, seen) = serve(StatusCode::OK, reply.to_string()).await;
    let client = UnsplashClient::new("access").with_base_url(base_url);

    // Act
    let urls = client.search("golden light", 10).await.unwrap();

    // Assert
    assert_eq!(
        urls,
        vec!["https://images.unsplash.com/a", "https://images.unsplash.com/b"]
    );
    let captured = seen.lock().unwrap().clone();
    assert_eq!(captured[0].path, "/search/photos");
    assert_eq!(captured[0].authorization.as_deref(), Some("Client-ID access"));
    assert!(captured[0].query.contains("query=golden+light"));
    assert!(captured[0].query.contains("per_page=10"));
    assert!(captured[0].query.contains("orientation=landscape"));
}

#[tokio::test]
async fn test_no_match_is_an_empty_list() {
    let (base_url, _) = serve(StatusCode::OK, json!({ "total": 0, "results": [] }).to_string()).await;
    let client = UnsplashClient::new("access").with_base_url(base_url);

    let urls = client.search("nothing", 10).await.unwrap();

    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_per_page_is_capped() {
    let (base_url, seen) = serve(StatusCode::OK, json!({ "results": [] }).to_string()).await;
    let client = UnsplashClient::new("access").with_base_url(base_url);

    client.search("mountain", 100).await.unwrap();

    assert!(seen.lock().unwrap()[0].query.contains("per_page=30"));
}

#[tokio::test]
async fn test_error_status_is_upstream_failure() {
    let (base_url, _) = serve(StatusCode::UNAUTHORIZED, "OAuth error: The access token is invalid".to_owned()).await;
    let client = UnsplashClient::new("wrong").with_base_url(base_url);

    let error = client.search("mountain", 10).await.unwrap_err();

    assert!(matches!(error, ImageLookupError::Upstream(message) if message.starts_with("status 401")));
}

#[tokio::test]
async fn test_blank_key_fails_without_a_request() {
    let (base_url, seen) = serve(StatusCode::OK, String::new()).await;
    let client = UnsplashClient::new("").with_base_url(base_url);

    let error = client.search("mountain", 10).await.unwrap_err();

    assert_eq!(error, ImageLookupError::MissingCredential);
    assert!(seen.lock().unwrap().is_empty());
}
