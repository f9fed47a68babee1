//! Browse branch integration tests.
//!
//! Tests verify:
//! - An empty workspace shows the landing page with a single wiki link
//! - A non-empty workspace is listed instead
//! - The root redirects to index.html when one exists
//! - Plain files are served and write methods are refused

use axum::body::Body;
use axum::http::{header, Method, StatusCode};

use super::test_utils::{
    anonymous_router, anonymous_router_hiding, basic_router, body_string, get, get_as, request,
    send,
};

// =============================================================================
// Landing Page
// =============================================================================

#[tokio::test]
async fn test_empty_workspace_shows_landing_page() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = body_string(response).await;
    assert_eq!(body.matches("<a href=").count(), 1);
    assert!(body.contains("<a href=\"http://localhost:8080/wiki.html\">"));
    assert!(body.contains("Hello! Welcome to widdler!"));
}

#[tokio::test]
async fn test_landing_page_greets_user() {
    let dir = tempfile::tempdir().unwrap();
    let router = basic_router(dir.path(), &[("alice", "secret")]);

    let response = send(&router, get_as("/", "alice", "secret")).await;
    let body = body_string(response).await;
    assert!(body.contains("Hello alice!"));
}

#[tokio::test]
async fn test_landing_page_replaced_by_listing() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let before = body_string(send(&router, get("/")).await).await;
    assert!(before.contains("Welcome to widdler"));

    let created = send(&router, get("/wiki.html")).await;
    assert_eq!(created.status(), StatusCode::OK);

    let after = body_string(send(&router, get("/")).await).await;
    assert!(!after.contains("Welcome to widdler"));
    assert!(after.contains("<a href=\"wiki.html\">wiki.html</a>"));
}

#[tokio::test]
async fn test_credentials_file_does_not_count_as_content() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".htpasswd"), "alice:$2b$04$x").unwrap();
    let router = anonymous_router_hiding(dir.path(), ".htpasswd");

    let landing = body_string(send(&router, get("/")).await).await;
    assert!(landing.contains("Welcome to widdler"));

    send(&router, get("/wiki.html")).await;
    let listing = body_string(send(&router, get("/")).await).await;
    assert!(listing.contains("wiki.html"));
    assert!(!listing.contains("htpasswd"));
}

// =============================================================================
// Index Redirect
// =============================================================================

#[tokio::test]
async fn test_root_redirects_to_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>home</html>").unwrap();
    std::fs::write(dir.path().join("other.html"), "<html></html>").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/")).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/index.html"
    );
}

#[tokio::test]
async fn test_root_lists_without_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("other.html"), "<html></html>").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("other.html"));
}

#[tokio::test]
async fn test_subdirectory_with_index_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("archive")).unwrap();
    std::fs::write(dir.path().join("archive").join("index.html"), "").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/archive/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("index.html"));
}

// =============================================================================
// Files
// =============================================================================

#[tokio::test]
async fn test_plain_file_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "remember the milk").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/notes.txt")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "remember the milk");
}

#[tokio::test]
async fn test_missing_plain_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wiki.html"), "").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/missing.txt")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!dir.path().join("missing.txt").exists());
}

#[tokio::test]
async fn test_write_to_browse_path_refused() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wiki.html"), "").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(
        &router,
        request(Method::PUT, "/notes.txt", None, Body::from("x")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(!dir.path().join("notes.txt").exists());
}
