//! Document dispatch integration tests.
//!
//! Tests verify:
//! - Missing HTML documents are created from the template with mode 0600
//! - Existing documents are never overwritten by the template
//! - WebDAV verbs pass straight through to the protocol handler
//! - Filesystem failures surface as 500 with the error text

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use widdler::{create_router, Authenticator, DocumentTemplate, RouterConfig, TenantRegistry};

use super::test_utils::{
    anonymous_router, basic_router, body_string, get, get_as, put, send, BASE_URL,
};

// =============================================================================
// Materialization
// =============================================================================

#[tokio::test]
async fn test_missing_document_created_from_template() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/wiki.html")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    let template = DocumentTemplate::bundled();
    assert_eq!(body.as_bytes(), template.bytes().as_ref());

    let on_disk = std::fs::read(dir.path().join("wiki.html")).unwrap();
    assert_eq!(on_disk, template.bytes().as_ref());
}

#[cfg(unix)]
#[tokio::test]
async fn test_document_is_owner_read_write() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    send(&router, get("/notes.html")).await;

    let mode = std::fs::metadata(dir.path().join("notes.html"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_custom_template() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router(
        TenantRegistry::anonymous(dir.path()),
        Authenticator::none(),
        RouterConfig::new(BASE_URL)
            .with_template(DocumentTemplate::from_static(b"<html>custom</html>"))
            .with_tracing(false),
    );

    let response = send(&router, get("/team.html")).await;
    assert_eq!(body_string(response).await, "<html>custom</html>");
}

#[tokio::test]
async fn test_saved_content_survives_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let first = send(&router, get("/wiki.html")).await;
    assert_eq!(first.status(), StatusCode::OK);

    let saved = send(&router, put("/wiki.html", "<html>saved</html>")).await;
    assert!(saved.status().is_success(), "PUT returned {}", saved.status());

    let second = send(&router, get("/wiki.html")).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_string(second).await, "<html>saved</html>");
}

#[tokio::test]
async fn test_existing_document_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wiki.html"), "<html>mine</html>").unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/wiki.html")).await;
    assert_eq!(body_string(response).await, "<html>mine</html>");
}

#[tokio::test]
async fn test_percent_encoded_document_name() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/My%20Wiki.html")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(dir.path().join("My Wiki.html").is_file());
}

#[tokio::test]
async fn test_encoded_html_suffix_is_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/wiki%2Ehtml")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(dir.path().join("wiki.html").is_file());

    let body = body_string(response).await;
    assert_eq!(body.as_bytes(), DocumentTemplate::bundled().bytes().as_ref());
}

#[tokio::test]
async fn test_encoded_html_suffix_not_writable_through_browse() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    send(&router, get("/wiki.html")).await;
    let saved = send(&router, put("/wiki%2Ehtml", "<html>saved</html>")).await;
    assert!(saved.status().is_success(), "PUT returned {}", saved.status());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("wiki.html")).unwrap(),
        "<html>saved</html>"
    );
}

// =============================================================================
// Protocol Passthrough
// =============================================================================

#[tokio::test]
async fn test_propfind_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let request = Request::builder()
        .method(Method::from_bytes(b"PROPFIND").unwrap())
        .uri("/wiki.html")
        .header("Depth", "0")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    assert!(body_string(response).await.contains("wiki.html"));
}

#[tokio::test]
async fn test_options_advertises_dav() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/wiki.html")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;

    assert!(response.status().is_success());
    assert!(response.headers().get("dav").is_some());
}

#[tokio::test]
async fn test_delete_then_get_recreates() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    send(&router, put("/wiki.html", "<html>old</html>")).await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/wiki.html")
        .body(Body::empty())
        .unwrap();
    let deleted = send(&router, request).await;
    assert!(deleted.status().is_success());

    let response = send(&router, get("/wiki.html")).await;
    let body = body_string(response).await;
    assert_eq!(body.as_bytes(), DocumentTemplate::bundled().bytes().as_ref());
}

// =============================================================================
// Server Errors
// =============================================================================

#[tokio::test]
async fn test_document_in_missing_directory_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let router = anonymous_router(dir.path());

    let response = send(&router, get("/archive/wiki.html")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert!(body_string(response).await.starts_with("Failed to create"));
    assert!(!dir.path().join("archive").exists());
}

#[tokio::test]
async fn test_unusable_serving_root_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("wikis");
    std::fs::write(&not_a_dir, "plain file").unwrap();
    let router = basic_router(&not_a_dir, &[("alice", "secret")]);

    let response = send(&router, get_as("/", "alice", "secret")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.starts_with("Failed to create directory"));
}

// =============================================================================
// Tenant Root
// =============================================================================

#[tokio::test]
async fn test_tenant_root_created_on_first_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = basic_router(dir.path(), &[("alice", "secret")]);
    let root = dir.path().join("alice");
    assert!(!root.exists());

    let response = send(&router, get_as("/", "alice", "secret")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(root.is_dir());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&root).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let router = basic_router(dir.path(), &[("alice", "secret"), ("bob", "hunter2")]);

    send(&router, get_as("/wiki.html", "alice", "secret")).await;
    let request = super::test_utils::request(
        Method::PUT,
        "/wiki.html",
        Some(("alice", "secret")),
        Body::from("<html>alice</html>"),
    );
    send(&router, request).await;

    let response = send(&router, get_as("/wiki.html", "bob", "hunter2")).await;
    let body = body_string(response).await;
    assert_ne!(body, "<html>alice</html>");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("alice").join("wiki.html")).unwrap(),
        "<html>alice</html>"
    );
}
