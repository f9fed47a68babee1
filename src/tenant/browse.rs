//! Read-only directory browsing for non-document paths.
//!
//! Directories are rendered as a plain HTML index of their direct entries;
//! everything else is handed to tower-http's `ServeDir`, which takes care of
//! content types, ranges and conditional requests.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tokio::fs;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::error::DispatchError;
use crate::server::landing::html_escape;

use super::resolve_path;

/// Directory-listing capability bound to a tenant root.
#[derive(Clone)]
pub struct DirectoryBrowser {
    root: PathBuf,
    hidden: Vec<String>,
    files: ServeDir,
}

impl DirectoryBrowser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let files = ServeDir::new(&root).append_index_html_on_directories(false);
        Self {
            root,
            hidden: Vec::new(),
            files,
        }
    }

    /// Leave entries with this exact name out of listings.
    pub fn hide(mut self, name: impl Into<String>) -> Self {
        self.hidden.push(name.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_hidden(&self, name: &str) -> bool {
        self.hidden.iter().any(|h| h == name)
    }

    /// Names of the visible direct entries of the root, sorted.
    pub async fn visible_entries(&self) -> std::io::Result<Vec<String>> {
        self.list(&self.root)
            .await
            .map(|entries| entries.into_iter().map(|(name, _)| name).collect())
    }

    /// `(name, is_dir)` for every visible entry of `dir`, sorted by name.
    async fn list(&self, dir: &Path) -> std::io::Result<Vec<(String, bool)>> {
        let mut reader = fs::read_dir(dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_hidden(&name) {
                continue;
            }
            let is_dir = entry.file_type().await?.is_dir();
            entries.push((name, is_dir));
        }

        entries.sort();
        Ok(entries)
    }

    /// Serve a browse request below the root.
    pub async fn serve(&self, request: Request) -> Result<Response, DispatchError> {
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return Ok((
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, HeaderValue::from_static("GET, HEAD"))],
            )
                .into_response());
        }

        let uri_path = request.uri().path().to_string();
        let Some(target) = resolve_path(&self.root, &uri_path) else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let is_dir = match fs::metadata(&target).await {
            Ok(metadata) => metadata.is_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(source) => {
                return Err(DispatchError::Browse {
                    path: target,
                    source,
                })
            }
        };

        if !is_dir {
            let response = match self.files.clone().oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            return Ok(response.map(Body::new));
        }

        if !uri_path.ends_with('/') {
            let location = format!("{}/", uri_path);
            return Ok(redirect(StatusCode::MOVED_PERMANENTLY, &location));
        }

        let entries = self
            .list(&target)
            .await
            .map_err(|source| DispatchError::ListDirectory {
                path: target.clone(),
                source,
            })?;

        Ok(Html(render_listing(&uri_path, &entries)).into_response())
    }
}

/// Build a redirect response with a `Location` header.
pub(crate) fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn render_listing(uri_path: &str, entries: &[(String, bool)]) -> String {
    let title = html_escape(&urlencoding::decode(uri_path).unwrap_or_else(|_| uri_path.into()));

    let mut items = String::new();
    for (name, is_dir) in entries {
        let suffix = if *is_dir { "/" } else { "" };
        items.push_str(&format!(
            "<a href=\"{}{}\">{}{}</a>\n",
            urlencoding::encode(name),
            suffix,
            html_escape(name),
            suffix
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width">
<title>Index of {title}</title>
</head>
<body>
<h1>Index of {title}</h1>
<pre>
{items}</pre>
</body>
</html>
"#
    )
}
