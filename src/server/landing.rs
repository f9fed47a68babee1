//! Landing page shown when a tenant's workspace is empty.

/// Document name suggested on the landing page.
pub const LANDING_DOCUMENT: &str = "wiki.html";

/// Escape HTML special characters to prevent XSS attacks.
pub(crate) fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Render the landing page.
///
/// # Arguments
///
/// * `username` - Authenticated user for the greeting, `None` when anonymous
/// * `base_url` - Site base URL (e.g., "https://wiki.example.com")
pub fn render_landing(username: Option<&str>, base_url: &str) -> String {
    let greeting = match username {
        Some(user) if !user.is_empty() => format!("Hello {}!", html_escape(user)),
        _ => "Hello!".to_string(),
    };
    let url = html_escape(&format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        LANDING_DOCUMENT
    ));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>widdler</title>
</head>
<body>
<h1>{greeting} Welcome to widdler!</h1>

<p>To create a new wiki, simply append an html file name to the URL in the address bar!</p>

<h3>For example:</h3>

<a href="{url}">{url}</a>

<p>This will create a new wiki called "<b>{LANDING_DOCUMENT}</b>".</p>

<p>After creating a wiki, this message will be replaced by a list of your wiki files.</p>
</body>
</html>
"#
    )
}
