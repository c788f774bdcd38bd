//! Protected fetching -- replay a stored session against pages behind login.

use crate::analyze::form;
use crate::analyze::resources::{self, PageResources};
use crate::client::WebClient;
use crate::session::store::Session;
use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

// ---- Public types -----------------------------------------------------------

/// A protected page fetched through a session.
#[derive(Debug, Clone)]
pub struct ProtectedDocument {
    /// URL actually fetched, after redirects.
    pub url: String,
    /// Page title, empty when the page has none.
    pub title: String,
    /// HTTP status, passed through whatever it was.
    pub status_code: u16,
    /// Full response body.
    pub html: String,
    /// Script, stylesheet, and form references on the page.
    pub resources: PageResources,
}

// ---- Public API -------------------------------------------------------------

/// Fetch a page through the session's cookies and extract its references.
///
/// Non-2xx statuses are not failures here; the document carries whatever the
/// server answered so the caller can see expired sessions and redirects to
/// login for what they are.
pub async fn fetch_document(
    client: &WebClient,
    session: &Session,
    path: Option<&str>,
) -> Result<ProtectedDocument> {
    let target = resolve_target(&session.final_url, path)?;
    debug!(session = %session.id, target = %target, "fetching protected page");

    let page = client
        .fetch_protected(&target, &session.cookies, &session.final_url)
        .await?;

    let title = form::page_title(&page.body);
    let resources = resources::extract_resources(&page.body, &page.final_url);

    Ok(ProtectedDocument {
        url: page.final_url,
        title,
        status_code: page.status,
        html: page.body,
        resources,
    })
}

/// Resolve the requested path against the session's final URL.
///
/// No path means the final URL itself. Full URLs pass through untouched and
/// absolute paths replace the whole path. Relative paths treat the final URL
/// as a directory: `…/app` plus `settings` is `…/app/settings`, not a sibling.
pub fn resolve_target(final_url: &str, path: Option<&str>) -> Result<String> {
    let path = match path {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(final_url.to_string()),
    };

    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let mut base = Url::parse(final_url)
        .with_context(|| format!("session final URL {final_url} does not parse"))?;

    if !path.starts_with('/') && !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }

    let resolved = base
        .join(path)
        .with_context(|| format!("cannot resolve {path} against {final_url}"))?;
    Ok(resolved.to_string())
}

// ---- Tests ------------------------------------------------------------------
