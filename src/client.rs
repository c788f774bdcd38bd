//! Shared HTTP plumbing -- browser-shaped requests, capped redirects, manual
//! cookie capture and replay.
//!
//! There is deliberately no automatic cookie jar: raw `Set-Cookie` strings are
//! what sessions store and replay, so the client hands them through untouched
//! and only derives the `name=value` parts when building a `Cookie` header.

use anyhow::{bail, Context, Result};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, ORIGIN, REFERER,
    SET_COOKIE, USER_AGENT,
};
use reqwest::Method;
use std::time::Duration;
use url::Url;

// ---- Public types -----------------------------------------------------------

/// User agent presented on every outbound request.
pub const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Timeout for page fetches (login page and protected pages).
const PAGE_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for the form submission, which often chains server-side work.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(20);
/// Redirect chains longer than this abort the request.
const MAX_REDIRECTS: usize = 5;

/// A fetched page with everything later stages care about.
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// URL of the final response, after redirects.
    pub final_url: String,
    /// HTTP status of the final response.
    pub status: u16,
    /// Decoded body text.
    pub body: String,
    /// Raw `Set-Cookie` header values from the final response.
    pub set_cookies: Vec<String>,
    /// All response headers as name-value pairs, in wire order.
    pub headers: Vec<(String, String)>,
}

/// HTTP client shared by the login flow and protected fetches.
#[derive(Debug, Clone)]
pub struct WebClient {
    http: reqwest::Client,
}

impl WebClient {
    /// Build the client: browser default headers, at most [`MAX_REDIRECTS`]
    /// redirects, rustls, no cookie jar.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .default_headers(browser_headers())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// Fetch the login page. A 4xx/5xx final status aborts the attempt.
    pub async fn fetch_login_page(&self, url: &str) -> Result<PageResponse> {
        let resp = self
            .http
            .get(url)
            .timeout(PAGE_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("failed to fetch login page {url}"))?;

        let page = read_response(resp).await?;
        if page.status >= 400 {
            bail!("login page {url} returned status {}", page.status);
        }
        Ok(page)
    }

    /// Submit the login form.
    ///
    /// Statuses under 500 are login answers, including 4xx rejections, and
    /// are returned for classification; 5xx is a transport failure. `Origin`
    /// and `Referer` derive from the page the form came from, and cookies
    /// that page set ride along.
    pub async fn submit_form(
        &self,
        method: &str,
        action: &str,
        payload: &[(String, String)],
        source_url: &str,
        cookies: &[String],
    ) -> Result<PageResponse> {
        let method = Method::from_bytes(method.as_bytes()).unwrap_or(Method::POST);

        let mut req = self
            .http
            .request(method, action)
            .timeout(SUBMIT_TIMEOUT)
            .header(REFERER, source_url)
            .form(payload);
        if let Some(origin) = origin_of(source_url) {
            req = req.header(ORIGIN, origin);
        }
        if !cookies.is_empty() {
            req = req.header(COOKIE, cookie_header(cookies));
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to submit login form to {action}"))?;

        let page = read_response(resp).await?;
        if page.status >= 500 {
            bail!("login submission to {action} returned status {}", page.status);
        }
        Ok(page)
    }

    /// Fetch a page behind the session cookies. Every status comes back to
    /// the caller untouched.
    pub async fn fetch_protected(
        &self,
        url: &str,
        cookies: &[String],
        referer: &str,
    ) -> Result<PageResponse> {
        let mut req = self.http.get(url).timeout(PAGE_TIMEOUT);
        if !referer.is_empty() {
            req = req.header(REFERER, referer);
        }
        if !cookies.is_empty() {
            req = req.header(COOKIE, cookie_header(cookies));
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;
        read_response(resp).await
    }
}

// ---- Private helpers --------------------------------------------------------

/// Headers that make requests look like an ordinary browser navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers
}

/// Join stored cookies into one `Cookie` header value. Only the `name=value`
/// part of each raw `Set-Cookie` string is sent; attributes stay behind.
fn cookie_header(cookies: &[String]) -> String {
    cookies
        .iter()
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// `scheme://host[:port]` of a URL, for the `Origin` header.
fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Drain a response into a [`PageResponse`]. Headers are captured before the
/// body consumes the response.
async fn read_response(resp: reqwest::Response) -> Result<PageResponse> {
    let final_url = resp.url().to_string();
    let status = resp.status().as_u16();

    let set_cookies = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect();

    let headers = resp
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = resp.text().await.context("failed to read response body")?;

    Ok(PageResponse {
        final_url,
        status,
        body,
        set_cookies,
        headers,
    })
}

// ---- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_strips_attributes() {
        let cookies = vec![
            "session_id=abc123; Path=/; HttpOnly".to_string(),
            "csrftoken=xyz789; Secure; SameSite=Strict".to_string(),
            "pref=dark".to_string(),
        ];
        assert_eq!(
            cookie_header(&cookies),
            "session_id=abc123; csrftoken=xyz789; pref=dark"
        );
    }

    #[test]
    fn test_cookie_header_skips_empty_entries() {
        let cookies = vec!["".to_string(), "a=1".to_string(), "; Path=/".to_string()];
        assert_eq!(cookie_header(&cookies), "a=1");
    }

    #[test]
    fn test_origin_of_url() {
        assert_eq!(
            origin_of("https://example.com/login?next=/app").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            origin_of("http://localhost:3000/login").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(origin_of("not a url"), None);
    }
}
