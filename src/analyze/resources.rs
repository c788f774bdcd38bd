//! Resource extraction -- scripts, stylesheets, and forms referenced by a page.
//!
//! Used on protected pages after login so the caller can see what the page
//! pulls in without downloading any of it.

use crate::analyze::form::resolve_url;
use scraper::{Html, Selector};
use serde::Serialize;

// ---- Public types -----------------------------------------------------------

/// Character budget for the protected-page HTML preview.
pub const HTML_PREVIEW_CHARS: usize = 5000;

/// Character budget for one inline-script preview.
pub const INLINE_SCRIPT_PREVIEW_CHARS: usize = 100;

/// References a fetched page makes, in document order per category.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResources {
    /// External script URLs, resolved against the page URL.
    pub scripts: Vec<String>,
    /// Previews of inline `<script>` bodies.
    pub inline_scripts: Vec<InlineScript>,
    /// Stylesheet URLs, resolved against the page URL.
    pub styles: Vec<String>,
    /// Every form on the page.
    pub forms: Vec<FormSummary>,
}

/// A truncated look at one inline script.
#[derive(Debug, Clone, Serialize)]
pub struct InlineScript {
    /// 0-based position among the page's inline scripts.
    pub index: usize,
    /// Trimmed script text cut to [`INLINE_SCRIPT_PREVIEW_CHARS`] characters,
    /// with a `...` marker.
    pub preview: String,
}

/// A form seen on a protected page. Unlike login-form analysis this keeps the
/// raw action and unnamed inputs; it describes the page, it is not submitted.
#[derive(Debug, Clone, Serialize)]
pub struct FormSummary {
    /// Raw `action` attribute, empty when absent.
    pub action: String,
    /// Uppercased method, `GET` when the form does not say.
    pub method: String,
    /// All inputs in document order.
    pub inputs: Vec<InputSummary>,
}

/// One input on a protected-page form.
#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    /// The `name` attribute, empty when absent.
    pub name: String,
    /// The `type` attribute as written in the markup; `None` when absent.
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    /// The `value` attribute, empty when absent.
    pub value: String,
}

// ---- Public API -------------------------------------------------------------

/// Extract script, stylesheet, and form references from a page.
pub fn extract_resources(html: &str, page_url: &str) -> PageResources {
    let document = Html::parse_document(html);
    let mut out = PageResources::default();

    if let Ok(sel) = Selector::parse("script") {
        for script in document.select(&sel) {
            match script.value().attr("src").filter(|s| !s.is_empty()) {
                Some(src) => out.scripts.push(resolve_url(page_url, src)),
                None => {
                    let content = script.text().collect::<String>();
                    let trimmed = content.trim();
                    if trimmed.is_empty() {
                        continue; // neither src nor content
                    }
                    out.inline_scripts.push(InlineScript {
                        index: out.inline_scripts.len(),
                        preview: format!(
                            "{}...",
                            truncate_chars(trimmed, INLINE_SCRIPT_PREVIEW_CHARS)
                        ),
                    });
                }
            }
        }
    }

    if let Ok(sel) = Selector::parse(r#"link[rel="stylesheet"]"#) {
        for link in document.select(&sel) {
            if let Some(href) = link.value().attr("href") {
                out.styles.push(resolve_url(page_url, href));
            }
        }
    }

    if let (Ok(form_sel), Ok(input_sel)) = (Selector::parse("form"), Selector::parse("input")) {
        for form in document.select(&form_sel) {
            let inputs = form
                .select(&input_sel)
                .map(|input| InputSummary {
                    name: input.value().attr("name").unwrap_or_default().to_string(),
                    field_type: input.value().attr("type").map(str::to_string),
                    value: input.value().attr("value").unwrap_or_default().to_string(),
                })
                .collect();

            out.forms.push(FormSummary {
                action: form.value().attr("action").unwrap_or_default().to_string(),
                method: form
                    .value()
                    .attr("method")
                    .filter(|m| !m.is_empty())
                    .map(|m| m.to_uppercase())
                    .unwrap_or_else(|| "GET".to_string()),
                inputs,
            });
        }
    }

    out
}

/// Cut a string to at most `max` characters, on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---- Tests ------------------------------------------------------------------
