//! Login-form discovery -- find the first form on a page and capture its fields.
//!
//! The analyzer never fails: a page with no `<form>` yields a synthetic form
//! that POSTs to the page URL with no fields, so the caller can still attempt
//! a submission against endpoints that render their form client-side.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

// ---- Public types -----------------------------------------------------------

/// A named input captured from a login form.
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    /// The `name` attribute of the input element.
    pub name: String,
    /// The `type` attribute as written in the markup; `None` when the input
    /// has no type.
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    /// The pre-filled `value` attribute, empty when absent.
    pub value: String,
    /// Credential-free fill suggestion: state-carrying inputs (hidden,
    /// checkbox, radio, submit) keep their value, everything else is blank.
    #[serde(rename = "suggestedValue")]
    pub suggested_value: String,
}

/// The discovered (or synthesized) login form for a page.
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    /// Action URL resolved against the page URL; the page URL itself when the
    /// form has no action.
    pub action: String,
    /// Uppercased HTTP method, `POST` when the form does not say.
    pub method: String,
    /// Named fields in document order, first occurrence of each name.
    #[serde(rename = "inputs")]
    pub fields: Vec<FormField>,
}

// ---- Public API -------------------------------------------------------------

/// Analyse a page for its login form.
///
/// Only the first `<form>` in document order is considered. Inputs without a
/// `name` are skipped and duplicate names keep their first occurrence.
/// Malformed HTML never fails; the parser takes whatever it can.
pub fn analyze(html: &str, base_url: &str) -> LoginForm {
    let document = Html::parse_document(html);

    if let Ok(form_sel) = Selector::parse("form") {
        if let Some(form) = document.select(&form_sel).next() {
            return capture_form(form, base_url);
        }
    }

    // No form anywhere in the document: synthesize a best-guess submission
    // target so the attempt can still go ahead.
    LoginForm {
        action: base_url.to_string(),
        method: "POST".to_string(),
        fields: Vec::new(),
    }
}

/// First `<title>` text, trimmed. Empty when the page has none.
pub fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    if let Ok(sel) = Selector::parse("title") {
        if let Some(el) = document.select(&sel).next() {
            return el.text().collect::<String>().trim().to_string();
        }
    }
    String::new()
}

// ---- Private helpers --------------------------------------------------------

fn capture_form(form: ElementRef<'_>, base_url: &str) -> LoginForm {
    let action = form
        .value()
        .attr("action")
        .filter(|a| !a.is_empty())
        .map(|a| resolve_url(base_url, a))
        .unwrap_or_else(|| base_url.to_string());

    let method = form
        .value()
        .attr("method")
        .filter(|m| !m.is_empty())
        .map(|m| m.to_uppercase())
        .unwrap_or_else(|| "POST".to_string());

    let mut fields = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if let Ok(input_sel) = Selector::parse("input") {
        for input in form.select(&input_sel) {
            let name = match input.value().attr("name") {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => continue, // unnamed inputs cannot be submitted
            };
            if !seen.insert(name.clone()) {
                continue;
            }

            let field_type = input.value().attr("type").map(str::to_string);
            let value = input.value().attr("value").unwrap_or_default().to_string();
            let suggested_value = suggest_value(field_type.as_deref(), &value);

            fields.push(FormField {
                name,
                field_type,
                value,
                suggested_value,
            });
        }
    }

    LoginForm {
        action,
        method,
        fields,
    }
}

/// Fill suggestion made without knowing any credentials: inputs that carry
/// server state ride through unchanged, user-entry inputs suggest blank.
/// Matches the type case-insensitively; the recorded type keeps its casing.
fn suggest_value(field_type: Option<&str>, value: &str) -> String {
    match field_type.map(|t| t.to_ascii_lowercase()).as_deref() {
        Some("hidden") | Some("checkbox") | Some("radio") | Some("submit") => value.to_string(),
        _ => String::new(),
    }
}

/// Resolve a possibly-relative URL against the page URL. Falls back to the
/// raw input when the base does not parse.
pub(crate) fn resolve_url(base_url: &str, href: &str) -> String {
    if href.is_empty() {
        return base_url.to_string();
    }
    if let Ok(base) = Url::parse(base_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }
    href.to_string()
}

// ---- Tests ------------------------------------------------------------------
