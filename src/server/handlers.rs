//! The API handlers -- login, protected fetch, raw download, session delete,
//! health.
//!
//! Handlers validate, delegate to the flow/session components, and translate
//! `anyhow` failures into [`ApiError`] at this boundary. Wire names are
//! camelCase throughout.

use crate::analyze::form::LoginForm;
use crate::analyze::mapping::Credentials;
use crate::analyze::resources::{truncate_chars, PageResources, HTML_PREVIEW_CHARS};
use crate::login::flow::{LoginAttempt, LoginFlow, LoginOutcome};
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::session::fetch::{self, ProtectedDocument};
use crate::session::store::NewSession;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Character budget for the login `responsePreview`.
const RESPONSE_PREVIEW_CHARS: usize = 500;

// ---- POST /api/login --------------------------------------------------------

/// Login request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    /// URL of the page carrying the login form.
    pub url: Option<String>,
    /// Account identifier (email or username).
    pub email: Option<String>,
    /// Account secret.
    pub password: Option<String>,
    /// Optional payload submitted verbatim instead of the mapped form.
    pub custom_selectors: Option<HashMap<String, String>>,
}

/// Login response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Content-heuristic verdict, not the HTTP status.
    pub success: bool,
    /// Store-minted session id, present even when the verdict says failure
    /// so a misclassified login can still be inspected.
    pub session_id: String,
    /// Human-readable verdict summary.
    pub message: String,
    /// URL of the final submission response.
    pub final_url: String,
    /// Title of the post-submission page.
    pub title: String,
    /// Raw `Set-Cookie` strings captured for the session.
    pub cookies: Vec<String>,
    /// The form the credentials were mapped into.
    pub detected_form: LoginForm,
    /// First [`RESPONSE_PREVIEW_CHARS`] characters of the submission body.
    pub response_preview: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (url, email, password) = match (body.url, body.email, body.password) {
        (Some(url), Some(email), Some(password))
            if !url.is_empty() && !email.is_empty() && !password.is_empty() =>
        {
            (url, email, password)
        }
        _ => {
            return Err(ApiError::Validation(
                "url, email and password are required".to_string(),
            ))
        }
    };

    info!(url = %url, "login requested");

    let attempt = LoginAttempt {
        source_url: url.clone(),
        credentials: Credentials {
            identifier: email,
            secret: password,
        },
        overrides: body.custom_selectors,
    };

    let outcome = LoginFlow::new(attempt)
        .run(&state.client)
        .await
        .map_err(|err| {
            ApiError::upstream("login attempt failed", &err, state.config.verbose_errors)
        })?;

    let session_id = state
        .store
        .put(NewSession {
            source_url: url,
            cookies: outcome.cookies.clone(),
            final_url: outcome.final_url.clone(),
            response_headers: outcome.response_headers.clone(),
        })
        .await;

    info!(
        session = %session_id,
        success = outcome.verdict.success,
        score = outcome.verdict.score,
        "login captured"
    );

    Ok(Json(login_response(session_id, outcome)))
}

fn login_response(session_id: String, outcome: LoginOutcome) -> LoginResponse {
    LoginResponse {
        success: outcome.verdict.success,
        session_id,
        message: outcome.verdict.message().to_string(),
        final_url: outcome.final_url,
        title: outcome.title,
        cookies: outcome.cookies,
        detected_form: outcome.form,
        response_preview: truncate_chars(&outcome.body, RESPONSE_PREVIEW_CHARS).to_string(),
    }
}

// ---- GET /api/fetch-protected -----------------------------------------------

/// Query parameters for the protected fetch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub session_id: Option<String>,
    /// Relative path, absolute path, or full URL; the session's final URL
    /// when omitted.
    pub path: Option<String>,
}

/// Protected-fetch response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProtectedResponse {
    pub success: bool,
    /// URL actually fetched, after redirects.
    pub url: String,
    pub title: String,
    /// Upstream status, passed through untouched.
    pub status_code: u16,
    pub resources: PageResources,
    /// First [`HTML_PREVIEW_CHARS`] characters of the body.
    pub html_preview: String,
    /// Untruncated body size in bytes.
    pub full_size: usize,
    /// Ready-made link to the raw-download route for the same page.
    pub download_link: String,
}

pub async fn fetch_protected(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<FetchProtectedResponse>, ApiError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("sessionId is required".to_string()))?;

    let session = state
        .store
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::Validation("invalid or expired session".to_string()))?;

    let doc = fetch::fetch_document(&state.client, &session, query.path.as_deref())
        .await
        .map_err(|err| {
            ApiError::upstream("protected fetch failed", &err, state.config.verbose_errors)
        })?;

    let ProtectedDocument {
        url,
        title,
        status_code,
        html,
        resources,
    } = doc;

    let download_link = format!(
        "/api/download-html/{}?sessionId={}",
        urlencoding::encode(&url),
        session_id
    );

    Ok(Json(FetchProtectedResponse {
        success: true,
        url,
        title,
        status_code,
        resources,
        html_preview: truncate_chars(&html, HTML_PREVIEW_CHARS).to_string(),
        full_size: html.len(),
        download_link,
    }))
}

// ---- GET /api/download-html/:url --------------------------------------------

/// Query parameters for the raw download.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub session_id: Option<String>,
}

/// Fetch a full URL with the session's cookies and hand the body back as a
/// file attachment. Errors come back as plain text on this route.
pub async fn download_html(
    State(state): State<AppState>,
    Path(url): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::download_rejected("sessionId is required"))?;

    let session = state
        .store
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::download_rejected("invalid or expired session"))?;

    let page = state
        .client
        .fetch_protected(&url, &session.cookies, &session.final_url)
        .await
        .map_err(|err| ApiError::download_failed(format!("download failed: {err:#}")))?;

    info!(session = %session_id, url = %url, bytes = page.body.len(), "raw download");

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"page.html\"",
            ),
        ],
        page.body,
    )
        .into_response())
}

// ---- DELETE /api/session/:id ------------------------------------------------

/// Session-deletion response body.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Deleting is idempotent: unknown ids answer success too.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let existed = state.store.delete(&id).await;
    info!(session = %id, existed, "session delete");

    Json(DeleteResponse {
        success: true,
        message: "Session deleted".to_string(),
    })
}

// ---- GET /api/health --------------------------------------------------------

/// Health response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_sessions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.store.len().await,
    })
}
