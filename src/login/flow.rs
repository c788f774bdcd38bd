//! The two-step login flow -- fetch the login page, then submit the mapped form.
//!
//! The flow is an explicit state machine. Every network round-trip is one
//! transition, each intermediate state carries exactly what the next step
//! needs, and a caller can either [`run`](LoginFlow::run) the whole thing or
//! [`step`](LoginFlow::step) through it transition by transition.

use crate::analyze::form::{self, LoginForm};
use crate::analyze::mapping::{self, Credentials};
use crate::client::{PageResponse, WebClient};
use crate::login::verdict::{self, Verdict};
use anyhow::{bail, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ---- Public types -----------------------------------------------------------

/// Everything needed to attempt one login.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// URL of the page carrying (or standing in for) the login form.
    pub source_url: String,
    /// Credentials to map into the discovered fields.
    pub credentials: Credentials,
    /// Optional payload submitted verbatim instead of the mapped fields.
    pub overrides: Option<HashMap<String, String>>,
}

/// Where a [`LoginFlow`] currently stands.
#[derive(Debug)]
pub enum FlowState {
    /// Nothing sent yet; the next step fetches the login page.
    AwaitingInitialFetch,
    /// Login page fetched and analysed; the next step submits the payload.
    AwaitingSubmission {
        /// Discovered (or synthesized) form.
        form: LoginForm,
        /// Submission payload in field document order.
        payload: Vec<(String, String)>,
        /// Raw `Set-Cookie` strings the login page itself set.
        page_cookies: Vec<String>,
    },
    /// The submission came back; the attempt is finished.
    Complete(Box<LoginOutcome>),
    /// A step failed; the flow will not advance again.
    Failed(String),
}

/// Result of a finished login attempt.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The form the credentials were mapped into.
    pub form: LoginForm,
    /// Raw `Set-Cookie` strings for the session: the submission's when it set
    /// any, otherwise the login page's.
    pub cookies: Vec<String>,
    /// URL of the final submission response, after redirects.
    pub final_url: String,
    /// HTTP status of the submission response.
    pub status: u16,
    /// Title of the post-submission page.
    pub title: String,
    /// Body of the post-submission page.
    pub body: String,
    /// Response headers of the submission response.
    pub response_headers: Vec<(String, String)>,
    /// Content-heuristic success verdict.
    pub verdict: Verdict,
}

/// The login state machine.
#[derive(Debug)]
pub struct LoginFlow {
    attempt: LoginAttempt,
    state: FlowState,
}

impl LoginFlow {
    pub fn new(attempt: LoginAttempt) -> Self {
        Self {
            attempt,
            state: FlowState::AwaitingInitialFetch,
        }
    }

    /// Current state, for callers driving the flow step by step.
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Drive the flow through exactly one transition.
    ///
    /// A failed transition parks the flow in [`FlowState::Failed`] and hands
    /// the error straight back; a finished flow refuses to step again.
    pub async fn step(&mut self, client: &WebClient) -> Result<&FlowState> {
        let state = std::mem::replace(&mut self.state, FlowState::AwaitingInitialFetch);

        let next = match state {
            FlowState::AwaitingInitialFetch => self.fetch_and_analyse(client).await,
            FlowState::AwaitingSubmission {
                form,
                payload,
                page_cookies,
            } => self.submit(client, form, payload, page_cookies).await,
            finished @ (FlowState::Complete(_) | FlowState::Failed(_)) => {
                self.state = finished;
                bail!("login flow already finished");
            }
        };

        match next {
            Ok(state) => {
                self.state = state;
                Ok(&self.state)
            }
            Err(err) => {
                warn!(url = %self.attempt.source_url, error = %format!("{err:#}"), "login step failed");
                self.state = FlowState::Failed(format!("{err:#}"));
                Err(err)
            }
        }
    }

    /// Run the flow to completion and return the outcome.
    pub async fn run(mut self, client: &WebClient) -> Result<LoginOutcome> {
        while !matches!(self.state, FlowState::Complete(_)) {
            self.step(client).await?;
        }
        match self.state {
            FlowState::Complete(outcome) => Ok(*outcome),
            _ => bail!("login flow stopped before completion"),
        }
    }

    // ---- Transitions --------------------------------------------------------

    /// Step 1: fetch the login page, analyse its form, build the payload.
    async fn fetch_and_analyse(&self, client: &WebClient) -> Result<FlowState> {
        let attempt = &self.attempt;
        info!(url = %attempt.source_url, "fetching login page");

        let page = client.fetch_login_page(&attempt.source_url).await?;

        let form = form::analyze(&page.body, &attempt.source_url);
        debug!(
            action = %form.action,
            method = %form.method,
            fields = form.fields.len(),
            page_cookies = page.set_cookies.len(),
            "analysed login form"
        );

        let payload = mapping::build_payload(
            &form.fields,
            &attempt.credentials,
            attempt.overrides.as_ref(),
        );

        Ok(FlowState::AwaitingSubmission {
            form,
            payload,
            page_cookies: page.set_cookies,
        })
    }

    /// Step 2: submit the payload, capture cookies, classify the answer.
    async fn submit(
        &self,
        client: &WebClient,
        form: LoginForm,
        payload: Vec<(String, String)>,
        page_cookies: Vec<String>,
    ) -> Result<FlowState> {
        info!(action = %form.action, method = %form.method, "submitting login form");

        let page = client
            .submit_form(
                &form.method,
                &form.action,
                &payload,
                &self.attempt.source_url,
                &page_cookies,
            )
            .await?;

        let title = form::page_title(&page.body);
        let verdict = verdict::assess(&page.body, &title);
        info!(
            success = verdict.success,
            score = verdict.score,
            status = page.status,
            final_url = %page.final_url,
            "login verdict"
        );

        let PageResponse {
            final_url,
            status,
            body,
            set_cookies,
            headers,
        } = page;

        // The submission's cookies win; the login page's only stand in when
        // the submission set none.
        let cookies = if set_cookies.is_empty() {
            page_cookies
        } else {
            set_cookies
        };

        Ok(FlowState::Complete(Box::new(LoginOutcome {
            form,
            cookies,
            final_url,
            status,
            title,
            body,
            response_headers: headers,
            verdict,
        })))
    }
}

// ---- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_PAGE: &str = r#"
    <html><head><title>Sign in</title></head><body>
        <form action="/do-login" method="post">
            <input type="hidden" name="csrf_token" value="tok-1" />
            <input type="email" name="user_email" />
            <input type="password" name="user_password" />
            <input type="checkbox" name="remember_me" value="on" />
        </form>
    </body></html>
    "#;

    fn attempt(server: &MockServer) -> LoginAttempt {
        LoginAttempt {
            source_url: format!("{}/login", server.uri()),
            credentials: Credentials {
                identifier: "alice@example.com".to_string(),
                secret: "hunter2".to_string(),
            },
            overrides: None,
        }
    }

    #[tokio::test]
    async fn test_run_full_flow_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(LOGIN_PAGE)
                    .append_header("set-cookie", "pre=1; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/do-login"))
            .and(body_string_contains("csrf_token=tok-1"))
            .and(body_string_contains("user_email=alice%40example.com"))
            .and(body_string_contains("user_password=hunter2"))
            .and(body_string_contains("remember_me=on"))
            .and(header("cookie", "pre=1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(
                        "<html><head><title>Dashboard</title></head>\
                         <body>Welcome! <a href='/logout'>Logout</a></body></html>",
                    )
                    .append_header("set-cookie", "sid=s3cret; Path=/; HttpOnly"),
            )
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let outcome = LoginFlow::new(attempt(&server)).run(&client).await.unwrap();

        assert!(outcome.verdict.success);
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.title, "Dashboard");
        assert_eq!(outcome.cookies, vec!["sid=s3cret; Path=/; HttpOnly".to_string()]);
        assert_eq!(outcome.form.fields.len(), 4);
        assert!(outcome.final_url.ends_with("/do-login"));
    }

    #[tokio::test]
    async fn test_step_by_step_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/do-login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome, logout"))
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let mut flow = LoginFlow::new(attempt(&server));
        assert!(matches!(flow.state(), FlowState::AwaitingInitialFetch));

        flow.step(&client).await.unwrap();
        match flow.state() {
            FlowState::AwaitingSubmission { form, payload, .. } => {
                assert!(form.action.ends_with("/do-login"));
                assert_eq!(payload.len(), 4);
                assert_eq!(payload[1].1, "alice@example.com");
            }
            other => panic!("expected AwaitingSubmission, got {other:?}"),
        }

        flow.step(&client).await.unwrap();
        assert!(matches!(flow.state(), FlowState::Complete(_)));

        // A finished flow refuses to advance.
        assert!(flow.step(&client).await.is_err());
        assert!(matches!(flow.state(), FlowState::Complete(_)));
    }

    #[tokio::test]
    async fn test_submission_follows_redirect_to_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/do-login"))
            .respond_with(
                ResponseTemplate::new(302)
                    .append_header("location", "/dashboard")
                    .append_header("set-cookie", "sid=redir; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dashboard"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<title>Dashboard</title>My account overview. Logout."),
            )
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let outcome = LoginFlow::new(attempt(&server)).run(&client).await.unwrap();

        assert!(outcome.final_url.ends_with("/dashboard"));
        assert_eq!(outcome.status, 200);
        assert!(outcome.verdict.success);
        // The redirect hop's cookie is lost to the client; the login page set
        // none either, so the session carries no cookies.
        assert!(outcome.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credentials_complete_with_failure_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/do-login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string("Invalid username or password. Login failed."),
            )
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let outcome = LoginFlow::new(attempt(&server)).run(&client).await.unwrap();

        assert!(!outcome.verdict.success);
        assert_eq!(outcome.status, 401);
    }

    #[tokio::test]
    async fn test_login_page_error_status_fails_step_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let mut flow = LoginFlow::new(attempt(&server));
        let err = flow.step(&client).await.unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(matches!(flow.state(), FlowState::Failed(_)));
    }

    #[tokio::test]
    async fn test_server_error_on_submission_fails_flow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/do-login"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let err = LoginFlow::new(attempt(&server)).run(&client).await.unwrap_err();
        assert!(format!("{err:#}").contains("500"));
    }

    #[tokio::test]
    async fn test_overrides_submitted_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/do-login"))
            .and(body_string_contains("tenant=acme"))
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome, logout"))
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let mut attempt = attempt(&server);
        attempt.overrides = Some(HashMap::from([("tenant".to_string(), "acme".to_string())]));

        let outcome = LoginFlow::new(attempt).run(&client).await.unwrap();
        assert_eq!(outcome.status, 200);
    }

    #[tokio::test]
    async fn test_page_without_form_submits_to_page_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>SPA</body></html>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome, logout"))
            .mount(&server)
            .await;

        let client = WebClient::new().unwrap();
        let outcome = LoginFlow::new(attempt(&server)).run(&client).await.unwrap();
        assert!(outcome.final_url.ends_with("/login"));
        assert_eq!(outcome.status, 200);
    }
}
