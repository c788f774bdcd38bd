//! Success classification -- content heuristics over the post-submission page.
//!
//! HTTP status says almost nothing about whether a login worked; most sites
//! answer a rejected login with 200 and an error message. The verdict instead
//! votes eight content indicators and calls success when enough agree.

/// Number of indicators consulted by [`assess`].
pub const INDICATOR_COUNT: usize = 8;

/// A login is called successful when strictly more than this many indicators
/// vote for it.
pub const SUCCESS_THRESHOLD: usize = 2;

/// Outcome of the post-submission content check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// True when the score exceeds [`SUCCESS_THRESHOLD`].
    pub success: bool,
    /// How many of the [`INDICATOR_COUNT`] indicators voted for success.
    pub score: usize,
}

impl Verdict {
    /// Short human-readable summary for API responses.
    pub fn message(&self) -> &'static str {
        if self.success {
            "Login successful"
        } else {
            "Login may have failed - check credentials or response content"
        }
    }
}

/// Score a post-submission page for signs of an authenticated state.
///
/// Five presence indicators (authenticated-area words in the body, `dashboard`
/// in the title) and three absence indicators (no failure wording in the
/// body), all case-insensitive. An empty page scores 3 from the absence
/// indicators alone, which already counts as success; rejection pages fail
/// because the failure wording knocks out the absence votes.
pub fn assess(body: &str, title: &str) -> Verdict {
    let body = body.to_lowercase();
    let title = title.to_lowercase();

    let indicators: [bool; INDICATOR_COUNT] = [
        body.contains("dashboard"),
        body.contains("welcome"),
        body.contains("logout"),
        body.contains("my account"),
        title.contains("dashboard"),
        !body.contains("invalid"),
        !body.contains("incorrect"),
        !body.contains("login failed"),
    ];

    let score = indicators.iter().filter(|&&vote| vote).count();
    Verdict {
        success: score > SUCCESS_THRESHOLD,
        score,
    }
}

// ---- Tests ------------------------------------------------------------------
