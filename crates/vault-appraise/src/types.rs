use vault_core::SourceRef;

/// Text plus citations from a search-grounded model call.
///
/// An empty source list is valid: the model answered without grounding
/// metadata, which happens routinely and is not an error.
#[derive(Debug, Clone, Default)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Errors from remote appraisal calls.
#[derive(Debug, thiserror::Error)]
pub enum AppraiseError {
    /// Missing or rejected credential. Fatal, never retried.
    #[error("AI service not configured: {0}")]
    Configuration(String),

    /// HTTP 429 / RESOURCE_EXHAUSTED. Retried with backoff.
    #[error("Rate limited by AI service")]
    RateLimited,

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-429 error response from the service (including model refusals).
    #[error("AI service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response that does not carry usable text or does not parse.
    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    /// Retry budget spent on rate limits without a success.
    #[error("Rate limit retry budget exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl AppraiseError {
    /// Whether the retry combinator should try the same call again.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppraiseError::RateLimited)
    }

    /// Whether a failed primary scan may degrade to basic mode.
    ///
    /// Configuration problems and malformed responses fail outright; only
    /// "service unavailable to us right now" shapes qualify. Transport
    /// failures are deliberately in that set: a timed-out or refused
    /// grounded call is indistinguishable from an overloaded route, and the
    /// cheaper basic-mode call may still get through. A network failure on
    /// the basic route itself still surfaces as a failed scan.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            AppraiseError::RateLimited
                | AppraiseError::Exhausted { .. }
                | AppraiseError::Network(_)
        )
    }
}
