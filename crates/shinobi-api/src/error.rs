use thiserror::Error;

/// Top-level error type for the `shinobi-api` crate.
///
/// Two cooperating layers: transport failures (connection errors, non-2xx
/// HTTP statuses) propagate unmodified from `reqwest`; application failures
/// come from the server's JSON envelope (`ok: false`) or from local
/// preconditions. There are no automatic retries anywhere — every failure
/// surfaces to the caller of the operation that triggered it.
#[derive(Debug, Error)]
pub enum Error {
    // ── Application (envelope) ──────────────────────────────────────
    /// The server answered with a parsable envelope whose `ok` field is
    /// `false`. Carries the server-supplied message.
    #[error("Server rejected the request: {message}")]
    NotOk { message: String },

    /// Login failed. Raised only by the login path, which translates a
    /// `NotOk` envelope on the credentials POST into this variant.
    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    // ── Local preconditions ─────────────────────────────────────────
    /// An action URL was requested before the auth token and group were
    /// known. Log in first, or seed the connection with both.
    #[error("Not connected -- log in before making API calls")]
    NotConnected,

    /// A single-entity lookup returned no elements.
    #[error("No `{action}` entity with id `{id}`")]
    NotFound { action: String, id: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, non-2xx
    /// status). Passed through from `reqwest`, never reinterpreted.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// The response body was not the JSON shape expected, with the raw
    /// body retained for debugging.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server's envelope rejected the request.
    pub fn is_not_ok(&self) -> bool {
        matches!(self, Self::NotOk { .. })
    }

    /// Returns `true` if this is a login failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` for a missing-entity lookup result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The server-supplied message, for envelope-level failures.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::NotOk { message } | Self::Unauthorized { message } => Some(message),
            _ => None,
        }
    }
}
