/// Errors from talking to the GO API.
///
/// Individual record fields never produce an error; they degrade to `None`.
/// Only failures of the request or of the response envelope end up here.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure: DNS, connect, TLS, body read.
    #[error("GO API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("GO API returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The body was not valid JSON.
    #[error("GO API returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body parsed but has no `results` array.
    #[error("GO API response from {url} has no `results` array")]
    MissingResults { url: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;
