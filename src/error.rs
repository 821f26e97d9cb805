use thiserror::Error;

/// Terminal causes for a fetch session. None of these are retried: the loop
/// stops with everything already checkpointed and a usable resume offset.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Any non-2xx status, uniformly. The body snippet is for diagnostics only.
    #[error("http {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid response payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The service promised recency-descending pages; this page broke that.
    /// The early-stop year filter is unsound on such input, so the session aborts.
    #[error("page at offset {offset} is not in descending order: {detail}")]
    OutOfOrderPage { offset: u32, detail: String },

    #[error("match {match_id} has an unparseable start time {raw:?}")]
    BadTimestamp { match_id: String, raw: String },
}
