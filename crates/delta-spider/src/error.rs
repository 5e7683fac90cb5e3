use reqwest::StatusCode;
use thiserror::Error;

/// Reasons a market data fetch produced no usable data.
///
/// Every variant is a soft failure: the caller logs it and moves on to the
/// next asset.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never completed (dns, tls, timeout, connection reset).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("http status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The server answered 2xx but flagged the payload as unsuccessful.
    #[error("unsuccessful response, result({result})")]
    Unsuccessful { result: String },

    /// The payload did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

/// Reasons a warehouse call failed.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid api key header: {0}")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),
}
