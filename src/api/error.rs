use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status: {status}")]
    Status { status: u16 },

    #[error("unexpected content type: {0}")]
    ContentType(String),

    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error("invalid base url: {0}")]
    BaseUrl(String),
}
