use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("unable to extract Space ID from url: {0}")]
    NotFound(String),
    #[error("Space has ended, and no replay is available")]
    EndedNoReplay,
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("http error: {status}, url: {url}, body: {body}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ExtractorError {
    pub fn metadata_unavailable(what: impl Into<String>) -> Self {
        Self::MetadataUnavailable(what.into())
    }

    /// Network, status or decoding failures talking to the platform API.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::HttpStatus { .. } | Self::JsonError(_)
        )
    }
}
