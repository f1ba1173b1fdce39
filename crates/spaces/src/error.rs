use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download cancelled")]
    Cancelled,

    #[error("output sink is closed")]
    SinkClosed,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("proxy configuration error: {reason}")]
    ProxyConfiguration { reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}, body: {body}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
        body: String,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("no audio segments or nested playlist found in {url}")]
    NoSegmentsFound { url: String },

    #[error("failed to fetch playlist after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<DownloadError>,
    },
}

impl DownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn proxy_configuration(reason: impl Into<String>) -> Self {
        Self::ProxyConfiguration {
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
        body: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
            body: body.into(),
        }
    }

    pub fn no_segments(url: impl Into<String>) -> Self {
        Self::NoSegmentsFound { url: url.into() }
    }

    /// Network failures and non-success statuses. These are retried for
    /// playlists and skipped until the next poll for segments.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }

    /// Errors that end a session as stopped rather than failed.
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Cancelled | Self::SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let status = DownloadError::http_status(
            StatusCode::SERVICE_UNAVAILABLE,
            "https://example.com/a.m3u8",
            "playlist fetch",
            "busy",
        );
        assert!(status.is_transient());
        assert!(!status.is_stop());

        assert!(DownloadError::SinkClosed.is_stop());
        assert!(DownloadError::Cancelled.is_stop());
        assert!(!DownloadError::no_segments("x").is_transient());
        assert!(!DownloadError::invalid_url("x", "bad").is_transient());
    }

    #[test]
    fn http_status_message_carries_body() {
        let err = DownloadError::http_status(
            StatusCode::FORBIDDEN,
            "https://example.com/chunk.aac",
            "segment fetch",
            "denied",
        );
        let message = err.to_string();
        assert!(message.contains("403"));
        assert!(message.contains("denied"));
    }
}
