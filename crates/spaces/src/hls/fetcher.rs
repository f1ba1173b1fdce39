// HLS fetching: raw HTTP access for playlists and segments, and the segment
// acquirer that streams a segment body into the output sink.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use crate::config::DownloaderConfig;
use crate::error::DownloadError;
use crate::sink::SegmentSink;

/// A response body delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Transport used by the downloader. Every call is a single attempt; retry
/// policy belongs to the caller.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// GETs `url` and returns the body as text. Non-success statuses fail
    /// with [`DownloadError::HttpStatus`] carrying the body.
    async fn fetch_text(&self, url: &Url) -> Result<String, DownloadError>;

    /// GETs `url` and returns the body as a stream once the status is known
    /// to be successful.
    async fn fetch_stream(&self, url: &Url) -> Result<ByteStream, DownloadError>;
}

/// [`MediaFetcher`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    headers: HeaderMap,
}

impl HttpFetcher {
    /// Sends `config.headers` with every request.
    pub fn new(client: Client, config: &DownloaderConfig) -> Self {
        Self::with_headers(client, config.headers.clone())
    }

    pub fn with_headers(client: Client, headers: HeaderMap) -> Self {
        Self { client, headers }
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await?;
        trace!(url = %url, status = %response.status(), version = ?response.version(), "Response received");
        Ok(response)
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, DownloadError> {
        let response = self.get(url).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DownloadError::http_status(
                status,
                url.as_str(),
                "playlist fetch",
                body,
            ));
        }
        Ok(body)
    }

    async fn fetch_stream(&self, url: &Url) -> Result<ByteStream, DownloadError> {
        let response = self.get(url).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DownloadError::http_status(
                status,
                url.as_str(),
                "segment fetch",
                body,
            ));
        }

        Ok(response.bytes_stream().map_err(DownloadError::from).boxed())
    }
}

/// Downloads one segment and appends it to the sink without buffering the
/// whole body.
pub struct SegmentAcquirer<F> {
    fetcher: Arc<F>,
}

impl<F: MediaFetcher> SegmentAcquirer<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self { fetcher }
    }

    /// Returns the number of bytes appended.
    ///
    /// Fails with [`DownloadError::Cancelled`] if `token` fires while the
    /// request or the body is in flight.
    pub async fn acquire<S>(
        &self,
        segment_url: &Url,
        sink: &mut S,
        token: &CancellationToken,
    ) -> Result<u64, DownloadError>
    where
        S: SegmentSink + ?Sized,
    {
        let mut body = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DownloadError::Cancelled),
            body = self.fetcher.fetch_stream(segment_url) => body?,
        };

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(DownloadError::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk?;
            sink.write_chunk(&chunk).await?;
            written += chunk.len() as u64;
        }

        trace!(url = %segment_url, bytes = written, "Segment appended");
        Ok(written)
    }
}
