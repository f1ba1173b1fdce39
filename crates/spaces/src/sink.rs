//! Append-only output for downloaded segment bytes.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::DownloadError;

/// Destination of the reassembled audio.
///
/// A sink only ever grows. Once closed, every write fails with
/// [`DownloadError::SinkClosed`] and further closes are no-ops.
#[async_trait]
pub trait SegmentSink: Send {
    /// Human readable name, usually the output path.
    fn name(&self) -> &str;

    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), DownloadError>;

    /// Flushes and releases the underlying writer.
    ///
    /// Returns `true` only for the call that actually closed the sink.
    async fn close(&mut self) -> Result<bool, DownloadError>;

    fn is_closed(&self) -> bool;

    fn bytes_written(&self) -> u64;
}

/// [`SegmentSink`] over any async writer, typically a `tokio::fs::File`.
pub struct OutputSink<W> {
    name: String,
    writer: Option<W>,
    bytes_written: u64,
}

impl<W> OutputSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Some(writer),
            bytes_written: 0,
        }
    }
}

impl OutputSink<tokio::fs::File> {
    /// Creates (or truncates) the file at `path`.
    pub async fn create(path: impl AsRef<std::path::Path>) -> Result<Self, DownloadError> {
        let path = path.as_ref();
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::new(path.display().to_string(), file))
    }
}

#[async_trait]
impl<W> SegmentSink for OutputSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        let writer = self.writer.as_mut().ok_or(DownloadError::SinkClosed)?;
        writer.write_all(data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<bool, DownloadError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(false);
        };
        writer.flush().await?;
        writer.shutdown().await?;
        debug!(sink = %self.name, bytes = self.bytes_written, "Output sink closed");
        Ok(true)
    }

    fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
