//! # spaces-engine
//!
//! Records the audio of a Space by polling its HLS playlist and appending
//! every new segment to a single output file.
//!
//! The entry point is [`SpaceDownloader`]: give it a [`MediaFetcher`]
//! (usually [`HttpFetcher`] over a client from [`create_client`]), a
//! [`SegmentSink`] and a [`PollingConfig`], then call
//! [`SpaceDownloader::run`] with the playlist URL. The run ends when the
//! playlist carries `#EXT-X-ENDLIST`, when the [`DownloadHandle`] is stopped,
//! or when playlist retries are exhausted.
//!
//! Live playlists that stop listing segments are switched to their replay
//! counterpart once per session.

pub mod client;
pub mod config;
pub mod error;
pub mod hls;
pub mod proxy;
pub mod sink;

pub use client::create_client;
pub use config::{DownloaderConfig, DownloaderConfigBuilder};
pub use error::DownloadError;
pub use hls::{
    DownloadHandle, DownloadOutcome, HttpFetcher, MediaFetcher, PollingConfig, SessionEnd,
    SessionStats, SpaceDownloader, StreamMode,
};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use sink::{OutputSink, SegmentSink};

pub use tokio_util::sync::CancellationToken;
