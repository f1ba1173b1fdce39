// Polling HLS downloader for Space audio playlists

pub mod config;
pub mod fetcher;
mod hls_downloader;
pub mod ledger;
pub mod playlist;

// Re-exports for easier access
pub use config::PollingConfig;
pub use fetcher::{ByteStream, HttpFetcher, MediaFetcher, SegmentAcquirer};
pub use hls_downloader::{
    DownloadHandle, DownloadOutcome, SessionEnd, SessionStats, SpaceDownloader, StreamMode,
};
pub use ledger::DedupLedger;
pub use playlist::{Manifest, ManifestFetcher, ParsedPlaylist, parse_playlist, switch_to_replay};
