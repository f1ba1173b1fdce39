// Polling driver: owns one download session and runs its state machine until
// the stream completes, the session is stopped, or it fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::error::DownloadError;
use crate::hls::config::PollingConfig;
use crate::hls::fetcher::{MediaFetcher, SegmentAcquirer};
use crate::hls::ledger::DedupLedger;
use crate::hls::playlist::{
    Manifest, ManifestFetcher, base_url_of, resolve_reference, switch_to_replay,
};
use crate::sink::SegmentSink;

/// Which playlist flavour the session is polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    #[default]
    Live,
    Replay,
}

/// How a session that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The playlist carried the end-of-list tag and every segment was handled.
    Completed,
    /// Cancellation fired or the sink was closed underneath the session.
    Stopped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Playlist fetch attempts, including failed ones.
    pub polls: u64,
    /// Segments written to the sink.
    pub segments: u64,
    /// Segment downloads that failed and were left for a later poll.
    pub skipped: u64,
    pub bytes: u64,
    pub mode: StreamMode,
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub end: SessionEnd,
    pub stats: SessionStats,
    pub elapsed: Duration,
}

/// Cloneable stop switch for a running download.
#[derive(Debug, Clone)]
pub struct DownloadHandle {
    token: CancellationToken,
}

impl DownloadHandle {
    /// Requests the session to stop. Never blocks; repeated calls are no-ops.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
enum SessionState {
    Polling,
    SwitchingToReplay,
    Completed,
    Stopped,
    Failed(DownloadError),
}

struct DownloadSession {
    manifest_url: Url,
    base_url: Url,
    ledger: DedupLedger,
    retries: u32,
    replay_attempted: bool,
    stats: SessionStats,
}

impl DownloadSession {
    fn new(manifest_url: Url) -> Result<Self, DownloadError> {
        let base_url = base_url_of(&manifest_url)?;
        Ok(Self {
            manifest_url,
            base_url,
            ledger: DedupLedger::new(),
            retries: 0,
            replay_attempted: false,
            stats: SessionStats::default(),
        })
    }
}

/// Downloads a Space by polling its playlist and appending unseen segments
/// to a sink.
///
/// The sink belongs to the downloader for the whole run and is closed exactly
/// once when [`SpaceDownloader::run`] returns.
pub struct SpaceDownloader<F, S> {
    playlists: ManifestFetcher<F>,
    acquirer: SegmentAcquirer<F>,
    sink: S,
    config: PollingConfig,
    token: CancellationToken,
}

impl<F, S> SpaceDownloader<F, S>
where
    F: MediaFetcher,
    S: SegmentSink,
{
    pub fn new(fetcher: F, sink: S, config: PollingConfig) -> Self {
        let fetcher = Arc::new(fetcher);
        Self {
            playlists: ManifestFetcher::new(Arc::clone(&fetcher), config.max_nested_depth),
            acquirer: SegmentAcquirer::new(fetcher),
            sink,
            config,
            token: CancellationToken::new(),
        }
    }

    /// Ties the session to an existing token, e.g. a process-wide shutdown token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn handle(&self) -> DownloadHandle {
        DownloadHandle {
            token: self.token.clone(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs the session to a terminal state.
    ///
    /// `Completed` and `Stopped` are returned as [`DownloadOutcome`]; every
    /// other ending is an error. Audio already written stays in the sink.
    #[instrument(skip(self), fields(output = %self.sink.name()))]
    pub async fn run(mut self, playlist_url: &str) -> Result<DownloadOutcome, DownloadError> {
        let started = Instant::now();
        let result = match Url::parse(playlist_url) {
            Ok(url) => self.drive(url, started).await,
            Err(e) => Err(DownloadError::invalid_url(playlist_url, e.to_string())),
        };

        match (result, self.sink.close().await) {
            (Ok(outcome), Ok(_)) => Ok(outcome),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "Failed to close output sink");
                Err(err)
            }
            (Err(err), Ok(_)) => Err(err),
        }
    }

    async fn drive(
        &mut self,
        playlist_url: Url,
        started: Instant,
    ) -> Result<DownloadOutcome, DownloadError> {
        let mut session = DownloadSession::new(playlist_url)?;
        info!(output = %self.sink.name(), "Starting Space recording");

        let mut state = SessionState::Polling;
        loop {
            state = match state {
                SessionState::Polling => self.poll(&mut session).await,
                SessionState::SwitchingToReplay => self.enter_replay(&mut session),
                SessionState::Completed => {
                    info!(
                        segments = session.stats.segments,
                        bytes = session.stats.bytes,
                        skipped = session.stats.skipped,
                        "Recording completed"
                    );
                    return Ok(outcome(SessionEnd::Completed, session, started));
                }
                SessionState::Stopped => {
                    info!(
                        segments = session.stats.segments,
                        bytes = session.stats.bytes,
                        "Download stopped"
                    );
                    return Ok(outcome(SessionEnd::Stopped, session, started));
                }
                SessionState::Failed(err) => {
                    error!(error = %err, segments = session.stats.segments, "Download failed");
                    return Err(err);
                }
            };
        }
    }

    async fn poll(&mut self, session: &mut DownloadSession) -> SessionState {
        if self.token.is_cancelled() {
            return SessionState::Stopped;
        }

        session.stats.polls += 1;
        let fetched = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DownloadError::Cancelled),
            manifest = self.playlists.fetch(&session.manifest_url) => manifest,
        };

        match fetched {
            Ok(manifest) => {
                session.retries = 0;
                session.base_url = manifest.base_url.clone();

                if let Err(err) = self.acquire_unseen(session, &manifest).await {
                    debug!(reason = %err, "Segment acquisition interrupted");
                    return SessionState::Stopped;
                }

                if manifest.completed {
                    return SessionState::Completed;
                }

                if pause(&self.token, self.config.poll_interval).await {
                    SessionState::Polling
                } else {
                    SessionState::Stopped
                }
            }
            Err(err) if err.is_stop() => SessionState::Stopped,
            Err(err @ DownloadError::NoSegmentsFound { .. }) => {
                if session.replay_attempted {
                    SessionState::Failed(err)
                } else {
                    info!(reason = %err, "No segments in live playlist");
                    SessionState::SwitchingToReplay
                }
            }
            Err(err) if err.is_transient() => {
                session.retries += 1;
                if session.retries > self.config.max_retries {
                    return SessionState::Failed(DownloadError::RetriesExhausted {
                        attempts: session.retries,
                        source: Box::new(err),
                    });
                }

                warn!(
                    retry = session.retries,
                    max = self.config.max_retries,
                    error = %err,
                    "Failed to get playlist, retrying"
                );
                if pause(&self.token, self.config.retry_delay).await {
                    SessionState::Polling
                } else {
                    SessionState::Stopped
                }
            }
            Err(err) => SessionState::Failed(err),
        }
    }

    fn enter_replay(&self, session: &mut DownloadSession) -> SessionState {
        let replay_url = switch_to_replay(session.manifest_url.as_str());
        let parsed = Url::parse(&replay_url)
            .map_err(|e| DownloadError::invalid_url(replay_url.as_str(), e.to_string()))
            .and_then(|url| base_url_of(&url).map(|base| (url, base)));

        match parsed {
            Ok((url, base)) => {
                info!(url = %url, "Switching to replay mode");
                session.manifest_url = url;
                session.base_url = base;
                session.stats.mode = StreamMode::Replay;
                session.replay_attempted = true;
                session.retries = 0;
                SessionState::Polling
            }
            Err(err) => SessionState::Failed(err),
        }
    }

    /// Appends every segment of `manifest` that is not in the ledger.
    ///
    /// Per-segment failures are logged and left unmarked so the next poll
    /// retries them. Only stop errors are returned.
    async fn acquire_unseen(
        &mut self,
        session: &mut DownloadSession,
        manifest: &Manifest,
    ) -> Result<(), DownloadError> {
        let mut fresh = 0u64;
        let mut failed = 0u64;

        for reference in &manifest.segments {
            if self.token.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            if session.ledger.seen(reference) {
                continue;
            }

            let segment_url = match resolve_reference(&session.base_url, reference) {
                Ok(url) => url,
                Err(err) => {
                    warn!(segment = %reference, error = %err, "Skipping unresolvable segment");
                    failed += 1;
                    continue;
                }
            };

            match self
                .acquirer
                .acquire(&segment_url, &mut self.sink, &self.token)
                .await
            {
                Ok(bytes) => {
                    session.ledger.mark(reference.as_str());
                    session.stats.segments += 1;
                    session.stats.bytes += bytes;
                    fresh += 1;
                    debug!(segment = %reference, bytes, "Segment downloaded");
                }
                Err(err) if err.is_stop() => return Err(err),
                Err(err) => {
                    warn!(segment = %reference, error = %err, "Failed to download segment");
                    failed += 1;
                }
            }
        }

        session.stats.skipped += failed;
        if fresh > 0 || failed > 0 {
            info!(
                new = fresh,
                failed,
                total = session.ledger.len(),
                "Processed playlist segments"
            );
        }
        if manifest.completed && failed > 0 {
            warn!(failed, "Stream ended with segments that could not be downloaded");
        }
        Ok(())
    }
}

fn outcome(end: SessionEnd, session: DownloadSession, started: Instant) -> DownloadOutcome {
    DownloadOutcome {
        end,
        stats: session.stats,
        elapsed: started.elapsed(),
    }
}

/// Sleeps for `delay`. Returns `false` if cancelled first.
async fn pause(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
