// Playlist handling: line scanning of Space playlists, nested playlist
// resolution and the live -> replay URL rewrite.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::DownloadError;
use crate::hls::fetcher::MediaFetcher;

/// Marks the line before a segment reference.
pub const SEGMENT_TAG: &str = "#EXTINF:";
/// Present once the stream has ended.
pub const END_LIST_TAG: &str = "#EXT-X-ENDLIST";
pub const PLAYLIST_EXTENSION: &str = ".m3u8";
/// Name fragment of the multi-variant playlist.
pub const MASTER_PLAYLIST: &str = "master_playlist";

const LIVE_MARKER: &str = "type=live";
const REPLAY_MARKER: &str = "type=replay";
const DYNAMIC_PLAYLIST_FILE: &str = "dynamic_playlist.m3u8";
const MASTER_PLAYLIST_FILE: &str = "master_playlist.m3u8";

/// Result of scanning one playlist document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPlaylist {
    /// Segment references in document order.
    pub segments: Vec<String>,
    /// Whether the end-of-list tag was seen.
    pub completed: bool,
    /// Lines naming another playlist, in document order.
    pub playlists: Vec<String>,
}

/// Scans a playlist body.
///
/// A line starting with [`SEGMENT_TAG`] arms the scanner; the next
/// non-empty line that is not a tag is taken as a segment reference.
pub fn parse_playlist(content: &str) -> ParsedPlaylist {
    let mut parsed = ParsedPlaylist::default();
    let mut expect_segment = false;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.contains(END_LIST_TAG) {
            parsed.completed = true;
        }

        if line.starts_with(SEGMENT_TAG) {
            expect_segment = true;
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if expect_segment {
            parsed.segments.push(line.to_owned());
            expect_segment = false;
        } else if is_playlist_reference(line) {
            parsed.playlists.push(line.to_owned());
        }
    }

    parsed
}

fn is_playlist_reference(line: &str) -> bool {
    let path = line.split(['?', '#']).next().unwrap_or(line);
    path.ends_with(PLAYLIST_EXTENSION)
}

fn is_absolute(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Rewrites the playlist URL of a live Space to its replay counterpart.
///
/// `type=live` becomes `type=replay` and the per-chunk dynamic playlist is
/// swapped for the master playlist. Everything else is preserved.
pub fn switch_to_replay(playlist_url: &str) -> String {
    let replay_url = playlist_url.replacen(LIVE_MARKER, REPLAY_MARKER, 1);
    if replay_url.contains(DYNAMIC_PLAYLIST_FILE) {
        replay_url.replacen(DYNAMIC_PLAYLIST_FILE, MASTER_PLAYLIST_FILE, 1)
    } else {
        replay_url
    }
}

/// Directory of `url`, with a trailing slash and without query or fragment.
pub fn base_url_of(url: &Url) -> Result<Url, DownloadError> {
    url.join(".")
        .map_err(|e| DownloadError::invalid_url(url.as_str(), format!("no base directory: {e}")))
}

/// Resolves a segment or playlist reference against `base`.
///
/// Relative names are appended verbatim so that names containing `:` are
/// never mistaken for a scheme. Root-relative references resolve against the
/// host.
pub fn resolve_reference(base: &Url, reference: &str) -> Result<Url, DownloadError> {
    if reference.starts_with('/') {
        return base
            .join(reference)
            .map_err(|e| DownloadError::invalid_url(reference, e.to_string()));
    }
    let raw = if is_absolute(reference) {
        reference.to_owned()
    } else {
        format!("{}{}", base.as_str(), reference)
    };
    Url::parse(&raw).map_err(|e| DownloadError::invalid_url(raw.as_str(), e.to_string()))
}

/// If any reference is absolute, returns the base directory of the first
/// absolute one and rewrites every reference to its trailing component.
fn normalize_absolute(segments: &mut [String]) -> Result<Option<Url>, DownloadError> {
    let Some(first_absolute) = segments.iter().find(|s| is_absolute(s)) else {
        return Ok(None);
    };
    let first_url = Url::parse(first_absolute)
        .map_err(|e| DownloadError::invalid_url(first_absolute.as_str(), e.to_string()))?;
    let base = base_url_of(&first_url)?;

    for segment in segments.iter_mut() {
        if let Some((_, name)) = segment.rsplit_once('/') {
            *segment = name.to_owned();
        }
    }

    Ok(Some(base))
}

fn same_resource(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.path() == b.path()
}

/// Picks the nested playlist to follow. Media playlists win over master
/// playlists; a master pointer back to the current document is ignored.
fn select_nested(
    candidates: &[String],
    current: &Url,
    base: &Url,
) -> Result<Option<Url>, DownloadError> {
    if let Some(media) = candidates.iter().find(|c| !c.contains(MASTER_PLAYLIST)) {
        return resolve_reference(base, media).map(Some);
    }

    for master in candidates {
        let url = resolve_reference(base, master)?;
        if !same_resource(&url, current) {
            return Ok(Some(url));
        }
    }

    Ok(None)
}

/// One fetched playlist. Never mutated; the next poll supersedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// The playlist the segments were read from (after nested resolution).
    pub url: Url,
    /// Base every segment reference resolves against.
    pub base_url: Url,
    pub segments: Vec<String>,
    pub completed: bool,
}

/// Fetches and parses playlists, following nested playlist pointers.
pub struct ManifestFetcher<F> {
    fetcher: Arc<F>,
    max_nested_depth: u8,
}

impl<F: MediaFetcher> ManifestFetcher<F> {
    pub fn new(fetcher: Arc<F>, max_nested_depth: u8) -> Self {
        Self {
            fetcher,
            max_nested_depth,
        }
    }

    pub async fn fetch(&self, playlist_url: &Url) -> Result<Manifest, DownloadError> {
        let mut current = playlist_url.clone();
        let mut completed = false;
        let mut depth = 0u8;

        loop {
            let content = self.fetcher.fetch_text(&current).await?;
            let parsed = parse_playlist(&content);
            completed |= parsed.completed;
            let mut base_url = base_url_of(&current)?;

            if !parsed.segments.is_empty() {
                let mut segments = parsed.segments;
                if let Some(absolute_base) = normalize_absolute(&mut segments)? {
                    debug!(base = %absolute_base, "Using base URL of absolute segment references");
                    base_url = absolute_base;
                }
                info!(count = segments.len(), completed, "Found audio segments");
                return Ok(Manifest {
                    url: current,
                    base_url,
                    segments,
                    completed,
                });
            }

            let Some(nested) = select_nested(&parsed.playlists, &current, &base_url)? else {
                return Err(DownloadError::no_segments(current.as_str()));
            };

            if depth >= self.max_nested_depth {
                warn!(url = %nested, depth, "Nested playlist depth limit reached");
                return Err(DownloadError::no_segments(current.as_str()));
            }
            depth += 1;

            info!(url = %nested, "Found playlist file, attempting to fetch");
            current = nested;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segments_in_order() {
        let parsed = parse_playlist(
            "#EXTM3U\n#EXT-X-TARGETDURATION:3\n#EXTINF:3.0,\nchunk_1.aac\n#EXTINF:3.0,\nchunk_2.aac\n#EXTINF:3.0,\nchunk_3.aac\n",
        );
        assert_eq!(parsed.segments, ["chunk_1.aac", "chunk_2.aac", "chunk_3.aac"]);
        assert!(!parsed.completed);
        assert!(parsed.playlists.is_empty());
    }

    #[test]
    fn end_list_marks_completion() {
        let parsed =
            parse_playlist("#EXTINF:1\nseg1.aac\n#EXTINF:1\nseg2.aac\n#EXT-X-ENDLIST");
        assert_eq!(parsed.segments, ["seg1.aac", "seg2.aac"]);
        assert!(parsed.completed);

        let early = parse_playlist("#EXT-X-ENDLIST\n#EXTINF:1\nseg1.aac\n");
        assert!(early.completed);
        assert_eq!(early.segments, ["seg1.aac"]);
    }

    #[test]
    fn skips_blank_lines_and_tags_between_marker_and_reference() {
        let parsed = parse_playlist(
            "#EXTINF:2.0,\n\n   \n#EXT-X-PROGRAM-DATE-TIME:2024-01-01T00:00:00Z\n  seg.aac  \r\n",
        );
        assert_eq!(parsed.segments, ["seg.aac"]);
    }

    #[test]
    fn lines_without_marker_are_not_segments() {
        let parsed = parse_playlist("#EXTM3U\nstray.aac\n#EXTINF:1\nreal.aac\nafter.aac\n");
        assert_eq!(parsed.segments, ["real.aac"]);
    }

    #[test]
    fn collects_playlist_pointers() {
        let parsed = parse_playlist(
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=32000\nplaylist_1234.m3u8?type=replay\nmaster_playlist.m3u8\n",
        );
        assert!(parsed.segments.is_empty());
        assert_eq!(
            parsed.playlists,
            ["playlist_1234.m3u8?type=replay", "master_playlist.m3u8"]
        );
    }

    #[test]
    fn replay_rewrite() {
        assert_eq!(
            switch_to_replay("https://cdn.test/a/type=live/dynamic_playlist.m3u8?x=1"),
            "https://cdn.test/a/type=replay/master_playlist.m3u8?x=1"
        );
        assert_eq!(
            switch_to_replay("https://cdn.test/a/playlist.m3u8?type=live"),
            "https://cdn.test/a/playlist.m3u8?type=replay"
        );
        assert_eq!(
            switch_to_replay("https://cdn.test/a/master_playlist.m3u8"),
            "https://cdn.test/a/master_playlist.m3u8"
        );
    }

    #[test]
    fn base_url_drops_file_and_query() {
        let url = Url::parse("https://cdn.test/a/b/dynamic_playlist.m3u8?type=live").unwrap();
        assert_eq!(base_url_of(&url).unwrap().as_str(), "https://cdn.test/a/b/");
    }

    #[test]
    fn resolves_relative_and_absolute_references() {
        let base = Url::parse("https://cdn.test/a/").unwrap();
        assert_eq!(
            resolve_reference(&base, "chunk_1.aac").unwrap().as_str(),
            "https://cdn.test/a/chunk_1.aac"
        );
        assert_eq!(
            resolve_reference(&base, "chunk:1.aac").unwrap().as_str(),
            "https://cdn.test/a/chunk:1.aac"
        );
        assert_eq!(
            resolve_reference(&base, "https://other.test/x/y.aac")
                .unwrap()
                .as_str(),
            "https://other.test/x/y.aac"
        );
    }

    #[test]
    fn root_relative_references_resolve_against_host() {
        let base = Url::parse("https://cdn.test/a/b/").unwrap();
        assert_eq!(
            resolve_reference(&base, "/x/seg.aac").unwrap().as_str(),
            "https://cdn.test/x/seg.aac"
        );
        assert_eq!(
            resolve_reference(&base, "/chunk:1.aac").unwrap().as_str(),
            "https://cdn.test/chunk:1.aac"
        );
    }

    #[test]
    fn absolute_segments_are_rewritten_to_names() {
        let mut segments = vec![
            "https://media.test/audio/seg1.aac".to_owned(),
            "seg2.aac".to_owned(),
            "https://media.test/audio/seg3.aac?t=1".to_owned(),
        ];
        let base = normalize_absolute(&mut segments).unwrap().unwrap();
        assert_eq!(base.as_str(), "https://media.test/audio/");
        assert_eq!(segments, ["seg1.aac", "seg2.aac", "seg3.aac?t=1"]);

        let mut relative = vec!["seg1.aac".to_owned()];
        assert!(normalize_absolute(&mut relative).unwrap().is_none());
    }

    #[test]
    fn nested_selection_prefers_media_playlists() {
        let current = Url::parse("https://cdn.test/a/master_playlist.m3u8?type=replay").unwrap();
        let base = base_url_of(&current).unwrap();

        let picked = select_nested(
            &["master_playlist.m3u8".to_owned(), "playlist_9.m3u8".to_owned()],
            &current,
            &base,
        )
        .unwrap();
        assert_eq!(
            picked.unwrap().as_str(),
            "https://cdn.test/a/playlist_9.m3u8"
        );

        // A master pointer to the document being read would loop.
        let looped = select_nested(&["master_playlist.m3u8".to_owned()], &current, &base).unwrap();
        assert!(looped.is_none());
    }

    #[test]
    fn nested_selection_follows_master_from_dynamic_playlist() {
        let current = Url::parse("https://cdn.test/a/dynamic_playlist.m3u8").unwrap();
        let base = base_url_of(&current).unwrap();
        let picked = select_nested(&["master_playlist.m3u8".to_owned()], &current, &base).unwrap();
        assert_eq!(
            picked.unwrap().as_str(),
            "https://cdn.test/a/master_playlist.m3u8"
        );
    }
}
