use serde::Deserialize;

use crate::extractor::utils::{lenient_bool, lenient_string};

#[derive(Debug, Deserialize)]
pub struct AudioSpaceResponse {
    pub data: Option<AudioSpaceData>,
}

#[derive(Debug, Deserialize)]
pub struct AudioSpaceData {
    #[serde(rename = "audioSpace")]
    pub audio_space: Option<AudioSpace>,
}

#[derive(Debug, Deserialize)]
pub struct AudioSpace {
    pub metadata: Option<SpaceMetadata>,
}

/// `data.audioSpace.metadata` of the `AudioSpaceById` query. Only the fields
/// needed to locate the stream are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub rest_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub media_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub broadcast_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_space_available_for_replay: Option<bool>,
}

impl SpaceMetadata {
    /// `state`, falling back to `status`.
    pub fn resolved_state(&self) -> Option<&str> {
        self.state.as_deref().or(self.status.as_deref())
    }

    /// Replays are assumed available unless the API says otherwise.
    pub fn replay_available(&self) -> bool {
        self.is_space_available_for_replay.unwrap_or(true)
    }

    /// `media_key`, falling back to `broadcast_id`.
    pub fn stream_key(&self) -> Option<&str> {
        self.media_key.as_deref().or(self.broadcast_id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct LiveVideoStreamStatus {
    pub source: Option<StreamSource>,
}

#[derive(Debug, Deserialize)]
pub struct StreamSource {
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
}

/// What is being recorded, for logging by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
    pub space_id: String,
    pub title: Option<String>,
    pub state: String,
    pub media_key: String,
    pub replay_available: bool,
}
