use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::extractor::error::ExtractorError;
use crate::extractor::platform_extractor::Extractor;
use crate::extractor::platforms::twitter::models::{
    AudioSpaceResponse, LiveVideoStreamStatus, SpaceInfo, SpaceMetadata,
};
use crate::extractor::utils::capture_group_1;

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spaces/([^/?#]*)").unwrap());

/// Bearer token of the public web client.
pub const DEFAULT_BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

const STATE_ENDED: &str = "Ended";

/// Returns the Space ID of a URL such as `https://x.com/i/spaces/1vOxwdQbRpXKB?s=20`.
pub fn extract_space_id(url: &str) -> Result<&str, ExtractorError> {
    capture_group_1(&URL_REGEX, url)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ExtractorError::NotFound(url.to_string()))
}

/// Session credentials sent with every API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: String,
    /// CSRF token; sent both as `x-csrf-token` and as the `ct0` cookie.
    pub ct0: String,
    pub auth_token: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            bearer_token: DEFAULT_BEARER_TOKEN.to_string(),
            ct0: String::new(),
            auth_token: String::new(),
        }
    }
}

impl Credentials {
    pub fn new(auth_token: impl Into<String>, ct0: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ct0: ct0.into(),
            ..Self::default()
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = token.into();
        self
    }

    pub fn is_logged_in(&self) -> bool {
        !self.auth_token.is_empty() && !self.ct0.is_empty()
    }
}

/// Decides whether a Space can be recorded and which key locates its stream.
///
/// Returns the resolved state and the stream key.
pub fn resolve_stream_target(metadata: &SpaceMetadata) -> Result<(&str, &str), ExtractorError> {
    let state = metadata
        .resolved_state()
        .ok_or_else(|| ExtractorError::metadata_unavailable("unable to find state information"))?;

    if state == STATE_ENDED && !metadata.replay_available() {
        return Err(ExtractorError::EndedNoReplay);
    }

    let key = metadata
        .stream_key()
        .ok_or_else(|| ExtractorError::metadata_unavailable("unable to find media key"))?;

    Ok((state, key))
}

pub struct TwitterSpaces {
    extractor: Extractor,
    api_base: String,
}

impl TwitterSpaces {
    pub const BASE_URL: &str = "https://twitter.com";
    const AUDIO_SPACE_BY_ID_PATH: &str = "/i/api/graphql/xjTKygiBMpX44KU8ywLohQ/AudioSpaceById";
    const LIVE_VIDEO_STREAM_PATH: &str = "/i/api/1.1/live_video_stream/status";

    pub fn new(platform_url: impl Into<String>, client: Client, credentials: &Credentials) -> Self {
        let mut extractor = Extractor::new(platform_url, client);

        extractor.add_header_typed(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", credentials.bearer_token),
        );
        extractor.add_header_typed(reqwest::header::CONTENT_TYPE, "application/json");
        extractor.add_header_str("X-Twitter-Active-User", "yes");
        extractor.add_header_str("X-Twitter-Client-Language", "en");
        if !credentials.ct0.is_empty() {
            extractor.add_header_str("x-csrf-token", &credentials.ct0);
        }

        extractor.add_cookie("auth_token", credentials.auth_token.as_str());
        extractor.add_cookie("ct0", credentials.ct0.as_str());

        Self {
            extractor,
            api_base: Self::BASE_URL.to_string(),
        }
    }

    /// Points API calls at another origin.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn extract_space_id(&self) -> Result<&str, ExtractorError> {
        extract_space_id(&self.extractor.url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExtractorError> {
        let response = self.extractor.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExtractorError::HttpStatus {
                status,
                url: url.to_string(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Fetches `data.audioSpace.metadata` for a Space.
    pub async fn fetch_space_metadata(
        &self,
        space_id: &str,
    ) -> Result<SpaceMetadata, ExtractorError> {
        let variables = serde_json::json!({
            "id": space_id,
            "isMetatagsQuery": true,
            "withSuperFollowsUserFields": true,
            "withDownvotePerspective": false,
            "withReactionsMetadata": false,
            "withReactionsPerspective": false,
            "withSuperFollowsTweetFields": true,
            "withReplays": true,
        });
        let features = serde_json::json!({
            "spaces_2022_h2_clipping": true,
            "spaces_2022_h2_spaces_communities": true,
            "responsive_web_twitter_blue_verified_badge_is_enabled": true,
            "verified_phone_label_enabled": false,
            "view_counts_public_visibility_enabled": true,
            "longform_notetweets_consumption_enabled": false,
            "tweetypie_unmention_optimization_enabled": true,
            "responsive_web_uc_gql_enabled": true,
            "vibe_api_enabled": true,
            "responsive_web_edit_tweet_api_enabled": true,
            "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
            "view_counts_everywhere_api_enabled": true,
            "standardized_nudges_misinfo": true,
            "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": false,
            "responsive_web_graphql_timeline_navigation_enabled": true,
            "interactive_text_enabled": true,
            "responsive_web_text_conversations_enabled": false,
            "responsive_web_enhance_cards_enabled": false,
        });

        let url = format!("{}{}", self.api_base, Self::AUDIO_SPACE_BY_ID_PATH);
        let response: AudioSpaceResponse = self
            .get_json(
                &url,
                &[
                    ("variables", variables.to_string()),
                    ("features", features.to_string()),
                ],
            )
            .await?;

        let data = response
            .data
            .ok_or_else(|| ExtractorError::metadata_unavailable("no data field in response"))?;
        let audio_space = data.audio_space.ok_or_else(|| {
            ExtractorError::metadata_unavailable("no audioSpace field in response")
        })?;
        let metadata = audio_space
            .metadata
            .ok_or_else(|| ExtractorError::metadata_unavailable("unable to find metadata field"))?;

        debug!(?metadata, "Space metadata");
        Ok(metadata)
    }

    /// Resolves a Space ID to its HLS playlist URL.
    pub async fn get_stream_url(
        &self,
        space_id: &str,
    ) -> Result<(String, SpaceInfo), ExtractorError> {
        let metadata = self.fetch_space_metadata(space_id).await?;
        let (state, media_key) = resolve_stream_target(&metadata)?;

        let url = format!(
            "{}{}/{}",
            self.api_base,
            Self::LIVE_VIDEO_STREAM_PATH,
            media_key
        );
        let status: LiveVideoStreamStatus = self.get_json(&url, &[]).await?;
        let location = status
            .source
            .and_then(|s| s.location)
            .ok_or_else(|| ExtractorError::metadata_unavailable("invalid source location"))?;

        info!(space_id, state, media_key, "Resolved Space stream");

        let info = SpaceInfo {
            space_id: space_id.to_string(),
            title: metadata.title.clone(),
            state: state.to_string(),
            media_key: media_key.to_string(),
            replay_available: metadata.replay_available(),
        };
        Ok((location, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_space_id() {
        assert_eq!(
            extract_space_id("https://twitter.com/i/spaces/1vOxwdQbRpXKB").unwrap(),
            "1vOxwdQbRpXKB"
        );
        assert_eq!(
            extract_space_id("https://x.com/i/spaces/1vOxwdQbRpXKB/peek?s=20").unwrap(),
            "1vOxwdQbRpXKB"
        );
        assert_eq!(
            extract_space_id("https://x.com/i/spaces/1vOxwdQbRpXKB?s=20").unwrap(),
            "1vOxwdQbRpXKB"
        );
        assert_eq!(
            extract_space_id("https://x.com/i/spaces/1vOxwdQbRpXKB-peek").unwrap(),
            "1vOxwdQbRpXKB-peek"
        );
    }

    #[test]
    fn missing_space_id_is_not_found() {
        for url in [
            "https://x.com/home",
            "https://x.com/i/spaces/",
            "https://x.com/i/spaces/?s=1",
            "",
        ] {
            assert!(
                matches!(extract_space_id(url), Err(ExtractorError::NotFound(_))),
                "{url}"
            );
        }
    }

    fn metadata(json: &str) -> SpaceMetadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn running_space_uses_media_key() {
        let meta = metadata(r#"{"state": "Running", "media_key": "28_1", "broadcast_id": "b"}"#);
        assert_eq!(resolve_stream_target(&meta).unwrap(), ("Running", "28_1"));
    }

    #[test]
    fn status_and_broadcast_id_are_fallbacks() {
        let meta = metadata(r#"{"status": "Running", "broadcast_id": "1mnGe"}"#);
        assert_eq!(resolve_stream_target(&meta).unwrap(), ("Running", "1mnGe"));
    }

    #[test]
    fn ended_space_needs_replay() {
        let meta = metadata(
            r#"{"state": "Ended", "is_space_available_for_replay": false, "media_key": "k"}"#,
        );
        assert!(matches!(
            resolve_stream_target(&meta),
            Err(ExtractorError::EndedNoReplay)
        ));

        // Replay flag defaults to available.
        let meta = metadata(r#"{"state": "Ended", "media_key": "k"}"#);
        assert_eq!(resolve_stream_target(&meta).unwrap(), ("Ended", "k"));
    }

    #[test]
    fn missing_fields_are_metadata_errors() {
        let no_state = metadata(r#"{"media_key": "k"}"#);
        assert!(matches!(
            resolve_stream_target(&no_state),
            Err(ExtractorError::MetadataUnavailable(_))
        ));

        let no_key = metadata(r#"{"state": "Running"}"#);
        assert!(matches!(
            resolve_stream_target(&no_key),
            Err(ExtractorError::MetadataUnavailable(_))
        ));
    }

    #[test]
    fn credentials_become_headers_and_cookies() {
        let credentials = Credentials::new("auth", "csrf");
        assert!(credentials.is_logged_in());
        let spaces = TwitterSpaces::new(
            "https://x.com/i/spaces/1abc",
            Client::new(),
            &credentials,
        );

        let extractor = spaces.get_extractor();
        let headers = extractor.get_platform_headers();
        assert_eq!(
            headers[reqwest::header::AUTHORIZATION],
            format!("Bearer {DEFAULT_BEARER_TOKEN}").as_str()
        );
        assert_eq!(headers["x-csrf-token"], "csrf");
        assert_eq!(headers["x-twitter-active-user"], "yes");
        assert_eq!(extractor.get_cookie("auth_token"), Some("auth"));
        assert_eq!(extractor.get_cookie("ct0"), Some("csrf"));
        assert_eq!(spaces.extract_space_id().unwrap(), "1abc");
    }

    #[test]
    fn anonymous_credentials_send_no_session() {
        let credentials = Credentials::default();
        assert!(!credentials.is_logged_in());
        let spaces = TwitterSpaces::new("https://x.com/i/spaces/1abc", Client::new(), &credentials);

        let extractor = spaces.get_extractor();
        assert!(extractor.get_platform_headers().get("x-csrf-token").is_none());
        assert_eq!(extractor.get_cookie("ct0"), None);
    }
}
