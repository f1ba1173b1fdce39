//! Resolves a Space URL to the HLS playlist of its audio stream.
//!
//! ```rust,ignore
//! let credentials = Credentials::new(auth_token, ct0);
//! let spaces = TwitterSpaces::new(url, client, &credentials);
//! let space_id = spaces.extract_space_id()?;
//! let (playlist_url, info) = spaces.get_stream_url(space_id).await?;
//! ```

pub mod extractor;

pub use extractor::error::ExtractorError;
pub use extractor::platforms::twitter::{
    Credentials, SpaceInfo, SpaceMetadata, TwitterSpaces, extract_space_id,
};
