mod builder;
mod models;

pub use builder::{
    Credentials, DEFAULT_BEARER_TOKEN, TwitterSpaces, URL_REGEX, extract_space_id,
    resolve_stream_target,
};
pub use models::{SpaceInfo, SpaceMetadata};
