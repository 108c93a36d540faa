//! Protobuf parser for GTFS Realtime feeds.

use prost::Message;

use crate::error::Result;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns [`FeedError::Decode`](crate::error::FeedError::Decode) if the
/// bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Human-readable dump of a decoded feed.
pub fn render_feed(feed: &FeedMessage) -> String {
    format!("{:#?}", feed)
}
