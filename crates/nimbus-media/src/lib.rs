//! Media plumbing for Nimbus apps.
//!
//! - [`MediaUri`] / [`MediaItem`]: what to play
//! - [`assets`]: where bundled files come from
//! - [`decode`]: bytes to RGBA frames (animated GIF, PNG, JPEG)
//! - [`VideoPlayer`]: a looping frame player driven by the frame clock
//!
//! ```
//! use nimbus_media::{MediaItem, RepeatMode, VideoPlayer};
//!
//! let mut player = VideoPlayer::builder().build();
//! player.set_media_item(MediaItem::from_uri("asset:///clouds.gif").unwrap());
//! player.set_repeat_mode(RepeatMode::All);
//! player.set_play_when_ready(true);
//! player.set_volume(0.0);
//! assert!(player.current_frame().is_none());
//! player.release();
//! ```

pub mod assets;
pub mod decode;
mod error;
pub mod player;
pub mod registry;
mod uri;

pub use assets::{
    AssetSource, DirAssets, MemoryAssets, asset_source, read_asset, set_asset_source,
};
pub use decode::{FrameSequence, VideoFrame, decode};
pub use error::MediaError;
pub use player::{AssetLoader, MediaLoader, PlayerState, RepeatMode, VideoPlayer};
pub use registry::{PlayerHandle, PlayerStats};
pub use uri::{MediaItem, MediaUri};
