use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assets::{AssetSource, asset_source, read_uri};
use crate::decode::{FrameSequence, VideoFrame, decode};
use crate::registry::{self, PlayerHandle};
use crate::{MediaError, MediaItem};

/// Turns a media item into decoded frames.
pub trait MediaLoader {
    fn load(&self, item: &MediaItem) -> Result<FrameSequence, MediaError>;
}

/// Loads through an [`AssetSource`]; the process-wide one unless a
/// source is given explicitly.
#[derive(Clone, Default)]
pub struct AssetLoader {
    source: Option<Arc<dyn AssetSource>>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source: Some(source),
        }
    }
}

impl MediaLoader for AssetLoader {
    fn load(&self, item: &MediaItem) -> Result<FrameSequence, MediaError> {
        let source = self.source.clone().unwrap_or_else(asset_source);
        let bytes = read_uri(&item.uri, source.as_ref())?;
        decode(&bytes)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepeatMode {
    /// Stop on the last frame.
    #[default]
    Off,
    /// Loop the current item.
    One,
    /// Loop the whole playlist. With a single item this is the same as `One`.
    All,
}

impl RepeatMode {
    fn wraps(self) -> bool {
        !matches!(self, RepeatMode::Off)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    Ready,
    Ended,
    Released,
}

#[derive(Default)]
pub struct VideoPlayerBuilder {
    loader: Option<Box<dyn MediaLoader>>,
}

impl VideoPlayerBuilder {
    pub fn loader(mut self, loader: impl MediaLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn build(self) -> VideoPlayer {
        let handle = registry::acquire();
        log::debug!("{handle} created");
        VideoPlayer {
            handle,
            loader: self
                .loader
                .unwrap_or_else(|| Box::new(AssetLoader::new())),
            item: None,
            repeat: RepeatMode::Off,
            play_when_ready: false,
            volume: 1.0,
            state: PlayerState::Idle,
            frames: None,
            index: 0,
            in_frame: Duration::ZERO,
            last_tick: None,
            last_error: None,
        }
    }
}

/// Frame-sequence player modelled on a platform video player: set an item,
/// `prepare()`, then drive it with `tick(now)` once per rendered frame.
///
/// Must be `release()`d; dropping a live player is counted as a leak.
pub struct VideoPlayer {
    handle: PlayerHandle,
    loader: Box<dyn MediaLoader>,
    item: Option<MediaItem>,
    repeat: RepeatMode,
    play_when_ready: bool,
    volume: f32,
    state: PlayerState,
    frames: Option<FrameSequence>,
    index: usize,
    in_frame: Duration,
    last_tick: Option<Instant>,
    last_error: Option<MediaError>,
}

impl VideoPlayer {
    pub fn builder() -> VideoPlayerBuilder {
        VideoPlayerBuilder::default()
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn media_item(&self) -> Option<&MediaItem> {
        self.item.as_ref()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn last_error(&self) -> Option<&MediaError> {
        self.last_error.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.state == PlayerState::Released
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Ready && self.play_when_ready
    }

    pub fn frame_index(&self) -> usize {
        self.index
    }

    pub fn frame_count(&self) -> usize {
        self.frames.as_ref().map_or(0, FrameSequence::len)
    }

    fn live(&self, op: &str) -> bool {
        if self.is_released() {
            log::warn!("{}: {op} after release ignored", self.handle);
            return false;
        }
        true
    }

    /// Replaces the item. A prepared player goes back to `Idle` and must be
    /// prepared again.
    pub fn set_media_item(&mut self, item: MediaItem) {
        if !self.live("set_media_item") {
            return;
        }
        self.item = Some(item);
        self.frames = None;
        self.state = PlayerState::Idle;
        self.rewind();
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.live("set_repeat_mode") {
            self.repeat = mode;
            if mode.wraps() && self.state == PlayerState::Ended {
                self.state = PlayerState::Ready;
                self.rewind();
            }
        }
    }

    pub fn set_play_when_ready(&mut self, play: bool) {
        if self.live("set_play_when_ready") {
            self.play_when_ready = play;
            // Paused time does not advance the frame clock.
            self.last_tick = None;
        }
    }

    pub fn play(&mut self) {
        self.set_play_when_ready(true);
    }

    pub fn pause(&mut self) {
        self.set_play_when_ready(false);
    }

    /// Clamped to `0.0..=1.0`. Frame sequences carry no audio track, the
    /// value is kept for parity with audio-capable backends.
    pub fn set_volume(&mut self, volume: f32) {
        if self.live("set_volume") {
            self.volume = if volume.is_nan() {
                0.0
            } else {
                volume.clamp(0.0, 1.0)
            };
        }
    }

    /// Loads and decodes the current item. On failure the player stays
    /// `Idle`, keeps the error in [`last_error`](Self::last_error) and
    /// shows no frame.
    pub fn prepare(&mut self) {
        if !self.live("prepare") {
            return;
        }
        let Some(item) = self.item.clone() else {
            log::warn!("{}: prepare without a media item", self.handle);
            return;
        };
        self.rewind();
        match self.loader.load(&item) {
            Ok(frames) => {
                log::info!(
                    "{}: prepared {} ({} frame(s), {:?})",
                    self.handle,
                    item.uri,
                    frames.len(),
                    frames.total_duration()
                );
                self.frames = Some(frames);
                self.state = PlayerState::Ready;
                self.last_error = None;
            }
            Err(e) => {
                log::warn!("{}: failed to load {}: {e}", self.handle, item.uri);
                self.frames = None;
                self.state = PlayerState::Idle;
                self.last_error = Some(e);
            }
        }
    }

    fn rewind(&mut self) {
        self.index = 0;
        self.in_frame = Duration::ZERO;
        self.last_tick = None;
    }

    /// Advances playback to `now`. Returns true when the visible frame
    /// changed. The first tick after play/prepare only sets the clock.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_playing() {
            self.last_tick = None;
            return false;
        }
        let Some(prev) = self.last_tick.replace(now) else {
            return false;
        };
        let Some(frames) = self.frames.as_ref() else {
            return false;
        };
        if !frames.is_animated() {
            return false;
        }
        let before = self.index;
        let total = frames.total_duration();
        self.in_frame += now.saturating_duration_since(prev);
        if self.repeat.wraps() && self.in_frame >= total {
            // A whole loop lands on the same frame with the same offset.
            let rem = self.in_frame.as_nanos() % total.as_nanos();
            self.in_frame = Duration::from_nanos(rem as u64);
        }
        loop {
            let delay = frames.frames()[self.index].delay;
            if delay.is_zero() || self.in_frame < delay {
                break;
            }
            self.in_frame -= delay;
            if self.index + 1 < frames.len() {
                self.index += 1;
            } else if self.repeat.wraps() {
                self.index = 0;
            } else {
                self.in_frame = Duration::ZERO;
                self.state = PlayerState::Ended;
                log::debug!("{}: playback ended", self.handle);
                break;
            }
        }
        self.index != before
    }

    pub fn current_frame(&self) -> Option<&VideoFrame> {
        match self.state {
            PlayerState::Ready | PlayerState::Ended => self.frames.as_ref()?.get(self.index),
            PlayerState::Idle | PlayerState::Released => None,
        }
    }

    /// Frees decoded frames. Releasing twice is a caller bug: it is logged
    /// and counted, nothing else happens.
    pub fn release(&mut self) {
        if self.is_released() {
            log::error!("{}: released twice", self.handle);
            registry::note_double_release();
            return;
        }
        self.free();
        registry::note_released();
        log::info!("{} released", self.handle);
    }

    fn free(&mut self) {
        self.state = PlayerState::Released;
        self.frames = None;
        self.play_when_ready = false;
        self.rewind();
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        if !self.is_released() {
            log::warn!("{} dropped without release()", self.handle);
            registry::note_leaked();
            self.free();
        }
    }
}

impl std::fmt::Debug for VideoPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoPlayer")
            .field("handle", &self.handle)
            .field("item", &self.item)
            .field("state", &self.state)
            .field("repeat", &self.repeat)
            .field("play_when_ready", &self.play_when_ready)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::decode::test_media;
    use crate::registry::{reset_stats, stats};

    const A: [u8; 4] = [10, 20, 30, 255];
    const B: [u8; 4] = [40, 50, 60, 255];
    const C: [u8; 4] = [70, 80, 90, 255];

    fn loader() -> AssetLoader {
        let assets = MemoryAssets::new()
            .with("clouds.gif", test_media::gif(2, 2, &[A, B, C], 100))
            .with("logo.png", test_media::png(3, 3, A));
        AssetLoader::with_source(Arc::new(assets))
    }

    fn looping(uri: &str) -> VideoPlayer {
        let mut p = VideoPlayer::builder().loader(loader()).build();
        p.set_media_item(MediaItem::from_uri(uri).unwrap());
        p.set_repeat_mode(RepeatMode::All);
        p.set_play_when_ready(true);
        p.prepare();
        p
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn prepared_player_shows_first_frame() {
        let mut p = looping("asset:///clouds.gif");
        assert_eq!(p.state(), PlayerState::Ready);
        assert!(p.is_playing());
        assert_eq!(p.frame_count(), 3);
        assert_eq!(&p.current_frame().unwrap().rgba[..4], &A);
        p.release();
    }

    #[test]
    fn looping_wraps_and_skips_whole_cycles() {
        let mut p = looping("asset:///clouds.gif");
        let t0 = Instant::now();
        assert!(!p.tick(t0));
        assert!(!p.tick(t0 + ms(50)));
        assert!(p.tick(t0 + ms(100)));
        assert_eq!(p.frame_index(), 1);
        assert!(p.tick(t0 + ms(300)));
        assert_eq!(p.frame_index(), 0);
        // Ten full loops later we are back on the same frame.
        assert!(!p.tick(t0 + ms(3300)));
        assert_eq!(p.frame_index(), 0);
        assert_eq!(p.state(), PlayerState::Ready);
        p.release();
    }

    #[test]
    fn repeat_off_ends_on_last_frame() {
        let mut p = looping("asset:///clouds.gif");
        p.set_repeat_mode(RepeatMode::Off);
        let t0 = Instant::now();
        p.tick(t0);
        p.tick(t0 + ms(1000));
        assert_eq!(p.state(), PlayerState::Ended);
        assert_eq!(p.frame_index(), 2);
        assert_eq!(&p.current_frame().unwrap().rgba[..4], &C);
        assert!(!p.is_playing());
        p.release();
    }

    #[test]
    fn paused_time_is_not_counted() {
        let mut p = looping("asset:///clouds.gif");
        let t0 = Instant::now();
        p.tick(t0);
        p.pause();
        assert!(!p.tick(t0 + ms(500)));
        p.play();
        p.tick(t0 + ms(10_000));
        assert_eq!(p.frame_index(), 0);
        assert!(p.tick(t0 + ms(10_100)));
        assert_eq!(p.frame_index(), 1);
        p.release();
    }

    #[test]
    fn still_images_never_advance() {
        let mut p = looping("asset:///logo.png");
        let t0 = Instant::now();
        p.tick(t0);
        assert!(!p.tick(t0 + ms(5000)));
        assert_eq!(p.current_frame().unwrap().width, 3);
        p.release();
    }

    #[test]
    fn missing_media_keeps_player_idle() {
        let mut p = looping("asset:///nope.gif");
        assert_eq!(p.state(), PlayerState::Idle);
        assert!(p.current_frame().is_none());
        assert!(matches!(p.last_error(), Some(MediaError::AssetNotFound(_))));
        assert!(!p.tick(Instant::now()));
        p.release();
    }

    #[test]
    fn volume_is_clamped() {
        let mut p = VideoPlayer::builder().loader(loader()).build();
        p.set_volume(2.0);
        assert_eq!(p.volume(), 1.0);
        p.set_volume(-1.0);
        assert_eq!(p.volume(), 0.0);
        p.release();
    }

    #[test]
    fn release_is_counted_once() {
        reset_stats();
        let mut p = looping("asset:///clouds.gif");
        assert_eq!(stats().live(), 1);
        p.release();
        assert!(p.current_frame().is_none());
        p.release();
        p.prepare();
        assert_eq!(p.state(), PlayerState::Released);
        drop(p);
        let s = stats();
        assert_eq!((s.acquired, s.released, s.double_release, s.leaked), (1, 1, 1, 0));
        assert_eq!(s.live(), 0);
    }

    #[test]
    fn dropping_unreleased_player_is_a_leak() {
        reset_stats();
        drop(looping("asset:///clouds.gif"));
        let s = stats();
        assert_eq!((s.acquired, s.released, s.leaked), (1, 0, 1));
        assert_eq!(s.live(), 0);
    }
}
