use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat};

use crate::MediaError;

/// Browsers treat tiny GIF delays as "as fast as possible"; we follow the
/// common convention of showing those frames for 100 ms.
pub const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);
pub const FALLBACK_FRAME_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
    /// Zero for still images.
    pub delay: Duration,
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameSequence {
    frames: Vec<VideoFrame>,
}

impl FrameSequence {
    pub fn new(frames: Vec<VideoFrame>) -> Result<Self, MediaError> {
        if frames.is_empty() {
            return Err(MediaError::Empty);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VideoFrame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[VideoFrame] {
        &self.frames
    }

    pub fn total_duration(&self) -> Duration {
        self.frames.iter().map(|f| f.delay).sum()
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1 && !self.total_duration().is_zero()
    }
}

/// Decodes an animated GIF into composited RGBA frames, or any other
/// supported image into a single still frame.
pub fn decode(bytes: &[u8]) -> Result<FrameSequence, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    let format = image::guess_format(bytes)?;
    if format == ImageFormat::Gif {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let frames = decoder
            .into_frames()
            .collect_frames()?
            .into_iter()
            .map(|frame| {
                let mut delay = Duration::from(frame.delay());
                if delay < MIN_FRAME_DELAY {
                    delay = FALLBACK_FRAME_DELAY;
                }
                let buf = frame.into_buffer();
                VideoFrame {
                    width: buf.width(),
                    height: buf.height(),
                    rgba: Arc::from(buf.into_raw()),
                    delay,
                }
            })
            .collect::<Vec<_>>();
        log::debug!("decoded gif: {} frame(s)", frames.len());
        return FrameSequence::new(frames);
    }

    let img = image::load_from_memory_with_format(bytes, format)?.to_rgba8();
    FrameSequence::new(vec![VideoFrame {
        width: img.width(),
        height: img.height(),
        rgba: Arc::from(img.into_raw()),
        delay: Duration::ZERO,
    }])
}

#[cfg(test)]
pub(crate) mod test_media {
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// A `w`x`h` GIF whose frame `i` is filled with `colors[i]`.
    pub fn gif(w: u32, h: u32, colors: &[[u8; 4]], delay_ms: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut out);
            let frames = colors.iter().map(|c| {
                Frame::from_parts(
                    RgbaImage::from_pixel(w, h, Rgba(*c)),
                    0,
                    0,
                    Delay::from_numer_denom_ms(delay_ms, 1),
                )
            });
            enc.encode_frames(frames).unwrap();
        }
        out
    }

    pub fn png(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        RgbaImage::from_pixel(w, h, Rgba(color))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }
}
