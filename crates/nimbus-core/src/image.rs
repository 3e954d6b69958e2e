//! Thread-local store of RGBA8 images.
//!
//! Views reference pixels by [`ImageHandle`]; the renderer looks the data up
//! at draw time and re-uploads whenever `generation` moves. Video players
//! write each new frame into their handle with [`update_image`].

use std::cell::RefCell;
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::Rect;

new_key_type! {
    pub struct ImageHandle;
}

#[derive(Clone, Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, `width * height * 4` bytes.
    pub rgba: Arc<[u8]>,
    pub generation: u64,
}

thread_local! {
    static IMAGES: RefCell<SlotMap<ImageHandle, ImageData>> = RefCell::new(SlotMap::with_key());
}

fn valid(width: u32, height: u32, rgba: &[u8]) -> bool {
    rgba.len() == width as usize * height as usize * 4
}

/// Returns `None` when the buffer does not match the given size.
pub fn insert_image(width: u32, height: u32, rgba: Arc<[u8]>) -> Option<ImageHandle> {
    if !valid(width, height, &rgba) {
        log::warn!(
            "insert_image: {} bytes for {}x{} image",
            rgba.len(),
            width,
            height
        );
        return None;
    }
    Some(IMAGES.with(|m| {
        m.borrow_mut().insert(ImageData {
            width,
            height,
            rgba,
            generation: 0,
        })
    }))
}

/// Replaces the pixels behind `handle` and bumps its generation.
pub fn update_image(handle: ImageHandle, width: u32, height: u32, rgba: Arc<[u8]>) -> bool {
    if !valid(width, height, &rgba) {
        log::warn!("update_image: size mismatch for {}x{}", width, height);
        return false;
    }
    IMAGES.with(|m| match m.borrow_mut().get_mut(handle) {
        Some(img) => {
            img.width = width;
            img.height = height;
            img.rgba = rgba;
            img.generation += 1;
            true
        }
        None => false,
    })
}

pub fn remove_image(handle: ImageHandle) -> bool {
    IMAGES.with(|m| m.borrow_mut().remove(handle).is_some())
}

pub fn image_size(handle: ImageHandle) -> Option<(u32, u32)> {
    IMAGES.with(|m| m.borrow().get(handle).map(|i| (i.width, i.height)))
}

pub fn image_exists(handle: ImageHandle) -> bool {
    IMAGES.with(|m| m.borrow().contains_key(handle))
}

pub fn with_image<R>(handle: ImageHandle, f: impl FnOnce(&ImageData) -> R) -> Option<R> {
    IMAGES.with(|m| m.borrow().get(handle).map(f))
}

pub fn image_count() -> usize {
    IMAGES.with(|m| m.borrow().len())
}

/// How an image is fitted into the rect of its view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageFit {
    /// Whole image visible, letterboxed.
    #[default]
    Contain,
    /// Fills the rect, cropping the overflowing axis evenly on both sides.
    Cover,
    /// Stretches to the rect.
    Fill,
}

impl ImageFit {
    /// Destination rect and source uv rect `[u0, v0, u1, v1]` for an image of
    /// `src` pixels drawn into `dst`.
    pub fn place(self, dst: Rect, src: (u32, u32)) -> (Rect, [f32; 4]) {
        let full = [0.0, 0.0, 1.0, 1.0];
        let (sw, sh) = (src.0 as f32, src.1 as f32);
        if sw <= 0.0 || sh <= 0.0 || dst.w <= 0.0 || dst.h <= 0.0 {
            return (dst, full);
        }
        let src_aspect = sw / sh;
        let dst_aspect = dst.w / dst.h;
        match self {
            ImageFit::Fill => (dst, full),
            ImageFit::Contain => {
                let scale = (dst.w / sw).min(dst.h / sh);
                let (w, h) = (sw * scale, sh * scale);
                let r = Rect {
                    x: dst.x + (dst.w - w) * 0.5,
                    y: dst.y + (dst.h - h) * 0.5,
                    w,
                    h,
                };
                (r, full)
            }
            ImageFit::Cover => {
                if src_aspect > dst_aspect {
                    // too wide: crop left/right
                    let visible = dst_aspect / src_aspect;
                    let u0 = (1.0 - visible) * 0.5;
                    (dst, [u0, 0.0, u0 + visible, 1.0])
                } else {
                    let visible = src_aspect / dst_aspect;
                    let v0 = (1.0 - visible) * 0.5;
                    (dst, [0.0, v0, 1.0, v0 + visible])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_crops_symmetrically() {
        let dst = Rect::new(0.0, 0.0, 100.0, 100.0);
        let (r, uv) = ImageFit::Cover.place(dst, (200, 100));
        assert_eq!(r, dst);
        assert!((uv[0] - 0.25).abs() < 1e-6);
        assert!((uv[2] - 0.75).abs() < 1e-6);
        assert_eq!((uv[1], uv[3]), (0.0, 1.0));

        let (r, uv) = ImageFit::Cover.place(dst, (100, 400));
        assert_eq!(r, dst);
        assert!((uv[1] - 0.375).abs() < 1e-6);
        assert!((uv[3] - 0.625).abs() < 1e-6);
    }

    #[test]
    fn contain_letterboxes() {
        let (r, uv) = ImageFit::Contain.place(Rect::new(0.0, 0.0, 100.0, 100.0), (200, 100));
        assert_eq!(r, Rect::new(0.0, 25.0, 100.0, 50.0));
        assert_eq!(uv, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn store_bumps_generation() {
        let h = insert_image(1, 1, Arc::from(vec![1u8, 2, 3, 4])).unwrap();
        assert_eq!(with_image(h, |i| i.generation), Some(0));
        assert!(update_image(h, 1, 1, Arc::from(vec![0u8; 4])));
        assert_eq!(with_image(h, |i| i.generation), Some(1));
        assert!(!update_image(h, 2, 2, Arc::from(vec![0u8; 4])));
        assert!(remove_image(h));
        assert!(!image_exists(h));
        assert!(insert_image(2, 2, Arc::from(vec![0u8; 3])).is_none());
    }
}
