use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nimbus_core::*;
use nimbus_media::{MediaItem, RepeatMode, VideoFrame, VideoPlayer, decode, read_asset};
use nimbus_ui::*;

fn build_player(uri: &str) -> VideoPlayer {
    let mut player = VideoPlayer::builder().build();
    player.set_repeat_mode(RepeatMode::All);
    player.set_play_when_ready(true);
    player.set_volume(0.0);
    match MediaItem::from_uri(uri) {
        Ok(item) => {
            player.set_media_item(item);
            player.prepare();
        }
        Err(e) => log::warn!("video background: {e}"),
    }
    player
}

fn upload(slot: &Cell<Option<ImageHandle>>, frame: &VideoFrame) {
    match slot.get() {
        Some(h) => {
            update_image(h, frame.width, frame.height, frame.rgba.clone());
        }
        None => slot.set(insert_image(frame.width, frame.height, frame.rgba.clone())),
    }
}

/// Muted, looping video filling `modifier`'s rect, cropped to cover it.
///
/// The player is built once per mount and released when the screen goes
/// away; its image is removed right after, so nothing draws a released
/// player. A URI that cannot be played leaves the area blank.
pub fn VideoBackground(uri: &str, modifier: Modifier) -> View {
    let player = remember(|| RefCell::new(build_player(uri)));
    let image = remember(|| Cell::new(None::<ImageHandle>));
    let shown = remember(|| Cell::new(None::<usize>));

    disposable_effect((), {
        let player = player.clone();
        let image = image.clone();
        move || {
            on_unmount(move || {
                player.borrow_mut().release();
                if let Some(h) = image.take() {
                    remove_image(h);
                }
            })
        }
    });

    {
        let mut p = player.borrow_mut();
        p.tick(frame_time());
        if let Some(frame) = p.current_frame() {
            let index = p.frame_index();
            if shown.get() != Some(index) || image.get().is_none() {
                upload(&image, frame);
                shown.set(Some(index));
            }
        }
    }

    Image(modifier, image.get()).image_fit(ImageFit::Cover)
}

/// Still image loaded once per mount from the asset source. A missing or
/// broken asset draws nothing but keeps its size.
pub fn AssetImage(name: &str, modifier: Modifier) -> View {
    let handle: Rc<Option<ImageHandle>> = remember(|| {
        let frames = match read_asset(name).and_then(|bytes| decode(&bytes)) {
            Ok(frames) => frames,
            Err(e) => {
                log::warn!("image {name}: {e}");
                return None;
            }
        };
        let first = frames.get(0)?;
        insert_image(first.width, first.height, first.rgba.clone())
    });

    disposable_effect((), {
        let handle = handle.clone();
        move || {
            on_unmount(move || {
                if let Some(h) = *handle {
                    remove_image(h);
                }
            })
        }
    });

    Image(modifier, *handle)
}
