pub use crate::color::Color;
pub use crate::effects::{Dispose, disposable_effect, effect, on_unmount, side_effect};
pub use crate::focus::{FocusDirection, FocusManager, FocusRequester, local_focus_manager};
pub use crate::geometry::{Rect, Size, Vec2};
pub use crate::image::{ImageFit, ImageHandle};
pub use crate::locals::{
    Density, Dp, TextScale, Theme, density, dp_to_px, text_scale, theme, with_density,
    with_text_scale, with_theme,
};
pub use crate::modifier::{Fill, Insets, Modifier};
pub use crate::render_api::{GlyphRasterConfig, RenderBackend};
pub use crate::runtime::{
    Frame, Scheduler, frame_time, remember, remember_state, remember_state_with_key,
    remember_with_key,
};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::semantics::{Role, Semantics};
pub use crate::signal::{Signal, signal};
pub use crate::text_input::{
    ImeAction, KeyboardActions, KeyboardOptions, KeyboardType, VisualTransformation,
};
pub use crate::view::{IconGlyph, Scene, SceneNode, View, ViewId, ViewKind};
pub use taffy::{AlignItems, JustifyContent};
