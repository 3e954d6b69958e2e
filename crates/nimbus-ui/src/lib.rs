#![allow(non_snake_case)]
//! Widgets, layout and text fields.

pub mod textfield;
pub mod toast;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Instant;

use nimbus_core::*;
use taffy::prelude::{
    AvailableSpace, Display, FlexDirection, GridTemplateComponent, Line, NodeId, Style,
    TaffyTree, flex, length, percent,
};
use taffy::style_helpers::{line, span};

pub use textfield::{TextField, TextFieldExt, TextFieldState};

use crate::textfield::{
    TF_FONT_DP, TF_HEIGHT_DP, TF_ICON_DP, TF_ICON_TEXT_X_DP, TF_LABEL_FLOAT_DP, TF_PADDING_X_DP,
    measure_text, sanitize_single_line,
};

#[derive(Default)]
pub struct Interactions {
    pub hover: Option<u64>,
    pub pressed: HashSet<u64>,
}

/// Editing state per text field, owned by the platform across frames.
pub type TextFieldStates = HashMap<u64, Rc<RefCell<TextFieldState>>>;

pub fn Surface(modifier: Modifier, child: View) -> View {
    let mut v = View::new(0, ViewKind::Surface).modifier(modifier);
    v.children = vec![child];
    v
}

pub fn Box(modifier: Modifier) -> View {
    View::new(0, ViewKind::Box).modifier(modifier)
}

pub fn Row(modifier: Modifier) -> View {
    View::new(0, ViewKind::Row).modifier(modifier)
}

pub fn Column(modifier: Modifier) -> View {
    View::new(0, ViewKind::Column).modifier(modifier)
}

/// Children are drawn on top of each other, first child at the bottom.
pub fn Stack(modifier: Modifier) -> View {
    View::new(0, ViewKind::Stack).modifier(modifier)
}

pub fn Text(text: impl Into<String>) -> View {
    View::new(
        0,
        ViewKind::Text {
            text: text.into(),
            color: Color::WHITE,
            font_size: 16.0, // dp (converted to px in layout/paint)
        },
    )
}

pub fn Spacer() -> View {
    Box(Modifier::new().flex_grow(1.0))
}

pub fn Icon(glyph: IconGlyph, tint: Color) -> View {
    View::new(0, ViewKind::Icon { glyph, tint }).modifier(Modifier::new().size(24.0, 24.0))
}

/// Draws the image behind `handle`; `None` or a removed handle draws nothing.
pub fn Image(modifier: Modifier, handle: Option<ImageHandle>) -> View {
    View::new(
        0,
        ViewKind::Image {
            handle,
            tint: Color::WHITE,
            fit: ImageFit::Contain,
        },
    )
    .modifier(modifier)
}

pub trait ImageExt {
    fn image_tint(self, c: Color) -> View;
    fn image_fit(self, fit: ImageFit) -> View;
}
impl ImageExt for View {
    fn image_tint(mut self, c: Color) -> View {
        if let ViewKind::Image { tint, .. } = &mut self.kind {
            *tint = c;
        }
        self
    }
    fn image_fit(mut self, fit: ImageFit) -> View {
        if let ViewKind::Image { fit: f, .. } = &mut self.kind {
            *f = fit;
        }
        self
    }
}

pub fn Button(text: impl Into<String>, on_click: impl Fn() + 'static) -> View {
    let text = text.into();
    View::new(
        0,
        ViewKind::Button {
            text: text.clone(),
            on_click: Some(Rc::new(on_click)),
            container: None,
            content: Color::WHITE,
        },
    )
    .semantics(Semantics::new(Role::Button).label(text))
}

/// Button without a container, label in the theme's primary color.
pub fn TextButton(text: impl Into<String>, on_click: impl Fn() + 'static) -> View {
    Button(text, on_click).button_colors(Color::TRANSPARENT, theme().primary)
}

pub trait ButtonStyle {
    fn button_colors(self, container: Color, content: Color) -> View;
}
impl ButtonStyle for View {
    fn button_colors(mut self, c: Color, fg: Color) -> View {
        if let ViewKind::Button {
            container, content, ..
        } = &mut self.kind
        {
            *container = Some(c);
            *content = fg;
        }
        self
    }
}

/// Horizontal rule spanning the available width.
pub fn Divider(color: Color, thickness: f32) -> View {
    View::new(0, ViewKind::Divider { color, thickness })
        .modifier(Modifier::new().fill_max_width())
}

/// Extension trait for child building
pub trait ViewExt: Sized {
    fn child(self, children: impl IntoChildren) -> Self;
}

impl ViewExt for View {
    fn child(self, children: impl IntoChildren) -> Self {
        self.with_children(children.into_children())
    }
}

pub trait IntoChildren {
    fn into_children(self) -> Vec<View>;
}

impl IntoChildren for View {
    fn into_children(self) -> Vec<View> {
        vec![self]
    }
}

impl IntoChildren for Vec<View> {
    fn into_children(self) -> Vec<View> {
        self
    }
}

impl<const N: usize> IntoChildren for [View; N] {
    fn into_children(self) -> Vec<View> {
        self.into()
    }
}

impl IntoChildren for Option<View> {
    fn into_children(self) -> Vec<View> {
        self.into_iter().collect()
    }
}

// Tuple implementations
macro_rules! impl_into_children_tuple {
    ($($idx:tt $t:ident),+) => {
        impl<$($t: IntoChildren),+> IntoChildren for ($($t,)+) {
            fn into_children(self) -> Vec<View> {
                let mut v = Vec::new();
                $(v.extend(self.$idx.into_children());)+
                v
            }
        }
    };
}

impl_into_children_tuple!(0 A, 1 B);
impl_into_children_tuple!(0 A, 1 B, 2 C);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_into_children_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

/// Method styling
pub trait TextStyle {
    fn color(self, c: Color) -> View;
    fn size(self, px: f32) -> View;
}
impl TextStyle for View {
    fn color(mut self, c: Color) -> View {
        if let ViewKind::Text {
            color: text_color, ..
        } = &mut self.kind
        {
            *text_color = c;
        }
        self
    }
    fn size(mut self, dp_font: f32) -> View {
        if let ViewKind::Text {
            font_size: text_size_dp,
            ..
        } = &mut self.kind
        {
            *text_size_dp = dp_font;
        }
        self
    }
}

#[derive(Clone)]
enum NodeCtx {
    Text { text: String, font_dp: f32 },
    Button { label: String },
    TextField,
    Icon,
    Divider { thickness_dp: f32 },
    Container,
}

fn font_px(dp_font: f32) -> f32 {
    dp_to_px(dp_font) * text_scale().0
}

// Rough glyph-width estimate, shared by measure and paint.
fn approx_text_w(text: &str, size_px: f32) -> f32 {
    text.chars().count() as f32 * size_px * 0.6
}

fn is_container(kind: &ViewKind) -> bool {
    matches!(
        kind,
        ViewKind::Surface | ViewKind::Box | ViewKind::Row | ViewKind::Column | ViewKind::Stack
    )
}

fn edges<T: taffy::style_helpers::FromLength>(e: Insets) -> taffy::geometry::Rect<T> {
    taffy::geometry::Rect {
        left: length(dp_to_px(e.left)),
        right: length(dp_to_px(e.right)),
        top: length(dp_to_px(e.top)),
        bottom: length(dp_to_px(e.bottom)),
    }
}

fn style_from_modifier(m: &Modifier, kind: &ViewKind) -> Style {
    let px = dp_to_px;
    let mut s = Style::default();

    s.display = match kind {
        ViewKind::Stack => Display::Grid,
        _ => Display::Flex,
    };

    let is_row = matches!(kind, ViewKind::Row);
    let is_column = matches!(kind, ViewKind::Column | ViewKind::Surface);
    if is_row {
        s.flex_direction = FlexDirection::Row;
    }
    if is_column {
        s.flex_direction = FlexDirection::Column;
    }
    if matches!(kind, ViewKind::Stack) {
        // one cell that every child occupies
        s.grid_template_rows = vec![GridTemplateComponent::Single(flex(1.0))];
        s.grid_template_columns = vec![GridTemplateComponent::Single(flex(1.0))];
    }

    s.align_items = if is_container(kind) {
        Some(AlignItems::Stretch)
    } else {
        Some(AlignItems::FlexStart)
    };
    s.justify_content = Some(JustifyContent::FlexStart);

    if let Some(a) = m.align_items {
        s.align_items = Some(a);
    }
    if let Some(j) = m.justify_content {
        s.justify_content = Some(j);
    }
    if let Some(g) = m.gap.map(|g| length(px(g))) {
        s.gap = taffy::geometry::Size {
            width: g,
            height: g,
        };
    }
    if let Some(w) = m.weight {
        s.flex_grow = w;
    }

    s.padding = edges(m.padding);
    s.margin = edges(m.margin);

    // Explicit size wins over fill.
    if let Some(w) = m.width {
        s.size.width = length(px(w));
    }
    if let Some(h) = m.height {
        s.size.height = length(px(h));
    }
    let fill_w = m.fill.width && m.width.is_none();
    let fill_h = m.fill.height && m.height.is_none();

    // Filling the main axis takes the leftover space; the cross axis is
    // pinned to the parent's extent.
    let (fill_main, fill_cross) = if is_row {
        (fill_w, fill_h)
    } else {
        (fill_h, fill_w)
    };
    if fill_main {
        s.flex_grow = s.flex_grow.max(1.0);
        s.flex_shrink = s.flex_shrink.max(1.0);
        s.flex_basis = length(0.0);
        if is_row {
            s.min_size.width = length(0.0);
        } else {
            s.min_size.height = length(0.0);
        }
    }
    if fill_cross {
        if is_row {
            s.min_size.height = percent(1.0);
            s.max_size.height = percent(1.0);
        } else {
            s.min_size.width = percent(1.0);
            s.max_size.width = percent(1.0);
        }
    }

    s
}

fn build_node(
    v: &View,
    in_stack: bool,
    t: &mut TaffyTree<NodeCtx>,
    nodes_map: &mut HashMap<ViewId, NodeId>,
) -> Result<NodeId, taffy::TaffyError> {
    let mut style = style_from_modifier(&v.modifier, &v.kind);
    if in_stack {
        style.grid_row = Line {
            start: line(1),
            end: span(1),
        };
        style.grid_column = Line {
            start: line(1),
            end: span(1),
        };
    }

    let ctx = match &v.kind {
        ViewKind::Text { text, font_size, .. } => NodeCtx::Text {
            text: text.clone(),
            font_dp: *font_size,
        },
        ViewKind::Button { text, .. } => NodeCtx::Button {
            label: text.clone(),
        },
        ViewKind::TextField { .. } => NodeCtx::TextField,
        ViewKind::Icon { .. } => NodeCtx::Icon,
        ViewKind::Divider { thickness, .. } => NodeCtx::Divider {
            thickness_dp: *thickness,
        },
        _ => NodeCtx::Container,
    };

    let node = if is_container(&v.kind) {
        let stack = matches!(v.kind, ViewKind::Stack);
        let children = v
            .children
            .iter()
            .map(|c| build_node(c, stack, t, nodes_map))
            .collect::<Result<Vec<_>, _>>()?;
        let n = t.new_with_children(style, &children)?;
        t.set_node_context(n, Some(ctx))?;
        n
    } else {
        t.new_leaf_with_context(style, ctx)?
    };

    nodes_map.insert(v.id, node);
    Ok(node)
}

fn measure(
    known: taffy::geometry::Size<Option<f32>>,
    ctx: Option<&mut NodeCtx>,
) -> taffy::geometry::Size<f32> {
    let px = dp_to_px;
    match ctx {
        Some(NodeCtx::Text { text, font_dp }) => {
            let size_px = font_px(*font_dp);
            taffy::geometry::Size {
                width: known.width.unwrap_or(approx_text_w(text, size_px)),
                height: known.height.unwrap_or(size_px * 1.3),
            }
        }
        Some(NodeCtx::Button { label }) => taffy::geometry::Size {
            width: known
                .width
                .unwrap_or(approx_text_w(label, font_px(16.0)) + px(24.0)),
            height: known.height.unwrap_or(px(48.0)),
        },
        Some(NodeCtx::TextField) => taffy::geometry::Size {
            width: known.width.unwrap_or(px(280.0)),
            height: known.height.unwrap_or(px(TF_HEIGHT_DP)),
        },
        Some(NodeCtx::Icon) => taffy::geometry::Size {
            width: known.width.unwrap_or(px(24.0)),
            height: known.height.unwrap_or(px(24.0)),
        },
        Some(NodeCtx::Divider { thickness_dp }) => taffy::geometry::Size {
            width: known.width.unwrap_or(0.0),
            height: known.height.unwrap_or(px(*thickness_dp)),
        },
        Some(NodeCtx::Container) | None => taffy::geometry::Size::ZERO,
    }
}

fn layout_of(node: NodeId, t: &TaffyTree<NodeCtx>) -> Result<Rect, taffy::TaffyError> {
    let l = t.layout(node)?;
    Ok(Rect {
        x: l.location.x,
        y: l.location.y,
        w: l.size.width,
        h: l.size.height,
    })
}

fn round_radius(r: f32, rect: Rect) -> f32 {
    r.max(0.0).min(rect.w * 0.5).min(rect.h * 0.5)
}

/// Paint output and per-frame inputs shared by the whole walk.
struct Painter<'a> {
    scene: Scene,
    hits: Vec<HitRegion>,
    sems: Vec<SemNode>,
    textfield_states: &'a mut TextFieldStates,
    seen_fields: HashSet<u64>,
    interactions: &'a Interactions,
    focus: &'a FocusManager,
    now: Instant,
}

/// Layout and paint with TextField state injection (Taffy 0.9 API).
///
/// Ids are stamped depth-first starting at 1, so they are stable as long as
/// the shape of the tree is. Focus requesters found on the way are bound to
/// their view. Editing state of fields that left the tree is dropped.
pub fn layout_and_paint(
    root: &View,
    size_px_u32: (u32, u32),
    textfield_states: &mut TextFieldStates,
    interactions: &Interactions,
    focus: &FocusManager,
) -> (Scene, Vec<HitRegion>, Vec<SemNode>) {
    match try_layout_and_paint(root, size_px_u32, textfield_states, interactions, focus) {
        Ok(out) => out,
        Err(e) => {
            log::error!("layout failed: {e:?}");
            (
                Scene {
                    clear_color: theme().background,
                    nodes: vec![],
                },
                vec![],
                vec![],
            )
        }
    }
}

fn try_layout_and_paint(
    root: &View,
    size_px_u32: (u32, u32),
    textfield_states: &mut TextFieldStates,
    interactions: &Interactions,
    focus: &FocusManager,
) -> Result<(Scene, Vec<HitRegion>, Vec<SemNode>), taffy::TaffyError> {
    // Assign ids
    let mut id = 1u64;
    fn stamp(mut v: View, id: &mut u64) -> View {
        v.id = *id;
        *id += 1;
        v.children = v.children.into_iter().map(|c| stamp(c, id)).collect();
        v
    }
    let root = stamp(root.clone(), &mut id);

    let mut taffy: TaffyTree<NodeCtx> = TaffyTree::new();
    let mut nodes_map = HashMap::new();
    let root_node = build_node(&root, false, &mut taffy, &mut nodes_map)?;

    {
        let mut rs = taffy.style(root_node)?.clone();
        rs.size.width = length(size_px_u32.0 as f32);
        rs.size.height = length(size_px_u32.1 as f32);
        taffy.set_style(root_node, rs)?;
    }

    let available = taffy::geometry::Size {
        width: AvailableSpace::Definite(size_px_u32.0 as f32),
        height: AvailableSpace::Definite(size_px_u32.1 as f32),
    };
    taffy.compute_layout_with_measure(root_node, available, |known, _avail, _node, ctx, _style| {
        measure(known, ctx)
    })?;

    let mut p = Painter {
        scene: Scene {
            clear_color: theme().background,
            nodes: vec![],
        },
        hits: vec![],
        sems: vec![],
        textfield_states,
        seen_fields: HashSet::new(),
        interactions,
        focus,
        now: frame_time(),
    };

    walk(&root, &taffy, &nodes_map, &mut p, (0.0, 0.0))?;

    let seen = std::mem::take(&mut p.seen_fields);
    p.textfield_states.retain(|k, _| seen.contains(k));

    if let Some(t) = toast::active(p.now).last() {
        paint_toast(&mut p.scene, &t.message, size_px_u32);
    }

    Ok((p.scene, p.hits, p.sems))
}

fn walk(
    v: &View,
    t: &TaffyTree<NodeCtx>,
    nodes: &HashMap<ViewId, NodeId>,
    p: &mut Painter<'_>,
    parent_offset_px: (f32, f32),
) -> Result<(), taffy::TaffyError> {
    let Some(&node) = nodes.get(&v.id) else {
        return Ok(());
    };
    let local = layout_of(node, t)?;
    let rect = Rect {
        x: local.x + parent_offset_px.0,
        y: local.y + parent_offset_px.1,
        ..local
    };
    let base_px = (rect.x, rect.y);

    let is_focused = p.focus.is_focused(v.id);
    let th = theme();

    if let Some(r) = &v.modifier.focus_requester {
        r.attach(v.id, p.focus);
    }

    let corner = v.modifier.corner.map(dp_to_px).unwrap_or(0.0);

    if let Some(bg) = v.modifier.background {
        p.scene.nodes.push(SceneNode::Rect {
            rect,
            color: bg,
            radius: round_radius(corner, rect),
        });
    }

    let label_of = |v: &View| {
        v.modifier
            .semantics
            .as_ref()
            .or(v.semantics.as_ref())
            .and_then(|s| s.label.clone())
    };

    match &v.kind {
        ViewKind::Text {
            text,
            color,
            font_size,
        } => {
            let size_px = font_px(*font_size);
            let line_h = size_px * 1.3;
            let mut draw_box = rect;
            let dy = (draw_box.h - line_h) * 0.5;
            if dy.is_finite() {
                draw_box.y += dy.max(0.0);
                draw_box.h = line_h;
            }
            p.scene.nodes.push(SceneNode::Text {
                rect: draw_box,
                text: text.clone(),
                color: *color,
                size: size_px,
            });
            p.sems.push(
                SemNode::new(v.id, Role::Text, text.clone(), rect)
                    .focused(is_focused),
            );
        }

        ViewKind::Icon { glyph, tint } => {
            paint_icon(&mut p.scene, *glyph, rect, *tint);
        }

        ViewKind::Image { handle, tint, fit } => {
            if let Some(h) = handle
                && let Some(src) = image_size(*h)
            {
                let (dst, uv) = fit.place(rect, src);
                p.scene.nodes.push(SceneNode::Image {
                    rect: dst,
                    handle: *h,
                    tint: *tint,
                    uv,
                });
            }
            if let Some(label) = label_of(v) {
                p.sems.push(SemNode::new(v.id, Role::Image, label, rect));
            }
        }

        ViewKind::Button {
            text,
            on_click,
            container,
            content,
        } => {
            let is_pressed = p.interactions.pressed.contains(&v.id);
            let radius = round_radius(
                v.modifier.corner.map(dp_to_px).unwrap_or(dp_to_px(6.0)),
                rect,
            );
            let bg = match container {
                Some(c) if is_pressed && c.3 == 0 => Some(th.on_surface.copy_alpha(0.12)),
                Some(c) => Some(*c),
                None if is_pressed => Some(th.button_bg_pressed),
                None => Some(th.button_bg),
            };
            if v.modifier.background.is_none()
                && let Some(bg) = bg
                && bg.3 > 0
            {
                p.scene.nodes.push(SceneNode::Rect {
                    rect,
                    color: bg,
                    radius,
                });
            }

            let label_px = font_px(16.0);
            let w = approx_text_w(text, label_px);
            p.scene.nodes.push(SceneNode::Text {
                rect: Rect {
                    x: rect.x + (rect.w - w).max(0.0) * 0.5,
                    y: rect.y + (rect.h - label_px * 1.3).max(0.0) * 0.5,
                    w,
                    h: label_px * 1.3,
                },
                text: text.clone(),
                color: *content,
                size: label_px,
            });

            if on_click.is_some() {
                p.hits.push(HitRegion {
                    id: v.id,
                    rect,
                    on_click: on_click.clone(),
                    focusable: true,
                    ..Default::default()
                });
            }
            p.sems.push(
                SemNode::new(v.id, Role::Button, text.clone(), rect)
                    .focused(is_focused)
                    .enabled(on_click.is_some()),
            );
            if is_focused {
                p.scene.nodes.push(SceneNode::Border {
                    rect,
                    color: th.focus,
                    width: dp_to_px(2.0),
                    radius,
                });
            }
        }

        ViewKind::TextField {
            state_key,
            value,
            label,
            leading_icon,
            visual_transformation,
            keyboard_options,
            keyboard_actions,
            on_change,
        } => {
            // Persistent key for platform-managed state
            let tf_key = if *state_key != 0 { *state_key } else { v.id };
            p.seen_fields.insert(tf_key);

            let state_rc = p
                .textfield_states
                .entry(tf_key)
                .or_insert_with(|| Rc::new(RefCell::new(TextFieldState::with_text(value))))
                .clone();
            {
                let mut st = state_rc.borrow_mut();
                let value = sanitize_single_line(value);
                if st.text != value {
                    st.set_text(&value);
                }
            }

            let radius = round_radius(
                v.modifier.corner.map(dp_to_px).unwrap_or(dp_to_px(4.0)),
                rect,
            );
            if v.modifier.background.is_none() {
                p.scene.nodes.push(SceneNode::Rect {
                    rect,
                    color: th.field_bg,
                    radius,
                });
            }

            if let Some(glyph) = leading_icon {
                let s = dp_to_px(TF_ICON_DP);
                let icon_rect = Rect {
                    x: rect.x + dp_to_px(12.0),
                    y: rect.y + (rect.h - s) * 0.5,
                    w: s,
                    h: s,
                };
                paint_icon(&mut p.scene, *glyph, icon_rect, th.field_label);
            }

            let text_x = rect.x
                + dp_to_px(if leading_icon.is_some() {
                    TF_ICON_TEXT_X_DP
                } else {
                    TF_PADDING_X_DP
                });
            let text_px = font_px(TF_FONT_DP);
            let line_h = text_px * 1.3;
            let floating = is_focused || !value.is_empty();
            let inner = Rect {
                x: text_x,
                y: if floating {
                    rect.y + dp_to_px(24.0)
                } else {
                    rect.y + (rect.h - line_h) * 0.5
                },
                w: (rect.x + rect.w - dp_to_px(TF_PADDING_X_DP) - text_x).max(0.0),
                h: line_h,
            };

            // Label: resting in the text slot, or floating above it.
            let (label_px, label_y) = if floating {
                let lp = font_px(TF_LABEL_FLOAT_DP);
                (lp, rect.y + dp_to_px(8.0))
            } else {
                (text_px, inner.y)
            };
            p.scene.nodes.push(SceneNode::Text {
                rect: Rect {
                    x: text_x,
                    y: label_y,
                    w: inner.w,
                    h: label_px * 1.3,
                },
                text: label.clone(),
                color: if is_focused { th.focus } else { th.field_label },
                size: label_px,
            });

            let vt = *visual_transformation;
            let display = {
                let mut st = state_rc.borrow_mut();
                let display = vt.filter(&st.text);
                if is_focused {
                    let caret = vt.original_to_transformed(&st.text, st.selection.end);
                    let cx = measure_text(&display, text_px).x_at(caret);
                    st.ensure_caret_visible(cx, inner.w);
                }
                display
            };

            p.scene.nodes.push(SceneNode::PushClip {
                rect: inner,
                radius: 0.0,
            });
            if !display.is_empty() || is_focused {
                let st = state_rc.borrow();
                let m = measure_text(&display, text_px);
                let to_x = |byte: usize| {
                    m.x_at(vt.original_to_transformed(&st.text, byte)) - st.scroll_offset
                };

                // Selection highlight
                let sel = st.selection_range();
                if sel.start != sel.end {
                    let sx = to_x(sel.start);
                    let ex = to_x(sel.end);
                    p.scene.nodes.push(SceneNode::Rect {
                        rect: Rect {
                            x: inner.x + sx.max(0.0),
                            y: inner.y,
                            w: (ex - sx).max(0.0),
                            h: inner.h,
                        },
                        color: th.selection,
                        radius: 0.0,
                    });
                }

                // Composition underline
                if let Some(range) = &st.composition
                    && range.start < range.end
                {
                    let sx = to_x(range.start);
                    let ex = to_x(range.end);
                    p.scene.nodes.push(SceneNode::Rect {
                        rect: Rect {
                            x: inner.x + sx.max(0.0),
                            y: inner.y + inner.h - dp_to_px(2.0),
                            w: (ex - sx).max(0.0),
                            h: dp_to_px(2.0),
                        },
                        color: th.focus,
                        radius: 0.0,
                    });
                }

                p.scene.nodes.push(SceneNode::Text {
                    rect: Rect {
                        x: inner.x - st.scroll_offset,
                        ..inner
                    },
                    text: display.clone(),
                    color: th.on_field,
                    size: text_px,
                });

                if is_focused && sel.start == sel.end && st.caret_visible(p.now) {
                    let cx = to_x(st.selection.end);
                    p.scene.nodes.push(SceneNode::Rect {
                        rect: Rect {
                            x: inner.x + cx.max(0.0),
                            y: inner.y,
                            w: dp_to_px(2.0),
                            h: inner.h,
                        },
                        color: th.focus,
                        radius: 0.0,
                    });
                }
            }
            p.scene.nodes.push(SceneNode::PopClip);

            let ime_handler: Rc<dyn Fn(ImeAction) -> bool> = {
                let actions = keyboard_actions.clone();
                Rc::new(move |a| actions.run(a))
            };
            p.hits.push(HitRegion {
                id: v.id,
                rect,
                focusable: true,
                on_text_change: on_change.clone(),
                on_ime_action: Some(ime_handler),
                ime_action: keyboard_options.ime_action,
                keyboard_type: keyboard_options.keyboard_type,
                tf_state_key: Some(tf_key),
                text_rect: Some(inner),
                transformation: vt,
                ..Default::default()
            });
            p.sems.push(
                SemNode::new(v.id, Role::TextField, label.clone(), rect)
                    .value(display)
                    .focused(is_focused),
            );
        }

        ViewKind::Divider { color, .. } => {
            p.scene.nodes.push(SceneNode::Rect {
                rect,
                color: *color,
                radius: 0.0,
            });
        }

        ViewKind::Surface => {
            if v.modifier.background.is_none() {
                p.scene.nodes.push(SceneNode::Rect {
                    rect,
                    color: th.surface,
                    radius: round_radius(corner, rect),
                });
            }
        }

        ViewKind::Box | ViewKind::Row | ViewKind::Column | ViewKind::Stack => {
            if let Some(label) = label_of(v) {
                p.sems.push(SemNode::new(v.id, Role::Container, label, rect));
            }
        }
    }

    let clip = is_container(&v.kind) && v.modifier.corner.is_some();
    if clip {
        p.scene.nodes.push(SceneNode::PushClip {
            rect,
            radius: round_radius(corner, rect),
        });
    }
    for c in &v.children {
        walk(c, t, nodes, p, base_px)?;
    }
    if clip {
        p.scene.nodes.push(SceneNode::PopClip);
    }
    Ok(())
}

/// Material-style person and lock icons from rects and rings, in a square.
fn paint_icon(scene: &mut Scene, glyph: IconGlyph, rect: Rect, color: Color) {
    let s = rect.w.min(rect.h);
    let ox = rect.x + (rect.w - s) * 0.5;
    let oy = rect.y + (rect.h - s) * 0.5;
    let r = |x: f32, y: f32, w: f32, h: f32| Rect {
        x: ox + x * s,
        y: oy + y * s,
        w: w * s,
        h: h * s,
    };
    match glyph {
        IconGlyph::Person => {
            // head
            scene.nodes.push(SceneNode::Rect {
                rect: r(0.33, 0.12, 0.34, 0.34),
                color,
                radius: 0.17 * s,
            });
            // shoulders
            scene.nodes.push(SceneNode::Rect {
                rect: r(0.17, 0.56, 0.66, 0.3),
                color,
                radius: 0.15 * s,
            });
        }
        IconGlyph::Lock => {
            // shackle
            scene.nodes.push(SceneNode::Border {
                rect: r(0.3, 0.1, 0.4, 0.5),
                color,
                width: 0.09 * s,
                radius: 0.2 * s,
            });
            // body
            scene.nodes.push(SceneNode::Rect {
                rect: r(0.2, 0.42, 0.6, 0.48),
                color,
                radius: 0.08 * s,
            });
        }
    }
}

fn paint_toast(scene: &mut Scene, message: &str, size_px: (u32, u32)) {
    let th = theme();
    let text_px = font_px(14.0);
    let pad_x = dp_to_px(16.0);
    let h = dp_to_px(48.0);
    let max_w = (size_px.0 as f32 - dp_to_px(32.0)).max(0.0);
    let w = (approx_text_w(message, text_px) + 2.0 * pad_x).min(max_w);
    let rect = Rect {
        x: (size_px.0 as f32 - w) * 0.5,
        y: size_px.1 as f32 - dp_to_px(64.0) - h,
        w,
        h,
    };
    scene.nodes.push(SceneNode::Rect {
        rect,
        color: th.toast_bg,
        radius: h * 0.5,
    });
    scene.nodes.push(SceneNode::PushClip {
        rect,
        radius: h * 0.5,
    });
    scene.nodes.push(SceneNode::Text {
        rect: Rect {
            x: rect.x + pad_x,
            y: rect.y + (h - text_px * 1.3) * 0.5,
            w: w - 2.0 * pad_x,
            h: text_px * 1.3,
        },
        text: message.to_string(),
        color: th.on_toast,
        size: text_px,
    });
    scene.nodes.push(SceneNode::PopClip);
}

#[cfg(test)]
mod tests;
