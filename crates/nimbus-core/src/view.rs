use std::rc::Rc;

use crate::{
    Color, ImageFit, ImageHandle, KeyboardActions, KeyboardOptions, Modifier, Rect, Semantics,
    VisualTransformation,
};

pub type ViewId = u64;

pub type Callback = Rc<dyn Fn()>;

/// Vector icons drawn from primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconGlyph {
    Person,
    Lock,
}

#[derive(Clone)]
pub enum ViewKind {
    Surface,
    Box,
    Row,
    Column,
    Stack,
    Text {
        text: String,
        color: Color,
        font_size: f32,
    },
    Icon {
        glyph: IconGlyph,
        tint: Color,
    },
    Image {
        handle: Option<ImageHandle>,
        tint: Color,
        fit: ImageFit,
    },
    Button {
        text: String,
        on_click: Option<Callback>,
        container: Option<Color>,
        content: Color,
    },
    TextField {
        state_key: ViewId,
        value: String,
        label: String,
        leading_icon: Option<IconGlyph>,
        visual_transformation: VisualTransformation,
        keyboard_options: KeyboardOptions,
        keyboard_actions: KeyboardActions,
        on_change: Option<Rc<dyn Fn(String)>>,
    },
    Divider {
        color: Color,
        thickness: f32,
    },
}

impl ViewKind {
    pub fn name(&self) -> &'static str {
        match self {
            ViewKind::Surface => "Surface",
            ViewKind::Box => "Box",
            ViewKind::Row => "Row",
            ViewKind::Column => "Column",
            ViewKind::Stack => "Stack",
            ViewKind::Text { .. } => "Text",
            ViewKind::Icon { .. } => "Icon",
            ViewKind::Image { .. } => "Image",
            ViewKind::Button { .. } => "Button",
            ViewKind::TextField { .. } => "TextField",
            ViewKind::Divider { .. } => "Divider",
        }
    }
}

// Callbacks and field values stay out of debug output.
impl std::fmt::Debug for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewKind::Text { text, .. } | ViewKind::Button { text, .. } => {
                write!(f, "{}({text:?})", self.name())
            }
            ViewKind::TextField { label, .. } => write!(f, "TextField({label:?})"),
            ViewKind::Image { handle, fit, .. } => write!(f, "Image({handle:?}, {fit:?})"),
            ViewKind::Icon { glyph, .. } => write!(f, "Icon({glyph:?})"),
            _ => f.write_str(self.name()),
        }
    }
}

/// A node of the tree a root function returns each frame.
///
/// `id` is assigned in pre-order at layout time, so it is stable across
/// frames as long as the tree shape is.
#[derive(Clone, Debug)]
pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,
    pub modifier: Modifier,
    pub children: Vec<View>,
    pub semantics: Option<Semantics>,
}

impl View {
    pub fn new(id: ViewId, kind: ViewKind) -> Self {
        View {
            id,
            kind,
            modifier: Modifier::default(),
            children: Vec::new(),
            semantics: None,
        }
    }

    pub fn modifier(mut self, m: Modifier) -> Self {
        self.modifier = m;
        self
    }

    pub fn with_children(mut self, kids: Vec<View>) -> Self {
        self.children = kids;
        self
    }

    pub fn semantics(mut self, s: Semantics) -> Self {
        self.semantics = Some(s);
        self
    }
}

/// Flat list of draw commands for one frame, painted in order.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub clear_color: Color,
    pub nodes: Vec<SceneNode>,
}

#[derive(Clone, Debug)]
pub enum SceneNode {
    Rect {
        rect: Rect,
        color: Color,
        radius: f32,
    },
    Border {
        rect: Rect,
        color: Color,
        width: f32,
        radius: f32,
    },
    Text {
        rect: Rect,
        text: String,
        color: Color,
        size: f32,
    },
    Image {
        rect: Rect,
        handle: ImageHandle,
        tint: Color,
        /// Source rect in normalized texture coordinates.
        uv: [f32; 4],
    },
    PushClip {
        rect: Rect,
        radius: f32,
    },
    PopClip,
}
