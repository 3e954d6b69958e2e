use taffy::{AlignItems, JustifyContent};

use crate::{Color, FocusRequester, Semantics};

/// Per-edge lengths in dp, used for both padding and margin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Insets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Insets {
    pub const fn all(v: f32) -> Self {
        Self {
            left: v,
            top: v,
            right: v,
            bottom: v,
        }
    }
}

/// Which axes a view stretches along inside its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fill {
    pub width: bool,
    pub height: bool,
}

/// Layout and decoration attached to a [`View`](crate::View).
///
/// Built by chaining; later calls override earlier ones for the same
/// property. Lengths are dp and converted with the current density at
/// layout time.
#[derive(Clone, Debug, Default)]
pub struct Modifier {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub fill: Fill,
    pub padding: Insets,
    pub margin: Insets,
    pub gap: Option<f32>,
    pub weight: Option<f32>,
    pub justify_content: Option<JustifyContent>,
    pub align_items: Option<AlignItems>,
    pub background: Option<Color>,
    /// Corner radius for the background and for clipping children.
    pub corner: Option<f32>,
    pub semantics: Option<Semantics>,
    pub focus_requester: Option<FocusRequester>,
}

impl Modifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(self, w: f32, h: f32) -> Self {
        self.width(w).height(h)
    }

    pub fn width(mut self, w: f32) -> Self {
        self.width = w.is_finite().then_some(w.max(0.0));
        self
    }

    pub fn height(mut self, h: f32) -> Self {
        self.height = h.is_finite().then_some(h.max(0.0));
        self
    }

    pub fn fill_max_size(mut self) -> Self {
        self.fill = Fill {
            width: true,
            height: true,
        };
        self
    }

    pub fn fill_max_width(mut self) -> Self {
        self.fill.width = true;
        self
    }

    pub fn padding(mut self, v: f32) -> Self {
        self.padding = Insets::all(v);
        self
    }

    pub fn margin(mut self, v: f32) -> Self {
        self.margin = Insets::all(v);
        self
    }

    pub fn margin_top(mut self, v: f32) -> Self {
        self.margin.top = v;
        self
    }

    /// Space between children of a Row or Column.
    pub fn gap(mut self, v: f32) -> Self {
        self.gap = Some(v);
        self
    }

    /// Share of the parent's leftover main-axis space.
    pub fn flex_grow(mut self, v: f32) -> Self {
        self.weight = Some(v);
        self
    }

    pub fn justify_content(mut self, j: JustifyContent) -> Self {
        self.justify_content = Some(j);
        self
    }

    pub fn align_items(mut self, a: AlignItems) -> Self {
        self.align_items = Some(a);
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn clip_rounded(mut self, radius: f32) -> Self {
        self.corner = Some(radius);
        self
    }

    /// Overrides the semantics the widget itself reports.
    pub fn semantics(mut self, s: Semantics) -> Self {
        self.semantics = Some(s);
        self
    }

    /// Binds `r` to this view on every layout pass.
    pub fn focus_requester(mut self, r: FocusRequester) -> Self {
        self.focus_requester = Some(r);
        self
    }
}
