use crate::{Rect, ViewId};

/// What a node is to assistive technology and to UI tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Text,
    Button,
    TextField,
    Image,
    Container,
}

/// Role and accessible name a widget declares for itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Semantics {
    pub role: Role,
    pub label: Option<String>,
}

impl Semantics {
    pub fn new(role: Role) -> Self {
        Self { role, label: None }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One entry of the flattened tree produced by each frame, in paint order.
///
/// Platform accessibility bridges and the headless session both read this.
#[derive(Clone, Debug, PartialEq)]
pub struct SemNode {
    /// Same id as the view and its hit region.
    pub id: ViewId,
    pub role: Role,
    pub label: Option<String>,
    /// Displayed value of a text field, after its visual transformation.
    pub value: Option<String>,
    pub rect: Rect,
    pub focused: bool,
    pub enabled: bool,
}

impl SemNode {
    pub fn new(id: ViewId, role: Role, label: impl Into<String>, rect: Rect) -> Self {
        Self {
            id,
            role,
            label: Some(label.into()),
            value: None,
            rect,
            focused: false,
            enabled: true,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
