use nimbus_core::*;
use nimbus_ui::textfield::TF_HEIGHT_DP;
use nimbus_ui::*;

/// The two kinds of credential field on the login form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    Username,
    Password,
}

impl InputKind {
    pub fn label(self) -> &'static str {
        match self {
            InputKind::Username => "username",
            InputKind::Password => "password",
        }
    }

    pub fn icon(self) -> IconGlyph {
        match self {
            InputKind::Username => IconGlyph::Person,
            InputKind::Password => IconGlyph::Lock,
        }
    }

    pub fn keyboard_options(self) -> KeyboardOptions {
        match self {
            InputKind::Username => KeyboardOptions::new()
                .keyboard_type(KeyboardType::Text)
                .ime_action(ImeAction::Next),
            InputKind::Password => KeyboardOptions::new()
                .keyboard_type(KeyboardType::Password)
                .ime_action(ImeAction::Done),
        }
    }

    pub fn visual_transformation(self) -> VisualTransformation {
        match self {
            InputKind::Username => VisualTransformation::None,
            InputKind::Password => VisualTransformation::password(),
        }
    }
}

/// Full-width, pill-shaped credential field that keeps its own text.
///
/// The text lives in a remembered signal, so it survives recomposition and
/// starts empty again after a remount.
pub fn TextInput(
    kind: InputKind,
    focus_requester: Option<FocusRequester>,
    keyboard_actions: KeyboardActions,
) -> View {
    let value = remember(|| signal(String::new()));

    let mut modifier = Modifier::new()
        .fill_max_width()
        .clip_rounded(TF_HEIGHT_DP / 2.0);
    if let Some(r) = focus_requester {
        modifier = modifier.focus_requester(r);
    }

    let on_change = {
        let value = value.clone();
        move |text: String| value.set(text)
    };
    TextField(kind.label(), value.get(), modifier, on_change)
        .leading_icon(kind.icon())
        .visual_transformation(kind.visual_transformation())
        .keyboard_options(kind.keyboard_options())
        .keyboard_actions(keyboard_actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_carry_their_keyboard() {
        let u = InputKind::Username.keyboard_options();
        assert_eq!((u.keyboard_type, u.ime_action), (KeyboardType::Text, ImeAction::Next));
        let p = InputKind::Password.keyboard_options();
        assert_eq!(
            (p.keyboard_type, p.ime_action),
            (KeyboardType::Password, ImeAction::Done)
        );
        assert_eq!(InputKind::Username.visual_transformation(), VisualTransformation::None);
        assert_eq!(InputKind::Password.icon(), IconGlyph::Lock);
    }
}
