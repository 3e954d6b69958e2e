//! Keyboard configuration carried by text fields: which soft keyboard to
//! show, what its action key does, and how the entered text is displayed.

use std::rc::Rc;

/// The action key of the soft keyboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImeAction {
    #[default]
    Default,
    None,
    Go,
    Search,
    Send,
    Previous,
    Next,
    Done,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyboardType {
    #[default]
    Text,
    Password,
    Email,
    Number,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardOptions {
    pub keyboard_type: KeyboardType,
    pub ime_action: ImeAction,
}

impl KeyboardOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn keyboard_type(mut self, t: KeyboardType) -> Self {
        self.keyboard_type = t;
        self
    }
    pub fn ime_action(mut self, a: ImeAction) -> Self {
        self.ime_action = a;
        self
    }
}

pub type KeyboardAction = Rc<dyn Fn()>;

/// Callbacks for the IME action key, one per action.
#[derive(Clone, Default)]
pub struct KeyboardActions {
    pub on_done: Option<KeyboardAction>,
    pub on_go: Option<KeyboardAction>,
    pub on_next: Option<KeyboardAction>,
    pub on_previous: Option<KeyboardAction>,
    pub on_search: Option<KeyboardAction>,
    pub on_send: Option<KeyboardAction>,
}

impl KeyboardActions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn on_done(mut self, f: impl Fn() + 'static) -> Self {
        self.on_done = Some(Rc::new(f));
        self
    }
    pub fn on_go(mut self, f: impl Fn() + 'static) -> Self {
        self.on_go = Some(Rc::new(f));
        self
    }
    pub fn on_next(mut self, f: impl Fn() + 'static) -> Self {
        self.on_next = Some(Rc::new(f));
        self
    }
    pub fn on_previous(mut self, f: impl Fn() + 'static) -> Self {
        self.on_previous = Some(Rc::new(f));
        self
    }
    pub fn on_search(mut self, f: impl Fn() + 'static) -> Self {
        self.on_search = Some(Rc::new(f));
        self
    }
    pub fn on_send(mut self, f: impl Fn() + 'static) -> Self {
        self.on_send = Some(Rc::new(f));
        self
    }

    pub fn get(&self, action: ImeAction) -> Option<&KeyboardAction> {
        match action {
            ImeAction::Done => self.on_done.as_ref(),
            ImeAction::Go => self.on_go.as_ref(),
            ImeAction::Next => self.on_next.as_ref(),
            ImeAction::Previous => self.on_previous.as_ref(),
            ImeAction::Search => self.on_search.as_ref(),
            ImeAction::Send => self.on_send.as_ref(),
            ImeAction::Default | ImeAction::None => None,
        }
    }

    /// Runs the callback for `action`. Returns false when there is none, so
    /// the caller can fall back to the default behavior.
    pub fn run(&self, action: ImeAction) -> bool {
        match self.get(action) {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for KeyboardActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |o: &Option<KeyboardAction>| o.as_ref().map(|_| "...");
        f.debug_struct("KeyboardActions")
            .field("on_done", &set(&self.on_done))
            .field("on_go", &set(&self.on_go))
            .field("on_next", &set(&self.on_next))
            .field("on_previous", &set(&self.on_previous))
            .field("on_search", &set(&self.on_search))
            .field("on_send", &set(&self.on_send))
            .finish()
    }
}

pub const PASSWORD_MASK: char = '\u{2022}';

/// How the stored text is turned into the displayed text.
///
/// `Password` replaces every char with the mask char, so offsets map one to
/// one per char between the two strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisualTransformation {
    #[default]
    None,
    Password(char),
}

impl VisualTransformation {
    pub fn password() -> Self {
        VisualTransformation::Password(PASSWORD_MASK)
    }

    pub fn filter(&self, text: &str) -> String {
        match self {
            VisualTransformation::None => text.to_string(),
            VisualTransformation::Password(mask) => text.chars().map(|_| *mask).collect(),
        }
    }

    /// Byte offset in `original` to the byte offset in the displayed text.
    pub fn original_to_transformed(&self, original: &str, byte: usize) -> usize {
        match self {
            VisualTransformation::None => byte.min(original.len()),
            VisualTransformation::Password(mask) => {
                let chars = original
                    .char_indices()
                    .take_while(|(i, _)| *i < byte)
                    .count();
                chars * mask.len_utf8()
            }
        }
    }

    /// Byte offset in the displayed text back to `original`.
    pub fn transformed_to_original(&self, original: &str, byte: usize) -> usize {
        match self {
            VisualTransformation::None => byte.min(original.len()),
            VisualTransformation::Password(mask) => {
                let n = byte / mask.len_utf8();
                original
                    .char_indices()
                    .nth(n)
                    .map(|(i, _)| i)
                    .unwrap_or(original.len())
            }
        }
    }
}
