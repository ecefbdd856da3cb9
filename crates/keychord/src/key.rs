//! Key canonicalization
//!
//! Raw key identifiers arrive from the host in whatever form the platform
//! produces (`"Control"`, `"A"`, `"!"`, `"ArrowUp"`, ...) and binding specs
//! arrive in whatever form a user types (`"ctrl"`, `"cmd"`, `"esc"`, ...).
//! Both are folded into the same closed vocabulary of [`KeyName`]s here.
//!
//! ## Resolution order
//!
//! 1. Handy aliases and canonical names, case-insensitive
//!    (`ctrl` / `Control` -> `Control`, `esc` / `Escape` -> `Escape`)
//! 2. Shifted punctuation, restored to the physical key it sits on
//!    (`!` -> `1`, `{` -> `[`, `"` -> `'`)
//! 3. Function keys `f1`..`f12`
//! 4. Any single character, lower-cased
//!
//! Everything else degrades to [`KeyName::Unrecognized`], which is never
//! [supported](KeyName::is_supported) and therefore never enters the
//! pressed-set.
//!
//! The same resolution is applied to both raw events and binding specs, so
//! `"shift+1"` and `"shift+!"` describe the same physical chord, and a raw
//! `"!"` produced while Shift is held resolves to key `1`.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Highest function key in the vocabulary.
pub const MAX_FUNCTION_KEY: u8 = 12;

const FUNCTION_NAMES: [&str; MAX_FUNCTION_KEY as usize + 1] = [
    "F0", "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
];

/// Canonical key name.
///
/// Identity, hashing and ordering all follow the canonical string returned by
/// [`KeyName::name`]. Sorting a list of names therefore yields the same order
/// as sorting their rendered strings lexicographically.
#[derive(Debug, Clone)]
pub enum KeyName {
    /// A single printable character, lower-cased. `' '` is the space bar.
    Char(char),
    Control,
    Shift,
    Alt,
    Meta,
    Enter,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Backspace,
    Escape,
    /// `F1`..`F12`
    Function(u8),
    /// Input outside the vocabulary, lower-cased.
    Unrecognized(String),
}

impl KeyName {
    /// Build a function key, if `n` is within `1..=12`.
    pub fn function(n: u8) -> Option<Self> {
        (1..=MAX_FUNCTION_KEY)
            .contains(&n)
            .then_some(KeyName::Function(n))
    }

    /// The canonical string form.
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            KeyName::Char(c) => Cow::Owned(c.to_string()),
            KeyName::Control => Cow::Borrowed("Control"),
            KeyName::Shift => Cow::Borrowed("Shift"),
            KeyName::Alt => Cow::Borrowed("Alt"),
            KeyName::Meta => Cow::Borrowed("Meta"),
            KeyName::Enter => Cow::Borrowed("Enter"),
            KeyName::Tab => Cow::Borrowed("Tab"),
            KeyName::ArrowUp => Cow::Borrowed("ArrowUp"),
            KeyName::ArrowDown => Cow::Borrowed("ArrowDown"),
            KeyName::ArrowLeft => Cow::Borrowed("ArrowLeft"),
            KeyName::ArrowRight => Cow::Borrowed("ArrowRight"),
            KeyName::Backspace => Cow::Borrowed("Backspace"),
            KeyName::Escape => Cow::Borrowed("Escape"),
            KeyName::Function(n) => match FUNCTION_NAMES.get(*n as usize) {
                Some(name) => Cow::Borrowed(name),
                None => Cow::Owned(format!("F{}", n)),
            },
            KeyName::Unrecognized(name) => Cow::Borrowed(name.as_str()),
        }
    }

    /// The modifier this key represents, if any.
    pub fn modifier(&self) -> Option<Modifier> {
        match self {
            KeyName::Control => Some(Modifier::Control),
            KeyName::Shift => Some(Modifier::Shift),
            KeyName::Alt => Some(Modifier::Alt),
            KeyName::Meta => Some(Modifier::Meta),
            _ => None,
        }
    }

    /// True exactly for Control, Shift, Alt and Meta.
    pub fn is_modifier(&self) -> bool {
        self.modifier().is_some()
    }

    /// True for every vocabulary member and every single character.
    pub fn is_supported(&self) -> bool {
        !matches!(self, KeyName::Unrecognized(_))
    }

    /// Human-readable label (`Space` instead of a bare blank).
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            KeyName::Char(' ') => Cow::Borrowed("Space"),
            other => other.name(),
        }
    }
}

impl KeyName {
    /// Run `f` on the canonical name without allocating for in-vocabulary keys.
    fn with_name<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        let mut buf = [0u8; 4];
        match self {
            KeyName::Char(c) => f(c.encode_utf8(&mut buf)),
            other => f(&other.name()),
        }
    }
}

impl PartialEq for KeyName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyName::Char(a), KeyName::Char(b)) => a == b,
            (KeyName::Function(a), KeyName::Function(b)) => a == b,
            _ => self.with_name(|a| other.with_name(|b| a == b)),
        }
    }
}

impl Eq for KeyName {}

impl Hash for KeyName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.with_name(|name| name.hash(state));
    }
}

impl PartialOrd for KeyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyName {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // UTF-8 byte order is code point order
            (KeyName::Char(a), KeyName::Char(b)) => a.cmp(b),
            _ => self.with_name(|a| other.with_name(|b| a.cmp(b))),
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Normalized modifier key. Left and right variants share one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Control,
    Shift,
    Alt,
    Meta,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [
        Modifier::Control,
        Modifier::Shift,
        Modifier::Alt,
        Modifier::Meta,
    ];

    /// Parse a modifier flag name as used in event scripts (case-insensitive).
    pub fn from_flag_name(name: &str) -> Option<Self> {
        match canonicalize(name) {
            key @ (KeyName::Control | KeyName::Shift | KeyName::Alt | KeyName::Meta) => {
                key.modifier()
            }
            _ => None,
        }
    }

    pub fn key_name(self) -> KeyName {
        match self {
            Modifier::Control => KeyName::Control,
            Modifier::Shift => KeyName::Shift,
            Modifier::Alt => KeyName::Alt,
            Modifier::Meta => KeyName::Meta,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key_name(), f)
    }
}

/// Live modifier flags reported by the host alongside every key event.
///
/// These reflect what the platform believes is physically held, which can
/// differ from the pressed-set when a modifier's release event was swallowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierState {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl ModifierState {
    pub const NONE: ModifierState = ModifierState {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    pub const fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        Self {
            ctrl,
            shift,
            alt,
            meta,
        }
    }

    /// Check whether the given modifier flag is set.
    pub fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Control => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Alt => self.alt,
            Modifier::Meta => self.meta,
        }
    }

    /// Set or clear one flag.
    pub fn set(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Control => self.ctrl = held,
            Modifier::Shift => self.shift = held,
            Modifier::Alt => self.alt = held,
            Modifier::Meta => self.meta = held,
        }
    }

    /// Builder-style variant of [`ModifierState::set`].
    pub fn with(mut self, modifier: Modifier) -> Self {
        self.set(modifier, true);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// Handy aliases plus the canonical multi-character names, keyed lower-case.
fn lookup_named(lower: &str) -> Option<KeyName> {
    let key = match lower {
        "alt" | "option" => KeyName::Alt,
        "control" | "ctrl" => KeyName::Control,
        "meta" | "command" | "cmd" | "windows" => KeyName::Meta,
        "shift" => KeyName::Shift,
        "enter" => KeyName::Enter,
        "tab" => KeyName::Tab,
        "space" => KeyName::Char(' '),
        "up" | "arrowup" => KeyName::ArrowUp,
        "down" | "arrowdown" => KeyName::ArrowDown,
        "left" | "arrowleft" => KeyName::ArrowLeft,
        "right" | "arrowright" => KeyName::ArrowRight,
        "backspace" => KeyName::Backspace,
        "esc" | "escape" => KeyName::Escape,
        _ => return None,
    };
    Some(key)
}

/// Map a shift-produced symbol back to the unshifted key it sits on (US layout).
pub fn unshifted(symbol: char) -> Option<char> {
    let base = match symbol {
        '|' => '\\',
        '}' => ']',
        '{' => '[',
        '"' => '\'',
        ':' => ';',
        '<' => ',',
        '>' => '.',
        '?' => '/',
        '~' => '`',
        '!' => '1',
        '@' => '2',
        '#' => '3',
        '$' => '4',
        '%' => '5',
        '^' => '6',
        '&' => '7',
        '*' => '8',
        '(' => '9',
        ')' => '0',
        '_' => '-',
        '+' => '=',
        _ => return None,
    };
    Some(base)
}

fn lookup_function(lower: &str) -> Option<KeyName> {
    let digits = lower.strip_prefix('f')?;
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    digits.parse::<u8>().ok().and_then(KeyName::function)
}

fn single_char(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn lower_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Canonicalize a raw key identifier or a binding-spec component.
pub fn canonicalize(raw: &str) -> KeyName {
    if let Some(c) = single_char(raw) {
        if let Some(base) = unshifted(c) {
            return KeyName::Char(base);
        }
        return KeyName::Char(lower_char(c));
    }

    let lower = raw.to_lowercase();
    if let Some(key) = lookup_named(&lower) {
        return key;
    }
    if let Some(key) = lookup_function(&lower) {
        return key;
    }

    KeyName::Unrecognized(lower)
}

/// Check whether a canonical name is one of Control, Shift, Alt, Meta.
pub fn is_modifier(name: &KeyName) -> bool {
    name.is_modifier()
}

/// Check a modifier against the host's live flags.
///
/// Returns false for non-modifier keys.
pub fn is_modifier_currently_held(name: &KeyName, live: &ModifierState) -> bool {
    name.modifier().is_some_and(|m| live.is_held(m))
}

/// Check whether a canonical name is part of the supported vocabulary.
pub fn is_supported(name: &KeyName) -> bool {
    name.is_supported()
}
