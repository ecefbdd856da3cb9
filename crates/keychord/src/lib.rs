//! Keyboard-shortcut binding engine
//!
//! Applications describe shortcuts as human-readable strings such as
//! `"ctrl + shift + z"` or `"cmd+s, ctrl+s"` and attach handlers to them.
//! A [`Keyboard`] tracks which keys are physically held for one host
//! surface; every [`Keybinding`] attached to it is offered the canonical
//! pressed-key fingerprint on each key-down and fires the handlers
//! registered for exactly that chord.
//!
//! The crate is host-agnostic: the embedding application forwards raw
//! key-down and key-up notifications as [`KeyEvent`]s and may install a
//! [`FocusProbe`] so that shortcuts stay quiet while the user is typing.

mod binding;
mod engine;
mod error;
mod key;
mod keyboard;
mod options;

pub use binding::{parse_bindings, KeyChord};
pub use engine::{Handler, HandlerResult, Keybinding, Scopes, ALL_SCOPE, DEFAULT_SCOPE};
pub use error::{BoxError, DispatchFault, HandlerError};
pub use key::{
    canonicalize, is_modifier, is_modifier_currently_held, is_supported, unshifted, KeyName,
    Modifier, ModifierState, MAX_FUNCTION_KEY,
};
pub use keyboard::{DispatchReport, FocusProbe, KeyDown, KeyEvent, KeyUp, Keyboard, PressKind};
pub use options::{KeybindingOptions, RepeatPolicy};
