//! evdev key codes to host key identifiers
//!
//! Produces the identifiers a browser-style host would report for a US
//! layout: shifted characters when Shift is held, `"Control"` for both
//! Ctrl keys, and so on. Live modifier flags are derived from which
//! physical modifier keys are down, so releasing one of two held Shift
//! keys still reports Shift as held.

use std::collections::HashSet;

use evdev::Key;
use keychord::{KeyEvent, Modifier, ModifierState};

/// evdev key event values
pub mod event_value {
    pub const RELEASE: i32 = 0;
    pub const PRESS: i32 = 1;
    pub const REPEAT: i32 = 2;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKeyEvent {
    Down(KeyEvent),
    Up(KeyEvent),
}

/// The modifier a physical key drives, left and right variants alike.
fn modifier_of(key: Key) -> Option<Modifier> {
    match key {
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => Some(Modifier::Control),
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => Some(Modifier::Shift),
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => Some(Modifier::Alt),
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => Some(Modifier::Meta),
        _ => None,
    }
}

fn letter(key: Key) -> Option<char> {
    let c = match key {
        Key::KEY_A => 'a',
        Key::KEY_B => 'b',
        Key::KEY_C => 'c',
        Key::KEY_D => 'd',
        Key::KEY_E => 'e',
        Key::KEY_F => 'f',
        Key::KEY_G => 'g',
        Key::KEY_H => 'h',
        Key::KEY_I => 'i',
        Key::KEY_J => 'j',
        Key::KEY_K => 'k',
        Key::KEY_L => 'l',
        Key::KEY_M => 'm',
        Key::KEY_N => 'n',
        Key::KEY_O => 'o',
        Key::KEY_P => 'p',
        Key::KEY_Q => 'q',
        Key::KEY_R => 'r',
        Key::KEY_S => 's',
        Key::KEY_T => 't',
        Key::KEY_U => 'u',
        Key::KEY_V => 'v',
        Key::KEY_W => 'w',
        Key::KEY_X => 'x',
        Key::KEY_Y => 'y',
        Key::KEY_Z => 'z',
        _ => return None,
    };
    Some(c)
}

/// (unshifted, shifted) characters for digit and symbol keys.
fn symbol(key: Key) -> Option<(char, char)> {
    let pair = match key {
        Key::KEY_1 => ('1', '!'),
        Key::KEY_2 => ('2', '@'),
        Key::KEY_3 => ('3', '#'),
        Key::KEY_4 => ('4', '$'),
        Key::KEY_5 => ('5', '%'),
        Key::KEY_6 => ('6', '^'),
        Key::KEY_7 => ('7', '&'),
        Key::KEY_8 => ('8', '*'),
        Key::KEY_9 => ('9', '('),
        Key::KEY_0 => ('0', ')'),
        Key::KEY_MINUS => ('-', '_'),
        Key::KEY_EQUAL => ('=', '+'),
        Key::KEY_LEFTBRACE => ('[', '{'),
        Key::KEY_RIGHTBRACE => (']', '}'),
        Key::KEY_SEMICOLON => (';', ':'),
        Key::KEY_APOSTROPHE => ('\'', '"'),
        Key::KEY_GRAVE => ('`', '~'),
        Key::KEY_BACKSLASH => ('\\', '|'),
        Key::KEY_COMMA => (',', '<'),
        Key::KEY_DOT => ('.', '>'),
        Key::KEY_SLASH => ('/', '?'),
        _ => return None,
    };
    Some(pair)
}

fn named(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => "Control",
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => "Shift",
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => "Alt",
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => "Meta",
        Key::KEY_ESC => "Escape",
        Key::KEY_ENTER | Key::KEY_KPENTER => "Enter",
        Key::KEY_TAB => "Tab",
        Key::KEY_SPACE => " ",
        Key::KEY_BACKSPACE => "Backspace",
        Key::KEY_UP => "ArrowUp",
        Key::KEY_DOWN => "ArrowDown",
        Key::KEY_LEFT => "ArrowLeft",
        Key::KEY_RIGHT => "ArrowRight",
        Key::KEY_F1 => "F1",
        Key::KEY_F2 => "F2",
        Key::KEY_F3 => "F3",
        Key::KEY_F4 => "F4",
        Key::KEY_F5 => "F5",
        Key::KEY_F6 => "F6",
        Key::KEY_F7 => "F7",
        Key::KEY_F8 => "F8",
        Key::KEY_F9 => "F9",
        Key::KEY_F10 => "F10",
        Key::KEY_F11 => "F11",
        Key::KEY_F12 => "F12",
        _ => return None,
    };
    Some(name)
}

/// Host identifier for `key` given the current Shift state.
///
/// Keys outside the supported vocabulary fall back to their evdev name
/// (`KEY_HOME`, ...), which the engine ignores.
pub fn key_identifier(key: Key, shift: bool) -> String {
    if let Some(name) = named(key) {
        return name.to_string();
    }
    if let Some(c) = letter(key) {
        let c = if shift { c.to_ascii_uppercase() } else { c };
        return c.to_string();
    }
    if let Some((plain, shifted)) = symbol(key) {
        return (if shift { shifted } else { plain }).to_string();
    }
    format!("{:?}", key)
}

/// Turns raw evdev key events into [`RawKeyEvent`]s with live flags.
#[derive(Debug, Default)]
pub struct KeyTranslator {
    held_modifiers: HashSet<Key>,
}

impl KeyTranslator {
    /// Current live modifier flags.
    pub fn flags(&self) -> ModifierState {
        let mut flags = ModifierState::NONE;
        for key in &self.held_modifiers {
            if let Some(modifier) = modifier_of(*key) {
                flags.set(modifier, true);
            }
        }
        flags
    }

    /// Translate one key event. Returns `None` for unknown event values.
    pub fn translate(&mut self, key: Key, value: i32) -> Option<RawKeyEvent> {
        if modifier_of(key).is_some() {
            match value {
                event_value::PRESS | event_value::REPEAT => {
                    self.held_modifiers.insert(key);
                }
                event_value::RELEASE => {
                    self.held_modifiers.remove(&key);
                }
                _ => {}
            }
        }

        let flags = self.flags();
        let event = KeyEvent::new(key_identifier(key, flags.shift), flags);
        match value {
            event_value::PRESS | event_value::REPEAT => Some(RawKeyEvent::Down(event)),
            event_value::RELEASE => Some(RawKeyEvent::Up(event)),
            other => {
                tracing::trace!("Ignoring key event value {} for {:?}", other, key);
                None
            }
        }
    }
}
