//! Configuration parsing for keychord
//!
//! This crate reads KDL files declaring engine options and scoped
//! bindings, validates every binding spec against the key vocabulary, and
//! installs the result onto a [`keychord::Keybinding`].

mod error;
mod model;
mod parser;

use std::path::PathBuf;

pub use error::{ConfigError, InvalidKeyInfo, SourceLocation};
pub use model::*;
pub use parser::{parse_config, parse_config_str};

/// Location used when no config path is given.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/keychord/config.kdl";

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

pub fn default_config_path() -> PathBuf {
    expand_path(DEFAULT_CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use keychord::{Handler, KeyEvent, Keybinding, Keyboard, Modifier, ModifierState};

    #[test]
    fn test_expand_path_keeps_absolute() {
        assert_eq!(expand_path("/etc/keychord.kdl"), PathBuf::from("/etc/keychord.kdl"));
        assert!(default_config_path().ends_with("keychord/config.kdl"));
    }

    #[test]
    fn test_to_engine_options() {
        let config = parse_config_str(
            r#"
            options {
                filter-editable false
                repeat "never"
            }
        "#,
        )
        .unwrap();
        let options = config.options.to_engine_options();
        assert!(!options.filter_editable);
        assert_eq!(options.repeat, keychord::RepeatPolicy::Never);
    }

    #[test]
    fn test_install_registers_and_disables() {
        let config = parse_config_str(
            r#"
            scope "editor" {
                bind "ctrl+s" "save"
                bind "ctrl+shift+z, ctrl+y" "redo"
            }
            scope "dialogs" enabled=false {
                bind "esc" "close"
            }
        "#,
        )
        .unwrap();

        let keyboard = Keyboard::new();
        let engine = Keybinding::with_options(&keyboard, config.options.to_engine_options());
        let fired = Rc::new(RefCell::new(Vec::new()));

        let installed = config.install(&engine, |_, binding| {
            let fired = Rc::clone(&fired);
            let action = binding.action.clone();
            Handler::infallible(move |_| fired.borrow_mut().push(action.clone()))
        });
        assert_eq!(installed, 3);
        assert!(engine.is_scope_disabled("dialogs"));
        assert_eq!(engine.handler_count("ctrl+shift+z, ctrl+y"), 2);

        let ctrl = ModifierState::NONE.with(Modifier::Control);
        keyboard.key_down(&KeyEvent::new("Control", ctrl));
        keyboard.key_down(&KeyEvent::new("y", ctrl));
        keyboard.key_up(&KeyEvent::new("y", ctrl));
        keyboard.key_up(&KeyEvent::new("Control", ModifierState::NONE));
        keyboard.key_down(&KeyEvent::new("Escape", ModifierState::NONE));

        assert_eq!(*fired.borrow(), vec!["redo".to_string()]);
    }
}
