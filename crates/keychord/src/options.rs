//! Engine construction options

use std::fmt;
use std::str::FromStr;

use crate::keyboard::PressKind;

/// When a press that did not change the pressed-set may still dispatch.
///
/// Every fresh press dispatches regardless of policy. The policy only decides
/// what happens to repeated down-events for a key that is already held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RepeatPolicy {
    /// Auto-repeat of printable keys keeps firing; held modifiers never re-fire.
    #[default]
    NonModifiers,
    /// Every repeated down-event fires, modifiers included.
    Always,
    /// Only fresh presses fire.
    Never,
}

impl RepeatPolicy {
    /// Decide whether a press of the given kind should dispatch.
    pub fn allows(self, kind: PressKind) -> bool {
        match (self, kind) {
            (_, PressKind::Fresh) => true,
            (RepeatPolicy::Always, _) => true,
            (RepeatPolicy::NonModifiers, PressKind::Repeat) => true,
            (RepeatPolicy::NonModifiers, PressKind::ModifierRepeat) => false,
            (RepeatPolicy::Never, _) => false,
        }
    }
}

impl FromStr for RepeatPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "non-modifiers" | "nonmodifiers" | "default" => Ok(Self::NonModifiers),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(format!("Unknown repeat policy: {}", s)),
        }
    }
}

impl fmt::Display for RepeatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepeatPolicy::NonModifiers => "non-modifiers",
            RepeatPolicy::Always => "always",
            RepeatPolicy::Never => "never",
        };
        f.write_str(name)
    }
}

/// Options fixed when a [`Keybinding`](crate::Keybinding) is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeybindingOptions {
    /// Skip dispatch while an editable element holds focus.
    pub filter_editable: bool,
    pub repeat: RepeatPolicy,
}

impl Default for KeybindingOptions {
    fn default() -> Self {
        Self {
            filter_editable: true,
            repeat: RepeatPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RepeatPolicy::default();
        assert!(policy.allows(PressKind::Fresh));
        assert!(policy.allows(PressKind::Repeat));
        assert!(!policy.allows(PressKind::ModifierRepeat));
    }

    #[test]
    fn test_always_and_never() {
        assert!(RepeatPolicy::Always.allows(PressKind::ModifierRepeat));
        assert!(RepeatPolicy::Never.allows(PressKind::Fresh));
        assert!(!RepeatPolicy::Never.allows(PressKind::Repeat));
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("non-modifiers".parse::<RepeatPolicy>(), Ok(RepeatPolicy::NonModifiers));
        assert_eq!("ALWAYS".parse::<RepeatPolicy>(), Ok(RepeatPolicy::Always));
        assert_eq!("never".parse::<RepeatPolicy>(), Ok(RepeatPolicy::Never));
        assert!("sometimes".parse::<RepeatPolicy>().is_err());
    }

    #[test]
    fn test_default_options_filter_editable() {
        let options = KeybindingOptions::default();
        assert!(options.filter_editable);
        assert_eq!(options.repeat, RepeatPolicy::NonModifiers);
    }
}
