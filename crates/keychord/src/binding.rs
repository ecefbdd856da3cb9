//! Binding keys and binding-spec parsing
//!
//! A [`KeyChord`] is a sorted list of canonical key names. The live
//! fingerprint of the pressed-set and the keys derived from a binding spec
//! share this one type, so matching is plain equality.

use std::fmt;

use crate::key::{canonicalize, KeyName};

/// A sorted sequence of canonical key names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyChord(Vec<KeyName>);

impl KeyChord {
    /// Build a chord from keys in any order.
    pub fn new(mut keys: Vec<KeyName>) -> Self {
        keys.sort();
        Self(keys)
    }

    /// Build from keys already sorted in canonical order.
    pub(crate) fn from_sorted(keys: Vec<KeyName>) -> Self {
        debug_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        Self(keys)
    }

    pub fn keys(&self) -> &[KeyName] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &KeyName) -> bool {
        self.0.binary_search(key).is_ok()
    }

    /// True if every component is a supported key.
    pub fn is_supported(&self) -> bool {
        self.0.iter().all(KeyName::is_supported)
    }

    /// Components that fall outside the supported vocabulary.
    pub fn unsupported_keys(&self) -> impl Iterator<Item = &KeyName> {
        self.0.iter().filter(|k| !k.is_supported())
    }

    /// Human-readable form, e.g. `Control+Shift+a`.
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Renders the concatenated canonical names, e.g. `Controla`.
impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.0 {
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl FromIterator<KeyName> for KeyChord {
    fn from_iter<I: IntoIterator<Item = KeyName>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Parse a binding spec such as `"ctrl + a, shift+b"` into its chords.
///
/// # Format
///
/// - Alternatives are separated by `,`
/// - Components of one chord are separated by `+`
/// - Whitespace is ignored everywhere and names are case-insensitive
///
/// Each component goes through [`canonicalize`] as written, so a component
/// resolves to the same key as the identical raw event would.
///
/// Empty components are dropped and empty alternatives yield no chord, so
/// `"ctrl+"` is the same as `"ctrl"`. This never fails; unknown names end up
/// as [`KeyName::Unrecognized`] components, which no key press can match.
pub fn parse_bindings(spec: &str) -> Vec<KeyChord> {
    let compact: String = spec
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    compact
        .split(',')
        .filter_map(|alternative| {
            let keys: Vec<KeyName> = alternative
                .split('+')
                .filter(|component| !component.is_empty())
                .map(canonicalize)
                .collect();
            (!keys.is_empty()).then(|| KeyChord::new(keys))
        })
        .collect()
}
