use miette::{Diagnostic, LabeledSpan};
use thiserror::Error;

/// Position of a node or entry in the config source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-indexed
    pub line: usize,
    /// 1-indexed
    pub column: usize,
    /// Byte offset
    pub offset: usize,
    pub len: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize, len: usize) -> Self {
        Self {
            line,
            column,
            offset,
            len,
        }
    }

    pub fn span(&self) -> miette::SourceSpan {
        (self.offset, self.len).into()
    }
}

/// One unknown key found in a `bind` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeyInfo {
    /// The unknown component, lower-cased
    pub key: String,
    /// The full binding spec it appeared in
    pub binding: String,
    pub scope: String,
    pub location: SourceLocation,
}

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(keychord::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(keychord::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(keychord::config::missing_field))]
    MissingField { field: String },

    #[error("Unknown key(s) in bindings: {}", .invalid_keys.iter().map(|k| k.key.as_str()).collect::<Vec<_>>().join(", "))]
    #[diagnostic(
        code(keychord::config::unknown_key),
        help("Supported keys: single characters, modifiers (ctrl, shift, alt, meta/cmd), enter, tab, space, esc, backspace, arrows (up/down/left/right) and f1-f12")
    )]
    InvalidKeys {
        #[source_code]
        src: String,
        #[label(collection)]
        labels: Vec<LabeledSpan>,
        invalid_keys: Vec<InvalidKeyInfo>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Aggregate unknown keys into one diagnostic labelled at each binding.
    pub(crate) fn invalid_keys(src: &str, invalid_keys: Vec<InvalidKeyInfo>) -> Self {
        let labels = invalid_keys
            .iter()
            .map(|info| {
                LabeledSpan::new_with_span(
                    Some(format!("unknown key '{}'", info.key)),
                    info.location.span(),
                )
            })
            .collect();
        ConfigError::InvalidKeys {
            src: src.to_string(),
            labels,
            invalid_keys,
        }
    }
}
