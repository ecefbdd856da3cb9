//! KDL configuration parser

use std::collections::HashSet;
use std::path::Path;

use keychord::{parse_bindings, ALL_SCOPE};

use crate::error::{ConfigError, InvalidKeyInfo, SourceLocation};
use crate::model::*;

/// Extract source location from a KDL entry
fn get_entry_location(entry: &kdl::KdlEntry, source: &str) -> SourceLocation {
    let span = entry.span();
    let offset = span.offset();
    let len = span.len();

    let (line, column) = offset_to_line_col(source, offset);

    SourceLocation::new(line, column, offset, len)
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Positional arguments of a node, skipping `key=value` properties
fn arguments(node: &kdl::KdlNode) -> impl Iterator<Item = &kdl::KdlEntry> {
    node.entries().iter().filter(|e| e.name().is_none())
}

fn property<'a>(node: &'a kdl::KdlNode, name: &str) -> Option<&'a kdl::KdlEntry> {
    node.entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == name))
}

fn first_string<'a>(node: &'a kdl::KdlNode) -> Option<&'a str> {
    arguments(node).next().and_then(|e| e.value().as_string())
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl carries its own miette version, so rebuild the span from offset/len
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();
    let mut invalid_keys = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "options" => {
                config.options = parse_options(node)?;
            }
            "scope" => {
                let scope = parse_scope(node, content, &mut invalid_keys)?;
                config.scopes.push(scope);
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    // Report every unknown key in one go, with source context
    if !invalid_keys.is_empty() {
        return Err(ConfigError::invalid_keys(content, invalid_keys));
    }

    validate_scope_names(&config)?;

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_options(node: &kdl::KdlNode) -> Result<OptionsConfig, ConfigError> {
    let mut options = OptionsConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "filter-editable" => {
                    let value = arguments(child).next().and_then(|e| e.value().as_bool());
                    options.filter_editable = value.ok_or_else(|| ConfigError::Invalid {
                        message: "filter-editable expects true or false".to_string(),
                    })?;
                }
                "repeat" => {
                    if let Some(val) = first_string(child) {
                        options.repeat = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                name => {
                    tracing::warn!("Unknown engine option: {}", name);
                }
            }
        }
    }

    Ok(options)
}

fn parse_scope(
    node: &kdl::KdlNode,
    source: &str,
    invalid_keys: &mut Vec<InvalidKeyInfo>,
) -> Result<ScopeConfig, ConfigError> {
    let name = first_string(node).ok_or_else(|| ConfigError::MissingField {
        field: "scope name (e.g., `scope \"editor\" { ... }`)".to_string(),
    })?;

    let enabled = match property(node, "enabled") {
        Some(entry) => entry.value().as_bool().ok_or_else(|| ConfigError::Invalid {
            message: format!("Scope '{}': enabled expects true or false", name),
        })?,
        None => true,
    };

    let mut scope = ScopeConfig {
        name: name.to_string(),
        enabled,
        bindings: Vec::new(),
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "bind" => {
                    let binding = parse_bind(child, &scope.name, source, invalid_keys)?;
                    scope.bindings.push(binding);
                }
                other => {
                    tracing::warn!("Unknown option in scope '{}': {}", scope.name, other);
                }
            }
        }
    }

    Ok(scope)
}

fn parse_bind(
    node: &kdl::KdlNode,
    scope: &str,
    source: &str,
    invalid_keys: &mut Vec<InvalidKeyInfo>,
) -> Result<BindingConfig, ConfigError> {
    let mut args = arguments(node);

    let spec = args
        .next()
        .and_then(|e| e.value().as_string().map(|keys| (e, keys.to_string())));
    let Some((keys_entry, keys)) = spec else {
        return Err(ConfigError::MissingField {
            field: format!(
                "key spec for bind in scope '{}' (e.g., `bind \"ctrl+s\" \"save\"`)",
                scope
            ),
        });
    };

    let action = args
        .next()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ConfigError::MissingField {
            field: format!("action for bind \"{}\" in scope '{}'", keys, scope),
        })?
        .to_string();

    let chords = parse_bindings(&keys);
    if chords.is_empty() {
        return Err(ConfigError::Invalid {
            message: format!("Binding for '{}' in scope '{}' has no keys", action, scope),
        });
    }

    for chord in &chords {
        for key in chord.unsupported_keys() {
            invalid_keys.push(InvalidKeyInfo {
                key: key.name().into_owned(),
                binding: keys.clone(),
                scope: scope.to_string(),
                location: get_entry_location(keys_entry, source),
            });
        }
    }

    Ok(BindingConfig {
        keys,
        action,
        chords,
    })
}

fn validate_scope_names(config: &Config) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for scope in &config.scopes {
        if scope.name == ALL_SCOPE {
            return Err(ConfigError::Invalid {
                message: format!(
                    "Scope name '{}' is reserved; use `disable \"all\"` at runtime instead",
                    ALL_SCOPE
                ),
            });
        }
        if !seen.insert(scope.name.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "Scope '{}' is declared more than once. Merge the bindings into one block.",
                    scope.name
                ),
            });
        }
    }
    Ok(())
}
