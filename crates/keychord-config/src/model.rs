//! Configuration data model

use keychord::{
    Handler, KeyChord, Keybinding, KeybindingOptions, RepeatPolicy, DEFAULT_SCOPE,
};

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub options: OptionsConfig,
    pub scopes: Vec<ScopeConfig>,
}

impl Config {
    pub fn scope(&self, name: &str) -> Option<&ScopeConfig> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// Total number of `bind` entries across all scopes.
    pub fn binding_count(&self) -> usize {
        self.scopes.iter().map(|s| s.bindings.len()).sum()
    }

    /// Register every binding on `engine` and disable scopes marked
    /// `enabled=false`.
    ///
    /// `make_handler` is called once per `bind` entry; the handler it returns
    /// is registered for all of that entry's alternatives. Returns the number
    /// of entries installed.
    pub fn install<F>(&self, engine: &Keybinding, mut make_handler: F) -> usize
    where
        F: FnMut(&ScopeConfig, &BindingConfig) -> Handler,
    {
        let mut installed = 0;
        for scope in &self.scopes {
            for binding in &scope.bindings {
                let handler = make_handler(scope, binding);
                engine.register_scoped(&binding.keys, &handler, &scope.name);
                installed += 1;
            }
            if !scope.enabled {
                engine.disable(scope.name.as_str());
            }
        }
        tracing::debug!(
            "Installed {} binding(s) from {} scope(s)",
            installed,
            self.scopes.len()
        );
        installed
    }
}

/// Global settings
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Engine construction options (`options { ... }`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionsConfig {
    pub filter_editable: bool,
    pub repeat: RepeatPolicy,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        let defaults = KeybindingOptions::default();
        Self {
            filter_editable: defaults.filter_editable,
            repeat: defaults.repeat,
        }
    }
}

impl OptionsConfig {
    pub fn to_engine_options(&self) -> KeybindingOptions {
        KeybindingOptions {
            filter_editable: self.filter_editable,
            repeat: self.repeat,
        }
    }
}

/// A named group of bindings (`scope "editor" { ... }`)
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub name: String,
    /// Starts disabled when false
    pub enabled: bool,
    pub bindings: Vec<BindingConfig>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SCOPE.to_string(),
            enabled: true,
            bindings: Vec::new(),
        }
    }
}

/// One `bind "keys" "action"` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfig {
    /// The binding spec as written, e.g. `"ctrl+shift+z, ctrl+y"`
    pub keys: String,
    /// Application-defined action name
    pub action: String,
    /// Parsed alternatives
    pub chords: Vec<KeyChord>,
}
