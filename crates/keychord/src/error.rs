use thiserror::Error;

use crate::binding::KeyChord;

/// Boxed error type handlers may forward.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by a failing handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error("{0}")]
    Source(#[from] BoxError),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::Message(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::Message(message.to_string())
    }
}

/// A handler fault captured at the dispatch boundary.
///
/// Faults are logged and collected; they never stop sibling handlers.
#[derive(Debug, Error)]
pub enum DispatchFault {
    #[error("handler for '{}' in scope '{scope}' failed: {source}", .chord.describe())]
    Failed {
        chord: KeyChord,
        scope: String,
        #[source]
        source: HandlerError,
    },

    #[error("handler for '{}' in scope '{scope}' panicked: {message}", .chord.describe())]
    Panicked {
        chord: KeyChord,
        scope: String,
        message: String,
    },
}

impl DispatchFault {
    pub fn scope(&self) -> &str {
        match self {
            DispatchFault::Failed { scope, .. } | DispatchFault::Panicked { scope, .. } => scope,
        }
    }

    pub fn chord(&self) -> &KeyChord {
        match self {
            DispatchFault::Failed { chord, .. } | DispatchFault::Panicked { chord, .. } => chord,
        }
    }
}
