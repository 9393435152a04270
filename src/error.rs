use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the bridge to the calling host code.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to evaluate program: {reason}")]
    Evaluation { program: String, reason: String },
    #[error("could not decode {payload} as {expected}: {reason}")]
    Deserialization {
        expected: &'static str,
        payload: String,
        reason: String,
    },
    #[error("expression `{expression}` does not evaluate to an element")]
    NotAnObject { expression: String },
    #[error("no element with id `{id}`")]
    NotFound { id: String },
    #[error("argument `{name}` must not be null")]
    ArgumentNull { name: &'static str },
    #[error("no result for `{expression}` after {waited:?}")]
    ResultTimeout { expression: String, waited: Duration },
    #[error("unknown event kind `{kind}`")]
    UnknownEvent { kind: String },
    #[error("an inbound callback is already registered with this transport")]
    CallbackAlreadyRegistered,
    #[error("the owning document has been dropped")]
    DocumentDropped,
    #[error("event handler failed: {0}")]
    Handler(#[source] anyhow::Error),
    #[error("engine error: {0}")]
    Engine(#[source] anyhow::Error),
}

impl BridgeError {
    pub(crate) fn evaluation(program: &str, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            program: program.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
