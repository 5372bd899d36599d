//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ClassifierError, QuestionBankError};

/// Errors surfaced by messaging transports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("send failed: {0}")]
    Send(String),
}

/// Errors surfaced by the session store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("session store lock poisoned: {0}")]
    Poisoned(String),
}

/// Errors while loading and validating static quiz content.
///
/// All of these are fatal at startup; content problems detected at load
/// time never reach a user.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Bank(#[from] QuestionBankError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("outcome {name} references missing image {path}")]
    MissingImage { name: String, path: String },
}

/// Errors emitted by `QuizEngine` transitions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The classifier produced an outcome with no presentation content.
    /// Startup validation keeps classifier and content in lockstep, so
    /// hitting this is a programming error rather than a user condition.
    #[error("no content for outcome {name}")]
    MissingOutcomeContent { name: String },
}
