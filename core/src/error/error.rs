use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::executor::TransitionError;
use super::resolve::{CatalogError, ResolveError};

/// Message keys carried by [`ErrorPayload`].
///
/// The core never renders user-facing text; the host maps these keys to
/// whatever presentation it owns.
pub mod keys {
    pub const MISSING_DEPENDENCY: &str = "loading.missing_dependency";
    pub const UNSUPPORTED_OPTIONAL: &str = "loading.unsupported_optional";
    pub const DUPLICATE_PLUGIN: &str = "loading.duplicate_plugin";
    pub const MISSING_SYSTEM_PLUGIN: &str = "loading.missing_system_plugin";
    pub const CYCLE: &str = "loading.cycle";
    pub const VALIDATION_FAILED: &str = "loading.validation_failed";
    pub const STAGE_FAILED: &str = "loading.stage_failed";
    pub const INTERNAL: &str = "loading.internal";
}

/// Structured early-failure payload: a message key plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorPayload {
    pub key: String,
    pub args: Vec<String>,
}

impl ErrorPayload {
    pub fn new<I, S>(key: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}: {}", self.key, self.args.join(", "))
        }
    }
}

/// Errors surfaced by the loading pipeline.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("loading failed with {} error(s)", errors.len())]
    LoadingFailed { errors: Vec<ErrorPayload> },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("failed to start executor: {0}")]
    Executor(#[from] std::io::Error),
}

impl LoaderError {
    /// Flatten into the payload list handed to the early-failure reporter.
    pub fn payloads(&self) -> Vec<ErrorPayload> {
        match self {
            Self::LoadingFailed { errors } => errors.clone(),
            Self::Resolve(e) => e.payloads(),
            Self::Catalog(e) => vec![ErrorPayload::new(keys::INTERNAL, [e.to_string()])],
            Self::Transition(e) => e.payloads(),
            Self::Executor(e) => vec![ErrorPayload::new(keys::INTERNAL, [e.to_string()])],
        }
    }
}
