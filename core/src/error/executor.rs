use std::sync::Arc;

use thiserror::Error;

use super::error::{keys, ErrorPayload};
use crate::transition::AggregateError;

/// Failure of a single job handed to an [`Executor`](crate::executor::Executor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("executor '{0}' is shut down")]
    Rejected(String),
}

/// Outcome of one stage transition that did not complete cleanly.
#[derive(Error, Debug, Clone)]
pub enum TransitionError {
    #[error("stage '{stage}' failed: {source}")]
    Aggregate {
        stage: String,
        #[source]
        source: AggregateError,
    },

    /// A container names a predecessor that has no task in the same stage.
    /// Only possible when the container list did not come from the resolver.
    #[error("no task for dependency '{dependency}' of plugin '{plugin}' in stage '{stage}'")]
    MissingPredecessor {
        stage: String,
        plugin: String,
        dependency: String,
    },

    #[error("{hook}-stage work for '{stage}' failed: {cause:#}")]
    Hook {
        stage: String,
        hook: &'static str,
        cause: Arc<anyhow::Error>,
    },

    #[error("executor unavailable while finishing stage '{stage}': {source}")]
    ExecutorUnavailable {
        stage: String,
        #[source]
        source: TaskError,
    },
}

impl TransitionError {
    pub fn stage(&self) -> &str {
        match self {
            Self::Aggregate { stage, .. }
            | Self::MissingPredecessor { stage, .. }
            | Self::Hook { stage, .. }
            | Self::ExecutorUnavailable { stage, .. } => stage,
        }
    }

    /// One payload per independent cause.
    pub fn payloads(&self) -> Vec<ErrorPayload> {
        match self {
            Self::Aggregate { stage, source } => source
                .causes()
                .iter()
                .map(|cause| {
                    ErrorPayload::new(keys::STAGE_FAILED, [stage.clone(), format!("{cause:#}")])
                })
                .collect(),
            Self::Hook { stage, cause, .. } => vec![ErrorPayload::new(
                keys::STAGE_FAILED,
                [stage.clone(), format!("{cause:#}")],
            )],
            Self::MissingPredecessor { .. } | Self::ExecutorUnavailable { .. } => {
                vec![ErrorPayload::new(keys::INTERNAL, [self.to_string()])]
            }
        }
    }
}
