use thiserror::Error;

use super::error::{keys, ErrorPayload};
use crate::resolver::CycleReport;

/// Errors raised while turning the declared plugin set into a load order.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Duplicate plugin id: {0}")]
    DuplicatePlugin(String),

    #[error("Failed to find system plugin: {0}")]
    MissingSystemPlugin(String),

    #[error("Failed to validate plugin list: {} problem(s)", .0.len())]
    Validation(Vec<ErrorPayload>),

    #[error("Plugin sorting failed - {0}")]
    Cycle(CycleReport),
}

impl ResolveError {
    pub fn payloads(&self) -> Vec<ErrorPayload> {
        match self {
            Self::DuplicatePlugin(id) => vec![ErrorPayload::new(keys::DUPLICATE_PLUGIN, [id.as_str()])],
            Self::MissingSystemPlugin(id) => {
                vec![ErrorPayload::new(keys::MISSING_SYSTEM_PLUGIN, [id.as_str()])]
            }
            Self::Validation(errors) => errors.clone(),
            Self::Cycle(report) => report.payloads(),
        }
    }
}

/// Errors raised when a stage chain is not a single rooted, acyclic list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("stage catalog is empty")]
    Empty,

    #[error("duplicate stage: {0}")]
    DuplicateStage(String),

    #[error("stage name '{0}' is reserved")]
    ReservedName(String),

    #[error("no initial stage (every stage names a previous stage)")]
    NoInitialStage,

    #[error("multiple initial stages: {}", .0.join(", "))]
    MultipleInitialStages(Vec<String>),

    #[error("stage '{stage}' follows unknown stage '{previous}'")]
    UnknownPrevious { stage: String, previous: String },

    #[error("stages '{first}' and '{second}' both follow '{previous}'")]
    Branch {
        previous: String,
        first: String,
        second: String,
    },

    #[error("stages not reachable from the initial stage: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}
