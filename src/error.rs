// src/error.rs

use thiserror::Error;

/// Errors surfaced by annotation lookups.
///
/// Cloneable so one failed computation can be reported to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotateError {
    #[error("history backend failed: {0}")]
    History(String),

    #[error("work item backend failed: {0}")]
    Items(String),

    #[error("{path} has no line {number}")]
    UnknownLine { path: String, number: usize },
}

impl AnnotateError {
    pub(crate) fn history(err: anyhow::Error) -> Self {
        Self::History(format!("{:#}", err))
    }

    pub(crate) fn items(err: anyhow::Error) -> Self {
        Self::Items(format!("{:#}", err))
    }

    /// True when a collaborator failed, as opposed to a bad request.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::History(_) | Self::Items(_))
    }
}

pub type AnnotateResult<T> = Result<T, AnnotateError>;
