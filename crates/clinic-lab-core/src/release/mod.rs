//! Result release workflow.
//!
//! A [`ResultController`] owns the in-progress document for one lab request
//! and is the only path by which it reaches the result store. Every action
//! issues its round trip(s) in order and advances local state only after the
//! store answers; there is no optimistic transition.
//!
//! Editing is single-author: two controllers saving the same request
//! overwrite each other (last save wins). No version check is made.

mod controller;
mod state_machine;

pub use controller::*;
pub use state_machine::*;

use thiserror::Error;

use crate::aggregate::{BuildError, ResultBuilder};
use crate::models::{EditError, LabResult, ResultStatus};
use crate::store::{release_digest, ResultStore, StoreError};

/// Workflow errors. All are recoverable by retrying the action.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Cannot {action} a result that is {from}")]
    Transition {
        from: ResultStatus,
        action: ReleaseAction,
    },

    #[error("Persistence failed: {0}")]
    Persistence(StoreError),

    #[error("Lab result not found: {0}")]
    NotFound(String),

    #[error("Enter at least one value before saving")]
    NothingToSave,

    #[error("No result has been saved for this request")]
    NotSaved,

    #[error("Save pending changes before releasing the result")]
    UnsavedChanges,

    #[error("Inconsistent result status: '{0}'")]
    InconsistentStatus(String),

    #[error("Result {result_id} is {status} and not yet released to the physician")]
    NotReleased {
        result_id: String,
        status: ResultStatus,
    },

    #[error("Release digest check failed for result {0}")]
    Integrity(String),

    #[error("Missing exam: {0}")]
    MissingExam(String),

    /// The composite send validated the draft, then the send step failed.
    /// The result is now `Validated` and only the send needs retrying.
    #[error("{}, but sending failed: {source}", .validation.message)]
    SendFailed {
        validation: TransitionReport,
        source: Box<WorkflowError>,
    },

    #[error(transparent)]
    Edit(#[from] EditError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected { action, status, .. } => {
                let Some(from) = ResultStatus::parse(&status) else {
                    return WorkflowError::InconsistentStatus(status);
                };
                match ReleaseAction::parse(action) {
                    Some(action) => WorkflowError::Transition { from, action },
                    None => WorkflowError::Edit(EditError::Locked(from)),
                }
            }
            StoreError::NotFound(id) => WorkflowError::NotFound(id),
            other => WorkflowError::Persistence(other),
        }
    }
}

impl From<BuildError> for WorkflowError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::MissingExam(id) => WorkflowError::MissingExam(id),
            BuildError::UnknownStatus(status) => WorkflowError::InconsistentStatus(status),
        }
    }
}

/// Parse a status returned by the store. Anything unknown is fatal for the
/// current action and is never coerced into a transition.
pub fn parse_status(status: &str) -> WorkflowResult<ResultStatus> {
    ResultStatus::parse(status).ok_or_else(|| {
        tracing::error!(status, "Store returned an unknown result status");
        WorkflowError::InconsistentStatus(status.to_string())
    })
}

/// Physician-facing read path. Only `Sent` results carrying a matching
/// release digest are returned.
pub fn physician_result<S: ResultStore>(store: &S, result_id: &str) -> WorkflowResult<LabResult> {
    let snapshot = store
        .get_result(result_id)?
        .ok_or_else(|| WorkflowError::NotFound(result_id.to_string()))?;

    let status = parse_status(&snapshot.status)?;
    if status != ResultStatus::Sent {
        tracing::warn!(result_id, %status, "Physician read attempted before release");
        return Err(WorkflowError::NotReleased {
            result_id: result_id.to_string(),
            status,
        });
    }

    let Some(expected) = &snapshot.release_digest else {
        tracing::error!(result_id, "Released result has no digest");
        return Err(WorkflowError::Integrity(result_id.to_string()));
    };
    let actual = release_digest(&snapshot.sections, snapshot.technician_notes.as_deref())
        .map_err(|_| WorkflowError::Integrity(result_id.to_string()))?;
    if &actual != expected {
        tracing::error!(result_id, "Released result does not match its digest");
        return Err(WorkflowError::Integrity(result_id.to_string()));
    }

    Ok(ResultBuilder::from_snapshot(snapshot)?)
}
