//! Persistence collaborator contract.
//!
//! The workflow only talks to storage through [`ResultStore`]. Each call is
//! one sequential round trip; the caller advances local state only after it
//! returns successfully.

mod contract;

pub use contract::*;

use thiserror::Error;

/// Errors reported by a result store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Cannot {action} result {result_id} from status '{status}'")]
    Rejected {
        result_id: String,
        action: &'static str,
        status: String,
    },

    #[error("Lab result not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote persistence for lab results.
pub trait ResultStore {
    /// Create the result for a request (status `draft`) or fully replace the
    /// sections and notes of its existing draft.
    fn save_result(&self, lab_request_id: &str, payload: &SaveResultPayload) -> StoreResult<StoredResult>;

    /// `draft → validated`. Rejected from any other status.
    fn validate_result(&self, result_id: &str) -> StoreResult<StoredResult>;

    /// `validated → sent`. Succeeds unchanged if already `sent`; rejected from `draft`.
    fn send_result(&self, result_id: &str) -> StoreResult<StoredResult>;

    /// Load a result by id.
    fn get_result(&self, result_id: &str) -> StoreResult<Option<ResultSnapshot>>;

    /// Load the result belonging to a lab request, if one was ever saved.
    fn find_result_for_request(&self, lab_request_id: &str) -> StoreResult<Option<ResultSnapshot>>;
}
