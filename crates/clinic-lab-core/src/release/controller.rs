//! Per-request result controller.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{parse_status, ReleaseAction, ReleaseStateMachine, SendPlan, WorkflowError, WorkflowResult};
use crate::aggregate::ResultBuilder;
use crate::models::{
    Alert, EditError, Exam, LabRequest, LabRequestStatus, LabResult, Parameter, ParameterInput,
    ResultSection, ResultStatus,
};
use crate::store::{ResultStore, StoreError};

/// Outcome of a completed transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionReport {
    pub status: ResultStatus,
    pub message: String,
}

/// Outcome of "send to physician".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SendOutcome {
    /// Released now. `validation` is set when the draft was validated first.
    Sent {
        validation: Option<TransitionReport>,
        sent_at: String,
    },
    /// The result had already been released; nothing changed.
    AlreadySent,
}

impl SendOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SendOutcome::Sent { .. } => "Result sent to physician",
            SendOutcome::AlreadySent => "Result already sent",
        }
    }
}

/// Owns the in-progress [`LabResult`] for one lab request.
pub struct ResultController<'a, S: ResultStore> {
    store: &'a S,
    machine: ReleaseStateMachine,
    exam_ids: Vec<String>,
    document: LabResult,
    dirty: bool,
}

impl<'a, S: ResultStore> ResultController<'a, S> {
    /// Open the result for a request.
    ///
    /// A persisted result is authoritative and is loaded as-is; the schema
    /// resolver only runs when nothing was ever saved for the request.
    pub fn open(
        store: &'a S,
        builder: &ResultBuilder,
        request: &LabRequest,
        exams: &[Exam],
    ) -> WorkflowResult<Self> {
        let document = match store.find_result_for_request(&request.id)? {
            Some(snapshot) => {
                let document = ResultBuilder::from_snapshot(snapshot)?;
                debug!(
                    lab_request_id = %request.id,
                    status = %document.status,
                    "Loaded persisted lab result"
                );
                document
            }
            None => {
                let document = builder.skeleton(request, exams)?;
                debug!(
                    lab_request_id = %request.id,
                    sections = document.sections.len(),
                    "Built lab result skeleton"
                );
                document
            }
        };

        Ok(Self {
            store,
            machine: ReleaseStateMachine::new(),
            exam_ids: request.exam_ids.clone(),
            document,
            dirty: false,
        })
    }

    /// The in-progress document.
    pub fn document(&self) -> &LabResult {
        &self.document
    }

    /// Consume the controller, keeping the document.
    pub fn into_document(self) -> LabResult {
        self.document
    }

    pub fn status(&self) -> ResultStatus {
        self.document.status
    }

    /// Coarse status of the owning request, derived from the persisted result.
    pub fn request_status(&self) -> LabRequestStatus {
        let persisted = self.document.is_persisted().then_some(self.document.status);
        LabRequestStatus::derive(persisted)
    }

    /// Whether local edits have not been saved yet.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Actions the current status allows.
    pub fn available_actions(&self) -> Vec<ReleaseAction> {
        self.machine.possible_actions(self.document.status)
    }

    // =========================================================================
    // Editing (Draft only)
    // =========================================================================

    pub fn set_value(&mut self, parameter_id: &str, value: &str) -> WorkflowResult<Alert> {
        let alert = self.document.set_value(parameter_id, value)?;
        self.dirty = true;
        Ok(alert)
    }

    pub fn set_reference_range(&mut self, parameter_id: &str, range: &str) -> WorkflowResult<Alert> {
        let alert = self.document.set_reference_range(parameter_id, range)?;
        self.dirty = true;
        Ok(alert)
    }

    pub fn set_unit(&mut self, parameter_id: &str, unit: &str) -> WorkflowResult<()> {
        self.document.set_unit(parameter_id, unit)?;
        self.dirty = true;
        Ok(())
    }

    /// Append an ad-hoc row to an exam. Works for canonical and free-text exams alike.
    pub fn add_parameter(&mut self, exam_id: &str, input: ParameterInput) -> WorkflowResult<String> {
        let id = self.document.add_parameter(exam_id, input)?;
        self.dirty = true;
        Ok(id)
    }

    pub fn remove_parameter(&mut self, parameter_id: &str) -> WorkflowResult<Parameter> {
        let removed = self.document.remove_parameter(parameter_id)?;
        self.dirty = true;
        Ok(removed)
    }

    pub fn set_technician_notes(&mut self, notes: Option<String>) -> WorkflowResult<()> {
        self.document.set_technician_notes(notes)?;
        self.dirty = true;
        Ok(())
    }

    /// Replace the whole section list with an edited copy.
    ///
    /// Every section must belong to one of the request's exams.
    pub fn replace_sections(&mut self, sections: Vec<ResultSection>) -> WorkflowResult<()> {
        if let Some(stray) = sections
            .iter()
            .find(|s| !self.exam_ids.iter().any(|id| *id == s.exam_id))
        {
            return Err(EditError::UnknownExam(stray.exam_id.clone()).into());
        }
        self.document.replace_sections(sections)?;
        self.dirty = true;
        Ok(())
    }

    // =========================================================================
    // Persistence and release
    // =========================================================================

    /// Persist the document, fully replacing any previously saved sections.
    ///
    /// The first save needs at least one entered value. On failure the local
    /// document keeps its edits and nothing else advances.
    pub fn save(&mut self) -> WorkflowResult<String> {
        if self.document.status != ResultStatus::Draft {
            return Err(EditError::Locked(self.document.status).into());
        }
        if !self.document.is_persisted() && !self.document.has_values() {
            return Err(WorkflowError::NothingToSave);
        }

        let payload = ResultBuilder::to_payload(&self.document);
        let stored = self
            .store
            .save_result(&self.document.lab_request_id, &payload)
            .map_err(|e| self.store_failure("save", e))?;

        let status = parse_status(&stored.status)?;
        if status != ResultStatus::Draft {
            error!(result_id = %stored.id, %status, "Store saved a result that is not a draft");
            return Err(WorkflowError::InconsistentStatus(stored.status));
        }

        info!(
            result_id = %stored.id,
            lab_request_id = %self.document.lab_request_id,
            sections = payload.sections.len(),
            parameters = self.document.parameter_count(),
            abnormal = self.document.abnormal_parameters().len(),
            "Lab result saved"
        );

        self.document.id = Some(stored.id.clone());
        self.dirty = false;
        Ok(stored.id)
    }

    /// `Draft → Validated`.
    pub fn validate(&mut self) -> WorkflowResult<TransitionReport> {
        let result_id = self.persisted_id()?;
        if self.dirty {
            return Err(WorkflowError::UnsavedChanges);
        }

        let next = self.check_transition(ReleaseAction::Validate)?;
        let stored = self
            .store
            .validate_result(&result_id)
            .map_err(|e| self.store_failure("validate", e))?;
        self.expect_status(&stored.status, next)?;

        self.document.status = next;
        self.document.validated_at = Some(chrono::Utc::now().to_rfc3339());

        let report = TransitionReport {
            status: next,
            message: "Result validated".to_string(),
        };
        info!(result_id = %result_id, "{}", report.message);
        Ok(report)
    }

    /// Release the result to the requesting physician.
    ///
    /// From `Draft` this validates first and only sends if validation
    /// succeeded; a send failing after that comes back as
    /// [`WorkflowError::SendFailed`] carrying the validation report. From
    /// `Sent` it is a no-op, as is a `Validated` document another session
    /// has already released.
    pub fn send_to_physician(&mut self) -> WorkflowResult<SendOutcome> {
        let result_id = self.persisted_id()?;

        let validation = match self.machine.plan_send(self.document.status) {
            SendPlan::AlreadySent => {
                info!(result_id = %result_id, "Result already sent");
                return Ok(SendOutcome::AlreadySent);
            }
            SendPlan::ValidateThenSend => Some(self.validate()?),
            SendPlan::SendOnly => {
                if self.adopt_if_sent(&result_id)? {
                    info!(result_id = %result_id, "Result already sent by another session");
                    return Ok(SendOutcome::AlreadySent);
                }
                None
            }
        };

        let sent_at = match self.send_step(&result_id) {
            Ok(sent_at) => sent_at,
            Err(source) => {
                return Err(match validation {
                    Some(validation) => WorkflowError::SendFailed {
                        validation,
                        source: Box::new(source),
                    },
                    None => source,
                })
            }
        };

        info!(
            result_id = %result_id,
            lab_request_id = %self.document.lab_request_id,
            validated_first = validation.is_some(),
            "Result sent to physician"
        );
        Ok(SendOutcome::Sent {
            validation,
            sent_at,
        })
    }

    /// Discard local edits and reload the persisted document.
    pub fn reload(&mut self) -> WorkflowResult<()> {
        let result_id = self.persisted_id()?;
        let snapshot = self
            .store
            .get_result(&result_id)?
            .ok_or_else(|| WorkflowError::NotFound(result_id.clone()))?;
        self.document = ResultBuilder::from_snapshot(snapshot)?;
        self.dirty = false;
        Ok(())
    }

    /// `Validated → Sent`. Returns the persisted release time.
    fn send_step(&mut self, result_id: &str) -> WorkflowResult<String> {
        let next = self.check_transition(ReleaseAction::Send)?;
        let stored = self
            .store
            .send_result(result_id)
            .map_err(|e| self.store_failure("send", e))?;
        self.expect_status(&stored.status, next)?;

        // The send already landed; a failed read-back only costs the exact timestamp.
        let sent_at = match self.store.get_result(result_id) {
            Ok(Some(snapshot)) => snapshot.sent_at,
            Ok(None) => None,
            Err(e) => {
                warn!(result_id, error = %e, "Could not read back release time");
                None
            }
        }
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        self.document.status = next;
        self.document.sent_at = Some(sent_at.clone());
        Ok(sent_at)
    }

    /// Reload the persisted document if it has already been released.
    fn adopt_if_sent(&mut self, result_id: &str) -> WorkflowResult<bool> {
        let Some(snapshot) = self.store.get_result(result_id)? else {
            return Err(WorkflowError::NotFound(result_id.to_string()));
        };
        if parse_status(&snapshot.status)? != ResultStatus::Sent {
            return Ok(false);
        }
        self.document = ResultBuilder::from_snapshot(snapshot)?;
        self.dirty = false;
        Ok(true)
    }

    fn persisted_id(&self) -> WorkflowResult<String> {
        self.document.id.clone().ok_or(WorkflowError::NotSaved)
    }

    fn check_transition(&self, action: ReleaseAction) -> WorkflowResult<ResultStatus> {
        self.machine
            .transition(self.document.status, action)
            .map_err(|e| {
                warn!(
                    lab_request_id = %self.document.lab_request_id,
                    status = %self.document.status,
                    action = %action,
                    "Rejected release transition"
                );
                e
            })
    }

    fn expect_status(&self, returned: &str, expected: ResultStatus) -> WorkflowResult<()> {
        let status = parse_status(returned)?;
        if status != expected {
            error!(%status, %expected, "Store returned an unexpected status");
            return Err(WorkflowError::InconsistentStatus(returned.to_string()));
        }
        Ok(())
    }

    fn store_failure(&self, action: &str, e: StoreError) -> WorkflowError {
        match &e {
            StoreError::Rejected { status, .. } => {
                warn!(action, status = %status, "Store rejected transition");
            }
            _ => {
                error!(
                    action,
                    lab_request_id = %self.document.lab_request_id,
                    error = %e,
                    "Result store call failed"
                );
            }
        }
        e.into()
    }
}
