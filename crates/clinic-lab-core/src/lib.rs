//! Clinic Lab Core Library
//!
//! Capture, classification and release of clinical laboratory results.
//!
//! # Architecture
//!
//! ```text
//! Lab request (exams)
//!        │
//!        ▼
//! Exam Schema Resolver ──► empty sections (panel or free text)
//!        │
//!        ▼
//! Technician enters values ──► Reference Range Parser ──► Parameter Classifier
//!        │                                                  (low/normal/high)
//!        ▼
//!    [DRAFT]  ── save (full replace) ──► result store
//!        │
//!     validate
//!        ▼
//!  [VALIDATED]
//!        │
//!      send  (digest sealed, request → sent_to_doctor)
//!        ▼
//!     [SENT] ──► physician read path (immutable)
//! ```
//!
//! # Modules
//!
//! - [`classifier`]: reference range parsing and alert classification
//! - [`schema`]: exam name → canonical result sections
//! - [`aggregate`]: result document construction and wire conversion
//! - [`release`]: release state machine and per-request controller
//! - [`store`]: persistence contract
//! - [`db`]: SQLite implementation of the store
//! - [`config`], [`logging`]: bootstrap

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod release;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use aggregate::ResultBuilder;
pub use classifier::{classify, classify_text, ReferenceRange};
pub use config::LabConfig;
pub use db::Database;
pub use models::{
    Alert, EditError, Exam, LabRequest, LabRequestStatus, LabResult, Parameter, ParameterInput,
    ResultSection, ResultStatus,
};
pub use release::{
    physician_result, ReleaseAction, ReleaseStateMachine, ResultController, SendOutcome,
    WorkflowError,
};
pub use schema::{PanelKind, SchemaResolver, SchemaVariant};
pub use store::ResultStore;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicLabError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Action not allowed: {0}")]
    InvalidTransition(String),

    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// The result was validated but the send step failed; retry the send.
    #[error("Result validated but not sent: {0}")]
    SendFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for ClinicLabError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => ClinicLabError::NotFound(what),
            db::DbError::Constraint(msg) => ClinicLabError::InvalidInput(msg),
            db::DbError::Transition { .. } => ClinicLabError::InvalidTransition(e.to_string()),
            other => ClinicLabError::DatabaseError(other.to_string()),
        }
    }
}

impl From<WorkflowError> for ClinicLabError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::NotFound(id) => ClinicLabError::NotFound(id),
            WorkflowError::MissingExam(id) => ClinicLabError::NotFound(format!("exam {}", id)),
            WorkflowError::Persistence(_) => ClinicLabError::DatabaseError(e.to_string()),
            WorkflowError::SendFailed { source, .. } => ClinicLabError::SendFailed(source.to_string()),
            WorkflowError::Integrity(_) | WorkflowError::InconsistentStatus(_) => {
                ClinicLabError::IntegrityError(e.to_string())
            }
            WorkflowError::Edit(EditError::UnknownParameter(_))
            | WorkflowError::Edit(EditError::UnknownExam(_))
            | WorkflowError::NothingToSave => ClinicLabError::InvalidInput(e.to_string()),
            WorkflowError::Transition { .. }
            | WorkflowError::Edit(EditError::Locked(_))
            | WorkflowError::NotSaved
            | WorkflowError::UnsavedChanges
            | WorkflowError::NotReleased { .. } => ClinicLabError::InvalidTransition(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ClinicLabError {
    fn from(e: anyhow::Error) -> Self {
        ClinicLabError::ConfigError(format!("{:#}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicLabError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicLabError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ClinicLabCore>, ClinicLabError> {
    let db = Database::open(&path)?;
    Ok(ClinicLabCore::wrap(db))
}

/// Open a throwaway in-memory store.
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicLabCore>, ClinicLabError> {
    let db = Database::open_in_memory()?;
    Ok(ClinicLabCore::wrap(db))
}

/// Load configuration, initialise logging and open the configured database.
#[uniffi::export]
pub fn open_with_config(config_path: Option<String>) -> Result<Arc<ClinicLabCore>, ClinicLabError> {
    let config = LabConfig::load(config_path.as_deref().map(Path::new))?;
    logging::init_logging(&config.logging.filter, config.logging.format)?;

    let db = Database::open_configured(&config.database)?;
    tracing::info!(in_memory = config.database.in_memory, "Clinic lab core opened");
    Ok(ClinicLabCore::wrap(db))
}

/// Install the global log subscriber. Returns false if one was already installed.
#[uniffi::export]
pub fn init_logging(filter: String, format: String) -> Result<bool, ClinicLabError> {
    let format = logging::LogFormat::parse(&format)
        .ok_or_else(|| ClinicLabError::InvalidInput(format!("Unknown log format: {}", format)))?;
    Ok(logging::init_logging(&filter, format)?)
}

/// Classify a raw value against a reference range text.
///
/// Returns "low", "normal", "high" or nothing when no judgement is possible.
#[uniffi::export]
pub fn classify_value(value: String, reference_range: String) -> Option<String> {
    classify_text(&value, &reference_range)
        .as_wire()
        .map(String::from)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicLabCore {
    db: Arc<Mutex<Database>>,
    builder: ResultBuilder,
}

impl ClinicLabCore {
    fn wrap(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            builder: ResultBuilder::new(),
        })
    }

    fn controller<'a>(
        &self,
        db: &'a Database,
        lab_request_id: &str,
    ) -> Result<ResultController<'a, Database>, ClinicLabError> {
        let request = db
            .get_lab_request(lab_request_id)?
            .ok_or_else(|| ClinicLabError::NotFound(format!("lab request {}", lab_request_id)))?;
        let exams = db.exams_for_request(&request)?;
        Ok(ResultController::open(db, &self.builder, &request, &exams)?)
    }
}

#[uniffi::export]
impl ClinicLabCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Add or update an exam. An empty id creates a new exam.
    pub fn upsert_exam(&self, exam: FfiExam) -> Result<FfiExam, ClinicLabError> {
        let db = self.db.lock()?;
        let exam: Exam = exam.into();
        db.upsert_exam(&exam)?;
        Ok(exam.into())
    }

    /// List the exam catalog by name.
    pub fn list_exams(&self) -> Result<Vec<FfiExam>, ClinicLabError> {
        let db = self.db.lock()?;
        let exams = db.list_exams()?;
        Ok(exams.into_iter().map(|e| e.into()).collect())
    }

    // =========================================================================
    // Lab Request Operations
    // =========================================================================

    /// Register a paid lab request for a patient.
    pub fn create_lab_request(
        &self,
        patient_id: String,
        doctor_id: String,
        exam_ids: Vec<String>,
        payment_ref: Option<String>,
    ) -> Result<FfiLabRequest, ClinicLabError> {
        let db = self.db.lock()?;
        let mut request = LabRequest::new(patient_id, doctor_id, exam_ids);
        request.payment_ref = payment_ref;
        db.insert_lab_request(&request)?;
        Ok(request.into())
    }

    pub fn get_lab_request(&self, id: String) -> Result<Option<FfiLabRequest>, ClinicLabError> {
        let db = self.db.lock()?;
        let request = db.get_lab_request(&id)?;
        Ok(request.map(|r| r.into()))
    }

    // =========================================================================
    // Result Workflow
    // =========================================================================

    /// Open the result for a request: the saved document, or an empty skeleton.
    pub fn open_result(&self, lab_request_id: String) -> Result<FfiLabResult, ClinicLabError> {
        let db = self.db.lock()?;
        let controller = self.controller(&db, &lab_request_id)?;
        Ok(controller.into_document().into())
    }

    /// Save the technician's edited document (full replace).
    pub fn save_result(
        &self,
        lab_request_id: String,
        edit: FfiResultEdit,
    ) -> Result<FfiLabResult, ClinicLabError> {
        let db = self.db.lock()?;
        let mut controller = self.controller(&db, &lab_request_id)?;
        let sections = edit.sections.into_iter().map(|s| s.into()).collect();
        controller.replace_sections(sections)?;
        controller.set_technician_notes(edit.technician_notes)?;
        controller.save()?;
        Ok(controller.into_document().into())
    }

    /// `Draft → Validated` for the saved result of a request.
    pub fn validate_result(&self, lab_request_id: String) -> Result<FfiLabResult, ClinicLabError> {
        let db = self.db.lock()?;
        let mut controller = self.controller(&db, &lab_request_id)?;
        controller.validate()?;
        Ok(controller.into_document().into())
    }

    /// Release the saved result of a request, validating first if needed.
    pub fn send_to_physician(&self, lab_request_id: String) -> Result<FfiSendOutcome, ClinicLabError> {
        let db = self.db.lock()?;
        let mut controller = self.controller(&db, &lab_request_id)?;
        let outcome = controller.send_to_physician()?;
        Ok(FfiSendOutcome {
            already_sent: outcome == SendOutcome::AlreadySent,
            validated_first: matches!(outcome, SendOutcome::Sent { validation: Some(_), .. }),
            message: outcome.message().to_string(),
            result: controller.into_document().into(),
        })
    }

    /// Physician view of a released result.
    pub fn get_physician_result(&self, result_id: String) -> Result<FfiLabResult, ClinicLabError> {
        let db = self.db.lock()?;
        let result = physician_result(&*db, &result_id)?;
        Ok(result.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe exam.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExam {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
}

impl From<Exam> for FfiExam {
    fn from(exam: Exam) -> Self {
        Self {
            id: exam.id,
            name: exam.name,
            category: exam.category,
            price: exam.price,
        }
    }
}

impl From<FfiExam> for Exam {
    fn from(exam: FfiExam) -> Self {
        if exam.id.trim().is_empty() {
            return Exam::new(exam.name, exam.category, exam.price);
        }
        Exam {
            id: exam.id,
            name: exam.name,
            category: exam.category,
            price: exam.price,
        }
    }
}

/// FFI-safe lab request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabRequest {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub exam_ids: Vec<String>,
    pub payment_ref: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<LabRequest> for FfiLabRequest {
    fn from(request: LabRequest) -> Self {
        Self {
            id: request.id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            exam_ids: request.exam_ids,
            payment_ref: request.payment_ref,
            status: request.status.as_str().to_string(),
            created_at: request.created_at,
        }
    }
}

/// FFI-safe parameter row. `alert` is "low", "normal", "high" or absent.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiParameter {
    pub id: String,
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub alert: Option<String>,
}

impl From<&Parameter> for FfiParameter {
    fn from(p: &Parameter) -> Self {
        Self {
            id: p.id().to_string(),
            name: p.name().to_string(),
            value: p.value().to_string(),
            unit: p.unit().to_string(),
            reference_range: p.reference_range().to_string(),
            alert: p.alert().as_wire().map(String::from),
        }
    }
}

// Incoming alerts are ignored and re-derived from value and range.
impl From<FfiParameter> for Parameter {
    fn from(p: FfiParameter) -> Self {
        if p.id.is_empty() {
            Parameter::new(p.name, p.value, p.unit, p.reference_range)
        } else {
            Parameter::with_id(p.id, p.name, p.value, p.unit, p.reference_range)
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSection {
    pub exam_id: String,
    pub title: String,
    pub parameters: Vec<FfiParameter>,
}

impl From<&ResultSection> for FfiSection {
    fn from(section: &ResultSection) -> Self {
        Self {
            exam_id: section.exam_id.clone(),
            title: section.title.clone(),
            parameters: section.parameters.iter().map(FfiParameter::from).collect(),
        }
    }
}

impl From<FfiSection> for ResultSection {
    fn from(section: FfiSection) -> Self {
        ResultSection::new(
            section.exam_id,
            section.title,
            section.parameters.into_iter().map(Parameter::from).collect(),
        )
    }
}

/// FFI-safe result document.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabResult {
    /// Absent until the first save
    pub id: Option<String>,
    pub lab_request_id: String,
    pub status: String,
    pub request_status: String,
    pub sections: Vec<FfiSection>,
    pub technician_notes: Option<String>,
    pub abnormal_count: u32,
    /// Release actions allowed from the current status
    pub available_actions: Vec<String>,
    pub created_at: String,
    pub validated_at: Option<String>,
    pub sent_at: Option<String>,
}

impl From<LabResult> for FfiLabResult {
    fn from(result: LabResult) -> Self {
        let persisted = result.is_persisted().then_some(result.status);
        let available_actions = if persisted.is_some() {
            ReleaseStateMachine::new()
                .possible_actions(result.status)
                .into_iter()
                .map(|a| a.as_str().to_string())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            abnormal_count: result.abnormal_parameters().len() as u32,
            sections: result.sections.iter().map(FfiSection::from).collect(),
            request_status: LabRequestStatus::derive(persisted).as_str().to_string(),
            status: result.status.as_str().to_string(),
            available_actions,
            id: result.id,
            lab_request_id: result.lab_request_id,
            technician_notes: result.technician_notes,
            created_at: result.created_at,
            validated_at: result.validated_at,
            sent_at: result.sent_at,
        }
    }
}

/// Edited document submitted by the technician.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResultEdit {
    pub sections: Vec<FfiSection>,
    pub technician_notes: Option<String>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSendOutcome {
    pub already_sent: bool,
    /// The draft was validated as part of this send
    pub validated_first: bool,
    pub message: String,
    pub result: FfiLabResult,
}
