//! Exam catalog and lab request models.

use serde::{Deserialize, Serialize};

use super::result::ResultStatus;

/// A single entry in the laboratory exam catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exam {
    /// Unique exam identifier
    pub id: String,
    /// Display name (e.g., "Complete hemogram")
    pub name: String,
    /// Catalog category (e.g., "Hematology")
    pub category: String,
    /// Billed price
    pub price: f64,
}

impl Exam {
    /// Create a new exam with a generated id.
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            category: category.into(),
            price,
        }
    }
}

/// Coarse status carried by a lab request.
///
/// Always derived from the status of its lab result, never set on its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LabRequestStatus {
    /// No result has reached the physician yet
    Pending,
    /// The lab result has been sent
    SentToDoctor,
}

impl LabRequestStatus {
    /// Derive the request status from its result status (if any).
    pub fn derive(result_status: Option<ResultStatus>) -> Self {
        match result_status {
            Some(ResultStatus::Sent) => LabRequestStatus::SentToDoctor,
            _ => LabRequestStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabRequestStatus::Pending => "pending",
            LabRequestStatus::SentToDoctor => "sent_to_doctor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LabRequestStatus::Pending),
            "sent_to_doctor" => Some(LabRequestStatus::SentToDoctor),
            _ => None,
        }
    }
}

/// A physician's order for one or more exams against a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabRequest {
    /// Unique request ID
    pub id: String,
    /// Patient identifier (owned by the registration service)
    pub patient_id: String,
    /// Requesting physician identifier
    pub doctor_id: String,
    /// Requested exam ids, in order
    pub exam_ids: Vec<String>,
    /// Payment reference, if the request was paid
    pub payment_ref: Option<String>,
    /// Coarse request status
    pub status: LabRequestStatus,
    /// Creation timestamp
    pub created_at: String,
}

impl LabRequest {
    /// Create a new pending lab request.
    pub fn new(patient_id: String, doctor_id: String, exam_ids: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            doctor_id,
            exam_ids,
            payment_ref: None,
            status: LabRequestStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Check whether an exam belongs to this request.
    pub fn includes_exam(&self, exam_id: &str) -> bool {
        self.exam_ids.iter().any(|id| id == exam_id)
    }
}
