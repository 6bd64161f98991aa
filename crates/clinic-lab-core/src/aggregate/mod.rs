//! Result aggregate builder.
//!
//! Assembles per-exam sections into one [`LabResult`] document and converts
//! between the document and the wire shapes of the result store.

use thiserror::Error;

use crate::models::{Exam, LabRequest, LabResult, Parameter, ResultSection, ResultStatus};
use crate::schema::SchemaResolver;
use crate::store::{ItemPayload, ResultSnapshot, SaveResultPayload, SectionPayload};

/// Builder errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Exam {0} is requested but missing from the catalog")]
    MissingExam(String),

    #[error("Unknown result status: '{0}'")]
    UnknownStatus(String),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Builds result documents for lab requests.
pub struct ResultBuilder {
    resolver: SchemaResolver,
}

impl Default for ResultBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultBuilder {
    /// Create a builder with the default panel rules.
    pub fn new() -> Self {
        Self {
            resolver: SchemaResolver::new(),
        }
    }

    /// Create a builder around a custom resolver.
    pub fn with_resolver(resolver: SchemaResolver) -> Self {
        Self { resolver }
    }

    /// Get the schema resolver for direct access.
    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    /// Build an empty draft for a request, one section set per requested exam
    /// in request order.
    pub fn skeleton(&self, request: &LabRequest, exams: &[Exam]) -> BuildResult<LabResult> {
        let mut sections = Vec::new();
        for exam_id in &request.exam_ids {
            let exam = exams
                .iter()
                .find(|e| &e.id == exam_id)
                .ok_or_else(|| BuildError::MissingExam(exam_id.clone()))?;
            sections.extend(self.resolver.resolve(exam));
        }
        Ok(LabResult::new(request.id.clone(), sections))
    }

    /// Convert a document into a `saveResult` body.
    pub fn to_payload(result: &LabResult) -> SaveResultPayload {
        SaveResultPayload {
            sections: result.sections.iter().map(section_to_payload).collect(),
            technician_notes: result.technician_notes.clone(),
        }
    }

    /// Rebuild a document from a stored snapshot. Alerts are re-derived from
    /// the stored values and ranges; stored item statuses are ignored.
    pub fn from_snapshot(snapshot: ResultSnapshot) -> BuildResult<LabResult> {
        let status = ResultStatus::parse(&snapshot.status)
            .ok_or_else(|| BuildError::UnknownStatus(snapshot.status.clone()))?;

        Ok(LabResult {
            id: Some(snapshot.id),
            lab_request_id: snapshot.lab_request_id,
            sections: snapshot.sections.into_iter().map(section_from_payload).collect(),
            technician_notes: snapshot.technician_notes,
            status,
            created_at: snapshot.created_at,
            validated_at: snapshot.validated_at,
            sent_at: snapshot.sent_at,
        })
    }
}

fn section_to_payload(section: &ResultSection) -> SectionPayload {
    SectionPayload {
        exam_id: section.exam_id.clone(),
        title: section.title.clone(),
        items: section
            .parameters
            .iter()
            .map(|p| ItemPayload {
                id: p.id().to_string(),
                name: p.name().to_string(),
                value: p.value().to_string(),
                unit: p.unit().to_string(),
                reference: p.reference_range().to_string(),
                status: p.alert().as_wire().map(str::to_string),
            })
            .collect(),
    }
}

fn section_from_payload(section: SectionPayload) -> ResultSection {
    let parameters = section
        .items
        .into_iter()
        .map(|item| Parameter::with_id(item.id, item.name, item.value, item.unit, item.reference))
        .collect();
    ResultSection::new(section.exam_id, section.title, parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Alert;

    fn make_request(exams: &[Exam]) -> LabRequest {
        LabRequest::new(
            "patient-1".into(),
            "doctor-1".into(),
            exams.iter().map(|e| e.id.clone()).collect(),
        )
    }

    #[test]
    fn test_skeleton_follows_request_order() {
        let widal = Exam::new("Widal test", "Serology", 8.0);
        let cbc = Exam::new("Hemogram", "Hematology", 15.0);
        let request = LabRequest::new(
            "patient-1".into(),
            "doctor-1".into(),
            vec![widal.id.clone(), cbc.id.clone()],
        );

        let result = ResultBuilder::new().skeleton(&request, &[cbc, widal]).unwrap();
        let titles: Vec<_> = result.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Widal test", "Hemogram", "Leukocyte differential"]);
        assert_eq!(result.lab_request_id, request.id);
        assert_eq!(result.status, ResultStatus::Draft);
        assert!(!result.is_persisted());
    }

    #[test]
    fn test_skeleton_missing_exam() {
        let cbc = Exam::new("Hemogram", "Hematology", 15.0);
        let request = make_request(&[cbc]);
        let err = ResultBuilder::new().skeleton(&request, &[]).unwrap_err();
        assert!(matches!(err, BuildError::MissingExam(_)));
    }

    #[test]
    fn test_payload_carries_derived_status() {
        let exam = Exam::new("Lipid panel", "Biochemistry", 20.0);
        let request = make_request(&[exam.clone()]);
        let mut result = ResultBuilder::new().skeleton(&request, &[exam]).unwrap();

        let glucose = result.sections[0].parameters[0].id().to_string();
        result.set_value(&glucose, "130").unwrap();
        result.set_technician_notes(Some("Non-fasting".into())).unwrap();

        let payload = ResultBuilder::to_payload(&result);
        assert_eq!(payload.sections.len(), 1);
        assert_eq!(payload.technician_notes.as_deref(), Some("Non-fasting"));

        let item = &payload.sections[0].items[0];
        assert_eq!(item.name, "Glucose");
        assert_eq!(item.value, "130");
        assert_eq!(item.reference, "70-100");
        assert_eq!(item.status.as_deref(), Some("high"));
        assert_eq!(payload.sections[0].items[1].status, None);
    }

    #[test]
    fn test_from_snapshot_rederives_alerts() {
        let snapshot = ResultSnapshot {
            id: "result-1".into(),
            lab_request_id: "request-1".into(),
            status: "validated".into(),
            sections: vec![SectionPayload {
                exam_id: "exam-1".into(),
                title: "Biochemistry".into(),
                items: vec![ItemPayload {
                    id: "item-1".into(),
                    name: "HDL cholesterol".into(),
                    value: "39".into(),
                    unit: "mg/dL".into(),
                    reference: ">40".into(),
                    status: Some("normal".into()),
                }],
            }],
            technician_notes: None,
            created_at: "2026-01-01T00:00:00+00:00".into(),
            validated_at: Some("2026-01-01T01:00:00+00:00".into()),
            sent_at: None,
            release_digest: None,
        };

        let result = ResultBuilder::from_snapshot(snapshot).unwrap();
        assert_eq!(result.id.as_deref(), Some("result-1"));
        assert_eq!(result.status, ResultStatus::Validated);
        assert_eq!(result.sections[0].parameters[0].alert(), Alert::Low);
    }

    #[test]
    fn test_from_snapshot_unknown_status() {
        let snapshot = ResultSnapshot {
            id: "result-1".into(),
            lab_request_id: "request-1".into(),
            status: "archived".into(),
            sections: vec![],
            technician_notes: None,
            created_at: String::new(),
            validated_at: None,
            sent_at: None,
            release_digest: None,
        };

        assert_eq!(
            ResultBuilder::from_snapshot(snapshot),
            Err(BuildError::UnknownStatus("archived".into()))
        );
    }
}
