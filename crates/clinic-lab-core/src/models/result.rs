//! Lab result document models.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::parameter::{Alert, Parameter};

/// Release status of a lab result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Editable; values may still change
    Draft,
    /// Checked by the lab, not yet visible to the physician
    Validated,
    /// Released to the requesting physician (terminal, immutable)
    Sent,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Draft => "draft",
            ResultStatus::Validated => "validated",
            ResultStatus::Sent => "sent",
        }
    }

    /// Parse a wire/storage status. Unknown strings yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ResultStatus::Draft),
            "validated" => Some(ResultStatus::Validated),
            "sent" => Some(ResultStatus::Sent),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when editing a result document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Result is {0} and can no longer be edited")]
    Locked(ResultStatus),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Exam {0} has no section in this result")]
    UnknownExam(String),
}

/// An ad-hoc parameter row supplied by the technician.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterInput {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
}

/// A group of parameters under one sub-panel title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultSection {
    /// Exam this section was resolved for. Persisted sections are keyed on it.
    pub exam_id: String,
    /// Sub-panel title (e.g., "Hemogram", "Leukocyte differential")
    pub title: String,
    /// Parameter rows
    pub parameters: Vec<Parameter>,
}

impl ResultSection {
    pub fn new(exam_id: impl Into<String>, title: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            exam_id: exam_id.into(),
            title: title.into(),
            parameters,
        }
    }
}

/// The structured result document for one lab request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabResult {
    /// Store-assigned id; `None` until the first successful save
    pub id: Option<String>,
    /// Owning lab request (1:1)
    pub lab_request_id: String,
    /// Sections for every requested exam
    pub sections: Vec<ResultSection>,
    /// Free-text commentary from the technician
    pub technician_notes: Option<String>,
    /// Release status
    pub status: ResultStatus,
    /// Creation timestamp
    pub created_at: String,
    /// Set when the result is validated
    pub validated_at: Option<String>,
    /// Set when the result is sent
    pub sent_at: Option<String>,
}

impl LabResult {
    /// Create an unsaved draft document for a request.
    pub fn new(lab_request_id: String, sections: Vec<ResultSection>) -> Self {
        Self {
            id: None,
            lab_request_id,
            sections,
            technician_notes: None,
            status: ResultStatus::Draft,
            created_at: chrono::Utc::now().to_rfc3339(),
            validated_at: None,
            sent_at: None,
        }
    }

    /// Whether the document has ever been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Whether any parameter carries an entered value.
    pub fn has_values(&self) -> bool {
        self.parameters().any(|p| p.has_value())
    }

    /// Iterate over every parameter in document order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.sections.iter().flat_map(|s| s.parameters.iter())
    }

    /// Total parameter row count.
    pub fn parameter_count(&self) -> usize {
        self.sections.iter().map(|s| s.parameters.len()).sum()
    }

    /// Parameters flagged low or high.
    pub fn abnormal_parameters(&self) -> Vec<&Parameter> {
        self.parameters().filter(|p| p.alert().is_abnormal()).collect()
    }

    /// Count of parameters per alert level.
    pub fn alert_count(&self, alert: Alert) -> usize {
        self.parameters().filter(|p| p.alert() == alert).count()
    }

    /// Sections resolved for a given exam.
    pub fn sections_for_exam<'a>(&'a self, exam_id: &'a str) -> impl Iterator<Item = &'a ResultSection> {
        self.sections.iter().filter(move |s| s.exam_id == exam_id)
    }

    /// Find a parameter by id.
    pub fn parameter(&self, parameter_id: &str) -> Option<&Parameter> {
        self.parameters().find(|p| p.id() == parameter_id)
    }

    fn ensure_editable(&self) -> Result<(), EditError> {
        if self.status != ResultStatus::Draft {
            return Err(EditError::Locked(self.status));
        }
        Ok(())
    }

    fn parameter_mut(&mut self, parameter_id: &str) -> Result<&mut Parameter, EditError> {
        self.ensure_editable()?;
        self.sections
            .iter_mut()
            .flat_map(|s| s.parameters.iter_mut())
            .find(|p| p.id() == parameter_id)
            .ok_or_else(|| EditError::UnknownParameter(parameter_id.to_string()))
    }

    /// Set a measured value; the row's alert is re-derived.
    pub fn set_value(&mut self, parameter_id: &str, value: &str) -> Result<Alert, EditError> {
        let param = self.parameter_mut(parameter_id)?;
        param.set_value(value);
        Ok(param.alert())
    }

    /// Set a reference range; the row's alert is re-derived.
    pub fn set_reference_range(&mut self, parameter_id: &str, range: &str) -> Result<Alert, EditError> {
        let param = self.parameter_mut(parameter_id)?;
        param.set_reference_range(range);
        Ok(param.alert())
    }

    pub fn set_unit(&mut self, parameter_id: &str, unit: &str) -> Result<(), EditError> {
        self.parameter_mut(parameter_id)?.set_unit(unit);
        Ok(())
    }

    /// Append an ad-hoc row to the last section of an exam. Returns the new row id.
    pub fn add_parameter(&mut self, exam_id: &str, input: ParameterInput) -> Result<String, EditError> {
        self.ensure_editable()?;
        let section = self
            .sections
            .iter_mut()
            .rev()
            .find(|s| s.exam_id == exam_id)
            .ok_or_else(|| EditError::UnknownExam(exam_id.to_string()))?;

        let param = Parameter::new(input.name, input.value, input.unit, input.reference_range);
        let id = param.id().to_string();
        section.parameters.push(param);
        Ok(id)
    }

    /// Remove a row from whichever section holds it.
    pub fn remove_parameter(&mut self, parameter_id: &str) -> Result<Parameter, EditError> {
        self.ensure_editable()?;
        for section in &mut self.sections {
            if let Some(pos) = section.parameters.iter().position(|p| p.id() == parameter_id) {
                return Ok(section.parameters.remove(pos));
            }
        }
        Err(EditError::UnknownParameter(parameter_id.to_string()))
    }

    /// Replace the technician commentary. Blank notes are stored as `None`.
    pub fn set_technician_notes(&mut self, notes: Option<String>) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.technician_notes = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    /// Replace every section at once.
    pub fn replace_sections(&mut self, sections: Vec<ResultSection>) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.sections = sections;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_result() -> LabResult {
        LabResult::new(
            "request-1".into(),
            vec![
                ResultSection::new(
                    "exam-cbc",
                    "Hemogram",
                    vec![
                        Parameter::empty("Hemoglobin", "g/dL", "12-16"),
                        Parameter::empty("Hematocrit", "%", "36-46"),
                    ],
                ),
                ResultSection::new(
                    "exam-cbc",
                    "Leukocyte differential",
                    vec![Parameter::empty("Neutrophils", "%", "40-70")],
                ),
                ResultSection::new(
                    "exam-misc",
                    "Widal test",
                    vec![Parameter::empty("Result", "", "")],
                ),
            ],
        )
    }

    fn first_id(result: &LabResult) -> String {
        result.sections[0].parameters[0].id().to_string()
    }

    #[test]
    fn test_new_result_is_unsaved_draft() {
        let result = make_test_result();
        assert!(!result.is_persisted());
        assert_eq!(result.status, ResultStatus::Draft);
        assert!(!result.has_values());
        assert_eq!(result.parameter_count(), 4);
    }

    #[test]
    fn test_set_value_classifies() {
        let mut result = make_test_result();
        let id = first_id(&result);

        assert_eq!(result.set_value(&id, "10.5").unwrap(), Alert::Low);
        assert!(result.has_values());
        assert_eq!(result.abnormal_parameters().len(), 1);

        assert_eq!(result.set_reference_range(&id, "10-16").unwrap(), Alert::Normal);
        assert_eq!(result.alert_count(Alert::Normal), 1);
    }

    #[test]
    fn test_add_parameter_goes_to_last_section_of_exam() {
        let mut result = make_test_result();
        let id = result
            .add_parameter(
                "exam-cbc",
                ParameterInput {
                    name: "Reticulocytes".into(),
                    value: "1.2".into(),
                    unit: "%".into(),
                    reference_range: "0.5-2.5".into(),
                },
            )
            .unwrap();

        let differential = &result.sections[1];
        assert_eq!(differential.parameters.len(), 2);
        assert_eq!(differential.parameters[1].id(), id);
        assert_eq!(differential.parameters[1].alert(), Alert::Normal);

        let err = result.add_parameter("exam-unknown", ParameterInput::default());
        assert_eq!(err, Err(EditError::UnknownExam("exam-unknown".into())));
    }

    #[test]
    fn test_remove_parameter() {
        let mut result = make_test_result();
        let id = first_id(&result);

        let removed = result.remove_parameter(&id).unwrap();
        assert_eq!(removed.name(), "Hemoglobin");
        assert_eq!(result.parameter_count(), 3);
        assert!(matches!(
            result.remove_parameter(&id),
            Err(EditError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_edits_rejected_unless_draft() {
        let mut result = make_test_result();
        let id = first_id(&result);

        for status in [ResultStatus::Validated, ResultStatus::Sent] {
            result.status = status;
            assert_eq!(result.set_value(&id, "13"), Err(EditError::Locked(status)));
            assert_eq!(
                result.set_technician_notes(Some("late note".into())),
                Err(EditError::Locked(status))
            );
            assert!(result.remove_parameter(&id).is_err());
        }
        assert!(!result.has_values());
    }

    #[test]
    fn test_blank_notes_cleared() {
        let mut result = make_test_result();
        result.set_technician_notes(Some("   ".into())).unwrap();
        assert_eq!(result.technician_notes, None);

        result.set_technician_notes(Some("Hemolysed sample".into())).unwrap();
        assert_eq!(result.technician_notes.as_deref(), Some("Hemolysed sample"));
    }

    #[test]
    fn test_status_strings() {
        for status in [ResultStatus::Draft, ResultStatus::Validated, ResultStatus::Sent] {
            assert_eq!(ResultStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ResultStatus::parse("archived"), None);
        assert_eq!(ResultStatus::Sent.to_string(), "sent");
    }
}
