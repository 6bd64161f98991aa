//! Measured parameter rows and their alert level.

use serde::{Deserialize, Serialize};

use crate::classifier::classify_text;

/// Classification of a measured value against its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    /// Below the reference range
    Low,
    /// Within the reference range
    Normal,
    /// Above the reference range
    High,
    /// No classification possible (empty/non-numeric value or unparsable range)
    None,
}

impl Alert {
    /// Wire representation: `"low" | "normal" | "high"` or null.
    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            Alert::Low => Some("low"),
            Alert::Normal => Some("normal"),
            Alert::High => Some("high"),
            Alert::None => None,
        }
    }

    /// Whether the value falls outside its reference range.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Alert::Low | Alert::High)
    }
}

/// A single measured parameter inside a result section.
///
/// `alert` is a cached output of the classifier over `(value, reference_range)`.
/// It has no setter: every mutation of either input recomputes it, and
/// deserialization ignores any stored alert and derives it again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "ParameterRecord")]
pub struct Parameter {
    id: String,
    name: String,
    value: String,
    unit: String,
    reference_range: String,
    alert: Alert,
}

/// Parameter as persisted, without its derived alert.
#[derive(Deserialize)]
struct ParameterRecord {
    id: String,
    name: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    reference_range: String,
}

impl From<ParameterRecord> for Parameter {
    fn from(record: ParameterRecord) -> Self {
        Parameter::with_id(
            record.id,
            record.name,
            record.value,
            record.unit,
            record.reference_range,
        )
    }
}

impl Parameter {
    /// Create a parameter row with a generated id.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
        reference_range: impl Into<String>,
    ) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            name.into(),
            value.into(),
            unit.into(),
            reference_range.into(),
        )
    }

    /// Create an empty row (no value yet) from a schema template.
    pub fn empty(
        name: impl Into<String>,
        unit: impl Into<String>,
        reference_range: impl Into<String>,
    ) -> Self {
        Self::new(name, String::new(), unit, reference_range)
    }

    /// Rebuild a parameter with a known id.
    pub fn with_id(
        id: String,
        name: String,
        value: String,
        unit: String,
        reference_range: String,
    ) -> Self {
        let alert = classify_text(&value, &reference_range);
        Self {
            id,
            name,
            value,
            unit,
            reference_range,
            alert,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn reference_range(&self) -> &str {
        &self.reference_range
    }

    pub fn alert(&self) -> Alert {
        self.alert
    }

    /// Whether a value has been entered for this row.
    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    /// Set the measured value and re-derive the alert.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.reclassify();
    }

    /// Set the reference range and re-derive the alert.
    pub fn set_reference_range(&mut self, reference_range: impl Into<String>) {
        self.reference_range = reference_range.into();
        self.reclassify();
    }

    fn reclassify(&mut self) {
        self.alert = classify_text(&self.value, &self.reference_range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_follows_value() {
        let mut param = Parameter::empty("Hematocrit", "%", "36-46");
        assert_eq!(param.alert(), Alert::None);
        assert!(!param.has_value());

        param.set_value("38");
        assert_eq!(param.alert(), Alert::Normal);

        param.set_value("50");
        assert_eq!(param.alert(), Alert::High);

        param.set_value("");
        assert_eq!(param.alert(), Alert::None);
    }

    #[test]
    fn test_alert_follows_range() {
        let mut param = Parameter::new("Glucose", "120", "mg/dL", "70-100");
        assert_eq!(param.alert(), Alert::High);

        param.set_reference_range("70-140");
        assert_eq!(param.alert(), Alert::Normal);

        param.set_reference_range("not a range");
        assert_eq!(param.alert(), Alert::None);
    }

    #[test]
    fn test_deserialize_ignores_stored_alert() {
        let json = r#"{
            "id": "p-1",
            "name": "Total cholesterol",
            "value": "250",
            "unit": "mg/dL",
            "reference_range": "<200",
            "alert": "normal"
        }"#;
        let param: Parameter = serde_json::from_str(json).unwrap();
        assert_eq!(param.alert(), Alert::High);
        assert_eq!(param.id(), "p-1");
    }

    #[test]
    fn test_alert_wire_values() {
        assert_eq!(Alert::Low.as_wire(), Some("low"));
        assert_eq!(Alert::Normal.as_wire(), Some("normal"));
        assert_eq!(Alert::High.as_wire(), Some("high"));
        assert_eq!(Alert::None.as_wire(), None);
        assert!(Alert::High.is_abnormal());
        assert!(!Alert::None.is_abnormal());
    }
}
