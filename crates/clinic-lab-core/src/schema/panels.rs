//! Canonical panel catalog.
//!
//! Each panel is a fixed list of sections, each section a fixed list of
//! parameters with a default unit and reference range.

use serde::{Deserialize, Serialize};

use crate::models::{Parameter, ResultSection};

/// Known panels with a canonical schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PanelKind {
    /// Complete blood count: red-cell panel plus white-cell differential
    Hemogram,
    /// Blood chemistry constituents
    Biochemistry,
}

/// Schema selected for one exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Panel(PanelKind),
    /// Single free-text "Result" row, no default range
    FreeText,
}

/// One default parameter row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterTemplate {
    pub name: &'static str,
    pub unit: &'static str,
    pub reference_range: &'static str,
}

/// One default section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionTemplate {
    pub title: &'static str,
    pub parameters: &'static [ParameterTemplate],
}

const fn row(name: &'static str, unit: &'static str, reference_range: &'static str) -> ParameterTemplate {
    ParameterTemplate {
        name,
        unit,
        reference_range,
    }
}

const RED_CELL_PANEL: &[ParameterTemplate] = &[
    row("Red blood cells", "10^6/µL", "4.2-5.4"),
    row("Hemoglobin", "g/dL", "12-16"),
    row("Hematocrit", "%", "36-46"),
    row("MCV", "fL", "80-100"),
    row("MCH", "pg", "27-33"),
    row("MCHC", "g/dL", "32-36"),
    row("Platelets", "10^3/µL", "150-400"),
];

const WHITE_CELL_DIFFERENTIAL: &[ParameterTemplate] = &[
    row("White blood cells", "10^3/µL", "4-10"),
    row("Neutrophils", "%", "40-70"),
    row("Lymphocytes", "%", "20-40"),
    row("Monocytes", "%", "2-8"),
    row("Eosinophils", "%", "1-4"),
    row("Basophils", "%", "0-1"),
];

const BIOCHEMISTRY_CONSTITUENTS: &[ParameterTemplate] = &[
    row("Glucose", "mg/dL", "70-100"),
    row("Urea", "mg/dL", "15-45"),
    row("Creatinine", "mg/dL", "0.6-1.2"),
    row("Total cholesterol", "mg/dL", "<200"),
    row("HDL cholesterol", "mg/dL", ">40"),
    row("Triglycerides", "mg/dL", "<150"),
    row("ALT", "U/L", "<40"),
    row("AST", "U/L", "<40"),
];

const HEMOGRAM_SECTIONS: &[SectionTemplate] = &[
    SectionTemplate {
        title: "Hemogram",
        parameters: RED_CELL_PANEL,
    },
    SectionTemplate {
        title: "Leukocyte differential",
        parameters: WHITE_CELL_DIFFERENTIAL,
    },
];

const BIOCHEMISTRY_SECTIONS: &[SectionTemplate] = &[SectionTemplate {
    title: "Biochemistry",
    parameters: BIOCHEMISTRY_CONSTITUENTS,
}];

/// Title of the single row used by free-text sections.
pub const FREE_TEXT_PARAMETER: &str = "Result";

impl PanelKind {
    /// Canonical sections for this panel.
    pub fn sections(&self) -> &'static [SectionTemplate] {
        match self {
            PanelKind::Hemogram => HEMOGRAM_SECTIONS,
            PanelKind::Biochemistry => BIOCHEMISTRY_SECTIONS,
        }
    }
}

impl SchemaVariant {
    /// Build empty sections for an exam.
    pub fn build_sections(&self, exam_id: &str, exam_name: &str) -> Vec<ResultSection> {
        match self {
            SchemaVariant::Panel(kind) => kind
                .sections()
                .iter()
                .map(|section| {
                    let parameters = section
                        .parameters
                        .iter()
                        .map(|p| Parameter::empty(p.name, p.unit, p.reference_range))
                        .collect();
                    ResultSection::new(exam_id, section.title, parameters)
                })
                .collect(),
            SchemaVariant::FreeText => vec![ResultSection::new(
                exam_id,
                exam_name,
                vec![Parameter::empty(FREE_TEXT_PARAMETER, "", "")],
            )],
        }
    }
}

/// A lookup rule: any normalized exam name containing one of `patterns`
/// resolves to `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRule {
    pub kind: PanelKind,
    pub patterns: Vec<String>,
}

impl PanelRule {
    pub fn new(kind: PanelKind, patterns: &[&str]) -> Self {
        Self {
            kind,
            patterns: patterns.iter().map(|p| normalize_name(p)).collect(),
        }
    }

    /// Check a normalized name against this rule.
    pub fn matches(&self, normalized_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| normalized_name.contains(pattern.as_str()))
    }
}

/// Default rules, in priority order.
pub fn default_rules() -> Vec<PanelRule> {
    vec![
        PanelRule::new(
            PanelKind::Hemogram,
            &[
                "hemogram",
                "hémogramme",
                "hemograma",
                "haemogram",
                "complete blood count",
                "full blood count",
                "blood count",
                "cbc",
                "nfs",
            ],
        ),
        PanelRule::new(
            PanelKind::Biochemistry,
            &[
                "biochem",
                "biochimie",
                "bioquímica",
                "bioquimica",
                "chemistry",
                "metabolic panel",
                "panel",
            ],
        ),
    ]
}

/// Default category rules, consulted when the exam name matches nothing.
pub fn default_category_rules() -> Vec<PanelRule> {
    vec![
        PanelRule::new(
            PanelKind::Hemogram,
            &["hematology", "haematology", "hématologie", "hematología", "hematologia"],
        ),
        PanelRule::new(
            PanelKind::Biochemistry,
            &["biochem", "biochimie", "bioquímica", "bioquimica", "chemistry"],
        ),
    ]
}

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
