//! Golden tests for the exam schema resolver.

use clinic_lab_core::models::{Exam, LabRequest};
use clinic_lab_core::schema::{PanelKind, SchemaResolver, SchemaVariant, FREE_TEXT_PARAMETER};
use clinic_lab_core::ResultBuilder;

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    exam_name: &'static str,
    expected_variant: SchemaVariant,
    expected_titles: &'static [&'static str],
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "hemogram-plain",
            exam_name: "Hemogram",
            expected_variant: SchemaVariant::Panel(PanelKind::Hemogram),
            expected_titles: &["Hemogram", "Leukocyte differential"],
        },
        GoldenCase {
            id: "hemogram-spanish-uppercase",
            exam_name: "HEMOGRAMA COMPLETO",
            expected_variant: SchemaVariant::Panel(PanelKind::Hemogram),
            expected_titles: &["Hemogram", "Leukocyte differential"],
        },
        GoldenCase {
            id: "cbc-abbreviation",
            exam_name: "Complete Blood Count (CBC)",
            expected_variant: SchemaVariant::Panel(PanelKind::Hemogram),
            expected_titles: &["Hemogram", "Leukocyte differential"],
        },
        GoldenCase {
            id: "hemogram-padded",
            exam_name: "   hemogram   ",
            expected_variant: SchemaVariant::Panel(PanelKind::Hemogram),
            expected_titles: &["Hemogram", "Leukocyte differential"],
        },
        GoldenCase {
            id: "biochemistry-panel",
            exam_name: "Biochemistry panel",
            expected_variant: SchemaVariant::Panel(PanelKind::Biochemistry),
            expected_titles: &["Biochemistry"],
        },
        GoldenCase {
            id: "lipid-panel",
            exam_name: "Lipid Panel",
            expected_variant: SchemaVariant::Panel(PanelKind::Biochemistry),
            expected_titles: &["Biochemistry"],
        },
        GoldenCase {
            id: "metabolic-panel",
            exam_name: "Basic metabolic panel",
            expected_variant: SchemaVariant::Panel(PanelKind::Biochemistry),
            expected_titles: &["Biochemistry"],
        },
        GoldenCase {
            id: "hemogram-wins-over-panel",
            exam_name: "Hemogram panel",
            expected_variant: SchemaVariant::Panel(PanelKind::Hemogram),
            expected_titles: &["Hemogram", "Leukocyte differential"],
        },
        GoldenCase {
            id: "widal-free-text",
            exam_name: "Widal test",
            expected_variant: SchemaVariant::FreeText,
            expected_titles: &["Widal test"],
        },
        GoldenCase {
            id: "urinalysis-free-text",
            exam_name: "Urinalysis",
            expected_variant: SchemaVariant::FreeText,
            expected_titles: &["Urinalysis"],
        },
    ]
}

#[test]
fn test_golden_cases() {
    let resolver = SchemaResolver::new();

    for case in get_golden_cases() {
        assert_eq!(
            resolver.resolve_variant(case.exam_name),
            case.expected_variant,
            "Case {}: variant mismatch",
            case.id
        );

        let exam = Exam::new(case.exam_name, "Any", 10.0);
        let sections = resolver.resolve(&exam);
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, case.expected_titles, "Case {}: section titles", case.id);

        for section in &sections {
            assert_eq!(section.exam_id, exam.id, "Case {}: sections keyed on exam", case.id);
            assert!(
                section.parameters.iter().all(|p| p.value().is_empty()),
                "Case {}: skeleton must be empty",
                case.id
            );
        }
    }
}

#[test]
fn test_free_text_section_shape() {
    let resolver = SchemaResolver::new();
    let exam = Exam::new("Widal test", "Serology", 8.0);

    let sections = resolver.resolve(&exam);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].parameters.len(), 1);

    let row = &sections[0].parameters[0];
    assert_eq!(row.name(), FREE_TEXT_PARAMETER);
    assert_eq!(row.reference_range(), "");
    assert_eq!(row.unit(), "");
}

#[test]
fn test_canonical_rows_carry_defaults() {
    let resolver = SchemaResolver::new();
    let exam = Exam::new("Hemogram", "Hematology", 15.0);
    let sections = resolver.resolve(&exam);

    let hematocrit = sections[0]
        .parameters
        .iter()
        .find(|p| p.name() == "Hematocrit")
        .unwrap();
    assert_eq!(hematocrit.unit(), "%");
    assert_eq!(hematocrit.reference_range(), "36-46");

    assert!(sections
        .iter()
        .flat_map(|s| s.parameters.iter())
        .all(|p| !p.reference_range().is_empty()));
}

#[test]
fn test_category_decides_when_name_is_unknown() {
    let resolver = SchemaResolver::new();
    // (name, category, expected first section title)
    let cases = [
        ("Frotis de sangre", "Hematología", "Hemogram"),
        ("Blood smear", "Haematology", "Hemogram"),
        ("Ionogramme", "Biochimie", "Biochemistry"),
        ("NFS", "Serology", "Hemogram"),
        ("Widal test", "Serology", "Widal test"),
    ];

    for (name, category, title) in cases {
        let exam = Exam::new(name, category, 10.0);
        let sections = resolver.resolve(&exam);
        assert_eq!(sections[0].title, title, "{} / {}", name, category);
    }
}

#[test]
fn test_custom_rule_extends_table() {
    let mut resolver = SchemaResolver::new();
    assert_eq!(resolver.resolve_variant("Perfil renal"), SchemaVariant::FreeText);

    resolver.add_rule(PanelKind::Biochemistry, &["perfil renal"]);
    assert_eq!(
        resolver.resolve_variant("PERFIL RENAL"),
        SchemaVariant::Panel(PanelKind::Biochemistry)
    );
}

/// Scenario E: one canonical hemogram exam plus one exam with no panel.
#[test]
fn test_mixed_request_skeleton() {
    let hemogram = Exam::new("Hemogram", "Hematology", 15.0);
    let widal = Exam::new("Widal test", "Serology", 8.0);
    let request = LabRequest::new(
        "patient-1".into(),
        "doctor-1".into(),
        vec![hemogram.id.clone(), widal.id.clone()],
    );

    let builder = ResultBuilder::new();
    let result = builder
        .skeleton(&request, &[widal.clone(), hemogram.clone()])
        .unwrap();

    let titles: Vec<_> = result.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Hemogram", "Leukocyte differential", "Widal test"]);
    assert_eq!(result.sections_for_exam(&hemogram.id).count(), 2);
    assert_eq!(result.sections_for_exam(&widal.id).count(), 1);
    assert!(!result.has_values());
    assert!(!result.is_persisted());
}
