//! Exam schema resolver.
//!
//! Maps an exam's display name to a tagged [`SchemaVariant`] through an
//! explicit rule table, then expands the variant into empty result sections.
//! A name matching no rule is retried against the exam's category; exams
//! matching neither fall back to a single free-text section.

mod panels;

pub use panels::*;

use crate::models::{Exam, ResultSection};

/// Resolves exams to their canonical result sections.
pub struct SchemaResolver {
    rules: Vec<PanelRule>,
    category_rules: Vec<PanelRule>,
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaResolver {
    /// Create a resolver with the default panel rules.
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            category_rules: default_category_rules(),
        }
    }

    /// Create a resolver with explicit name and category rule tables.
    pub fn with_rules(rules: Vec<PanelRule>, category_rules: Vec<PanelRule>) -> Self {
        Self {
            rules,
            category_rules,
        }
    }

    /// Add extra name patterns for a panel. They are checked after the existing rules.
    pub fn add_rule(&mut self, kind: PanelKind, patterns: &[&str]) {
        self.rules.push(PanelRule::new(kind, patterns));
    }

    /// Add extra category patterns for a panel.
    pub fn add_category_rule(&mut self, kind: PanelKind, patterns: &[&str]) {
        self.category_rules.push(PanelRule::new(kind, patterns));
    }

    /// Select the schema variant for an exam name.
    ///
    /// Matching is by case-insensitive substring, first rule wins.
    pub fn resolve_variant(&self, exam_name: &str) -> SchemaVariant {
        match_rules(&self.rules, exam_name).unwrap_or(SchemaVariant::FreeText)
    }

    /// Select the schema variant for an exam.
    ///
    /// The name decides when it matches a rule. Otherwise the category
    /// table is consulted, so "Blood smear" filed under "Hematology" gets
    /// the hemogram schema. Unmatched exams are free text.
    pub fn resolve_exam_variant(&self, exam: &Exam) -> SchemaVariant {
        match_rules(&self.rules, &exam.name)
            .or_else(|| match_rules(&self.category_rules, &exam.category))
            .unwrap_or(SchemaVariant::FreeText)
    }

    /// Build the empty section skeleton for one exam, using
    /// [`resolve_exam_variant`](Self::resolve_exam_variant).
    pub fn resolve(&self, exam: &Exam) -> Vec<ResultSection> {
        self.resolve_exam_variant(exam)
            .build_sections(&exam.id, &exam.name)
    }

    /// Build skeletons for several exams, in order.
    pub fn resolve_all(&self, exams: &[Exam]) -> Vec<ResultSection> {
        exams.iter().flat_map(|exam| self.resolve(exam)).collect()
    }
}

fn match_rules(rules: &[PanelRule], text: &str) -> Option<SchemaVariant> {
    let normalized = normalize_name(text);
    rules
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map(|rule| SchemaVariant::Panel(rule.kind))
}
