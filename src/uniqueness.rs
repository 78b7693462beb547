use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    reference::{ReferenceSet, normalize_key},
    rows::{Batch, Row},
};

static IDENTIFIER_PATTERN: OnceLock<Regex> = OnceLock::new();
static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn identifier_pattern() -> &'static Regex {
    IDENTIFIER_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid identifier regex"))
}

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z\s\-']+$").expect("valid name regex"))
}

/// How an entity's identifier column is policed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRule {
    pub field: String,
    #[serde(default = "IdentityRule::default_label")]
    pub label: String,
    /// Query returning identifiers already stored upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_query: Option<String>,
    #[serde(default = "IdentityRule::default_unique_in_batch")]
    pub unique_in_batch: bool,
}

impl IdentityRule {
    fn default_label() -> String {
        "identifier".to_string()
    }

    const fn default_unique_in_batch() -> bool {
        true
    }
}

/// Identifier format, in-batch duplicates, already-stored identifiers and
/// name-field characters. Stateful: rows must be fed in file order.
pub struct UniquenessChecker<'a> {
    identity: Option<&'a IdentityRule>,
    name_fields: &'a [String],
    existing: ReferenceSet,
    upstream: &'a str,
    seen: HashSet<String>,
}

impl<'a> UniquenessChecker<'a> {
    pub fn new(
        identity: Option<&'a IdentityRule>,
        name_fields: &'a [String],
        existing: ReferenceSet,
        upstream: &'a str,
    ) -> Self {
        Self {
            identity,
            name_fields,
            existing,
            upstream,
            seen: HashSet::new(),
        }
    }

    pub fn check(&mut self, batch: &Batch, row: &Row, out: &mut Vec<Diagnostic>) {
        if let Some(identity) = self.identity {
            self.check_identifier(identity, batch, row, out);
        }
        for field in self.name_fields {
            if let Some(value) = batch.value(row, field)
                && !name_pattern().is_match(value)
            {
                out.push(Diagnostic::new(
                    DiagnosticKind::InvalidNameCharacters,
                    format!("Invalid characters in {field}"),
                ));
            }
        }
    }

    fn check_identifier(
        &mut self,
        identity: &IdentityRule,
        batch: &Batch,
        row: &Row,
        out: &mut Vec<Diagnostic>,
    ) {
        let value = batch.value(row, &identity.field).unwrap_or("");
        if !identifier_pattern().is_match(value) {
            out.push(Diagnostic::new(
                DiagnosticKind::InvalidIdentifierCharacters,
                format!(
                    "{} contains invalid characters. Only letters and numbers allowed.",
                    identity.label
                ),
            ));
        }
        if value.is_empty() {
            return;
        }
        let key = normalize_key(value);
        if identity.unique_in_batch && !self.seen.insert(key.clone()) {
            out.push(Diagnostic::new(
                DiagnosticKind::DuplicateIdentifierInBatch,
                format!(
                    "Duplicate {} found in uploaded file: '{}'",
                    identity.label, key
                ),
            ));
        }
        if self.existing.contains(&key) {
            out.push(Diagnostic::new(
                DiagnosticKind::DuplicateIdentifierExists,
                format!("{} already exists in {}", identity.label, self.upstream),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> IdentityRule {
        IdentityRule {
            field: "id".to_string(),
            label: "Salesman ID".to_string(),
            existing_query: None,
            unique_in_batch: true,
        }
    }

    fn run(rows: &[&[&str]], existing: &[&str]) -> Vec<Vec<Diagnostic>> {
        let headers = vec![
            "id".to_string(),
            "firstname".to_string(),
            "lastname".to_string(),
        ];
        let rows: Vec<Row> = rows
            .iter()
            .enumerate()
            .map(|(idx, values)| Row::new(idx, values.iter().map(|v| v.to_string()).collect()))
            .collect();
        let batch = Batch::new(headers, rows);
        let identity = identity();
        let names = vec!["firstname".to_string(), "lastname".to_string()];
        let mut checker = UniquenessChecker::new(
            Some(&identity),
            &names,
            existing.iter().collect(),
            "Agvance",
        );
        batch
            .rows()
            .iter()
            .map(|row| {
                let mut out = Vec::new();
                checker.check(&batch, row, &mut out);
                out
            })
            .collect()
    }

    #[test]
    fn later_duplicates_are_flagged_case_insensitively() {
        let out = run(
            &[&["A1", "Ann", "Lee"], &["B2", "Bo", "Ng"], &["a1", "Al", "Ray"]],
            &[],
        );
        assert!(out[0].is_empty());
        assert!(out[1].is_empty());
        assert_eq!(out[2].len(), 1);
        assert_eq!(out[2][0].kind, DiagnosticKind::DuplicateIdentifierInBatch);
        assert_eq!(out[2][0].message, "Duplicate Salesman ID found in uploaded file: 'a1'");
    }

    #[test]
    fn stored_identifiers_are_rejected() {
        let out = run(&[&["S01", "Ann", "Lee"]], &[" s01 "]);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].kind, DiagnosticKind::DuplicateIdentifierExists);
        assert_eq!(out[0][0].message, "Salesman ID already exists in Agvance");
    }

    #[test]
    fn identifier_whitelist_rejects_punctuation_and_blanks() {
        let out = run(&[&["S-01", "Ann", "Lee"], &["", "Bo", "Ng"], &["", "Cy", "Ko"]], &[]);
        for diagnostics in &out {
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidIdentifierCharacters);
        }
    }

    #[test]
    fn name_fields_allow_letters_spaces_hyphens_apostrophes() {
        let out = run(
            &[&["S01", "Mary-Jo", "O'Neil Smith"], &["S02", "R2D2", "Lee"], &["S03", "", "X_"]],
            &[],
        );
        assert!(out[0].is_empty());
        assert_eq!(out[1][0].message, "Invalid characters in firstname");
        assert_eq!(out[2].len(), 1);
        assert_eq!(out[2][0].message, "Invalid characters in lastname");
    }

    #[test]
    fn batch_uniqueness_can_be_disabled() {
        let mut rule = identity();
        rule.unique_in_batch = false;
        let headers = vec!["id".to_string()];
        let rows = vec![Row::new(0, vec!["G1".to_string()]), Row::new(1, vec!["G1".to_string()])];
        let batch = Batch::new(headers, rows);
        let mut checker = UniquenessChecker::new(Some(&rule), &[], ReferenceSet::default(), "Agvance");
        let mut out = Vec::new();
        for row in batch.rows() {
            checker.check(&batch, row, &mut out);
        }
        assert!(out.is_empty());
    }
}
