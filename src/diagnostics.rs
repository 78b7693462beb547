//! Row-level findings and the classifier that folds them into one status.

use std::fmt;

use serde::Serialize;

use crate::rows::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingRequiredField,
    InvalidTypeRequired,
    InvalidTypeOptional,
    InvalidIdentifierCharacters,
    InvalidNameCharacters,
    DuplicateIdentifierInBatch,
    DuplicateIdentifierExists,
    InvalidReference,
    UnrecognizedReferenceValue,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::InvalidTypeOptional | DiagnosticKind::UnrecognizedReferenceValue => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Valid,
    Warning,
    Error,
}

/// Any error wins over warnings; a row with neither is valid.
pub fn classify(diagnostics: &[Diagnostic]) -> RowStatus {
    if diagnostics.iter().any(Diagnostic::is_error) {
        RowStatus::Error
    } else if diagnostics.is_empty() {
        RowStatus::Valid
    } else {
        RowStatus::Warning
    }
}

/// A copy of an uploaded row together with everything the checks found.
#[derive(Debug, Clone)]
pub struct AnnotatedRow {
    pub row: Row,
    pub diagnostics: Vec<Diagnostic>,
    pub status: RowStatus,
}

impl AnnotatedRow {
    pub fn new(row: Row, diagnostics: Vec<Diagnostic>) -> Self {
        let status = classify(&diagnostics);
        Self {
            row,
            diagnostics,
            status,
        }
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    /// Messages of one severity joined the way report sheets show them.
    pub fn joined_messages(&self, severity: Severity) -> String {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == severity)
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KINDS: [DiagnosticKind; 9] = [
        DiagnosticKind::MissingRequiredField,
        DiagnosticKind::InvalidTypeRequired,
        DiagnosticKind::InvalidTypeOptional,
        DiagnosticKind::InvalidIdentifierCharacters,
        DiagnosticKind::InvalidNameCharacters,
        DiagnosticKind::DuplicateIdentifierInBatch,
        DiagnosticKind::DuplicateIdentifierExists,
        DiagnosticKind::InvalidReference,
        DiagnosticKind::UnrecognizedReferenceValue,
    ];

    #[test]
    fn classify_prefers_errors_over_warnings() {
        let diagnostics = vec![
            Diagnostic::new(DiagnosticKind::InvalidTypeOptional, "Invalid bit in optional field: active"),
            Diagnostic::new(DiagnosticKind::MissingRequiredField, "Missing required field: id"),
        ];
        assert_eq!(classify(&diagnostics), RowStatus::Error);
        assert_eq!(classify(&diagnostics[..1]), RowStatus::Warning);
        assert_eq!(classify(&[]), RowStatus::Valid);
    }

    #[test]
    fn joined_messages_filters_by_severity() {
        let row = AnnotatedRow::new(
            Row::new(0, vec![]),
            vec![
                Diagnostic::new(DiagnosticKind::MissingRequiredField, "Missing required field: id"),
                Diagnostic::new(DiagnosticKind::UnrecognizedReferenceValue, "[Gold] needs to be added to Agvance"),
                Diagnostic::new(DiagnosticKind::InvalidNameCharacters, "Invalid characters in firstname"),
            ],
        );
        assert_eq!(
            row.joined_messages(Severity::Error),
            "Missing required field: id; Invalid characters in firstname"
        );
        assert_eq!(
            row.joined_messages(Severity::Warning),
            "[Gold] needs to be added to Agvance"
        );
    }

    proptest! {
        #[test]
        fn classification_matches_severity_counts(picks in proptest::collection::vec(0usize..KINDS.len(), 0..8)) {
            let diagnostics: Vec<Diagnostic> = picks
                .iter()
                .map(|idx| Diagnostic::new(KINDS[*idx], "finding"))
                .collect();
            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            let warnings = diagnostics.len() - errors;
            let status = classify(&diagnostics);
            let expected = match (errors, warnings) {
                (0, 0) => RowStatus::Valid,
                (0, _) => RowStatus::Warning,
                _ => RowStatus::Error,
            };
            prop_assert_eq!(status, expected);
        }
    }
}
