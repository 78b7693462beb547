//! Reference snapshots and cross-reference checks.
//!
//! Every [`ReferenceSet`] is read once per run from the first column of a
//! query's results. Values are compared after trimming and lowercasing, both
//! when the set is built and when uploaded values are looked up.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    error::BatchError,
    rows::{Batch, Row},
    source::QuerySource,
};

pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    values: HashSet<String>,
}

impl ReferenceSet {
    pub fn load(source: &dyn QuerySource, statement: &str, what: &str) -> Result<Self, BatchError> {
        let rows = source
            .query(statement, &[])
            .map_err(|err| BatchError::connectivity(what, &err))?;
        let set: Self = rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect();
        info!("Loaded {} reference value(s) for {}", set.len(), what);
        Ok(set)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(&normalize_key(value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|value| normalize_key(value.as_ref()))
            .filter(|value| !value.is_empty())
            .collect();
        Self { values }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReferenceRule {
    /// The value must already exist in a related table; a miss rejects the row.
    Membership {
        field: String,
        label: String,
        query: String,
    },
    /// The value should be a known lookup name; a miss only warns, meaning the
    /// name has to be created upstream before the row can be loaded.
    JoinedLookup { field: String, query: String },
}

impl ReferenceRule {
    pub fn field(&self) -> &str {
        match self {
            ReferenceRule::Membership { field, .. } | ReferenceRule::JoinedLookup { field, .. } => {
                field
            }
        }
    }

    fn query(&self) -> &str {
        match self {
            ReferenceRule::Membership { query, .. } | ReferenceRule::JoinedLookup { query, .. } => {
                query
            }
        }
    }
}

pub struct CrossReferenceChecker {
    rules: Vec<(ReferenceRule, ReferenceSet)>,
    upstream: String,
}

impl CrossReferenceChecker {
    pub fn load(
        rules: &[ReferenceRule],
        source: &dyn QuerySource,
        upstream: &str,
    ) -> Result<Self, BatchError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let what = format!("reference values for '{}'", rule.field());
                ReferenceSet::load(source, rule.query(), &what).map(|set| (rule.clone(), set))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_sets(rules, upstream))
    }

    pub fn with_sets(rules: Vec<(ReferenceRule, ReferenceSet)>, upstream: &str) -> Self {
        Self {
            rules,
            upstream: upstream.to_string(),
        }
    }

    /// Blank values are left to the required-field check.
    pub fn check(&self, batch: &Batch, row: &Row, out: &mut Vec<Diagnostic>) {
        for (rule, set) in &self.rules {
            let Some(value) = batch.value(row, rule.field()) else {
                continue;
            };
            if set.contains(value) {
                continue;
            }
            match rule {
                ReferenceRule::Membership { label, .. } => out.push(Diagnostic::new(
                    DiagnosticKind::InvalidReference,
                    format!("Invalid {label}: {value}"),
                )),
                ReferenceRule::JoinedLookup { .. } => out.push(Diagnostic::new(
                    DiagnosticKind::UnrecognizedReferenceValue,
                    format!("[{value}] needs to be added to {}", self.upstream),
                )),
            }
        }
    }
}
