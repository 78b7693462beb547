use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{error::BatchError, schema::SchemaDescriptor};

/// Entity-specific header aliases, keyed by the trimmed, lowercased spelling
/// users put in their files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(from, to)| (normalize_header(from.as_ref()), normalize_header(to.as_ref())))
            .collect();
        Self { entries }
    }

    pub fn resolve<'a>(&'a self, header: &'a str) -> &'a str {
        self.entries
            .get(header)
            .map(String::as_str)
            .unwrap_or(header)
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trims, lowercases, then applies aliases. Headers without an alias pass
/// through so that files already using schema names need no mapping.
pub fn normalize_headers(raw: &[String], aliases: &AliasTable) -> Vec<String> {
    raw.iter()
        .map(|header| {
            let normalized = normalize_header(header);
            aliases.resolve(&normalized).to_string()
        })
        .collect()
}

/// Fails the whole batch when a required schema column, or a header the
/// entity insists on regardless of nullability, is absent.
pub fn ensure_required_columns(
    headers: &[String],
    schema: &SchemaDescriptor,
    required_headers: &[String],
) -> Result<(), BatchError> {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let missing: BTreeSet<String> = schema
        .required_names()
        .into_iter()
        .map(str::to_string)
        .chain(required_headers.iter().map(|name| normalize_header(name)))
        .filter(|name| !present.contains(name.as_str()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BatchError::MissingRequiredColumns {
            missing: missing.into_iter().collect(),
        })
    }
}
