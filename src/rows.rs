//! Normalized upload rows and exact-duplicate removal.
//!
//! A [`Batch`] pairs the canonical header list with the uploaded rows. Each
//! [`Row`] remembers its position in the original upload so diagnostics and
//! reports can refer back to it after duplicates are dropped.

use std::collections::{HashMap, HashSet};

use crate::{
    headers::{AliasTable, normalize_headers},
    upload::UploadedTable,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    /// Zero-based index of the row among the non-blank uploaded data rows.
    pub position: usize,
    pub values: Vec<String>,
}

impl Row {
    pub fn new(position: usize, values: Vec<String>) -> Self {
        Self { position, values }
    }

    /// One-based number of the row among the non-blank data rows.
    pub fn row_number(&self) -> usize {
        self.position + 1
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Row>,
}

impl Batch {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let mut index = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            index.entry(header.clone()).or_insert(idx);
        }
        Self {
            headers,
            index,
            rows,
        }
    }

    pub fn from_upload(upload: &UploadedTable, aliases: &AliasTable) -> Self {
        let headers = normalize_headers(&upload.headers, aliases);
        let rows = upload
            .rows
            .iter()
            .enumerate()
            .map(|(position, values)| Row::new(position, values.clone()))
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Raw cell for `name`, or `None` when the column is absent from the upload.
    pub fn raw<'a>(&self, row: &'a Row, name: &str) -> Option<&'a str> {
        self.column_index(name)
            .and_then(|idx| row.values.get(idx))
            .map(String::as_str)
    }

    /// Trimmed cell for `name`; absent columns and blank cells are both null.
    pub fn value<'a>(&self, row: &'a Row, name: &str) -> Option<&'a str> {
        self.raw(row, name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Outcome of [`deduplicate`]: the surviving batch plus the number of rows dropped.
#[derive(Debug, Clone)]
pub struct Deduplicated {
    pub batch: Batch,
    pub removed: usize,
}

/// Drops rows whose every raw value equals an earlier row, keeping the first
/// occurrence in file order.
pub fn deduplicate(batch: &Batch) -> Deduplicated {
    let mut seen: HashSet<&[String]> = HashSet::with_capacity(batch.len());
    let mut kept = Vec::with_capacity(batch.len());
    for row in batch.rows() {
        if seen.insert(row.values.as_slice()) {
            kept.push(row.clone());
        }
    }
    let removed = batch.len() - kept.len();
    Deduplicated {
        batch: Batch::new(batch.headers().to_vec(), kept),
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn batch(rows: &[&[&str]]) -> Batch {
        let headers = vec!["id".to_string(), "firstname".to_string()];
        let rows = rows
            .iter()
            .enumerate()
            .map(|(idx, values)| Row::new(idx, values.iter().map(|v| v.to_string()).collect()))
            .collect();
        Batch::new(headers, rows)
    }

    #[test]
    fn value_treats_blank_and_absent_as_null() {
        let batch = batch(&[&["A1", "   "]]);
        let row = &batch.rows()[0];
        assert_eq!(batch.value(row, "id"), Some("A1"));
        assert_eq!(batch.value(row, "firstname"), None);
        assert_eq!(batch.raw(row, "firstname"), Some("   "));
        assert_eq!(batch.value(row, "lastname"), None);
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let batch = batch(&[&["A1", "Ann"], &["A2", "Bo"], &["A1", "Ann"], &["a1", "Ann"]]);
        let result = deduplicate(&batch);
        assert_eq!(result.removed, 1);
        let positions: Vec<usize> = result.batch.rows().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 3]);
    }

    #[test]
    fn deduplicate_empty_batch_removes_nothing() {
        let result = deduplicate(&batch(&[]));
        assert_eq!(result.removed, 0);
        assert!(result.batch.is_empty());
    }

    proptest! {
        #[test]
        fn deduplicate_is_idempotent(values in proptest::collection::vec(
            (prop::sample::select(vec!["A1", "A2", "b3"]), prop::sample::select(vec!["Ann", "", "Bo"])),
            0..24,
        )) {
            let rows: Vec<Row> = values
                .iter()
                .enumerate()
                .map(|(idx, (id, name))| Row::new(idx, vec![id.to_string(), name.to_string()]))
                .collect();
            let batch = Batch::new(vec!["id".to_string(), "firstname".to_string()], rows);
            let once = deduplicate(&batch);
            let twice = deduplicate(&once.batch);
            prop_assert_eq!(twice.removed, 0);
            prop_assert_eq!(twice.batch.len(), once.batch.len());
        }
    }
}
