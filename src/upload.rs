//! Materialized uploads.
//!
//! The transport layer hands the core a file; this module turns it into an
//! [`UploadedTable`] of raw header and cell strings. Delimited text goes through
//! the `csv` reader in [`crate::io_utils`]; spreadsheet uploads read the first
//! worksheet through `calamine`.

use std::{io::Read, path::Path};

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::Encoding;
use log::debug;

use crate::io_utils;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl UploadedTable {
    /// Loads `path`, choosing the reader from its extension.
    pub fn from_path(
        path: &Path,
        delimiter: Option<u8>,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        if is_workbook(path) {
            return Self::from_workbook(path);
        }
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        Self::from_csv_reader(reader, encoding).with_context(|| format!("Reading upload {path:?}"))
    }

    pub fn from_csv<R: Read>(
        reader: R,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        Self::from_csv_reader(io_utils::open_csv_reader(reader, delimiter), encoding)
    }

    fn from_csv_reader<R: Read>(
        mut reader: csv::Reader<R>,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let headers = io_utils::reader_headers(&mut reader, encoding)?;
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let values = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?;
            if values.iter().all(|value| value.trim().is_empty()) {
                continue;
            }
            rows.push(pad_to(values, headers.len()));
        }
        debug!("Read {} data row(s) across {} column(s)", rows.len(), headers.len());
        Ok(Self { headers, rows })
    }

    pub fn from_workbook(path: &Path) -> Result<Self> {
        let mut workbook =
            open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Workbook {path:?} contains no worksheets"))?
            .with_context(|| format!("Reading first worksheet of {path:?}"))?;

        let mut iter = range.rows();
        let headers = match iter.next() {
            Some(cells) => cells.iter().map(cell_to_string).collect::<Vec<_>>(),
            None => return Ok(Self::default()),
        };
        let rows = iter
            .map(|cells| cells.iter().map(cell_to_string).collect::<Vec<_>>())
            .filter(|values| values.iter().any(|value| !value.trim().is_empty()))
            .map(|values| pad_to(values, headers.len()))
            .collect::<Vec<_>>();
        debug!(
            "Read {} data row(s) from worksheet of {:?}",
            rows.len(),
            path
        );
        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn pad_to(mut values: Vec<String>, width: usize) -> Vec<String> {
    if values.len() < width {
        values.resize(width, String::new());
    }
    values
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| value.as_f64().to_string()),
        other => other.to_string(),
    }
}
