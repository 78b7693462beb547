//! Artifact generation.
//!
//! The batch outcome is decided once, after every row is classified:
//!
//! | batch state | plan | artifact |
//! |-------------|------|----------|
//! | no rows flagged, at least one valid row | [`OutputPlan::CleanArtifact`] | SQL insert script |
//! | any row flagged | [`OutputPlan::ReportArtifact`] | xlsx workbook |
//! | nothing at all | [`OutputPlan::MessageOnly`] | none |
//!
//! Which rows count as "flagged" is governed by [`CleanPathPolicy`].

use std::fmt::Write as _;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};

use crate::{
    data::{coerce, parse_bit},
    diagnostics::{AnnotatedRow, RowStatus, Severity},
    rows::Batch,
    schema::{ColumnDescriptor, DeclaredType, SchemaDescriptor},
};

pub const VALID_SHEET: &str = "Valid";
pub const ERRORS_SHEET: &str = "Errors";
pub const WARNINGS_SHEET: &str = "Warnings";
pub const ERRORS_COLUMN: &str = "ValidationErrors";
pub const WARNINGS_COLUMN: &str = "ValidationWarnings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanPathPolicy {
    /// A single warning row sends the whole batch to the report, so no SQL is
    /// produced even for rows that passed every check.
    #[default]
    AnyWarningBlocks,
    /// Only error rows block the clean path; warning rows are then inserted
    /// alongside valid ones.
    ErrorsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPlan {
    CleanArtifact,
    ReportArtifact,
    MessageOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub valid: usize,
    pub warning: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn tally(rows: &[AnnotatedRow]) -> Self {
        rows.iter().fold(Self::default(), |mut counts, row| {
            match row.status {
                RowStatus::Valid => counts.valid += 1,
                RowStatus::Warning => counts.warning += 1,
                RowStatus::Error => counts.error += 1,
            }
            counts
        })
    }
}

pub fn plan(counts: StatusCounts, policy: CleanPathPolicy) -> OutputPlan {
    let flagged = match policy {
        CleanPathPolicy::AnyWarningBlocks => counts.error + counts.warning,
        CleanPathPolicy::ErrorsOnly => counts.error,
    };
    let insertable = match policy {
        CleanPathPolicy::AnyWarningBlocks => counts.valid,
        CleanPathPolicy::ErrorsOnly => counts.valid + counts.warning,
    };
    if flagged > 0 {
        OutputPlan::ReportArtifact
    } else if insertable > 0 {
        OutputPlan::CleanArtifact
    } else {
        OutputPlan::MessageOnly
    }
}

pub fn escape_sql(value: &str) -> String {
    value.replace('\'', "''")
}

/// One `INSERT` per row. Only non-blank cells of columns the target table
/// knows are emitted, in upload header order. A cell that does not coerce to
/// its column's declared type is left out so the column falls back to NULL.
pub fn render_sql_script<'a, I>(
    generator: &str,
    insert_table: &str,
    schema: &SchemaDescriptor,
    batch: &Batch,
    rows: I,
) -> (String, usize)
where
    I: IntoIterator<Item = &'a AnnotatedRow>,
{
    let mut script = String::new();
    let _ = writeln!(script, "-- SQL INSERT STATEMENTS GENERATED BY {generator}");
    let _ = writeln!(script);

    let columns: Vec<(usize, &ColumnDescriptor)> = batch
        .headers()
        .iter()
        .enumerate()
        .filter(|(idx, header)| batch.column_index(header) == Some(*idx))
        .filter_map(|(idx, header)| schema.column(header).map(|column| (idx, column)))
        .collect();

    let mut statements = 0usize;
    for annotated in rows {
        let mut names = Vec::new();
        let mut values = Vec::new();
        for (idx, column) in &columns {
            let Some(raw) = annotated.row.values.get(*idx) else {
                continue;
            };
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            let Some(literal) = render_literal(value, column.declared_type) else {
                continue;
            };
            names.push(column.source_name.as_str());
            values.push(literal);
        }
        if names.is_empty() {
            continue;
        }
        let _ = writeln!(
            script,
            "INSERT INTO {} ({}) VALUES ({})",
            insert_table,
            names.join(", "),
            values.join(", ")
        );
        statements += 1;
    }
    (script, statements)
}

fn render_literal(value: &str, declared_type: DeclaredType) -> Option<String> {
    match declared_type {
        DeclaredType::Boolean => parse_bit(value)
            .ok()
            .map(|bit| if bit { "1" } else { "0" }.to_string()),
        _ => coerce(value, declared_type)
            .ok()
            .map(|_| format!("'{}'", escape_sql(value))),
    }
}

/// Builds the diagnostic workbook and returns its bytes with the names of the
/// sheets it contains. Sheets without rows are left out.
pub fn build_report_workbook(
    batch: &Batch,
    rows: &[AnnotatedRow],
) -> Result<(Vec<u8>, Vec<String>), XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut sheets = Vec::new();

    let layout: [(&str, RowStatus, Option<(&str, Severity)>); 3] = [
        (VALID_SHEET, RowStatus::Valid, None),
        (ERRORS_SHEET, RowStatus::Error, Some((ERRORS_COLUMN, Severity::Error))),
        (WARNINGS_SHEET, RowStatus::Warning, Some((WARNINGS_COLUMN, Severity::Warning))),
    ];
    for (name, status, trailing) in layout {
        let selected: Vec<&AnnotatedRow> = rows.iter().filter(|row| row.status == status).collect();
        if selected.is_empty() {
            continue;
        }
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_sheet(sheet, &header_format, batch.headers(), &selected, trailing)?;
        sheets.push(name.to_string());
    }

    // An xlsx file needs at least one worksheet; callers only ask for a
    // report when something was flagged, so this is a fallback for empty input.
    if sheets.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(VALID_SHEET)?;
        write_sheet(sheet, &header_format, batch.headers(), &[], None)?;
        sheets.push(VALID_SHEET.to_string());
    }

    let bytes = workbook.save_to_buffer()?;
    Ok((bytes, sheets))
}

fn write_sheet(
    sheet: &mut Worksheet,
    header_format: &Format,
    headers: &[String],
    rows: &[&AnnotatedRow],
    trailing: Option<(&str, Severity)>,
) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, column_index(col)?, header, header_format)?;
    }
    let trailing_col = column_index(headers.len())?;
    if let Some((column, _)) = trailing {
        sheet.write_string_with_format(0, trailing_col, column, header_format)?;
    }
    for (offset, annotated) in rows.iter().enumerate() {
        let row_num = row_index(offset + 1)?;
        for (col, value) in annotated.row.values.iter().take(headers.len()).enumerate() {
            if !value.is_empty() {
                sheet.write_string(row_num, column_index(col)?, value)?;
            }
        }
        if let Some((_, severity)) = trailing {
            sheet.write_string(row_num, trailing_col, annotated.joined_messages(severity))?;
        }
    }
    Ok(())
}

fn column_index(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

fn row_index(row: usize) -> Result<u32, XlsxError> {
    u32::try_from(row).map_err(|_| XlsxError::RowColumnLimitError)
}
