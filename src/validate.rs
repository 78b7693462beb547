use log::trace;

use crate::{
    data::coerce,
    diagnostics::{Diagnostic, DiagnosticKind},
    rows::{Batch, Row},
    schema::SchemaDescriptor,
};

/// Presence and type checks driven purely by the target table's schema.
pub struct RowValidator<'a> {
    schema: &'a SchemaDescriptor,
}

impl<'a> RowValidator<'a> {
    pub fn new(schema: &'a SchemaDescriptor) -> Self {
        Self { schema }
    }

    /// Appends one diagnostic per failing column, in schema column order.
    pub fn check(&self, batch: &Batch, row: &Row, out: &mut Vec<Diagnostic>) {
        for column in self.schema.columns() {
            let value = batch.value(row, &column.name);
            match value {
                None if column.required => out.push(Diagnostic::new(
                    DiagnosticKind::MissingRequiredField,
                    format!("Missing required field: {}", column.name),
                )),
                None => {}
                Some(value) => {
                    if let Err(err) = coerce(value, column.declared_type) {
                        trace!("Row {} column '{}': {err:#}", row.row_number(), column.name);
                        let (kind, requiredness) = if column.required {
                            (DiagnosticKind::InvalidTypeRequired, "required")
                        } else {
                            (DiagnosticKind::InvalidTypeOptional, "optional")
                        };
                        out.push(Diagnostic::new(
                            kind,
                            format!(
                                "Invalid {} in {} field: {}",
                                column.sql_type, requiredness, column.name
                            ),
                        ));
                    }
                }
            }
        }
    }
}
