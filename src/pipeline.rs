//! One validation run, from uploaded table to [`BatchResult`].
//!
//! Stages run strictly in order: schema introspection, header normalization
//! and the required-column gate, exact-row deduplication, per-row checks
//! (schema, cross-reference, uniqueness), classification, and finally the
//! output decision. Only the first two stages and reference loading can fail
//! the run; everything after that is recorded on the rows.

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::AppConfig,
    diagnostics::{AnnotatedRow, RowStatus},
    error::BatchError,
    headers::ensure_required_columns,
    output::{self, CleanPathPolicy, OutputPlan, StatusCounts},
    profile::EntityProfile,
    reference::{CrossReferenceChecker, ReferenceSet},
    rows::{Batch, deduplicate},
    schema::{SchemaDescriptor, introspect},
    source::QuerySource,
    store::ArtifactStore,
    uniqueness::UniquenessChecker,
    upload::UploadedTable,
    validate::RowValidator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Sql,
    Spreadsheet,
    None,
}

/// What a run produced. Each variant carries exactly what its kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Sql { reference: String, statements: usize },
    Spreadsheet { reference: String, sheets: Vec<String> },
    None,
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Sql { .. } => ArtifactKind::Sql,
            Artifact::Spreadsheet { .. } => ArtifactKind::Spreadsheet,
            Artifact::None => ArtifactKind::None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            Artifact::Sql { reference, .. } | Artifact::Spreadsheet { reference, .. } => {
                Some(reference)
            }
            Artifact::None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub valid_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
    pub duplicates_removed: usize,
    pub artifact: Artifact,
    pub message: String,
    /// Every row that survived deduplication, with its findings, in file order.
    pub rows: Vec<AnnotatedRow>,
}

/// Payload handed back to whatever transport delivers results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub message: String,
    pub artifact_kind: ArtifactKind,
    pub artifact_ref: Option<String>,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
    pub duplicates_removed: usize,
}

impl BatchResult {
    pub fn artifact_kind(&self) -> ArtifactKind {
        self.artifact.kind()
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            message: self.message.clone(),
            artifact_kind: self.artifact.kind(),
            artifact_ref: self.artifact.reference().map(str::to_string),
            valid_rows: self.valid_rows,
            error_rows: self.error_rows,
            warning_rows: self.warning_rows,
            duplicates_removed: self.duplicates_removed,
        }
    }
}

/// Runs every stage for one upload against one entity profile.
pub fn run_batch(
    profile: &EntityProfile,
    config: &AppConfig,
    upload: &UploadedTable,
    source: &dyn QuerySource,
    store: &dyn ArtifactStore,
) -> Result<BatchResult, BatchError> {
    info!(
        "Validating {} row(s) as '{}' against table '{}'",
        upload.row_count(),
        profile.label,
        profile.table
    );
    let schema = introspect(source, &profile.table, &profile.skip_columns)?;

    let batch = Batch::from_upload(upload, &profile.alias_table());
    debug!("Normalized headers: {:?}", batch.headers());
    ensure_required_columns(batch.headers(), &schema, &profile.required_headers)?;

    let cross_refs =
        CrossReferenceChecker::load(&profile.references, source, &config.upstream_system)?;
    let existing = match profile
        .identity
        .as_ref()
        .and_then(|identity| identity.existing_query.as_deref())
    {
        Some(statement) => ReferenceSet::load(source, statement, "stored identifiers")?,
        None => ReferenceSet::default(),
    };

    let deduplicated = deduplicate(&batch);
    let batch = deduplicated.batch;
    if deduplicated.removed > 0 {
        info!("Removed {} duplicate row(s)", deduplicated.removed);
    }

    let validator = RowValidator::new(&schema);
    let mut uniqueness = UniquenessChecker::new(
        profile.identity.as_ref(),
        &profile.name_fields,
        existing,
        &config.upstream_system,
    );
    let rows: Vec<AnnotatedRow> = batch
        .rows()
        .iter()
        .map(|row| {
            let mut diagnostics = Vec::new();
            validator.check(&batch, row, &mut diagnostics);
            cross_refs.check(&batch, row, &mut diagnostics);
            uniqueness.check(&batch, row, &mut diagnostics);
            let annotated = AnnotatedRow::new(row.clone(), diagnostics);
            if annotated.status != RowStatus::Valid {
                debug!(
                    "Row {} classified {:?}: {:?}",
                    row.row_number(),
                    annotated.status,
                    annotated.diagnostics
                );
            }
            annotated
        })
        .collect();

    let counts = StatusCounts::tally(&rows);
    info!(
        "Classified {} row(s): {} valid, {} warning, {} error",
        rows.len(),
        counts.valid,
        counts.warning,
        counts.error
    );

    let context = OutputContext {
        profile,
        config,
        schema: &schema,
        batch: &batch,
        rows: &rows,
        duplicates_removed: deduplicated.removed,
    };
    let (artifact, message) = context.produce(counts, store)?;
    if let Some(reference) = artifact.reference() {
        info!("Wrote {:?} artifact to {}", artifact.kind(), reference);
    }

    Ok(BatchResult {
        valid_rows: counts.valid,
        error_rows: counts.error,
        warning_rows: counts.warning,
        duplicates_removed: deduplicated.removed,
        artifact,
        message,
        rows,
    })
}

struct OutputContext<'a> {
    profile: &'a EntityProfile,
    config: &'a AppConfig,
    schema: &'a SchemaDescriptor,
    batch: &'a Batch,
    rows: &'a [AnnotatedRow],
    duplicates_removed: usize,
}

impl OutputContext<'_> {
    fn produce(
        &self,
        counts: StatusCounts,
        store: &dyn ArtifactStore,
    ) -> Result<(Artifact, String), BatchError> {
        let policy = self.config.clean_path_policy;
        let removed = self.duplicates_removed;
        let display = &self.profile.display_name;
        let no_data = || {
            (
                Artifact::None,
                format!("No valid data or errors to report. {removed} duplicate row(s) removed."),
            )
        };
        match output::plan(counts, policy) {
            OutputPlan::CleanArtifact => {
                let (script, statements) = output::render_sql_script(
                    &self.config.generator,
                    self.profile.insert_table(),
                    self.schema,
                    self.batch,
                    self.rows
                        .iter()
                        .filter(|row| insertable(row.status, policy)),
                );
                if statements == 0 {
                    info!("No insert statements generated; skipping script");
                    return Ok(no_data());
                }
                let name = format!("{}.sql", self.profile.script_stem());
                let reference = persist(store, script.as_bytes(), &name)?;
                info!("Generated {statements} insert statement(s)");
                Ok((
                    Artifact::Sql {
                        reference,
                        statements,
                    },
                    format!("{display} validation complete. {removed} duplicate row(s) removed."),
                ))
            }
            OutputPlan::ReportArtifact => {
                let (bytes, sheets) = output::build_report_workbook(self.batch, self.rows)
                    .map_err(|err| BatchError::ArtifactPersistence {
                        name: "validation_result.xlsx".to_string(),
                        reason: err.to_string(),
                    })?;
                let reference = persist(store, &bytes, "validation_result.xlsx")?;
                Ok((
                    Artifact::Spreadsheet { reference, sheets },
                    format!(
                        "{display} validation complete with issues. {removed} duplicate row(s) removed."
                    ),
                ))
            }
            OutputPlan::MessageOnly => Ok(no_data()),
        }
    }
}

fn insertable(status: RowStatus, policy: CleanPathPolicy) -> bool {
    match policy {
        CleanPathPolicy::AnyWarningBlocks => status == RowStatus::Valid,
        CleanPathPolicy::ErrorsOnly => status != RowStatus::Error,
    }
}

fn persist(store: &dyn ArtifactStore, bytes: &[u8], name: &str) -> Result<String, BatchError> {
    store
        .save(bytes, name)
        .map_err(|err| BatchError::ArtifactPersistence {
            name: name.to_string(),
            reason: format!("{err:#}"),
        })
}
