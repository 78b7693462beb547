pub mod cli;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod headers;
pub mod io_utils;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod reference;
pub mod rows;
pub mod schema;
pub mod source;
pub mod store;
pub mod table;
pub mod uniqueness;
pub mod upload;
pub mod validate;
pub mod validator;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, EntitiesArgs, SchemaArgs, ValidateArgs},
    config::AppConfig,
    source::SqliteSource,
    store::DirectoryStore,
    upload::UploadedTable,
    validator::Registry,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("datamend", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => handle_validate(&args),
        Commands::Entities(args) => handle_entities(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn handle_validate(args: &ValidateArgs) -> Result<()> {
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        config.artifact_dir = dir.clone();
    }
    let registry = Registry::from_config(&config);
    let validator = registry.get(&args.entity)?;

    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Reading '{}' for entity '{}'",
        args.input.display(),
        validator.label()
    );
    let upload = UploadedTable::from_path(&args.input, args.delimiter, encoding)?;
    let source = SqliteSource::open(&args.database)?;
    let store = DirectoryStore::new(&config.artifact_dir);

    let result = validator.run(&upload, &source, &store)?;
    let summary = result.summary();
    if args.json {
        let rendered =
            serde_json::to_string_pretty(&summary).context("Serializing result summary")?;
        println!("{rendered}");
    } else {
        println!("{}", summary.message);
        if let Some(reference) = &summary.artifact_ref {
            println!("Artifact: {reference}");
        }
    }
    Ok(())
}

fn handle_entities(args: &EntitiesArgs) -> Result<()> {
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let registry = Registry::from_config(&config);
    let rows = registry
        .iter()
        .map(|validator| {
            let profile = validator.profile();
            vec![
                profile.label.clone(),
                profile.display_name.clone(),
                profile.table.clone(),
                profile.insert_table().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_table(&["entity", "name", "table", "insert into"], &rows)
    );
    Ok(())
}

fn handle_schema(args: &SchemaArgs) -> Result<()> {
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let registry = Registry::from_config(&config);
    let profile = registry.get(&args.entity)?.profile();
    let source = SqliteSource::open(&args.database)?;
    let schema = schema::introspect(&source, &profile.table, &profile.skip_columns)?;
    let rows = schema
        .columns()
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                column.sql_type.clone(),
                column.declared_type.to_string(),
                if column.required { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_table(&["column", "sql type", "declared", "required"], &rows)
    );
    Ok(())
}
