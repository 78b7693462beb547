use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Validate uploads against a live table schema", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate an uploaded file and emit an insert script or a diagnostic workbook
    Validate(ValidateArgs),
    /// List the registered entity validators
    Entities(EntitiesArgs),
    /// Show the schema a validator would load for its target table
    Schema(SchemaArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Entity validator to run (see `entities`)
    #[arg(short, long)]
    pub entity: String,
    /// Uploaded CSV/TSV or workbook file ('-' reads CSV from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// SQLite database holding the target and reference tables
    #[arg(short, long)]
    pub database: PathBuf,
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory for generated artifacts (overrides the configuration)
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the result summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Entity whose target table is introspected
    #[arg(short, long)]
    pub entity: String,
    /// SQLite database holding the target table
    #[arg(short, long)]
    pub database: PathBuf,
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
