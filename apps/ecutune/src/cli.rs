//! # CLI
//!
//! clap command definitions and the offline commands.
//!
//! `inspect` and `stage` read a file from disk, run it through a fresh
//! [`Session`], and print the result as text or JSON. `serve` starts the
//! HTTP server.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use ecutune_core::{EcuError, LoadedFile, Session, Stage, StagedValues};
use serde_json::json;
use thiserror::Error;

use crate::api;
use crate::config::{
    DEFAULT_HOST, DEFAULT_MAX_SESSIONS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT, DEFAULT_UPLOAD_DIR, ServerConfig,
};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ecu(#[from] EcuError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

// =============================================================================
// ARGUMENTS
// =============================================================================

/// ECU parameter tuning service.
#[derive(Debug, Parser)]
#[command(name = "ecutune", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Show the detected type and parameters of a file
    Inspect {
        /// Path to the ECU file
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Apply a stage preset to a file and print the result
    Stage {
        /// Path to the ECU file
        file: PathBuf,

        /// stage1, stage2 or stage3
        stage: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Options for `serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, env = "ECUTUNE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Listen port
    #[arg(long, env = "ECUTUNE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory for stored uploads
    #[arg(long, env = "ECUTUNE_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: PathBuf,

    /// Maximum request body in bytes
    #[arg(long, env = "ECUTUNE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Requests per second (0 disables rate limiting)
    #[arg(long, env = "ECUTUNE_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
    pub rate_limit: u32,

    /// Sessions kept in memory before the oldest is dropped
    #[arg(long, env = "ECUTUNE_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            upload_dir: args.upload_dir,
            max_upload_bytes: args.max_upload_bytes,
            rate_limit_per_sec: args.rate_limit,
            max_sessions: args.max_sessions,
        }
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Serve(args) => api::serve(args.into()).await.map_err(CliError::from),
        Commands::Inspect { file, json } => cmd_inspect(&file, json),
        Commands::Stage { file, stage, json } => cmd_stage(&file, &stage, json),
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Load a file from disk into a fresh session.
pub fn load_file(path: &Path) -> Result<Session, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut session = Session::new();
    session.load(&bytes, name);
    Ok(session)
}

/// Print the detected type and parameters of a file.
pub fn cmd_inspect(path: &Path, json: bool) -> Result<(), CliError> {
    println!("{}", render_inspect(path, json)?);
    Ok(())
}

/// Print the staged values of a file.
pub fn cmd_stage(path: &Path, stage: &str, json: bool) -> Result<(), CliError> {
    println!("{}", render_stage(path, stage, json)?);
    Ok(())
}

/// Output of `inspect`.
pub fn render_inspect(path: &Path, json: bool) -> Result<String, CliError> {
    let session = load_file(path)?;
    let file = session.current_file().ok_or(EcuError::NotLoaded)?;

    if json {
        return Ok(serde_json::to_string_pretty(file)?);
    }
    Ok(format_file(file))
}

/// Output of `stage`.
pub fn render_stage(path: &Path, stage_name: &str, json: bool) -> Result<String, CliError> {
    let session = load_file(path)?;
    let staged = session.apply_stage(stage_name)?;
    let stage = stage_name.parse::<Stage>()?;
    let file = session.current_file().ok_or(EcuError::NotLoaded)?;

    if json {
        let value = json!({
            "file": file.name,
            "stage": stage,
            "parameters": staged,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }
    Ok(format_staged(file, stage, &staged))
}

fn format_file(file: &LoadedFile) -> String {
    let mut out = String::new();
    out.push_str(&format!("File:     {}\n", file.name));
    out.push_str(&format!("Size:     {} bytes\n", file.size));
    out.push_str(&format!("Checksum: {}\n", file.checksum));
    out.push_str(&format!("Type:     {}\n", file.ecu_type));
    out.push_str("\nParameters:\n");
    for (key, record) in file.parameters.iter() {
        out.push_str(&format!(
            "  {:<18} {:>8} {:<6} [{}] {}\n",
            key.as_str(),
            record.value.to_string(),
            record.unit,
            record.address,
            record.description
        ));
    }
    out
}

fn format_staged(file: &LoadedFile, stage: Stage, staged: &StagedValues) -> String {
    let mut out = String::new();
    out.push_str(&format!("File:  {}\n", file.name));
    out.push_str(&format!("Stage: {}\n\n", stage));
    for (key, value) in staged.iter() {
        let record = file.parameters.get(key);
        let unit = record.map(|r| r.unit.as_str()).unwrap_or_default();
        let before = record
            .map(|r| r.value.to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "  {:<18} {:>8} -> {:>8} {}\n",
            key.as_str(),
            before,
            value.to_string(),
            unit
        ));
    }
    out
}
