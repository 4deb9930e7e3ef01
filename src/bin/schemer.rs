//! Schemer CLI
//!
//! Command-line interface for validating documents against schema
//! descriptions and linting description files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::debug;
use schemer::{lint, load_json, load_schema, FileStatus, LintResult, Severity, ValidateError};

#[derive(Parser)]
#[command(name = "schemer")]
#[command(about = "Validate documents against declarative schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document and apply schema defaults
    Validate {
        /// Document file to validate
        document: PathBuf,

        /// Schema description file
        #[arg(long, short)]
        schema: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Strict mode: reject fields the root schema does not declare
        #[arg(long)]
        strict: bool,

        /// Write the defaulted document to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print the defaulted document
        #[arg(long)]
        pretty: bool,
    },

    /// Lint schema description files
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            document,
            schema,
            json,
            strict,
            output,
            pretty,
        } => run_validate(ValidateArgs {
            document,
            schema,
            json_output: json,
            strict,
            output,
            pretty,
        }),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct ValidateArgs {
    document: PathBuf,
    schema: PathBuf,
    json_output: bool,
    strict: bool,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_validate(args: ValidateArgs) -> Result<(), u8> {
    let ValidateArgs {
        document: document_path,
        schema: schema_path,
        json_output,
        strict,
        output,
        pretty,
    } = args;

    let mut schema = load_schema(&schema_path).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;
    if strict {
        schema = schema.strict(true);
    }

    let document = load_json(&document_path).map_err(|e| {
        report_error(json_output, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    let validation = schema.validate(&document);
    debug!(
        "{}: {} error(s)",
        document_path.display(),
        validation.errors.len()
    );

    // Defaults are written even when the document is invalid.
    if let Some(path) = &output {
        write_document(path, &validation.document, pretty)?;
    }

    match validation.into_result() {
        Ok(_) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e @ ValidateError::Load(_)) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn write_document(path: &Path, document: &serde_json::Value, pretty: bool) -> Result<(), u8> {
    let text = if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    std::fs::write(path, text).map_err(|e| {
        eprintln!("Error writing to {}: {}", path.display(), e);
        3u8
    })
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    if format == "json" {
        let text = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", text);
    } else {
        print_lint_report(&result, quiet);
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

/// Quiet mode lists only files with problems and only their errors.
fn print_lint_report(result: &LintResult, quiet: bool) {
    if !quiet {
        println!("Linting {} ...\n", result.path.display());
    }

    for file in &result.results {
        if quiet && file.status == FileStatus::Ok {
            continue;
        }
        let marker = match file.status {
            FileStatus::Ok => "\x1b[32mok\x1b[0m  ",
            FileStatus::Warning => "\x1b[33mwarn\x1b[0m",
            FileStatus::Error => "\x1b[31mfail\x1b[0m",
        };
        println!("  {} {}", marker, file.file.display());
        for diag in &file.diagnostics {
            if !quiet || diag.severity == Severity::Error {
                println!("       {}", diag);
            }
        }
    }

    println!();
    if result.is_ok() {
        println!("{} files checked, all passed", result.files_checked);
    } else {
        println!(
            "{} files checked: {} passed, {} failed ({} errors, {} warnings)",
            result.files_checked, result.passed, result.failed, result.errors, result.warnings
        );
    }
}
