use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use bms_core::DisplayTables;
use jsonschema::JSONSchema;

const TABLES_SCHEMA: &str = "bms_core/src/data/display_tables.schema.json";
const DEFAULT_TABLE_GLOBS: [&str; 2] = [
    "bms_core/src/data/display_tables.json",
    "integration_tests/tests/fixtures/*tables*.json",
];

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("check-tables") => check_tables(args.collect()),
        Some("help") | None => {
            print_usage();
            Ok(())
        }
        Some(cmd) => {
            eprintln!("Unknown xtask '{cmd}'.");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: cargo xtask check-tables [GLOB...]");
    eprintln!("       cargo xtask help");
}

/// Validate display-table files against the JSON schema, then load each one
/// the way the dashboard does.
fn check_tables(patterns: Vec<String>) -> Result<(), Box<dyn Error>> {
    let schema_text = fs::read_to_string(TABLES_SCHEMA)?;
    let schema_json: serde_json::Value = serde_json::from_str(&schema_text)?;
    let schema = JSONSchema::compile(&schema_json)
        .map_err(|err| format!("invalid schema {TABLES_SCHEMA}: {err}"))?;

    let patterns = if patterns.is_empty() {
        DEFAULT_TABLE_GLOBS.iter().map(|p| p.to_string()).collect()
    } else {
        patterns
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in &patterns {
        for entry in glob::glob(pattern)? {
            files.push(entry?);
        }
    }
    if files.is_empty() {
        return Err(format!("no display tables matched {}", patterns.join(", ")).into());
    }

    let mut failures = 0usize;
    for path in &files {
        match check_file(&schema, path) {
            Ok(()) => println!("ok      {}", path.display()),
            Err(problems) => {
                failures += 1;
                println!("FAILED  {}", path.display());
                for problem in problems {
                    println!("        {problem}");
                }
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} display table file(s) invalid", files.len()).into());
    }
    Ok(())
}

fn check_file(schema: &JSONSchema, path: &Path) -> Result<(), Vec<String>> {
    let text = fs::read_to_string(path).map_err(|err| vec![err.to_string()])?;
    let instance: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| vec![err.to_string()])?;

    if let Err(errors) = schema.validate(&instance) {
        return Err(errors
            .map(|err| format!("{}: {}", err.instance_path, err))
            .collect());
    }

    DisplayTables::from_json_str(&text)
        .map(|_| ())
        .map_err(|err| vec![err.to_string()])
}
