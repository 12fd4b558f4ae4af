//! Runs every sample payload through the built-in flight schema.
//!
//! Files named `ok_*.json` must cast and round-trip; `bad_*.json` must be
//! rejected. Prints a JSON report and exits non-zero on any surprise.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use serde_json::Value;

use json_cast::flight::{self, Convert};

#[derive(Debug, Serialize)]
struct Outcome {
    sample: String,
    expected_ok: bool,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn run_sample(path: &Path) -> Outcome {
    let sample = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let expected_ok = sample.starts_with("ok_");
    let text = match std::fs::read_to_string(path) {
        Ok(x) => x,
        Err(error) => {
            return Outcome { sample, expected_ok, passed: false, detail: Some(error.to_string()) };
        }
    };
    let (passed, detail) = match check(&text) {
        Ok(()) => (expected_ok, None),
        Err(error) => (!expected_ok, Some(error)),
    };
    Outcome { sample, expected_ok, passed, detail }
}

fn check(text: &str) -> Result<(), String> {
    let registry = flight::registry().map_err(|e| e.to_string())?;
    let internal = json_cast::cast(registry, text, flight::ROOT).map_err(|e| e.to_string())?;
    let wire = json_cast::uncast(registry, &internal, flight::ROOT).map_err(|e| e.to_string())?;

    let before = serde_json::from_str::<Value>(text).map_err(|e| e.to_string())?;
    let after = serde_json::from_str::<Value>(&wire).map_err(|e| e.to_string())?;
    if before != after {
        return Err("round trip changed the document".into());
    }

    // the typed model must agree with the untyped pass
    let typed = Convert::to_flight_data_set(text).map_err(|e| e.to_string())?;
    let again = Convert::flight_data_set_to_json(&typed).map_err(|e| e.to_string())?;
    Convert::to_flight_data_set(&again).map_err(|e| e.to_string())?;
    Ok(())
}

fn main() -> ExitCode {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../samples")));

    let mut paths = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|x| x == "json"))
            .collect::<Vec<_>>(),
        Err(error) => {
            eprintln!("cannot read sample directory {}: {error}", dir.display());
            return ExitCode::FAILURE;
        }
    };
    paths.sort();

    let outcomes = paths.iter().map(|p| run_sample(p)).collect::<Vec<_>>();
    match serde_json::to_string_pretty(&outcomes) {
        Ok(report) => println!("{report}"),
        Err(error) => eprintln!("cannot render report: {error}"),
    }

    if outcomes.iter().all(|o| o.passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
