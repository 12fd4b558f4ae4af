//! Minimal CLI: cast | uncast | check | schema
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use json_cast::{flight, schema_doc, SchemaRegistry};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against a named schema, renaming keys on the way in or out
#[derive(Parser, Debug)]
#[command(name = "json-cast")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate wire JSON and print the internal value
    Cast(TransformOut),
    /// validate an internal value and print wire JSON
    Uncast(TransformOut),
    /// validate every input in parallel and report ok/failed per input
    Check(CheckOut),
    /// list the schemas of the selected registry
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document (JSON type map); the built-in flight schema if omitted
    #[arg(long)]
    schema_file: Option<PathBuf>,

    /// name of the root schema
    #[arg(long, default_value = flight::ROOT)]
    root: String,
}

#[derive(clap::Parser, Debug)]
struct TransformOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    schema_settings: SchemaSettings,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    /// schema document (JSON type map); the built-in flight schema if omitted
    #[arg(long)]
    schema_file: Option<PathBuf>,
}

/// One input document, labelled for reporting. An input that could not be
/// parsed or selected keeps its reason instead of a value.
struct Document {
    label: String,
    value: std::result::Result<Value, String>,
}

enum Registry {
    Builtin(&'static SchemaRegistry),
    Loaded(SchemaRegistry),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut docs = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;

            let sources: Vec<(String, &str)> = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| (format!("{source_path_str}:{}", i + 1), line))
                    .collect()
            } else {
                vec![(source_path_str.clone(), source.as_str())]
            };

            for (label, text) in sources {
                let json_value = match serde_json::from_str::<Value>(text) {
                    Ok(x) => x,
                    Err(error) => {
                        tracing::debug!(%label, %error, "input is not JSON");
                        let reason = json_cast::Error::MalformedInput(error).to_string();
                        docs.push(Document { label, value: Err(reason) });
                        continue;
                    }
                };
                match self.select(json_value, &label) {
                    Ok(values) => {
                        for (i, value) in values.into_iter().enumerate() {
                            let label = if i == 0 { label.clone() } else { format!("{label}#{i}") };
                            docs.push(Document { label, value: Ok(value) });
                        }
                    }
                    Err(error) => docs.push(Document { label, value: Err(format!("{error:#}")) }),
                }
            }
        }
        tracing::debug!(documents = docs.len(), "loaded inputs");
        Ok(docs)
    }

    fn select(&self, json_value: Value, label: &str) -> Result<Vec<Value>> {
        let json_value = match self.json_pointer.as_deref() {
            None => json_value,
            Some(pointer) => json_value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {label}"))?,
        };
        match self.jq_expr.as_ref() {
            None => Ok(vec![json_value]),
            Some(jq_expr) => json_cast::jq_exec::run_jaq(jq_expr, &json_value)
                .with_context(|| format!("failed to apply jq expression to {label}")),
        }
    }
}

impl SchemaSettings {
    fn load(&self) -> Result<Registry> {
        load_registry(self.schema_file.as_deref())
    }
}

impl Deref for Registry {
    type Target = SchemaRegistry;
    fn deref(&self) -> &SchemaRegistry {
        match self {
            Registry::Builtin(r) => r,
            Registry::Loaded(r) => r,
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Cast(target) => {
                target.run(|registry, value, root| {
                    let out = json_cast::cast_value(registry, value, root)?;
                    Ok(serde_json::to_string_pretty(&out)?)
                })?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Uncast(target) => {
                target.run(|registry, value, root| Ok(json_cast::uncast(registry, value, root)?))?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Check(target) => target.run(),
            Command::Schema(target) => {
                let registry = load_registry(target.schema_file.as_deref())?;
                for (name, ty) in registry.definitions() {
                    println!("{} {}", name.bold(), ty.describe().dimmed());
                }
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

impl TransformOut {
    fn run(&self, apply: impl Fn(&SchemaRegistry, &Value, &str) -> Result<String>) -> Result<()> {
        let registry = self.schema_settings.load()?;
        let root = self.schema_settings.root.as_str();
        let docs = self.input_settings.load_documents()?;
        let mut rendered = Vec::with_capacity(docs.len());
        for doc in &docs {
            let value = doc.value.as_ref().map_err(|reason| anyhow!("cannot read {}: {reason}", doc.label))?;
            let text = apply(&*registry, value, root)
                .with_context(|| format!("conversion failed for {}", doc.label))?;
            rendered.push(text);
        }
        let output = rendered.join("\n");
        if let Some(out) = self.out.as_ref() {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &output)?;
            tracing::info!(path = %out.display(), documents = docs.len(), "wrote output");
        } else {
            println!("{output}");
        }
        Ok(())
    }
}

impl CheckOut {
    fn run(&self) -> Result<ExitCode> {
        let registry = self.schema_settings.load()?;
        let root = self.schema_settings.root.as_str();
        let docs = self.input_settings.load_documents()?;

        let mut failed = 0usize;
        for (doc, result) in check_documents(&registry, &docs, root) {
            match result {
                Ok(()) => println!("{} {}", "ok".green(), doc.label),
                Err(reason) => {
                    failed += 1;
                    println!("{} {}: {reason}", "failed".red(), doc.label);
                }
            }
        }
        if failed > 0 {
            tracing::warn!(failed, total = docs.len(), "some documents did not validate");
            return Ok(ExitCode::FAILURE);
        }
        Ok(ExitCode::SUCCESS)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_registry(schema_file: Option<&Path>) -> Result<Registry> {
    match schema_file {
        None => Ok(Registry::Builtin(flight::registry()?)),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read schema file {}", path.display()))?;
            let registry = schema_doc::load_registry(&text)
                .with_context(|| format!("invalid schema file {}", path.display()))?;
            tracing::info!(path = %path.display(), schemas = registry.len(), "loaded schema file");
            Ok(Registry::Loaded(registry))
        }
    }
}

/// Casts every document, in input order. Inputs that never became a value
/// fail with the reason they were set aside.
fn check_documents<'d>(
    registry: &SchemaRegistry,
    docs: &'d [Document],
    root: &str,
) -> Vec<(&'d Document, std::result::Result<(), String>)> {
    // the registry is only read from here on
    docs.par_iter()
        .map(|doc| {
            let result = match &doc.value {
                Ok(value) => json_cast::cast_value(registry, value, root).map(|_| ()).map_err(|e| e.to_string()),
                Err(reason) => Err(reason.clone()),
            };
            (doc, result)
        })
        .collect()
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
