//! Minimal CLI: normalize | check
use std::path::PathBuf;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::{debug, info};

use schema_notation::{Config, NameForm, Parsed};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// parse compact type notation documents and print their normalized form
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse and print `{root, types, unresolved}` per document
    Normalize(NormalizeOut),
    /// parse every input and report pass/fail per file
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select a subnode in each document (e.g. /definitions/user)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JSON config file (camelCase keys, see `Config`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// spelling of emitted properties and base kinds (overrides the config file)
    #[arg(long, value_enum)]
    name_form: Option<NameFormArg>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum NameFormArg {
    Short,
    Normal,
    Long,
}

impl From<NameFormArg> for NameForm {
    fn from(arg: NameFormArg) -> Self {
        match arg {
            NameFormArg::Short => NameForm::Short,
            NameFormArg::Normal => NameForm::Normal,
            NameFormArg::Long => NameForm::Long,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display())),
            None => Ok(Config::default()),
        }
    }

    fn sources(&self) -> Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input)
    }

    /// Read one input and select the `--json-pointer` subnode.
    fn load(&self, source_path: &PathBuf) -> Result<Value> {
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read source file {}", source_path.display()))?;
        let value = serde_json::from_str::<Value>(&source)
            .with_context(|| format!("failed to parse JSON source file {}", source_path.display()))?;
        match &self.json_pointer {
            None => Ok(value),
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {}", source_path.display())),
        }
    }
}

fn parse_document(value: &Value, config: &Config) -> Result<Parsed> {
    let parsed = schema_notation::Parser::new(schema_notation::Catalog::global())
        .with_config(config.clone())
        .parse(value)?;
    Ok(parsed)
}

fn report(parsed: &Parsed, config: &Config) -> Result<Value> {
    Ok(json!({
        "root": parsed.to_value(config)?,
        "types": parsed.registry.names().collect::<Vec<_>>(),
        "unresolved": parsed.unresolved,
    }))
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Normalize(target) => {
                let settings = &target.input_settings;
                let mut config = settings.config()?;
                if let Some(form) = target.name_form {
                    config.name_form = form.into();
                }

                let mut reports = Vec::new();
                for source_path in settings.sources()? {
                    debug!(path = %source_path.display(), "normalizing");
                    let value = settings.load(&source_path)?;
                    let parsed = parse_document(&value, &config)
                        .with_context(|| format!("in {}", source_path.display()))?;
                    reports.push(report(&parsed, &config)?);
                }
                let out = match <[Value; 1]>::try_from(reports) {
                    Ok([single]) => single,
                    Err(many) => Value::Array(many),
                };
                let out_src = serde_json::to_string_pretty(&out)?;
                match target.out.as_ref() {
                    Some(out) => {
                        if let Some(parent) = out.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(out, &out_src)?;
                        info!(path = %out.display(), "written");
                    }
                    None => println!("{out_src}"),
                }
                Ok(())
            }
            Command::Check(target) => {
                let settings = &target.input_settings;
                let config = settings.config()?;
                let sources = settings.sources()?;
                let results: Vec<(PathBuf, Result<Parsed>)> = sources
                    .into_par_iter()
                    .map(|path| {
                        let result = settings.load(&path).and_then(|v| parse_document(&v, &config));
                        (path, result)
                    })
                    .collect();

                let mut failed = 0usize;
                for (path, result) in &results {
                    match result {
                        Ok(parsed) if parsed.unresolved.is_empty() => {
                            println!("{} {}", "pass".green().bold(), path.display());
                        }
                        Ok(parsed) => {
                            let names: Vec<&str> = parsed.unresolved.iter().map(String::as_str).collect();
                            println!("{} {} (unresolved: {})", "pass".yellow().bold(), path.display(), names.join(", "));
                        }
                        Err(error) => {
                            failed += 1;
                            println!("{} {}: {error:#}", "fail".red().bold(), path.display());
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} inputs failed", results.len());
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
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
