//! `config.txt` loading.
//!
//! One `KEY = VALUE` per line, `#` starts a comment line. Values may be
//! wrapped in quotes and end in a semicolon; both are stripped. Keys this
//! tool does not use (RPC endpoints, keys for publishing) are ignored.

use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::span::Span;

pub const DEFAULT_NETWORK: &str = "testnet";
pub const DEFAULT_OUTPUT_DIR: &str = "with_git_dependencies";

/// Pipeline configuration. Passed by value through every stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub model_path: PathBuf,
    pub scale: u32,
    /// Sui network; selects the framework revision in Move.toml.
    pub network: String,
    pub output_dir: PathBuf,
}

/// Values given on the command line. Each one replaces the matching key,
/// and a key that is overridden need not appear in the file at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overrides {
    pub model_path: Option<PathBuf>,
    pub scale: Option<u32>,
    pub network: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// A raw `KEY = VALUE` entry with the span of its value.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    key: String,
    value: String,
    line: Span,
    value_span: Span,
}

impl Config {
    /// Load from a config file. Relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Config> {
        Config::load_with(path, &Overrides::default())
    }

    /// Load from a config file, then apply command-line overrides.
    pub fn load_with(path: &Path, overrides: &Overrides) -> Result<Config> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(Diagnostic::error(
                format!("cannot read '{}': {}", path.display(), e),
                Span::dummy(),
            ))
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        Config::parse_with(&source, base, overrides)
    }

    /// Parse config text. `base_dir` anchors relative paths.
    pub fn parse(source: &str, base_dir: &Path) -> Result<Config> {
        Config::parse_with(source, base_dir, &Overrides::default())
    }

    /// Parse config text with overrides. Override paths are used as given.
    pub fn parse_with(source: &str, base_dir: &Path, overrides: &Overrides) -> Result<Config> {
        let entries = parse_entries(source);
        let find = |names: &[&str]| {
            entries
                .iter()
                .rev()
                .find(|e| names.contains(&e.key.as_str()))
        };

        let model_path = match &overrides.model_path {
            Some(path) => path.clone(),
            None => {
                let model = find(&["MODEL_PATH", "H5_MODEL_PATH"]).ok_or_else(|| {
                    missing_key("MODEL_PATH", "MODEL_PATH = ./model.safetensors", "--model")
                })?;
                if model.value.is_empty() {
                    return Err(Error::Config(
                        Diagnostic::error("MODEL_PATH is empty".to_string(), model.line)
                            .with_help(
                                "point MODEL_PATH at a .safetensors or .json model".to_string(),
                            ),
                    ));
                }
                base_dir.join(&model.value)
            }
        };

        let scale = match overrides.scale {
            Some(scale) => scale,
            None => {
                let entry = find(&["SCALE"])
                    .ok_or_else(|| missing_key("SCALE", "SCALE = 2", "--scale"))?;
                entry.value.parse::<u32>().map_err(|_| {
                    Error::Config(
                        Diagnostic::error(
                            format!("invalid SCALE {:?}", entry.value),
                            entry.value_span,
                        )
                        .with_help("SCALE must be a non-negative integer".to_string()),
                    )
                })?
            }
        };

        let network = match (&overrides.network, find(&["NETWORK"])) {
            (Some(name), _) => {
                validate_network(name).map_err(|reason| {
                    Error::Config(Diagnostic::error(
                        format!("invalid --network {:?}: {}", name, reason),
                        Span::dummy(),
                    ))
                })?;
                name.clone()
            }
            (None, Some(entry)) => {
                validate_network(&entry.value).map_err(|reason| {
                    Error::Config(Diagnostic::error(
                        format!("invalid NETWORK {:?}: {}", entry.value, reason),
                        entry.value_span,
                    ))
                })?;
                entry.value.clone()
            }
            (None, None) => DEFAULT_NETWORK.to_string(),
        };

        let output_dir = match &overrides.output_dir {
            Some(dir) => dir.clone(),
            None => {
                let dir = find(&["OUTPUT_DIR"])
                    .map(|e| e.value.clone())
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
                base_dir.join(dir)
            }
        };

        Ok(Config {
            model_path,
            scale,
            network,
            output_dir,
        })
    }
}

fn missing_key(key: &str, example: &str, flag: &str) -> Error {
    Error::Config(
        Diagnostic::error(format!("missing '{}' in config", key), Span::dummy())
            .with_help(format!("add a line like `{}` or pass {}", example, flag)),
    )
}

/// Network names end up inside a git revision string in Move.toml.
pub fn validate_network(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty name".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
    {
        return Err(format!("character {:?} is not allowed", c));
    }
    Ok(())
}

/// Split lines into entries, tracking byte offsets for diagnostics.
fn parse_entries(source: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut offset = 0usize;
    for line in source.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, raw_value)) = content.split_once('=') else {
            continue;
        };
        let value_start = start + key.len() + 1;
        let value = clean_value(raw_value);
        let value_offset = raw_value.find(value.as_str()).unwrap_or(0);
        let value_span = Span::new(
            (value_start + value_offset) as u32,
            (value_start + value_offset + value.len()) as u32,
        );
        entries.push(Entry {
            key: key.trim().to_string(),
            value,
            line: Span::new(start as u32, (start + content.len()) as u32),
            value_span,
        });
    }
    entries
}

/// Strip whitespace, quotes and trailing semicolons.
fn clean_value(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ';')
        .to_string()
}
