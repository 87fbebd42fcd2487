use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use template_fill::{
    filled_file_name, generate_filled_document, load_template, parse_template_variables,
    require_template_variables, ConfigManager, DirectorySink, GeneratorConfig, RawData, Value,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docx-fill", about = "Discover and fill {{placeholders}} in DOCX templates.")]
struct Cli {
    /// Generator settings file (JSON). Missing or malformed files fall back to defaults.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the placeholder names a template uses.
    Scan {
        /// Template file (.docx).
        template: PathBuf,

        /// Print the names as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Fill a template and write the result.
    Fill {
        /// Template file (.docx).
        template: PathBuf,

        /// JSON object of values keyed by placeholder name.
        #[arg(long, value_name = "PATH")]
        data: Option<PathBuf>,

        /// A single value (repeatable). Overrides `--data`.
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        /// Directory the filled document is written to.
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Output file name (default: `<template>_filled.docx`).
        #[arg(long, value_name = "FILE")]
        name: Option<String>,
    },
}

fn parse_assignment(input: &str) -> std::result::Result<(String, String), String> {
    let Some((name, value)) = input.split_once('=') else {
        return Err(format!("invalid assignment '{input}' (expected NAME=VALUE)"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid assignment '{input}' (empty name)"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let mut manager = ConfigManager::new(path);
    manager
        .load_sync()
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(manager.into_config())
}

fn load_data(path: Option<&Path>, assignments: &[(String, String)]) -> Result<RawData> {
    let mut data = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading data file {}", path.display()))?;
            serde_json::from_str::<RawData>(&content)
                .with_context(|| format!("parsing data file {} (expected a JSON object)", path.display()))?
        }
        None => RawData::new(),
    };
    for (name, value) in assignments {
        data.insert(name.clone(), Value::Text(value.clone()));
    }
    Ok(data)
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("template path {} has no file name", path.display()))
}

async fn scan(template: &Path, json: bool, config: &GeneratorConfig) -> Result<()> {
    let bytes = load_template(template, config.min_file_size).await?;
    let variables = parse_template_variables(&bytes, config)?;

    if json {
        println!("{}", serde_json::to_string(&variables)?);
    } else if variables.is_empty() {
        println!("No variables found.");
    } else {
        for name in &variables {
            println!("{name}");
        }
    }
    Ok(())
}

async fn fill(
    template: &Path,
    data: Option<&Path>,
    assignments: &[(String, String)],
    out_dir: &Path,
    name: Option<String>,
    config: &GeneratorConfig,
) -> Result<()> {
    let data = load_data(data, assignments)?;
    let bytes = load_template(template, config.min_file_size).await?;
    let variables = require_template_variables(&bytes, config)?;

    for missing in variables.iter().filter(|v| !data.contains_key(v.as_str())) {
        tracing::warn!("No value for {}, leaving it blank", missing);
    }

    let file_name = match name {
        Some(name) => name,
        None => filled_file_name(&file_name_of(template)?),
    };
    let sink = DirectorySink::new(out_dir);
    generate_filled_document(&bytes, &data, &variables, &file_name, config, &sink)?;

    println!("{}", sink.path_for(&file_name).display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scan { template, json } => scan(&template, json, &config).await,
        Command::Fill {
            template,
            data,
            set,
            out_dir,
            name,
        } => fill(&template, data.as_deref(), &set, &out_dir, name, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("name=Ada Lovelace").unwrap(),
            ("name".to_string(), "Ada Lovelace".to_string())
        );
        assert_eq!(parse_assignment("eq=a=b").unwrap().1, "a=b");
        assert_eq!(parse_assignment("blank=").unwrap().1, "");
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_cli_parses_fill() {
        let cli = Cli::try_parse_from([
            "docx-fill", "fill", "t.docx", "--set", "a=1", "--set", "b=2", "--out-dir", "out",
        ])
        .unwrap();
        match cli.command {
            Command::Fill { set, out_dir, name, .. } => {
                assert_eq!(set.len(), 2);
                assert_eq!(out_dir, PathBuf::from("out"));
                assert!(name.is_none());
            }
            Command::Scan { .. } => panic!("expected fill"),
        }
    }

    #[test]
    fn test_load_data_merges_assignments() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, r#"{"a": "from file", "n": 3, "gone": null}"#).unwrap();

        let data = load_data(Some(path.as_path()), &[("a".into(), "override".into())]).unwrap();
        assert_eq!(data.get("a"), Some(&Value::Text("override".into())));
        assert_eq!(data.get("n"), Some(&Value::Number(3.0)));
        assert_eq!(data.get("gone"), Some(&Value::Null));
    }

    #[test]
    fn test_load_data_rejects_non_object() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(load_data(Some(path.as_path()), &[]).is_err());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(Some(temp_dir.path().join("none.json").as_path())).unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }
}
