//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, their arguments, and how they are executed.

use crate::env::source::discover_env;
use crate::env::EnvDict;
use crate::error::{EnvDictError, Result};
use crate::utils::discovery::{find_file_recursively, host_name, MAX_PARENT_LEVELS};
use crate::utils::format::{format_table, format_value, EntryRow, OutputFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_yaml::Value;
use std::path::PathBuf;
use tracing::debug;

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

/// Log output style
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "envdict")]
#[command(about = "Inspect layered YAML environments with placeholder expansion")]
#[command(version = get_version(), author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text", env = "ENVDICT_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "yaml")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to load the environment from and what to override
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Environment file; env.<host>.yaml or env.yaml is searched for when omitted
    #[arg(short, long, env = "ENVDICT_FILE")]
    pub file: Option<PathBuf>,

    /// Directory used for the {{here}} placeholder
    #[arg(long)]
    pub here: Option<PathBuf>,

    /// Override a value (can be specified multiple times), e.g. env__db__port=5433
    #[arg(long = "set", value_name = "env__KEY=VALUE", value_parser = parse_key_val::<String, String>)]
    pub overrides: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the expanded environment, or a single dotted key
    Show {
        #[command(flatten)]
        source: SourceArgs,
        /// Dotted key to print, e.g. db.host
        key: Option<String>,
    },
    /// List the placeholders available for expansion
    Placeholders {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the path of the environment file that would be loaded
    Locate {
        /// File name to search for instead of env.<host>.yaml / env.yaml
        name: Option<String>,
    },
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Show { source, key } => {
                let env = load_env(&source)?;
                let value = match key {
                    Some(key) => env.get_dotted(&key)?.to_value(),
                    None => env.to_value(),
                };
                println!("{}", format_value(&value, self.format)?);
            }
            Commands::Placeholders { source } => {
                let env = load_env(&source)?;
                let rows: Vec<EntryRow> = env
                    .placeholders()
                    .iter()
                    .map(|(name, value)| EntryRow::new(name, value))
                    .collect();
                println!("{}", format_table(&rows));
            }
            Commands::Locate { name } => {
                let path = locate_env(name.as_deref())?;
                println!("{}", path.display());
            }
        }

        Ok(())
    }
}

/// Load the environment described by `args` and apply its overrides
pub fn load_env(args: &SourceArgs) -> Result<EnvDict> {
    let env = EnvDict::new(args.file.clone(), args.here.as_deref())?;

    if args.overrides.is_empty() {
        return Ok(env);
    }

    debug!("Applying {} override(s)", args.overrides.len());
    let overrides = args
        .overrides
        .iter()
        .map(|(key, raw)| (key.as_str(), parse_override_value(raw)));
    env.replace_many(overrides)
}

/// Parse an override so `2` stays a number and `true` a bool.
///
/// Anything that is not a number, bool or null is kept as the raw string;
/// `{{user}}` would otherwise read as a flow mapping.
pub fn parse_override_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        Ok(Value::Null) if !raw.trim().is_empty() => Value::Null,
        _ => Value::String(raw.to_string()),
    }
}

fn locate_env(name: Option<&str>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    match name {
        Some(name) => find_file_recursively(name, &cwd).ok_or_else(|| {
            EnvDictError::not_found(format!(
                "Could not find file \"{}\" in the current working directory nor {} levels up",
                name, MAX_PARENT_LEVELS
            ))
        }),
        None => discover_env(&cwd, &host_name()),
    }
}

fn parse_key_val<T, U>(
    s: &str,
) -> std::result::Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_show_with_overrides() {
        let cli = Cli::try_parse_from([
            "envdict",
            "--format",
            "json",
            "show",
            "--file",
            "env.yaml",
            "--set",
            "env__db__port=5433",
            "--set",
            "env__name=x=y",
            "db.port",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Show { source, key } => {
                assert_eq!(source.file, Some(PathBuf::from("env.yaml")));
                assert_eq!(
                    source.overrides,
                    vec![
                        ("env__db__port".to_string(), "5433".to_string()),
                        ("env__name".to_string(), "x=y".to_string()),
                    ]
                );
                assert_eq!(key.as_deref(), Some("db.port"));
            }
            _ => panic!("expected show command"),
        }
    }

    #[test]
    fn test_override_without_equals_is_rejected() {
        let result = Cli::try_parse_from(["envdict", "show", "--set", "env__a"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_override_value() {
        assert_eq!(parse_override_value("2"), Value::from(2));
        assert_eq!(parse_override_value("true"), Value::Bool(true));
        assert_eq!(parse_override_value("hello"), Value::from("hello"));
        assert_eq!(parse_override_value("{{user}}/x"), Value::from("{{user}}/x"));
        assert_eq!(parse_override_value("{{user}}"), Value::from("{{user}}"));
        assert_eq!(parse_override_value("null"), Value::Null);
        assert_eq!(parse_override_value(""), Value::from(""));
    }
}
