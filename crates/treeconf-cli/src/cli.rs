//! treeconf CLI - Command-line interface for treeconf configuration trees
//!
//! Usage:
//!   treeconf dump base.yaml prod.yaml --resolve
//!   treeconf get config.yaml database.host
//!   treeconf flat config.yaml
//!   treeconf check config.yaml

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use treeconf_core::{Config, ErrorKind, Value};

/// treeconf - Layered configuration trees with ${...} expressions
#[derive(Parser)]
#[command(name = "treeconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the merged configuration
    Dump {
        /// Configuration file(s), later files override earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Resolve ${...} expressions
        #[arg(short, long)]
        resolve: bool,

        /// Keep unresolvable expressions as text instead of failing
        #[arg(long, requires = "resolve")]
        skip_unresolved: bool,

        /// Don't redact secret values (use with caution)
        #[arg(long)]
        show_secrets: bool,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Get a specific value from the configuration
    Get {
        /// Configuration file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to the value (e.g., database.host or servers[0].port)
        path: String,

        /// Resolve ${...} expressions
        #[arg(short, long)]
        resolve: bool,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if key not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Print every value as a `path = value` line, secrets redacted
    Flat {
        /// Configuration file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Resolve ${...} expressions
        #[arg(short, long)]
        resolve: bool,
    },

    /// Check that files parse into a configuration tree
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            files,
            resolve,
            skip_unresolved,
            show_secrets,
            format,
            output,
        } => cmd_dump(
            &files,
            resolve.then_some(skip_unresolved),
            show_secrets,
            &format,
            output,
        ),

        Commands::Get {
            files,
            path,
            resolve,
            format,
            default,
        } => cmd_get(&files, &path, resolve, &format, default),

        Commands::Flat { files, resolve } => cmd_flat(&files, resolve),

        Commands::Check { files } => cmd_check(&files),
    }
}

fn is_json(file: &Path) -> bool {
    file.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Parse one document, JSON for `.json` files and YAML otherwise
fn parse_document(file: &Path, content: &str) -> Result<Config, treeconf_core::Error> {
    if is_json(file) {
        Config::from_json(content)
    } else {
        Config::from_yaml(content)
    }
}

fn load_file(file: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    parse_document(file, &content).map_err(|e| format!("Failed to load {}: {}", file.display(), e))
}

/// Load and merge files, later files masking earlier ones
fn load_config(files: &[PathBuf]) -> Result<Config, String> {
    let (first, rest) = files
        .split_first()
        .ok_or_else(|| "No configuration files specified".to_string())?;

    let mut config = load_file(first)?;
    for file in rest {
        config = config.with_values(&load_file(file)?);
    }
    Ok(config)
}

/// Resolve expressions when requested. `Some(true)` keeps unresolvable ones as text.
fn resolve(config: Config, skip_unresolved: Option<bool>) -> treeconf_core::Result<Config> {
    let builder = config.to_builder();
    let builder = match skip_unresolved {
        None => return Ok(config),
        Some(false) => builder.resolve_expressions(&Config::empty())?,
        Some(true) => builder.resolve_expressions_or_skip(&Config::empty())?,
    };
    Ok(builder.build())
}

fn render(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|json| json + "\n")
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => match value {
            Value::Sequence(_) | Value::Mapping(_) | Value::Config(_) => {
                serde_yaml::to_string(value).map_err(|e| e.to_string())
            }
            scalar => Ok(format!("{}\n", scalar)),
        },
    }
}

fn render_flat(config: &Config) -> String {
    config
        .entries()
        .into_iter()
        .map(|(path, value)| format!("{} = {}\n", path, value))
        .collect()
}

fn cmd_dump(
    files: &[PathBuf],
    skip_unresolved: Option<bool>,
    show_secrets: bool,
    format: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(files) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let result = resolve(config, skip_unresolved).and_then(|config| {
        match (format, show_secrets) {
            ("json", false) => config.to_json(),
            ("json", true) => config.to_json_with_secrets(),
            (_, false) => config.to_yaml(),
            (_, true) => config.to_yaml_with_secrets(),
        }
    });

    match result {
        Ok(content) => {
            if let Some(output_path) = output {
                if let Err(e) = std::fs::write(&output_path, &content) {
                    eprintln!("{}: {}", "Error writing file".red(), e);
                    return ExitCode::from(2);
                }
                eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
            } else {
                print!("{}", content);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_get(
    files: &[PathBuf],
    path: &str,
    resolve_expressions: bool,
    format: &str,
    default: Option<String>,
) -> ExitCode {
    let config = match load_config(files) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let result = resolve(config, resolve_expressions.then_some(false))
        .and_then(|config| config.get_value(path));

    match result {
        Ok(value) => match render(&value, format) {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                ExitCode::from(1)
            }
        },
        Err(e) if e.kind == ErrorKind::MissingValue => {
            if let Some(default_val) = default {
                println!("{}", default_val);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}: Path '{}' not found", "Error".red(), path);
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_flat(files: &[PathBuf], resolve_expressions: bool) -> ExitCode {
    let config = match load_config(files) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let result = resolve(config, resolve_expressions.then_some(true))
        .and_then(|config| config.with_hidden_secrets());

    match result {
        Ok(config) => {
            print!("{}", render_flat(&config));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_check(files: &[PathBuf]) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match load_file(file) {
            Ok(config) => {
                println!(
                    "{} {}: valid {} ({} values)",
                    "✓".green(),
                    file.display(),
                    if is_json(file) { "JSON" } else { "YAML" },
                    config.entries().len()
                );
            }
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(file: &str, content: &str) -> Config {
        parse_document(Path::new(file), content).unwrap()
    }

    #[test]
    fn test_parse_document_by_extension() {
        let config = yaml("a.json", r#"{"a": {"b": 1}}"#);
        assert_eq!(config.get::<i64>("a.b").unwrap(), 1);

        let config = yaml("a.yaml", "a:\n  b: 2");
        assert_eq!(config.get::<i64>("a.b").unwrap(), 2);

        assert!(parse_document(Path::new("a.json"), "a: 1").is_err());
    }

    #[test]
    fn test_load_config_requires_files() {
        assert!(load_config(&[]).is_err());
    }

    #[test]
    fn test_resolve_modes() {
        let config = yaml("c.yaml", "a: ${missing}\nb: ${c}\nc: 1");
        assert!(resolve(config.clone(), Some(false)).is_err());

        let skipped = resolve(config.clone(), Some(true)).unwrap();
        assert_eq!(skipped.get_string("a").unwrap(), "${missing}");
        assert_eq!(skipped.get::<i64>("b").unwrap(), 1);

        let untouched = resolve(config, None).unwrap();
        assert_eq!(untouched.get_string("b").unwrap(), "${c}");
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render(&Value::from("x"), "text").unwrap(), "x\n");
        assert_eq!(render(&Value::from(3i64), "text").unwrap(), "3\n");
        assert_eq!(
            render(&Value::Sequence(vec![Value::from(1i64)]), "text").unwrap(),
            "- 1\n"
        );
        assert_eq!(render(&Value::from(true), "json").unwrap(), "true\n");
    }

    #[test]
    fn test_render_flat_is_sorted() {
        let config = yaml("c.yaml", "b: 2\na:\n  - x\n  - y");
        assert_eq!(render_flat(&config), "a[0] = x\na[1] = y\nb = 2\n");
    }
}
