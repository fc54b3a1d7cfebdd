//! lazyconf CLI - Command-line interface for deferred-call configuration
//!
//! Usage:
//!   lazyconf get config.yaml database.host --resolve
//!   lazyconf dump base.yaml overlay.yaml --resolve -o model.depth=50
//!   lazyconf source config.yaml
//!   lazyconf check config.yaml

use clap::{Parser, Subcommand};
use colored::Colorize;
use lazyconf_core::{serialize, Config, Value};
use std::path::PathBuf;
use std::process::ExitCode;

/// lazyconf - Configuration management with deferred calls
#[derive(Parser)]
#[command(name = "lazyconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a specific value from the configuration
    Get {
        /// Configuration file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to the value (e.g., database.host)
        path: String,

        /// Resolve interpolations
        #[arg(short, long)]
        resolve: bool,

        /// Apply an override before reading (repeatable)
        #[arg(short = 'o', long = "override", value_name = "PATH=VALUE")]
        overrides: Vec<String>,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if the path is not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Export configuration in various formats
    Dump {
        /// Configuration file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Resolve interpolations
        #[arg(short, long)]
        resolve: bool,

        /// Apply an override before dumping (repeatable)
        #[arg(short = 'o', long = "override", value_name = "PATH=VALUE")]
        overrides: Vec<String>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Render the configuration as assignment-statement source text
    Source {
        /// Configuration file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Apply an override before rendering (repeatable)
        #[arg(short = 'o', long = "override", value_name = "PATH=VALUE")]
        overrides: Vec<String>,

        /// Write to file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Quick well-formedness check (syntax and call descriptor tags)
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            files,
            path,
            resolve,
            overrides,
            format,
            default,
        } => cmd_get(files, &path, resolve, &overrides, &format, default),

        Commands::Dump {
            files,
            resolve,
            overrides,
            format,
            output,
        } => cmd_dump(files, resolve, &overrides, &format, output),

        Commands::Source {
            files,
            overrides,
            output,
        } => cmd_source(files, &overrides, output),

        Commands::Check { files } => cmd_check(files),
    }
}

fn load_config(files: &[PathBuf], overrides: &[String]) -> Result<Config, String> {
    if files.is_empty() {
        return Err("No configuration files specified".to_string());
    }

    // Load first file
    let mut config = Config::load(&files[0])
        .map_err(|e| format!("Failed to load {}: {}", files[0].display(), e))?;

    // Merge subsequent files
    for file in &files[1..] {
        let next_config =
            Config::load(file).map_err(|e| format!("Failed to load {}: {}", file.display(), e))?;
        config.merge(next_config);
    }

    config
        .apply_overrides(overrides)
        .map_err(|e| format!("Failed to apply overrides: {}", e))?;

    Ok(config)
}

fn write_or_print(content: &str, output: Option<PathBuf>) -> ExitCode {
    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

fn cmd_get(
    files: Vec<PathBuf>,
    path: &str,
    resolve: bool,
    overrides: &[String],
    format: &str,
    default: Option<String>,
) -> ExitCode {
    let config = match load_config(&files, overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let result = if resolve {
        config.get(path)
    } else {
        config.get_raw(path).cloned()
    };

    let value = match result {
        Ok(value) => value,
        Err(_) => {
            if let Some(default_val) = default {
                println!("{}", default_val);
                return ExitCode::SUCCESS;
            }
            eprintln!("{}: Path '{}' not found", "Error".red(), path);
            return ExitCode::from(1);
        }
    };

    let rendered = match format {
        "json" => serialize::to_json(&value).map(|s| format!("{}\n", s)),
        "yaml" => serialize::to_yaml(&value),
        _ => match &value {
            Value::String(s) => Ok(format!("{}\n", s)),
            Value::Integer(i) => Ok(format!("{}\n", i)),
            Value::Float(f) => Ok(format!("{}\n", f)),
            Value::Bool(b) => Ok(format!("{}\n", b)),
            Value::Null => Ok("null\n".to_string()),
            // Structured values read better as YAML
            _ => serialize::to_yaml(&value),
        },
    };

    match rendered {
        Ok(content) => {
            print!("{}", content);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_dump(
    files: Vec<PathBuf>,
    resolve: bool,
    overrides: &[String],
    format: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(&files, overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let result = match format {
        "json" => config.to_json(resolve).map(|s| format!("{}\n", s)),
        _ => config.to_yaml(resolve),
    };

    match result {
        Ok(content) => write_or_print(&content, output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_source(files: Vec<PathBuf>, overrides: &[String], output: Option<PathBuf>) -> ExitCode {
    let config = match load_config(&files, overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    match config.to_source() {
        Ok(content) => write_or_print(&content, output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        // Full load catches syntax errors and malformed call descriptors
        // (bad _target_ values, relative target names)
        match Config::load(&file) {
            Ok(_) => {
                println!("{} {}: valid", "✓".green(), file.display());
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
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
