//! `zero-verify` - verify three-statement financial models from the command line.

#![warn(clippy::all)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use zero_common::logging::init_logging_with_exclusions;
use zero_common::{Validate, ValidationError};
use zero_verify::checks::registry;
use zero_verify::mapping::template::generate_template;
use zero_verify::mapping::MappingFile;
use zero_verify::{
    ingest, output, verify, verify_batch, CheckCategory, Config, FieldMapper, MappingConfig,
    RawModel, Severity, VerifyError,
};

/// Verify that a three-statement financial model is internally consistent.
#[derive(Parser, Debug)]
#[command(name = "zero-verify")]
#[command(version)]
#[command(about = "Three-statement financial model verification.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.zero-verify/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Map, check and report on a model
    Verify {
        /// Model JSON file
        model: PathBuf,

        /// Mapping YAML layered over the built-in aliases
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Print the JSON export instead of the console summary
        #[arg(long)]
        json: bool,

        /// Write the JSON export to a file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lowest severity listed in the console findings
        #[arg(long, default_value = "warning")]
        min_severity: Severity,

        /// Absolute tolerance override
        #[arg(long)]
        abs_tolerance: Option<f64>,

        /// Relative tolerance override
        #[arg(long)]
        rel_tolerance: Option<f64>,

        /// Check id to skip (repeatable)
        #[arg(long = "disable")]
        disable: Vec<String>,

        /// Category to run (repeatable; default all)
        #[arg(long = "category")]
        categories: Vec<CheckCategory>,

        /// Also print the mapping table
        #[arg(long)]
        diagnostics: bool,
    },

    /// Show how raw field names map, without running checks
    Diagnose {
        model: PathBuf,

        #[arg(short, long)]
        mapping: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Generate a mapping YAML from a model's field names
    Template {
        model: PathBuf,

        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate and lint a mapping YAML
    #[command(name = "validate-mapping")]
    ValidateMapping { file: PathBuf },

    /// List every check
    Checks {
        #[arg(long)]
        json: bool,
    },

    /// Verify several models in parallel
    Batch {
        #[arg(required = true)]
        models: Vec<PathBuf>,

        #[arg(short, long)]
        mapping: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status(error_exit_code(&err)))
        }
    }
}

/// sysexits-style code for a failed run.
fn error_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<VerifyError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<zero_common::Error>() {
        e.exit_code()
    } else if err.downcast_ref::<ValidationError>().is_some() {
        78
    } else {
        70
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env_overrides()?;
            config.validate().context("Invalid configuration")?;
            config
        }
        None => Config::load()?,
    };
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.to_lowercase();
    }
    Ok(config)
}

fn mapper_for(config: &Config, mapping: Option<&Path>) -> Result<FieldMapper> {
    let mut verification = config.verification.clone();
    if let Some(path) = mapping {
        verification.mapping_file = Some(path.to_path_buf());
    }
    let mapping: MappingConfig = verification.mapping_config()?;
    Ok(FieldMapper::new(mapping))
}

fn read_model(path: &Path) -> Result<RawModel> {
    Ok(ingest::load_json(path)?)
}

fn run(cli: Cli) -> Result<u8> {
    let config = load_config(&cli)?;
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    match cli.command {
        Commands::Verify {
            model,
            mapping,
            json,
            output: output_path,
            min_severity,
            abs_tolerance,
            rel_tolerance,
            disable,
            categories,
            diagnostics,
        } => {
            let mapper = mapper_for(&config, mapping.as_deref())?;
            let mut options = config.verification.run_options();
            if let Some(value) = abs_tolerance {
                options.tolerance.absolute = value;
            }
            if let Some(value) = rel_tolerance {
                options.tolerance.relative = value;
            }
            options.disabled_checks.extend(disable);
            if !categories.is_empty() {
                options.categories = categories;
            }

            let raw = read_model(&model)?;
            let verification = verify(&raw, &mapper, &options)?;
            let report = &verification.report;

            if let Some(path) = &output_path {
                let json = output::to_json(report, Some(&verification.diagnostics))?;
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "Report written");
            }
            if json {
                println!("{}", output::to_json(report, Some(&verification.diagnostics))?);
            } else {
                if diagnostics {
                    print!("{}", output::render_diagnostics(&verification.diagnostics));
                }
                print!("{}", output::render_summary(report, min_severity));
            }
            Ok(exit_status(report.health().exit_code()))
        }

        Commands::Diagnose {
            model,
            mapping,
            json,
        } => {
            let mapper = mapper_for(&config, mapping.as_deref())?;
            let raw = read_model(&model)?;
            let diagnostics = zero_verify::diagnose(&raw, &mapper);
            if json {
                println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            } else {
                print!("{}", output::render_diagnostics(&diagnostics));
            }
            Ok(0)
        }

        Commands::Template {
            model,
            mapping,
            output: output_path,
        } => {
            let mapper = mapper_for(&config, mapping.as_deref())?;
            let raw = read_model(&model)?;
            let yaml = generate_template(&mapper, &raw)?;
            match output_path {
                Some(path) => {
                    std::fs::write(&path, yaml)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✅ Mapping template written to {}", path.display());
                }
                None => print!("{yaml}"),
            }
            Ok(0)
        }

        Commands::ValidateMapping { file } => {
            let mapping_file = MappingFile::load(&file)?;
            for warning in mapping_file.lint() {
                println!("⚠️  {warning}");
            }
            let mut mapping = MappingConfig::builtin();
            mapping.extend(&mapping_file)?;
            println!("✅ {} is valid", file.display());
            Ok(0)
        }

        Commands::Checks { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(registry())?);
            } else {
                print!("{}", output::render_checks());
            }
            Ok(0)
        }

        Commands::Batch {
            models,
            mapping,
            json,
        } => {
            let mapper = mapper_for(&config, mapping.as_deref())?;
            let options = config.verification.run_options();
            let mut raws = Vec::with_capacity(models.len());
            for path in &models {
                raws.push(
                    read_model(path).with_context(|| format!("Failed to load {}", path.display()))?,
                );
            }

            let outcomes = verify_batch(&raws, &mapper, &options);
            let mut worst = 0;
            let mut exports = Vec::new();
            for (path, outcome) in models.iter().zip(outcomes) {
                match outcome {
                    Ok(verification) => {
                        let report = &verification.report;
                        worst = worst.max(report.health().exit_code());
                        if json {
                            exports.push(serde_json::json!({
                                "model": path.display().to_string(),
                                "report": report,
                            }));
                        } else {
                            println!(
                                "{:40} {:12} {} findings, pass rate {:.1}%",
                                path.display().to_string(),
                                report.health().as_str(),
                                report.summary.findings,
                                report.summary.pass_rate * 100.0
                            );
                        }
                    }
                    Err(err) => {
                        worst = worst.max(err.exit_code());
                        if json {
                            exports.push(serde_json::json!({
                                "model": path.display().to_string(),
                                "error": err.to_string(),
                            }));
                        } else {
                            println!("{:40} ❌ {err}", path.display().to_string());
                        }
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&exports)?);
            }
            Ok(exit_status(worst))
        }
    }
}

fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
