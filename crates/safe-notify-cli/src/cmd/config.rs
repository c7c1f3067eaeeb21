use crate::output::{print_json, print_yaml};
use crate::settings::Settings;
use anyhow::Context;
use clap::Subcommand;
use safe_notify_core::config::{create_default_config, WarnLevel};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration (defaults merged with --config)
    Show,

    /// Validate the effective configuration
    Validate,

    /// Print the defaults for --env, optionally writing them to a file
    Defaults {
        /// Write the defaults as YAML to this path
        #[arg(long, value_name = "PATH")]
        write: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(settings: &Settings, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(settings, json),
        ConfigSubcommand::Validate => validate(settings, json),
        ConfigSubcommand::Defaults { write } => defaults(settings, write, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    if json {
        print_json(&config)
    } else {
        print_yaml(&config)
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let config = settings.load_config().context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "environment": config.environment,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// defaults
// ---------------------------------------------------------------------------

fn defaults(settings: &Settings, write: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let config = create_default_config(settings.environment);

    if let Some(path) = write {
        config
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if json {
            print_json(&serde_json::json!({ "written": path.display().to_string() }))?;
        } else {
            println!("Wrote {} defaults to {}", settings.environment, path.display());
        }
        return Ok(());
    }

    if json {
        print_json(&config)
    } else {
        print_yaml(&config)
    }
}
