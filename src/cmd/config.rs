//! Configuration view and validation commands — `review-responder config`.

use anyhow::Result;
use std::path::Path;

use review_responder::config::{ResponderConfig, ResponderToml};

use super::super::ConfigCommands;

pub fn cmd_config(config_path: &Path, config: &ResponderConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Review Responder Configuration");
            println!("==============================");
            println!();

            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => {
                    println!("No responder.toml found at {}", config_path.display());
                    println!("Using defaults. Run 'review-responder config init' to create one.");
                }
            }
            println!();

            let settings = config.pipeline_settings();
            println!("Effective values (with env/CLI overrides):");
            println!("[identity]");
            println!("  login = \"{}\"", settings.identity);
            println!("  marker = \"{}\"", settings.marker);
            println!("[loop_prevention]");
            println!("  known_bots = [{}]", quoted(&settings.known_bots));
            println!("  max_thread_depth = {}", settings.max_thread_depth);
            println!("[workspace]");
            println!("  root = \"{}\"", settings.workspace_root.display());
            println!("[ticket]");
            println!("  pr_url_field = \"{}\"", settings.pr_url_field);
            println!("[logging]");
            println!("  format = \"{}\"", config.log_format());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if config.source.is_none() {
                println!("No responder.toml found. Using defaults.");
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("responder.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }

            ResponderToml::default().save(config_path)?;

            println!("Created responder.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [identity] login, marker");
            println!("  - [loop_prevention] known_bots, max_thread_depth");
            println!("  - [workspace] root and [ticket] pr_url_field");
            println!();
        }
    }

    Ok(())
}

fn quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}
