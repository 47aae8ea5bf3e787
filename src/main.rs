use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use review_responder::config::{CONFIG_FILE, ResponderConfig};
use review_responder::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "review-responder")]
#[command(version, about = "Inspect and replay PR review feedback cycles offline")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Log format: compact, json. Overrides responder.toml setting.
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how a pull request's feedback would be gated and grouped
    Group {
        /// PR details as JSON (reviews, comments, files, head info)
        #[arg(long)]
        pr: PathBuf,

        /// Conversation comments (JSON array) to resolve the watermark from
        #[arg(long)]
        marker_comments: Option<PathBuf>,

        /// Explicit watermark (RFC3339); wins over --marker-comments
        #[arg(long)]
        watermark: Option<String>,

        /// Print the full generator prompt for each group
        #[arg(long)]
        prompts: bool,
    },
    /// Parse generator output into per-item responses (JSON)
    Parse {
        /// Expected IDs, comma-separated (e.g. COMMENT_1,REVIEW_1)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,

        /// Output file to read (stdin if omitted)
        file: Option<PathBuf>,
    },
    /// Print a watermark marker comment stamped with the current time
    Marker {
        /// Withhold the explanatory trailer
        #[arg(long)]
        redact: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default responder.toml
    Init,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_format = cli
        .log_format
        .as_deref()
        .map(str::parse::<LogFormat>)
        .transpose()?;
    let config = ResponderConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?
        .with_cli_args(log_format);
    logging::init(config.log_format(), cli.verbose)?;

    match &cli.command {
        Commands::Group {
            pr,
            marker_comments,
            watermark,
            prompts,
        } => cmd::cmd_group(
            &config,
            pr,
            marker_comments.as_deref(),
            watermark.as_deref(),
            *prompts,
        )?,
        Commands::Parse { ids, file } => cmd::cmd_parse(ids, file.as_deref())?,
        Commands::Marker { redact } => cmd::cmd_marker(&config, *redact),
        Commands::Config { command } => cmd::cmd_config(&cli.config, &config, command.clone())?,
    }

    Ok(())
}
