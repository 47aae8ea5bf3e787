//! Responder configuration.
//!
//! Settings are read from `responder.toml`, then overridden by environment
//! variables, then by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [identity]
//! login = "review-responder"
//! marker = "🤖 Review Responder"
//!
//! [loop_prevention]
//! known_bots = ["coderabbitai", "copilot-pull-request-reviewer"]
//! max_thread_depth = 3
//!
//! [workspace]
//! root = ".responder/work"
//!
//! [ticket]
//! pr_url_field = "pull_request_url"
//!
//! [logging]
//! format = "compact"
//! ```
//!
//! | Variable              | Overrides             |
//! |-----------------------|-----------------------|
//! | `RESPONDER_LOGIN`     | `identity.login`      |
//! | `RESPONDER_MARKER`    | `identity.marker`     |
//! | `RESPONDER_WORKSPACE` | `workspace.root`      |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;
use crate::pipeline::PipelineSettings;

/// Default config file name.
pub const CONFIG_FILE: &str = "responder.toml";

pub const ENV_LOGIN: &str = "RESPONDER_LOGIN";
pub const ENV_MARKER: &str = "RESPONDER_MARKER";
pub const ENV_WORKSPACE: &str = "RESPONDER_WORKSPACE";

/// Who the responder posts as, and how its watermark comments are tagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySection {
    /// Code-host login the pipeline authenticates as
    #[serde(default = "default_login")]
    pub login: String,
    /// Prefix of watermark marker comments
    #[serde(default = "default_marker")]
    pub marker: String,
}

fn default_login() -> String {
    "review-responder".to_string()
}

fn default_marker() -> String {
    "🤖 Review Responder".to_string()
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            login: default_login(),
            marker: default_marker(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPreventionSection {
    /// Logins of automated reviewers (compared case-insensitively)
    #[serde(default = "default_known_bots")]
    pub known_bots: Vec<String>,
    /// Replies are withheld once this many of our own comments sit above a comment
    #[serde(default = "default_max_thread_depth")]
    pub max_thread_depth: usize,
}

fn default_known_bots() -> Vec<String> {
    vec![
        "coderabbitai".to_string(),
        "copilot-pull-request-reviewer".to_string(),
    ]
}

fn default_max_thread_depth() -> usize {
    3
}

impl Default for LoopPreventionSection {
    fn default() -> Self {
        Self {
            known_bots: default_known_bots(),
            max_thread_depth: default_max_thread_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSection {
    /// Parent directory of per-ticket working trees
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".responder/work")
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSection {
    /// Custom field holding the pull request URL
    #[serde(default = "default_pr_url_field")]
    pub pr_url_field: String,
}

fn default_pr_url_field() -> String {
    "pull_request_url".to_string()
}

impl Default for TicketSection {
    fn default() -> Self {
        Self {
            pr_url_field: default_pr_url_field(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
}

/// Contents of `responder.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderToml {
    #[serde(default)]
    pub identity: IdentitySection,
    #[serde(default)]
    pub loop_prevention: LoopPreventionSection,
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub ticket: TicketSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ResponderToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse responder.toml")
    }

    /// Load from `path`, or return defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize responder.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.identity.login.trim().is_empty() {
            warnings.push("identity.login is empty: own comments cannot be recognised".to_string());
        }
        if self.identity.marker.trim().is_empty() {
            warnings.push("identity.marker is empty: watermark comments cannot be recognised".to_string());
        }
        if self.loop_prevention.max_thread_depth == 0 {
            warnings.push("loop_prevention.max_thread_depth is 0: every comment reply will be withheld".to_string());
        }
        if self
            .loop_prevention
            .known_bots
            .iter()
            .any(|bot| bot.eq_ignore_ascii_case(&self.identity.login))
        {
            warnings.push(format!(
                "identity.login '{}' is listed in loop_prevention.known_bots",
                self.identity.login
            ));
        }
        if self.ticket.pr_url_field.trim().is_empty() {
            warnings.push("ticket.pr_url_field is empty: no ticket will resolve a pull request".to_string());
        }

        warnings
    }
}

/// Effective configuration (file + environment + CLI).
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Where the file layer came from, if it existed
    pub source: Option<PathBuf>,
    toml: ResponderToml,
}

impl ResponderConfig {
    /// Load `path` (or defaults) and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let source = path.exists().then(|| path.to_path_buf());
        let toml = ResponderToml::load_or_default(path)?;
        Ok(Self::from_toml_with_env(toml, source, |key| std::env::var(key).ok()))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn from_toml_with_env<F>(mut toml: ResponderToml, source: Option<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(login) = set(ENV_LOGIN) {
            toml.identity.login = login;
        }
        if let Some(marker) = set(ENV_MARKER) {
            toml.identity.marker = marker;
        }
        if let Some(root) = set(ENV_WORKSPACE) {
            toml.workspace.root = PathBuf::from(root);
        }

        Self { source, toml }
    }

    /// Apply CLI flag overrides.
    pub fn with_cli_args(mut self, log_format: Option<LogFormat>) -> Self {
        if let Some(format) = log_format {
            self.toml.logging.format = format;
        }
        self
    }

    pub fn toml(&self) -> &ResponderToml {
        &self.toml
    }

    pub fn login(&self) -> &str {
        &self.toml.identity.login
    }

    pub fn marker(&self) -> &str {
        &self.toml.identity.marker
    }

    pub fn log_format(&self) -> LogFormat {
        self.toml.logging.format
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }

    /// Runtime settings for the feedback pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            identity: self.toml.identity.login.clone(),
            marker: self.toml.identity.marker.clone(),
            known_bots: self.toml.loop_prevention.known_bots.clone(),
            max_thread_depth: self.toml.loop_prevention.max_thread_depth,
            workspace_root: self.toml.workspace.root.clone(),
            pr_url_field: self.toml.ticket.pr_url_field.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let toml = ResponderToml::parse("").unwrap();
        assert_eq!(toml, ResponderToml::default());
        assert_eq!(toml.loop_prevention.max_thread_depth, 3);
        assert_eq!(toml.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let content = r#"
[identity]
login = "acme-bot"

[loop_prevention]
known_bots = ["renovate"]

[logging]
format = "json"
"#;
        let toml = ResponderToml::parse(content).unwrap();
        assert_eq!(toml.identity.login, "acme-bot");
        assert_eq!(toml.identity.marker, default_marker());
        assert_eq!(toml.loop_prevention.known_bots, vec!["renovate".to_string()]);
        assert_eq!(toml.loop_prevention.max_thread_depth, 3);
        assert_eq!(toml.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        let err = ResponderToml::parse("[identity\nlogin = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse responder.toml"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut toml = ResponderToml::default();
        toml.identity.login = "saved-bot".to_string();
        toml.loop_prevention.max_thread_depth = 5;
        toml.save(&path).unwrap();

        let loaded = ResponderToml::load(&path).unwrap();
        assert_eq!(loaded, toml);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = ResponderToml::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(toml, ResponderToml::default());
    }

    #[test]
    fn test_validate_defaults_clean() {
        assert!(ResponderToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut toml = ResponderToml::default();
        toml.identity.login = " ".to_string();
        toml.loop_prevention.max_thread_depth = 0;
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("identity.login"));
        assert!(warnings[1].contains("max_thread_depth"));
    }

    #[test]
    fn test_validate_flags_self_in_known_bots() {
        let mut toml = ResponderToml::default();
        toml.loop_prevention.known_bots.push("Review-Responder".to_string());
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("known_bots"));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ResponderConfig::from_toml_with_env(
            ResponderToml::default(),
            None,
            env(&[(ENV_LOGIN, "env-bot"), (ENV_WORKSPACE, "/tmp/work"), (ENV_MARKER, "")]),
        );
        assert_eq!(config.login(), "env-bot");
        assert_eq!(config.marker(), default_marker());
        assert_eq!(config.pipeline_settings().workspace_root, PathBuf::from("/tmp/work"));
    }

    #[test]
    fn test_cli_overrides_log_format() {
        let config = ResponderConfig::from_toml_with_env(ResponderToml::default(), None, env(&[]))
            .with_cli_args(Some(LogFormat::Json));
        assert_eq!(config.log_format(), LogFormat::Json);

        let unchanged = ResponderConfig::from_toml_with_env(ResponderToml::default(), None, env(&[]))
            .with_cli_args(None);
        assert_eq!(unchanged.log_format(), LogFormat::Compact);
    }

    #[test]
    fn test_pipeline_settings_mirror_config() {
        let content = r#"
[identity]
login = "acme-bot"
marker = "[acme]"

[loop_prevention]
known_bots = ["renovate"]
max_thread_depth = 2

[workspace]
root = "/srv/work"

[ticket]
pr_url_field = "customfield_10042"
"#;
        let config = ResponderConfig::from_toml_with_env(ResponderToml::parse(content).unwrap(), None, env(&[]));
        let settings = config.pipeline_settings();
        assert_eq!(
            settings,
            PipelineSettings {
                identity: "acme-bot".to_string(),
                marker: "[acme]".to_string(),
                known_bots: vec!["renovate".to_string()],
                max_thread_depth: 2,
                workspace_root: PathBuf::from("/srv/work"),
                pr_url_field: "customfield_10042".to_string(),
            }
        );
    }

    #[test]
    fn test_load_records_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(ResponderConfig::load(&path).unwrap().source.is_none());

        std::fs::write(&path, "[identity]\nlogin = \"file-bot\"\n").unwrap();
        let config = ResponderConfig::load(&path).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }
}
