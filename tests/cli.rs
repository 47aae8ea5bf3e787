//! Integration tests for the review-responder CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a review-responder Command isolated from the caller's env
fn responder(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("review-responder");
    cmd.current_dir(dir.path())
        .env_remove("RESPONDER_LOGIN")
        .env_remove("RESPONDER_MARKER")
        .env_remove("RESPONDER_WORKSPACE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_pr(dir: &TempDir) -> PathBuf {
    let pr = json!({
        "title": "Add widget cache",
        "body": "Caches widgets.",
        "html_url": "https://github.com/acme/widgets/pull/7",
        "head_ref": "abc-42-widget-cache",
        "head_clone_url": "https://github.com/agent-fork/widgets.git",
        "head_owner": "agent-fork",
        "files": [
            {"path": "src/a.rs", "status": "modified", "additions": 3, "deletions": 1, "patch": "@@ -1 +1,3 @@\n+fn a() {}"}
        ],
        "reviews": [
            {"id": 1, "author": "alice", "state": "CHANGES_REQUESTED", "body": "Please add tests.", "submitted_at": "2024-05-01T10:00:00Z"}
        ],
        "comments": [
            {"id": 10, "author": "bob", "body": "Use a const here.", "path": "src/a.rs", "line": 2, "created_at": "2024-05-01T11:00:00Z"}
        ]
    });
    let path = dir.path().join("pr.json");
    fs::write(&path, serde_json::to_string_pretty(&pr).unwrap()).unwrap();
    path
}

// =============================================================================
// Basics
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("group"))
            .stdout(predicate::str::contains("parse"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        responder(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_invalid_log_format_fails() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["--log-format", "pretty", "marker"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid log format"));
    }
}

// =============================================================================
// config
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_init_writes_default_file() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created responder.toml"));

        let content = fs::read_to_string(dir.path().join("responder.toml")).unwrap();
        assert!(content.contains("[identity]"));
        assert!(content.contains("max_thread_depth = 3"));
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("responder.toml"), "[identity]\nlogin = \"mine\"\n").unwrap();

        responder(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        let content = fs::read_to_string(dir.path().join("responder.toml")).unwrap();
        assert!(content.contains("login = \"mine\""));
    }

    #[test]
    fn test_show_reports_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No responder.toml found"))
            .stdout(predicate::str::contains("login = \"review-responder\""))
            .stdout(predicate::str::contains("max_thread_depth = 3"));
    }

    #[test]
    fn test_env_overrides_file_login() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("responder.toml"), "[identity]\nlogin = \"file-bot\"\n").unwrap();

        responder(&dir)
            .env("RESPONDER_LOGIN", "env-bot")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("login = \"env-bot\""));
    }

    #[test]
    fn test_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("responder.toml"),
            "[loop_prevention]\nmax_thread_depth = 0\n",
        )
        .unwrap();

        responder(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("max_thread_depth"));
    }

    #[test]
    fn test_validate_clean_config() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_custom_config_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("alt.toml"), "[identity]\nmarker = \"[acme]\"\n").unwrap();

        responder(&dir)
            .args(["--config", "alt.toml", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("marker = \"[acme]\""));
    }

    #[test]
    fn test_malformed_config_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("responder.toml"), "[identity\n").unwrap();

        responder(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse responder.toml"));
    }
}

// =============================================================================
// marker / parse
// =============================================================================

mod marker_and_parse {
    use super::*;

    #[test]
    fn test_marker_prints_timestamp_line() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .arg("marker")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("🤖 Review Responder Processing Timestamp: "))
            .stdout(predicate::str::contains("[details withheld]").not());
    }

    #[test]
    fn test_marker_redacted() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["marker", "--redact"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[details withheld]"));
    }

    #[test]
    fn test_parse_from_stdin() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["parse", "--ids", "COMMENT_1,REVIEW_1"])
            .write_stdin("Done.\n\nCOMMENT_1_RESPONSE: Extracted a const.\n\nREVIEW_1_RESPONSE: Added tests.\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"COMMENT_1\": \"Extracted a const.\""))
            .stdout(predicate::str::contains("\"REVIEW_1\": \"Added tests.\""));
    }

    #[test]
    fn test_parse_from_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("out.txt"), "COMMENT_2_RESPONSE: Renamed.").unwrap();

        responder(&dir)
            .args(["parse", "--ids", "COMMENT_2", "out.txt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"COMMENT_2\": \"Renamed.\""));
    }

    #[test]
    fn test_parse_rejects_bad_id() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["parse", "--ids", "THREAD_1"])
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid feedback ID 'THREAD_1'"));
    }
}

// =============================================================================
// group
// =============================================================================

mod group_command {
    use super::*;

    #[test]
    fn test_group_shows_groups_and_reply_plan() {
        let dir = TempDir::new().unwrap();
        let pr = write_pr(&dir);

        responder(&dir)
            .args(["group", "--pr"])
            .arg(&pr)
            .assert()
            .success()
            .stdout(predicate::str::contains("Trigger:      yes"))
            .stdout(predicate::str::contains("=== Group: general (REVIEW_1) ==="))
            .stdout(predicate::str::contains("=== Group: src/a.rs (COMMENT_1) ==="))
            .stdout(predicate::str::contains("COMMENT_1 -> threaded reply to comment 10"))
            .stdout(predicate::str::contains("REVIEW_1 -> general comment mentioning @alice"))
            .stdout(predicate::str::contains("## Instructions").not());
    }

    #[test]
    fn test_group_with_prompts() {
        let dir = TempDir::new().unwrap();
        let pr = write_pr(&dir);

        responder(&dir)
            .args(["group", "--prompts", "--pr"])
            .arg(&pr)
            .assert()
            .success()
            .stdout(predicate::str::contains("## Instructions"))
            .stdout(predicate::str::contains("Respond to these IDs: COMMENT_1"));
    }

    #[test]
    fn test_group_explicit_watermark_suppresses_old_feedback() {
        let dir = TempDir::new().unwrap();
        let pr = write_pr(&dir);

        responder(&dir)
            .args(["group", "--watermark", "2024-06-01T00:00:00Z", "--pr"])
            .arg(&pr)
            .assert()
            .success()
            .stdout(predicate::str::contains("Trigger:      no"))
            .stdout(predicate::str::contains("=== Group:").not());
    }

    #[test]
    fn test_group_watermark_from_marker_comments() {
        let dir = TempDir::new().unwrap();
        let pr = write_pr(&dir);
        let markers = json!([
            {
                "id": 500,
                "author": "review-responder",
                "body": "🤖 Review Responder Processing Timestamp: 2024-05-01T10:30:00Z\n\n[details withheld]",
                "created_at": "2024-05-01T10:30:05Z"
            }
        ]);
        let markers_path = dir.path().join("markers.json");
        fs::write(&markers_path, markers.to_string()).unwrap();

        responder(&dir)
            .args(["group", "--pr"])
            .arg(&pr)
            .arg("--marker-comments")
            .arg(&markers_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Watermark:    2024-05-01T10:30:00+00:00"))
            .stdout(predicate::str::contains("=== Group: src/a.rs (COMMENT_1) ==="))
            .stdout(predicate::str::contains("=== Group: general").not())
            .stdout(predicate::str::contains("- @alice (review): Please add tests."));
    }

    #[test]
    fn test_group_rejects_bad_watermark() {
        let dir = TempDir::new().unwrap();
        let pr = write_pr(&dir);

        responder(&dir)
            .args(["group", "--watermark", "yesterday", "--pr"])
            .arg(&pr)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid --watermark"));
    }

    #[test]
    fn test_group_missing_pr_file_fails() {
        let dir = TempDir::new().unwrap();
        responder(&dir)
            .args(["group", "--pr", "nope.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read"));
    }
}
