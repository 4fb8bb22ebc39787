use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const REPLY: &str = r#"Here is the refactored version.

```json
{
  "primary_content": "from utils.helpers import greet\n\ngreet()\n",
  "utility_modules": {
    "utils/helpers.py": "def greet():\n    print('hi')\n"
  }
}
```

Let me know if you want further changes.
"#;

fn remold(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("remold").unwrap();
    cmd.current_dir(dir).env_remove("REMOLD_AGENT_CMD").env_remove("RUST_LOG");
    cmd
}

fn setup() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("main.py"), "print('hi')\n").unwrap();
    fs::write(tmp.path().join("reply.md"), REPLY).unwrap();
    tmp
}

fn log_files(dir: &Path) -> usize {
    fs::read_dir(dir.join("refactor_logs"))
        .map(|d| d.count())
        .unwrap_or(0)
}

#[test]
fn version_prints_package_version() {
    let tmp = TempDir::new().unwrap();
    remold(tmp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("remold "));
}

#[test]
fn extract_prints_preview() {
    let tmp = setup();
    remold(tmp.path())
        .args(["extract", "reply.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Primary file (").and(predicate::str::contains(
            "  - utils/helpers.py: 29 characters",
        )));
    assert!(!tmp.path().join("utils").exists());
}

#[test]
fn extract_without_block_fails_with_excerpt() {
    let tmp = setup();
    fs::write(tmp.path().join("refusal.md"), "Sorry, I can't do that.").unwrap();
    remold(tmp.path())
        .args(["extract", "refusal.md"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("no structured block found"))
        .stdout(predicate::str::contains("Sorry, I can't do that."));
}

#[test]
fn extract_reports_missing_field() {
    let tmp = setup();
    fs::write(
        tmp.path().join("partial.md"),
        "```json\n{\"utility_modules\": {}}\n```\n",
    )
    .unwrap();
    remold(tmp.path())
        .args(["--format", "json", "extract", "partial.md"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"stage\": \"validation\""))
        .stdout(predicate::str::contains("missing required field"));
}

#[test]
fn refactor_in_place_with_yes() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 written, 0 skipped"));

    let dir = tmp.path();
    assert_eq!(
        fs::read_to_string(dir.join("main.py")).unwrap(),
        "from utils.helpers import greet\n\ngreet()\n"
    );
    assert_eq!(
        fs::read_to_string(dir.join("main.py.backup")).unwrap(),
        "print('hi')\n"
    );
    assert!(dir.join("utils/helpers.py").exists());
    assert_eq!(log_files(dir), 1);
}

#[test]
fn refactor_preview_writes_nothing() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md", "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing was written"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("main.py")).unwrap(),
        "print('hi')\n"
    );
    assert!(!tmp.path().join("main.py.backup").exists());
    assert_eq!(log_files(tmp.path()), 0);
}

#[test]
fn refactor_declined_at_prompt() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Changes discarded"))
        .stderr(predicate::str::contains("[y/N]"));

    assert!(!tmp.path().join("main.py.backup").exists());
    assert_eq!(log_files(tmp.path()), 0);
}

#[test]
fn refactor_closed_stdin_cancels() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Changes discarded"));
    assert!(!tmp.path().join("utils").exists());
}

#[test]
fn refactor_accepted_at_prompt() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md"])
        .write_stdin("yes\n")
        .assert()
        .success();
    assert!(tmp.path().join("main.py.backup").exists());
}

#[test]
fn refactor_tree_layout_leaves_input_alone() {
    let tmp = setup();
    for _ in 0..2 {
        remold(tmp.path())
            .args([
                "refactor",
                "main.py",
                "--transcript",
                "reply.md",
                "--yes",
                "--layout",
                "tree",
                "--out-dir",
                "out",
                "--label",
                "test_refactor",
            ])
            .assert()
            .success();
    }

    assert_eq!(
        fs::read_to_string(tmp.path().join("main.py")).unwrap(),
        "print('hi')\n"
    );
    let roots: Vec<_> = fs::read_dir(tmp.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(roots.len(), 2);
    for root in roots {
        let name = root.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("test_refactor_"));
        assert_eq!(
            fs::read_to_string(root.join("before/main.py")).unwrap(),
            "print('hi')\n"
        );
        assert!(root.join("after/main.py").exists());
        assert!(root.join("utils/helpers.py").exists());
    }
    assert_eq!(log_files(tmp.path()), 2);
}

#[test]
fn refactor_rejects_traversal_but_applies_rest() {
    let tmp = setup();
    fs::write(
        tmp.path().join("evil.md"),
        "```json\n{\"primary_content\": \"ok\", \"utility_modules\": {\"../../escape.py\": \"x\", \"fine.py\": \"y\"}}\n```",
    )
    .unwrap();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "evil.md", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected"));

    assert!(tmp.path().join("utils/fine.py").exists());
    assert!(!tmp.path().parent().unwrap().join("escape.py").exists());
}

#[test]
fn refactor_backup_disabled() {
    let tmp = setup();
    remold(tmp.path())
        .args([
            "refactor",
            "main.py",
            "--transcript",
            "reply.md",
            "--yes",
            "--backup",
            "disabled",
        ])
        .assert()
        .success();
    assert!(!tmp.path().join("main.py.backup").exists());
}

#[test]
fn refactor_backup_is_the_file_on_disk() {
    let tmp = setup();
    fs::write(
        tmp.path().join("with_backup.md"),
        "```json\n{\"primary_content\": \"new\", \"backup_content\": \"not the original\"}\n```",
    )
    .unwrap();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "with_backup.md", "--yes"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(tmp.path().join("main.py.backup")).unwrap(),
        "print('hi')\n"
    );
}

#[test]
fn refactor_label_with_path_is_rejected() {
    let tmp = setup();
    fs::create_dir(tmp.path().join("nested")).unwrap();
    remold(&tmp.path().join("nested"))
        .args([
            "refactor",
            "../main.py",
            "--transcript",
            "../reply.md",
            "--yes",
            "--layout",
            "tree",
            "--label",
            "../escaped",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --label"));
    let escaped = fs::read_dir(tmp.path())
        .unwrap()
        .any(|e| e.unwrap().file_name().to_string_lossy().starts_with("escaped"));
    assert!(!escaped);
}

#[test]
fn refactor_needs_a_transcript_or_agent() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "main.py", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--agent-cmd"));
}

#[test]
fn refactor_missing_input_fails() {
    let tmp = setup();
    remold(tmp.path())
        .args(["refactor", "nope.py", "--transcript", "reply.md", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read nope.py"));
}

#[cfg(unix)]
#[test]
fn refactor_with_agent_command() {
    let tmp = TempDir::new().unwrap();
    // `cat` echoes the request back; its code fence holds a valid payload
    fs::write(
        tmp.path().join("data.json"),
        "{\"primary_content\": \"echoed\"}",
    )
    .unwrap();
    remold(tmp.path())
        .args(["refactor", "data.json", "--agent-cmd", "cat", "--yes"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(tmp.path().join("data.json")).unwrap(),
        "echoed"
    );
}

#[test]
fn init_writes_config_once() {
    let tmp = TempDir::new().unwrap();
    remold(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));
    let config = fs::read_to_string(tmp.path().join(".remold.json")).unwrap();
    assert!(config.contains("\"backup_policy\": \"original\""));

    remold(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn config_file_drives_defaults() {
    let tmp = setup();
    fs::write(
        tmp.path().join(".remold.json"),
        r#"{"preview_only": true}"#,
    )
    .unwrap();
    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preview only"));
    assert!(!tmp.path().join("main.py.backup").exists());
}

#[test]
fn invalid_config_is_an_error() {
    let tmp = setup();
    fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();
    remold(tmp.path())
        .args(["--config", "bad.json", "logs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn logs_lists_runs_newest_first() {
    let tmp = setup();
    remold(tmp.path())
        .arg("logs")
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit entries found."));

    remold(tmp.path())
        .args(["refactor", "main.py", "--transcript", "reply.md", "--yes"])
        .assert()
        .success();

    let output = remold(tmp.path())
        .args(["--format", "json", "logs"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["initiator"], "cli");
    assert!(entries[0]["original_file"]
        .as_str()
        .unwrap()
        .ends_with("main.py"));
}
