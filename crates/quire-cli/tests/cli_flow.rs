use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const PASSPHRASE: &str = "correct horse battery staple";

struct Store {
    dir: TempDir,
}

impl Store {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn initialized() -> Self {
        let store = Self::new();
        let output = store.run_with_passphrase(&["init"]);
        assert!(output.status.success(), "init failed: {}", stderr(&output));
        store
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_quire")));
        cmd.env("QUIRE_DATA_DIR", self.path().join("data"))
            .env("QUIRE_CONFIG", self.path().join("config.toml"))
            .env("QUIRE_TEST_FAST_KDF", "1")
            .env("HOME", self.path())
            .env("NO_COLOR", "1")
            .env_remove("QUIRE_PASSPHRASE")
            .env_remove("QUIRE_EXPORT_PASSWORD")
            .env_remove("QUIRE_TEST_PASSPHRASE_ATTEMPTS");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().expect("run quire")
    }

    fn run_with_passphrase(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .env("QUIRE_PASSPHRASE", PASSPHRASE)
            .output()
            .expect("run quire")
    }

    fn new_note(&self, args: &[&str]) -> String {
        let mut full = vec!["new"];
        full.extend_from_slice(args);
        let output = self.run_with_passphrase(&full);
        assert!(output.status.success(), "new failed: {}", stderr(&output));
        field(&stdout(&output), "id").expect("id in receipt")
    }

    fn status(&self) -> Value {
        let output = self.run(&["status", "--json"]);
        assert!(output.status.success(), "status failed: {}", stderr(&output));
        serde_json::from_str(&stdout(&output)).expect("status json")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn field(text: &str, key: &str) -> Option<String> {
    let prefix = format!("{}=", key);
    text.lines()
        .find_map(|line| line.strip_prefix(&prefix).map(|value| value.to_string()))
}

fn file_contains(path: &Path, needle: &str) -> bool {
    let bytes = std::fs::read(path).unwrap_or_default();
    bytes
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[test]
fn test_note_round_trip_keeps_body_encrypted_at_rest() {
    let store = Store::initialized();
    let id = store.new_note(&[
        "--title",
        "Trip plans",
        "--body",
        "meet at the blue lighthouse",
        "-t",
        "travel",
    ]);

    let list = store.run(&["list"]);
    assert!(list.status.success());
    let listing = stdout(&list);
    assert!(listing.contains(&id));
    assert!(listing.contains("Trip plans"));
    assert!(listing.contains("locked"));
    assert!(!listing.contains("lighthouse"));

    let search = store.run(&["search", "travel"]);
    assert!(stdout(&search).contains(&id));
    let miss = store.run(&["search", "trav"]);
    assert!(stdout(&miss).contains("No notes found."));

    let show = store.run_with_passphrase(&["show", &id[..8], "--json"]);
    assert!(show.status.success(), "show failed: {}", stderr(&show));
    let note: Value = serde_json::from_str(&stdout(&show)).unwrap();
    assert_eq!(note["content"], "meet at the blue lighthouse");
    assert_eq!(note["tags"][0], "travel");

    let db = store.path().join("data").join("notes.db");
    assert!(db.exists());
    assert!(!file_contains(&db, "lighthouse"));
    assert!(!file_contains(&db, "Trip plans"));
}

#[test]
fn test_show_without_passphrase_explains_how_to_unlock() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Private", "--body", "hidden words"]);

    let output = store.run(&["show", &id]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("QUIRE_PASSPHRASE"));
    assert!(!stdout(&output).contains("hidden words"));
}

#[test]
fn test_commands_before_init_point_at_init() {
    let store = Store::new();
    let output = store.run_with_passphrase(&["unlock"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("quire init"));

    let status = store.status();
    assert_eq!(status["initialized"], false);
}

#[test]
fn test_init_twice_is_rejected() {
    let store = Store::initialized();
    let output = store.run_with_passphrase(&["init"]);
    assert!(!output.status.success());
    assert!(store.path().join("config.toml").exists());
}

#[test]
fn test_failed_unlocks_lead_to_lockout() {
    let store = Store::initialized();

    let output = store
        .cmd()
        .arg("unlock")
        .env("QUIRE_TEST_PASSPHRASE_ATTEMPTS", "bad1,bad2,bad3")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("4 attempts remaining"));
    assert!(err.contains("2 attempts remaining"));

    let output = store
        .cmd()
        .arg("unlock")
        .env("QUIRE_TEST_PASSPHRASE_ATTEMPTS", "bad4,bad5")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("Too many failed attempts"));

    // The right passphrase is refused while the lockout lasts.
    let output = store.run_with_passphrase(&["unlock"]);
    assert_eq!(output.status.code(), Some(5));

    let status = store.status();
    assert_eq!(status["locked_out"], true);
    let minutes = status["minutes_left"].as_u64().unwrap();
    assert!((14..=15).contains(&minutes), "minutes_left={}", minutes);
}

#[test]
fn test_successful_unlock_resets_counter() {
    let store = Store::initialized();
    let output = store
        .cmd()
        .arg("unlock")
        .env("QUIRE_TEST_PASSPHRASE_ATTEMPTS", format!("wrong,{}", PASSPHRASE))
        .output()
        .unwrap();
    assert!(output.status.success(), "unlock failed: {}", stderr(&output));
    assert_eq!(store.status()["failed_attempts"], 0);
}

#[test]
fn test_metadata_edit_needs_no_passphrase() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Draft", "--body", "first version"]);

    let output = store.run(&["edit", &id, "--title", "Final", "--favorite", "true"]);
    assert!(output.status.success(), "edit failed: {}", stderr(&output));

    let show = store.run_with_passphrase(&["show", &id, "--json"]);
    let note: Value = serde_json::from_str(&stdout(&show)).unwrap();
    assert_eq!(note["title"], "Final");
    assert_eq!(note["favorite"], true);
    assert_eq!(note["content"], "first version");
}

#[test]
fn test_body_edit_reencrypts() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Draft", "--body", "old words"]);

    let output = store.run_with_passphrase(&["edit", &id, "--body", "new words"]);
    assert!(output.status.success(), "edit failed: {}", stderr(&output));

    let show = store.run_with_passphrase(&["show", &id, "--json"]);
    let note: Value = serde_json::from_str(&stdout(&show)).unwrap();
    assert_eq!(note["content"], "new words");
    assert!(!file_contains(&store.path().join("data").join("notes.db"), "new words"));
}

#[test]
fn test_plain_notes_show_without_passphrase() {
    let store = Store::initialized();
    let output = store.run(&["new", "--plain", "--title", "Shopping", "--body", "eggs"]);
    assert!(output.status.success(), "new failed: {}", stderr(&output));
    let receipt = stdout(&output);
    assert_eq!(field(&receipt, "encrypted").as_deref(), Some("no"));
    let id = field(&receipt, "id").unwrap();

    let show = store.run(&["show", &id]);
    assert!(show.status.success());
    assert!(stdout(&show).contains("eggs"));
}

#[test]
fn test_delete_requires_confirmation() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Temp", "--body", "scratch"]);

    let refused = store.run(&["delete", &id]);
    assert!(!refused.status.success());
    assert!(stderr(&refused).contains("--yes"));

    let deleted = store.run(&["delete", &id, "--yes"]);
    assert!(deleted.status.success(), "delete failed: {}", stderr(&deleted));

    let show = store.run_with_passphrase(&["show", &id]);
    assert_eq!(show.status.code(), Some(3));
}

#[test]
fn test_plaintext_backup_is_bound_to_device() {
    let store = Store::initialized();
    store.new_note(&["--title", "Kept", "--body", "keep me"]);
    let backup = store.path().join("backup.json");
    let backup_arg = backup.to_str().unwrap();

    let output = store.run_with_passphrase(&["export", backup_arg]);
    assert!(output.status.success(), "export failed: {}", stderr(&output));
    assert_eq!(field(&stdout(&output), "notes").as_deref(), Some("1"));

    let output = store.run_with_passphrase(&["import", backup_arg]);
    assert!(output.status.success(), "import failed: {}", stderr(&output));

    let other = Store::initialized();
    let output = other.run_with_passphrase(&["import", backup_arg]);
    assert!(!output.status.success());
    let list = other.run(&["list"]);
    assert!(stdout(&list).contains("No notes found."));
}

#[test]
fn test_protected_backup_moves_between_stores() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Recipe", "--body", "two eggs and flour"]);
    let backup = store.path().join("protected.json");
    let backup_arg = backup.to_str().unwrap();

    let output = store
        .cmd()
        .args(["export", backup_arg, "--protected"])
        .env("QUIRE_PASSPHRASE", PASSPHRASE)
        .env("QUIRE_EXPORT_PASSWORD", "export-pass-123")
        .output()
        .unwrap();
    assert!(output.status.success(), "export failed: {}", stderr(&output));
    assert!(!file_contains(&backup, "two eggs"));

    let other = Store::initialized();
    let wrong = other
        .cmd()
        .args(["import", backup_arg])
        .env("QUIRE_PASSPHRASE", PASSPHRASE)
        .env("QUIRE_EXPORT_PASSWORD", "not-the-password")
        .output()
        .unwrap();
    assert!(!wrong.status.success());

    let output = other
        .cmd()
        .args(["import", backup_arg])
        .env("QUIRE_PASSPHRASE", PASSPHRASE)
        .env("QUIRE_EXPORT_PASSWORD", "export-pass-123")
        .output()
        .unwrap();
    assert!(output.status.success(), "import failed: {}", stderr(&output));

    let show = other.run_with_passphrase(&["show", &id, "--json"]);
    let note: Value = serde_json::from_str(&stdout(&show)).unwrap();
    assert_eq!(note["content"], "two eggs and flour");
}

#[test]
fn test_maintain_reports_counts() {
    let store = Store::initialized();
    store.new_note(&["--title", "One", "--body", "a"]);
    let output = store.run(&["maintain"]);
    assert!(output.status.success(), "maintain failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(field(&text, "migrated").is_some());
    assert!(field(&text, "removed").is_some());
}

#[test]
fn test_shell_lock_hides_note_bodies() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Shell note", "--body", "visible once"]);

    let mut child = store
        .cmd()
        .arg("shell")
        .env("QUIRE_PASSPHRASE", PASSPHRASE)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let stdin = child.stdin.as_mut().unwrap();
        write!(stdin, "show {}\nlock\nshow {}\nexit\n", id, id).unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "shell failed: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Session locked."));
    assert_eq!(out.matches("visible once").count(), 1);
    assert!(stderr(&output).contains("Session is locked"));
}

#[test]
fn test_folder_and_color_edits_keep_body_sealed() {
    let store = Store::initialized();
    let id = store.new_note(&["--title", "Quarterly", "--body", "numbers", "--folder", "work"]);

    let output = store.run(&["edit", &id, "--folder", "work/reports", "--color", "yellow"]);
    assert!(output.status.success(), "edit failed: {}", stderr(&output));
    assert_eq!(field(&stdout(&output), "folder").as_deref(), Some("work/reports"));

    let show = store.run_with_passphrase(&["show", &id, "--json"]);
    let note: Value = serde_json::from_str(&stdout(&show)).unwrap();
    assert_eq!(note["folder"], "work/reports");
    assert_eq!(note["color"], "yellow");
    assert_eq!(note["content"], "numbers");

    let output = store.run(&["edit", &id, "--folder", "", "--color", ""]);
    assert!(output.status.success(), "edit failed: {}", stderr(&output));
    let listed = store.run(&["list", "--json"]);
    let notes: Value = serde_json::from_str(&stdout(&listed)).unwrap();
    assert!(notes[0]["folder"].is_null());
    assert!(notes[0]["color"].is_null());
}

#[test]
fn test_list_filters_sorts_and_groups() {
    let store = Store::initialized();
    store.new_note(&["--title", "banana", "--body", "b", "--folder", "work/fruit", "-t", "food"]);
    store.new_note(&["--title", "Apple", "--body", "a", "--folder", "work", "-t", "food"]);
    store.new_note(&["--title", "cherry", "--body", "c", "--folder", "home"]);

    let output = store.run(&["list", "--folder", "work", "--sort", "alphabetical"]);
    assert!(output.status.success(), "list failed: {}", stderr(&output));
    let text = stdout(&output);
    let titles: Vec<&str> = text
        .lines()
        .filter_map(|line| line.split('\t').nth(2))
        .collect();
    assert_eq!(titles, vec!["Apple", "banana"]);

    let output = store.run(&["list", "--sort", "alphabetical", "--order", "asc", "--json"]);
    let notes: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(notes[0]["title"], "cherry");

    let output = store.run(&["list", "--group-by", "tags", "--json"]);
    assert!(output.status.success(), "list failed: {}", stderr(&output));
    let groups: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(groups[0]["group"], "food");
    assert_eq!(groups[0]["notes"].as_array().unwrap().len(), 2);
    assert_eq!(groups[1]["group"], "Untagged");

    let output = store.run(&["list", "--group-by", "folders"]);
    let text = stdout(&output);
    assert!(text.contains("# home"));
    assert!(text.contains("# work/fruit"));
}
