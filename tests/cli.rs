use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

/// A command with its settings file and logs inside `home`
fn cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("litfinder").unwrap();
    cmd.env("LITFINDER_CONFIG", home.path().join("settings.json"))
        .env("LITFINDER_LOG_DIR", home.path().join("logs"))
        .env_remove("LITFINDER_BACKEND")
        .env_remove("LITFINDER_MAILTO")
        .env_remove("LITFINDER_GEMINI_MODEL")
        .env_remove("LITFINDER_OLLAMA_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn every_command_has_help() {
    let home = TempDir::new().expect("temp home");
    for args in [
        vec![],
        vec!["search"],
        vec!["lookup"],
        vec!["summarize"],
        vec!["clean"],
        vec!["tokens"],
        vec!["config"],
        vec!["config", "path"],
        vec!["config", "show"],
        vec!["config", "init"],
        vec!["check"],
    ] {
        cmd(&home).args(&args).arg("--help").assert().success();
    }
}

#[test]
fn clean_from_stdin() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("clean")
        .write_stdin("<jats:p>Robots   <i>learn</i> fast .</jats:p>\n")
        .assert()
        .success()
        .stdout("Robots learn fast.\n");
}

#[test]
fn clean_from_file_json() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("abstract.html");
    std::fs::write(&input, "<p>Fish &amp; chips</p>").unwrap();

    cmd(&home)
        .args(["--json", "clean", "--file"])
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("\"ok\": true").and(contains("\"data\": \"Fish & chips\"")));
}

#[test]
fn tokens_count_and_truncate() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("tokens")
        .write_stdin("one two  three\nfour")
        .assert()
        .success()
        .stdout("4\n");

    cmd(&home)
        .args(["tokens", "--max", "2"])
        .write_stdin("one two three four")
        .assert()
        .success()
        .stdout("4\none two\n");
}

#[test]
fn summarize_empty_input_needs_no_backend() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .env_remove("GOOGLE_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .arg("summarize")
        .write_stdin("  <p> </p> ")
        .assert()
        .success()
        .stdout("No abstract provided.\n");
}

#[test]
fn config_path_follows_flag() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("elsewhere.json");
    cmd(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(contains("elsewhere.json"));
}

#[test]
fn config_init_then_show() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(contains("wrote"));
    assert!(home.path().join("settings.json").exists());

    cmd(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(contains("already exists"));

    cmd(&home).args(["config", "init", "--force"]).assert().success();

    cmd(&home)
        .args(["--json", "--backend", "ollama", "config", "show"])
        .assert()
        .success()
        .stdout(contains("\"backend\": \"ollama\"").and(contains("\"max_words\": 60")));
}

#[test]
fn broken_explicit_settings_fail() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("settings.json"), "{ nope").unwrap();
    cmd(&home)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("configuration error")));
}

#[test]
fn interactive_mode_rejects_empty_query() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(contains("Enter a paper title").and(contains("empty query")));
}
