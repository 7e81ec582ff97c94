//! Integration tests for the grounded CLI

use std::process::{Command, Output};

fn grounded(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_grounded"))
        .args(args)
        .env_remove("GROUNDED_CONFIG")
        .env_remove("GROUNDED_INDEX_DIR")
        .output()
        .expect("Failed to run command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_cli_help() {
    let output = grounded(&["--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("ingest"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("ask"));
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_cli_version() {
    let output = grounded(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("grounded"));
}

#[test]
fn test_ingest_help() {
    let output = grounded(&["ingest", "--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("<CORPUS>"));
    assert!(stdout.contains("--index-dir"));
    assert!(stdout.contains("--backend"));
}

#[test]
fn test_search_help() {
    let output = grounded(&["search", "--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("--top-k"));
    assert!(stdout.contains("--threshold"));
    assert!(stdout.contains("--format"));
}

#[test]
fn test_ask_help() {
    let output = grounded(&["ask", "--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("--llm"));
    assert!(stdout.contains("--model"));
    assert!(stdout.contains("--timeout"));
    assert!(stdout.contains("--interactive"));
}

#[test]
fn test_serve_help() {
    let output = grounded(&["serve", "--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("--port"));
    assert!(stdout.contains("--host"));
    assert!(stdout.contains("--cors"));
}

#[test]
fn test_config_init_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path_str = path.to_str().unwrap();

    let output = grounded(&["--config", path_str, "config", "path"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), path_str);

    let output = grounded(&["--config", path_str, "config", "init"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(path.exists());

    // A second init without --force refuses to overwrite
    let output = grounded(&["--config", path_str, "config", "init"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--force"));

    let output = grounded(&["--config", path_str, "config", "show"]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("[retrieval]"));
    assert!(shown.contains("top_k = 5"));
}

#[test]
fn test_ingest_empty_corpus_fails() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus.txt");
    std::fs::write(&corpus, "\n   \n\n").unwrap();
    let index_dir = dir.path().join("index");

    let output = grounded(&[
        "ingest",
        corpus.to_str().unwrap(),
        "--index-dir",
        index_dir.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("corpus is empty"));
    assert!(!index_dir.exists());
}

#[test]
fn test_search_without_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("missing");

    let output = grounded(&[
        "search",
        "How do I track my order?",
        "--index-dir",
        index_dir.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no index found"));
}
