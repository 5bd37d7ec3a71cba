//! Integration tests for the `docgraph` command-line front end.

mod common;

use common::{docgraph_err, docgraph_json, docgraph_ok};

#[test]
fn init_then_log() {
    let dir = tempfile::tempdir().unwrap();
    let out = docgraph_ok(dir.path(), &["init", "--title", "Notes", "--text", "hello"]);
    assert!(out.contains("Created document 1"), "{out}");
    assert!(dir.path().join(".docgraph").join("1.json").exists());

    let log = docgraph_json(dir.path(), &["log"]);
    assert_eq!(log["branches"][0]["name"], "main");
    assert_eq!(log["branches"][0]["color"], "#6366f1");
    assert_eq!(log["commits"][0]["title"], "Notes");
}

#[test]
fn init_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    docgraph_ok(dir.path(), &["init", "--title", "Notes", "--text", "a"]);
    let err = docgraph_err(dir.path(), &["init", "--title", "Again", "--text", "a"]);
    assert!(err.contains("already exists"), "{err}");
}

#[test]
fn commit_requires_blocks() {
    let dir = tempfile::tempdir().unwrap();
    docgraph_ok(dir.path(), &["init", "--title", "Notes", "--text", "a"]);
    let err = docgraph_err(dir.path(), &["commit", "--title", "Empty"]);
    assert!(err.contains("To fix:"), "{err}");
}

#[test]
fn branch_commit_and_merge() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    docgraph_ok(d, &["init", "--title", "Notes", "--text", "intro"]);
    docgraph_ok(d, &["branch", "feature"]);
    docgraph_ok(
        d,
        &[
            "commit", "--branch", "feature", "-t", "More", "--text", "intro", "--text", "details",
        ],
    );

    let preview = docgraph_json(d, &["merge", "feature", "--dry-run"]);
    assert_eq!(preview["summary"]["added"], 1);
    assert_eq!(preview["summary"]["modified"], 0);

    let merged = docgraph_json(d, &["merge", "feature", "--take", "target"]);
    assert_eq!(merged["title"], "Merge feature into main");
    assert_eq!(merged["blocks"].as_array().unwrap().len(), 2);

    let log = docgraph_json(d, &["log"]);
    let feature = log["branches"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["name"] == "feature")
        .unwrap();
    assert_eq!(feature["merged"], true);
    assert_eq!(log["commits"][0]["parents"].as_array().unwrap().len(), 2);
}

#[test]
fn diff_between_commits() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    docgraph_ok(d, &["init", "--title", "Notes", "--text", "x"]);
    docgraph_ok(d, &["commit", "-t", "Edit", "--text", "y"]);

    let out = docgraph_ok(d, &["diff", "1", "2"]);
    assert!(out.contains("~ [0] [-x-]{+y+}"), "{out}");
    assert!(out.contains("0 added, 0 deleted, 1 modified, 0 unchanged"), "{out}");

    let json = docgraph_json(d, &["diff", "1", "2"]);
    assert_eq!(json["entries"][0]["kind"], "modified");
}

#[test]
fn delete_non_head_commit_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    docgraph_ok(d, &["init", "--title", "Notes", "--text", "a"]);
    docgraph_ok(d, &["commit", "-t", "Second", "--text", "b"]);
    docgraph_err(d, &["delete-commit", "1"]);
    docgraph_ok(d, &["delete-commit", "2"]);
    let log = docgraph_json(d, &["log"]);
    assert_eq!(log["commits"].as_array().unwrap().len(), 1);
}

#[test]
fn delete_main_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    docgraph_ok(d, &["init", "--title", "Notes", "--text", "a"]);
    let err = docgraph_err(d, &["delete-branch", "main"]);
    assert!(err.contains("main"), "{err}");
}

#[test]
fn draft_shows_up_in_layout() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    docgraph_ok(d, &["init", "--title", "Notes", "--text", "a"]);
    docgraph_ok(d, &["draft", "--text", "wip"]);

    let placed = docgraph_json(d, &["layout"]);
    assert_eq!(placed["nodes"]["commit-1"]["x"], 150.0);
    assert_eq!(placed["nodes"]["commit-1"]["y"], 100.0);
    assert_eq!(placed["nodes"]["draft-1"]["y"], 180.0);

    docgraph_ok(d, &["draft", "--discard"]);
    let placed = docgraph_json(d, &["layout"]);
    assert!(placed["nodes"].get("draft-1").is_none());
}

#[test]
fn config_file_changes_layout() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    std::fs::write(d.join("docgraph.toml"), "[layout]\nbase_x_offset = 10.0\n").unwrap();
    docgraph_ok(d, &["init", "--title", "Notes", "--text", "a"]);
    let placed = docgraph_json(d, &["layout"]);
    assert_eq!(placed["nodes"]["commit-1"]["x"], 10.0);
}

#[test]
fn bad_config_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    std::fs::write(d.join("docgraph.toml"), "[layout]\nzoom = 2.0\n").unwrap();
    let err = docgraph_err(d, &["log"]);
    assert!(err.contains("docgraph.toml"), "{err}");
}

#[test]
fn blocks_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    std::fs::write(
        d.join("blocks.json"),
        r#"[{"id":"h","type":"header","data":{"text":"Title","level":2}},
            {"id":"p","type":"paragraph","data":{"text":"Body"}}]"#,
    )
    .unwrap();
    docgraph_ok(d, &["init", "--title", "Notes", "--blocks", "blocks.json"]);
    let log = docgraph_json(d, &["log"]);
    assert_eq!(log["branches"][0]["commits"], 1);
}
