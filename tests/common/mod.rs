//! Shared helpers for docgraph integration tests.
//!
//! Every test works in its own temp directory. The binary runs with that
//! directory as its working directory, so the default `.docgraph` store and
//! `docgraph.toml` are local to the test.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use docgraph::Block;
use serde_json::Value;

/// Paragraph blocks with ids `b0`, `b1`, ...
pub fn paragraphs(texts: &[&str]) -> Vec<Block> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Block::paragraph(format!("b{i}"), t))
        .collect()
}

/// Run docgraph in `dir`.
pub fn docgraph_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docgraph"))
        .args(args)
        .current_dir(dir)
        .env_remove("DOCGRAPH_STORE")
        .env_remove("DOCGRAPH_CONFIG")
        .env_remove("DOCGRAPH_LOG")
        .output()
        .expect("failed to execute docgraph")
}

/// Run docgraph and assert it succeeds. Returns stdout as string.
pub fn docgraph_ok(dir: &Path, args: &[&str]) -> String {
    let out = docgraph_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "docgraph {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.into_owned()
}

/// Run docgraph and assert it fails. Returns stderr as string.
pub fn docgraph_err(dir: &Path, args: &[&str]) -> String {
    let out = docgraph_in(dir, args);
    assert!(
        !out.status.success(),
        "docgraph {} unexpectedly succeeded:\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout)
    );
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Run docgraph with `--format json` and parse its stdout.
pub fn docgraph_json(dir: &Path, args: &[&str]) -> Value {
    let mut full = vec!["--format", "json"];
    full.extend_from_slice(args);
    let stdout = docgraph_ok(dir, &full);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON from docgraph {}: {e}\n{stdout}", args.join(" ")))
}
