// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `.env` file discovery and loading.
//!
//! Lookup order:
//!
//! 1. `config/.env` next to the project root (found by walking up from the
//!    working directory to the nearest `Cargo.toml`);
//! 2. `config/.env` under the working directory;
//! 3. `../../../config/.env`;
//! 4. `./.env`.
//!
//! The first file that exists wins. Lines beginning with `#` and blank
//! lines are skipped; quoted values are unquoted. Variables already present
//! in the process environment are never overwritten.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Finds and applies the `.env` file. Returns the path that was loaded, if
/// any.
pub fn load() -> Option<PathBuf> {
    let path = discover()?;
    apply_file(&path);
    Some(path)
}

/// Applies a specific `.env` file.
pub fn load_from(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    apply_file(path);
    true
}

fn discover() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;

    let mut candidates = Vec::new();
    if let Some(root) = project_root(&cwd) {
        candidates.push(root.join("config/.env"));
    }
    candidates.push(cwd.join("config/.env"));
    candidates.push(cwd.join("../../../config/.env"));
    candidates.push(cwd.join(".env"));

    candidates.into_iter().find(|p| p.is_file())
}

/// Walks up from `start` to the nearest directory containing a project
/// file.
fn project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join("Cargo.toml").is_file() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

fn apply_file(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    let mut applied = 0usize;
    for line in content.lines() {
        let Some((name, value)) = parse_line(line) else {
            continue;
        };
        if env::var_os(&name).is_some() {
            debug!(%name, "Environment already set, .env value ignored");
            continue;
        }
        env::set_var(&name, value);
        applied += 1;
    }

    info!(path = %path.display(), applied, "Loaded .env file");
}

/// Parses one `NAME=value` line. Returns `None` for comments, blanks, and
/// malformed lines.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (name, value) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    Some((name.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("OPCUA_SERVER_URL=opc.tcp://host:4840"),
            Some(("OPCUA_SERVER_URL".into(), "opc.tcp://host:4840".into()))
        );
        assert_eq!(
            parse_line(r#"EVENTHUB_NAME="macman-records""#),
            Some(("EVENTHUB_NAME".into(), "macman-records".into()))
        );
        assert_eq!(
            parse_line("NAME='quoted value'"),
            Some(("NAME".into(), "quoted value".into()))
        );
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("no_equals_sign"), None);
    }

    #[test]
    fn test_unquote_partial_quotes_kept() {
        assert_eq!(unquote(r#""open ended"#), r#""open ended"#);
        assert_eq!(unquote(r#""#), r#""#);
    }

    #[test]
    fn test_load_from_respects_existing_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "OCONN_ENVFILE_TEST_A=from_file\nOCONN_ENVFILE_TEST_B=from_file\n",
        )
        .unwrap();

        env::set_var("OCONN_ENVFILE_TEST_A", "from_process");
        env::remove_var("OCONN_ENVFILE_TEST_B");

        assert!(load_from(&path));
        assert_eq!(env::var("OCONN_ENVFILE_TEST_A").unwrap(), "from_process");
        assert_eq!(env::var("OCONN_ENVFILE_TEST_B").unwrap(), "from_file");

        env::remove_var("OCONN_ENVFILE_TEST_A");
        env::remove_var("OCONN_ENVFILE_TEST_B");
    }
}
