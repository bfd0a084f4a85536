use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// One line of `repos.conf`: a repository name and its clone URL.
///
/// The name doubles as the clone directory under the target root, so it has
/// to be a single plain path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub clone_url: String,
}

/// Roster problems are configuration errors: fatal for the whole run, never
/// applied partially.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("no repos config found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read repos config at {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid repos config at line {line}: expected `<name> <clone-url>`, got {got:?}")]
    Malformed { line: usize, got: String },
    #[error("invalid repository name at line {line}: {name:?}")]
    BadName { line: usize, name: String },
}

/// Read and parse the roster file.
pub fn load(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let raw = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            RosterError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            RosterError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse(&raw)
}

/// Parse roster lines. Each line must hold exactly two whitespace-separated
/// fields; anything else (including a blank line) is malformed.
pub fn parse(raw: &str) -> Result<Vec<RosterEntry>, RosterError> {
    let mut entries = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(RosterError::Malformed {
                line: line_no,
                got: line.trim_end().to_string(),
            });
        }
        let (name, clone_url) = (fields[0], fields[1]);
        if !valid_name(name) {
            return Err(RosterError::BadName {
                line: line_no,
                name: name.to_string(),
            });
        }
        entries.push(RosterEntry {
            name: name.to_string(),
            clone_url: clone_url.to_string(),
        });
    }
    Ok(entries)
}

/// Append entries to the roster file, creating it and the directory above it
/// if absent. The rewrite goes through a temp file in the same directory so a
/// crash cannot leave a half-written roster behind.
pub fn append(path: &Path, entries: &[RosterEntry]) -> anyhow::Result<()> {
    let mut raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    if !raw.is_empty() && !raw.ends_with('\n') {
        raw.push('\n');
    }
    for entry in entries {
        raw.push_str(&entry.name);
        raw.push(' ');
        raw.push_str(&entry.clone_url);
        raw.push('\n');
    }

    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file for {}", path.display()))?;
    tmp.as_file()
        .write_all(raw.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// True when `<name> <url>` written as a roster line reads back as exactly
/// this pair. Discovery filters third-party names through this before they
/// reach the file.
pub(crate) fn fits_line_format(name: &str, clone_url: &str) -> bool {
    valid_name(name)
        && !clone_url.is_empty()
        && !name.chars().any(char::is_whitespace)
        && !clone_url.chars().any(char::is_whitespace)
}


#[test]
fn parse_accepts_tab_separated_fields() {
    let entries = parse("api\thttps://example.com/api.git\n").unwrap();
    assert_eq!(entries[0].name, "api");
    assert_eq!(entries[0].clone_url, "https://example.com/api.git");
}

#[test]
fn parse_of_empty_input_yields_no_entries() {
    assert!(parse("").unwrap().is_empty());
}
