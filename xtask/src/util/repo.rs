use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Environment;

/// `REPODIR` if set, otherwise the directory above this crate.
pub fn repo_root(env: &Environment) -> Result<PathBuf> {
    if let Some(dir) = env.get_path("REPODIR") {
        return Ok(dir);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask is expected at <repo>/xtask")
}

/// Two-component version (`24.08`) used to key the prebuilt docs archives.
pub fn docs_version(root: &Path) -> Result<String> {
    let path = root.join("VERSION");
    let raw = fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))?;
    parse_docs_version(&raw)
}

pub fn parse_docs_version(raw: &str) -> Result<String> {
    let line = raw.lines().next().unwrap_or_default().trim();
    let mut parts = line.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) if is_number(major) && is_number(minor) => {
            Ok(format!("{major}.{minor}"))
        }
        _ => bail!("VERSION '{line}' does not start with <major>.<minor>"),
    }
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}
