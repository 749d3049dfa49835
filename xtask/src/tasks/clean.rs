//! `uninstall` and `clean` stages.
//!
//! Missing files are the normal case here, so nothing in this module returns
//! an error: failures are logged and the stage moves on.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::tasks::python;
use crate::util::process::Runner;

/// Install-prefix relative paths written by the native `install` targets.
const INSTALLED_PATHS: &[&str] = &[
    "include/cugraph",
    "lib/libcugraph.so",
    "include/cugraph_c",
    "lib/libcugraph_c.so",
    "include/cugraph_etl",
    "lib/libcugraph_etl.so",
    "lib/cmake/cugraph",
    "lib/cmake/cugraph_etl",
];

const PYTHON_PACKAGES: &[&str] = &[
    "pylibcugraph",
    "cugraph",
    "cugraph-service-client",
    "cugraph-service-server",
    "cugraph-dgl",
    "cugraph-pyg",
    "nx-cugraph",
];

const GENERATED_DIRS: &[&str] = &["__pycache__", "build", "dist", "_external_repositories"];

pub fn uninstall(config: &BuildConfig, runner: &dyn Runner) {
    println!("🗑️  Uninstalling libcugraph and cugraph...");

    if let Some(prefix) = &config.install_prefix {
        for rel in INSTALLED_PATHS {
            remove_quietly(&prefix.join(rel));
        }
    }

    // Catches installed files outside the locations above.
    let manifest = config.paths.libcugraph_build.join("install_manifest.txt");
    match fs::read_to_string(&manifest) {
        Ok(listing) => {
            for line in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
                remove_file_quietly(Path::new(line));
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %manifest.display(), %err, "could not read install manifest"),
    }

    let cmd = python::pip()
        .args(["uninstall", "-y"])
        .args(PYTHON_PACKAGES.iter().copied());
    if let Err(err) = runner.run(&cmd) {
        warn!(error = %format!("{err:#}"), "pip uninstall failed, continuing");
    }
}

pub fn clean(config: &BuildConfig) {
    println!("🧹 Cleaning...");

    clean_python_dir(&config.paths.python_root());
    for dir in config.paths.build_dirs() {
        clean_build_dir(dir);
    }
}

/// Empty `dir`, then try to remove it.
///
/// Build directories are often volumes mounted into a container: the contents
/// can go but the mount point cannot, so a failed `rmdir` is expected.
pub fn clean_build_dir(dir: &Path) {
    clean_build_dir_with(dir, |dir| fs::remove_dir(dir));
}

fn clean_build_dir_with(dir: &Path, remove_dir: impl FnOnce(&Path) -> io::Result<()>) {
    if !dir.is_dir() {
        return;
    }
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                remove_quietly(&entry.path());
            }
        }
        Err(err) => warn!(path = %dir.display(), %err, "could not list build directory"),
    }
    if let Err(err) = remove_dir(dir) {
        debug!(path = %dir.display(), %err, "kept build directory");
    }
}

/// Remove artifacts generated in place by Python/Cython builds under `root`.
/// A missing `root` is left alone.
pub fn clean_python_dir(root: &Path) {
    if !root.is_dir() {
        return;
    }
    for path in generated_python_artifacts(root) {
        remove_quietly(&path);
    }
}

pub fn generated_python_artifacts(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "skipping unreadable path");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            if GENERATED_DIRS.contains(&name.as_ref()) || name.ends_with(".egg-info") {
                found.push(entry.path().to_path_buf());
                walker.skip_current_dir();
            }
        } else if is_generated_file(&name) {
            found.push(entry.path().to_path_buf());
        }
    }
    found
}

fn is_generated_file(name: &str) -> bool {
    name.ends_with(".cpp")
        || (name.contains(".cpython") && name.ends_with(".so"))
}

/// Files only: a directory listed in an install manifest is not ours to delete.
fn remove_file_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "could not remove"),
    }
}

fn remove_quietly(path: &Path) {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "could not remove"),
    }
}
