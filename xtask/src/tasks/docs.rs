//! Documentation build.
//!
//! The Sphinx tree pulls Doxygen XML from libcugraph and from two upstream
//! projects whose XML is published as prebuilt archives per release.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::BuildConfig;
use crate::tasks::fetch::Fetcher;
use crate::tasks::native;
use crate::util::process::{CommandSpec, Runner};
use crate::util::repo;

const ARCHIVE_HOST: &str = "https://d1664dvumjb44w.cloudfront.net";

pub const UPSTREAM_PROJECTS: [&str; 2] = ["libcugraphops", "libwholegraph"];

pub fn archive_url(project: &str, version: &str) -> String {
    format!("{ARCHIVE_HOST}/{project}/xml_tar/{version}/xml.tar.gz")
}

/// Environment variable the Sphinx config reads for a project's XML directory.
pub fn xml_dir_var(project: &str) -> String {
    format!("XML_DIR_{}", project.to_ascii_uppercase())
}

pub fn build(config: &BuildConfig, runner: &dyn Runner, fetcher: &dyn Fetcher) -> Result<()> {
    println!("📚 Building docs...");
    let version = repo::docs_version(&config.paths.repo_root)?;
    let docs_root = config.paths.docs_root();

    let mut xml_env = Vec::new();
    for project in UPSTREAM_PROJECTS {
        let xml_dir = docs_root.join(project);
        reset_dir(&xml_dir)?;
        let var = xml_dir_var(project);
        info!(
            project,
            dir = %xml_dir.display(),
            "downloading xml, {var} is set to this directory"
        );
        fetcher.fetch_archive(&archive_url(project, &version), &xml_dir)?;
        xml_env.push((var, xml_dir.display().to_string()));
    }

    let build_dir = &config.paths.libcugraph_build;
    if !build_dir.is_dir() {
        fs::create_dir_all(build_dir)
            .with_context(|| format!("Creating {}", build_dir.display()))?;
        runner.run(&native::configure_docs(config))?;
    }
    runner.run(&native::build_command(config, build_dir, Some("docs_cugraph")).envs(&xml_env))?;

    reset_dir(&docs_root.join("libcugraph"))?;
    xml_env.push((
        xml_dir_var("libcugraph"),
        config.paths.doxygen_xml().display().to_string(),
    ));

    runner.run(
        &CommandSpec::new("make")
            .arg("html")
            .current_dir(&docs_root)
            .envs(&xml_env),
    )
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Removing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))
}
