use anyhow::{Context, Result};

use crate::cli::{BuildTarget, Invocation, Token};
use crate::config::BuildConfig;
use crate::tasks::fetch::Fetcher;
use crate::util::process::Runner;

/// External tools the stages delegate to.
pub struct Collaborators<'a> {
    pub runner: &'a dyn Runner,
    pub fetcher: &'a dyn Fetcher,
}

/// Run the stages in their fixed order: uninstall, clean, docs, builds.
///
/// Only the first two swallow errors; any later failure stops the run.
pub fn run(invocation: &Invocation, config: &BuildConfig, tools: &Collaborators<'_>) -> Result<()> {
    if invocation.has(Token::Uninstall) {
        crate::tasks::clean::uninstall(config, tools.runner);
    }
    if invocation.has(Token::Clean) {
        crate::tasks::clean::clean(config);
    }

    if invocation.wants_docs() {
        crate::tasks::docs::build(config, tools.runner, tools.fetcher).context("Building docs")?;
    }

    let targets = invocation.build_targets();
    if targets.iter().any(|t| t.is_native()) && !config.clean_targets {
        crate::tasks::native::log_gpu_architectures(config);
    }
    for target in targets {
        build_target(target, config, tools.runner).with_context(|| format!("Building {target}"))?;
    }
    Ok(())
}

fn build_target(target: BuildTarget, config: &BuildConfig, runner: &dyn Runner) -> Result<()> {
    match target {
        BuildTarget::Libcugraph => crate::tasks::native::build_libcugraph(config, runner),
        BuildTarget::LibcugraphEtl => crate::tasks::native::build_libcugraph_etl(config, runner),
        BuildTarget::Pylibcugraph
        | BuildTarget::Cugraph
        | BuildTarget::CugraphService
        | BuildTarget::CugraphPyg
        | BuildTarget::CugraphDgl => crate::tasks::python::build(target, config, runner),
    }
}
