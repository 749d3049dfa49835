use std::process::ExitCode;

use anyhow::Result;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod tasks;
mod util;

use crate::cli::{Invocation, Parsed};
use crate::config::{BuildConfig, BuildPaths, Environment};

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let env = Environment::from_process();

    match cli::parse(&args) {
        Ok(Parsed::Help) => {
            print!("{}", cli::usage(&help_build_dir(&env)));
            ExitCode::SUCCESS
        }
        Ok(Parsed::Run(invocation)) => match execute(&invocation, &env) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn execute(invocation: &Invocation, env: &Environment) -> Result<()> {
    let root = util::repo::repo_root(env)?;
    let config = BuildConfig::resolve(invocation, env, root)?;
    match serde_json::to_string(&config) {
        Ok(json) => debug!(config = %json, "resolved build configuration"),
        Err(err) => debug!(%err, ?config, "resolved build configuration"),
    }

    let fetcher = tasks::fetch::HttpFetcher::default();
    let collaborators = app::Collaborators {
        runner: &util::process::SystemRunner,
        fetcher: &fetcher,
    };
    app::run(invocation, &config, &collaborators)
}

fn help_build_dir(env: &Environment) -> std::path::PathBuf {
    util::repo::repo_root(env).map_or_else(
        |_| std::path::PathBuf::from("cpp/build"),
        |root| BuildPaths::resolve(root, env).libcugraph_build,
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
