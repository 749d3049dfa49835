//! pip installation of the Python packages.

use anyhow::Result;

use crate::cli::BuildTarget;
use crate::config::BuildConfig;
use crate::tasks::clean;
use crate::util::process::{CommandSpec, Runner};

const PYTHON: &str = "python";

pub struct PythonPackage {
    /// Directory cleaned by `--clean`, relative to `<repo>/python`.
    pub root: &'static str,
    /// Installable project directories, relative to `<repo>/python`.
    pub projects: &'static [&'static str],
    /// Packages with a scikit-build native extension, which need `SKBUILD_CMAKE_ARGS`.
    pub native_extension: bool,
}

pub fn package_for(target: BuildTarget) -> Option<PythonPackage> {
    let package = match target {
        BuildTarget::Pylibcugraph => PythonPackage {
            root: "pylibcugraph",
            projects: &["pylibcugraph"],
            native_extension: true,
        },
        BuildTarget::Cugraph => PythonPackage {
            root: "cugraph",
            projects: &["cugraph"],
            native_extension: true,
        },
        BuildTarget::CugraphService => PythonPackage {
            root: "cugraph-service",
            projects: &["cugraph-service/client", "cugraph-service/server"],
            native_extension: false,
        },
        BuildTarget::CugraphPyg => PythonPackage {
            root: "cugraph-pyg",
            projects: &["cugraph-pyg"],
            native_extension: false,
        },
        BuildTarget::CugraphDgl => PythonPackage {
            root: "cugraph-dgl",
            projects: &["cugraph-dgl"],
            native_extension: false,
        },
        BuildTarget::Libcugraph | BuildTarget::LibcugraphEtl => return None,
    };
    Some(package)
}

pub fn pip() -> CommandSpec {
    CommandSpec::new(PYTHON).args(["-m", "pip"])
}

pub fn install_commands(package: &PythonPackage, config: &BuildConfig) -> Vec<CommandSpec> {
    let python_root = config.paths.python_root();
    package
        .projects
        .iter()
        .map(|project| {
            let mut cmd = pip().args([
                "install",
                "--no-build-isolation",
                "--no-deps",
                "--config-settings",
                "rapidsai.disable-cuda=true",
            ]);
            if config.python_develop {
                cmd = cmd.arg("-e");
            }
            if package.native_extension {
                cmd = cmd.env("SKBUILD_CMAKE_ARGS", config.skbuild_cmake_args());
            }
            cmd.arg_path(&python_root.join(project))
                .current_dir(&config.paths.repo_root)
        })
        .collect()
}

pub fn build(target: BuildTarget, config: &BuildConfig, runner: &dyn Runner) -> Result<()> {
    let Some(package) = package_for(target) else {
        return Ok(());
    };
    if config.clean_targets {
        clean::clean_python_dir(&config.paths.python_root().join(package.root));
        return Ok(());
    }
    println!("🐍 Installing {target}...");
    for cmd in install_commands(&package, config) {
        runner.run(&cmd)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Invocation, Token};
    use crate::config::Environment;
    use crate::util::process::testing::RecordingRunner;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn config(tokens: &[Token]) -> BuildConfig {
        BuildConfig::resolve(
            &Invocation::new(tokens.iter().copied()),
            &Environment::default(),
            PathBuf::from("/repo"),
        )
        .unwrap()
    }

    #[test]
    fn test_native_extension_gets_skbuild_args() {
        let package = package_for(BuildTarget::Cugraph).unwrap();
        let cmds = install_commands(&package, &config(&[]));
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            cmds[0].env,
            vec![(
                "SKBUILD_CMAKE_ARGS".to_string(),
                "-DFIND_CUGRAPH_CPP=ON".to_string()
            )]
        );
        assert_eq!(cmds[0].args.last().unwrap(), "/repo/python/cugraph");
        assert!(!cmds[0].has_arg("-e"));
    }

    #[test]
    fn test_pydevelop_installs_editable() {
        let package = package_for(BuildTarget::Pylibcugraph).unwrap();
        let cmds = install_commands(&package, &config(&[Token::PyDevelop]));
        assert!(cmds[0].has_arg("-e"));
    }

    #[test]
    fn test_service_installs_client_then_server() {
        let runner = RecordingRunner::default();
        build(BuildTarget::CugraphService, &config(&[]), &runner).unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].env.is_empty());
        assert!(calls[0].has_arg("/repo/python/cugraph-service/client"));
        assert!(calls[1].has_arg("/repo/python/cugraph-service/server"));
    }

    #[test]
    fn test_native_targets_are_not_python() {
        assert!(package_for(BuildTarget::Libcugraph).is_none());
        assert!(package_for(BuildTarget::LibcugraphEtl).is_none());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_clean_missing_package_dir_is_quiet() {
        let repo = tempfile::tempdir().unwrap();
        let cfg = BuildConfig::resolve(
            &Invocation::new([Token::CleanTarget, Token::CugraphDgl]),
            &Environment::default(),
            repo.path().to_path_buf(),
        )
        .unwrap();
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let runner = RecordingRunner::default();

        tracing::subscriber::with_default(subscriber, || {
            build(BuildTarget::CugraphDgl, &cfg, &runner).unwrap();
        });

        assert!(runner.calls().is_empty());
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(!output.contains("WARN"), "unexpected warning: {output}");
    }

    #[test]
    fn test_no_install_does_not_affect_python() {
        let runner = RecordingRunner::default();
        build(BuildTarget::Cugraph, &config(&[Token::NoInstall]), &runner).unwrap();
        assert_eq!(runner.calls().len(), 1);
    }
}
