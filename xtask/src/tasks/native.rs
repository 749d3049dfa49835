//! CMake configure/build of the native libraries.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::{on_off, BuildConfig};
use crate::tasks::clean;
use crate::util::process::{CommandSpec, Runner};

pub fn build_libcugraph(config: &BuildConfig, runner: &dyn Runner) -> Result<()> {
    let build_dir = &config.paths.libcugraph_build;
    if config.clean_targets {
        clean::clean_build_dir(build_dir);
        return Ok(());
    }
    println!("🔧 Building libcugraph ({})...", config.build_type);
    fs::create_dir_all(build_dir)
        .with_context(|| format!("Creating {}", build_dir.display()))?;
    runner.run(&configure_libcugraph(config))?;
    runner.run(&build_command(config, build_dir, install_target(config)))
}

pub fn build_libcugraph_etl(config: &BuildConfig, runner: &dyn Runner) -> Result<()> {
    let build_dir = &config.paths.libcugraph_etl_build;
    if config.clean_targets {
        clean::clean_build_dir(build_dir);
        return Ok(());
    }
    println!("🔧 Building libcugraph_etl ({})...", config.build_type);
    fs::create_dir_all(build_dir)
        .with_context(|| format!("Creating {}", build_dir.display()))?;
    runner.run(&configure_libcugraph_etl(config))?;
    runner.run(&build_command(config, build_dir, install_target(config)))
}

pub fn log_gpu_architectures(config: &BuildConfig) {
    if config.all_gpu_arch {
        info!("Building for *ALL* supported GPU architectures...");
    } else {
        info!(
            architectures = %config.cuda_architectures,
            "Building for the architecture of the GPU in the system..."
        );
    }
}

pub fn configure_libcugraph(config: &BuildConfig) -> CommandSpec {
    let cmd = configure_base(config, &config.paths.libcugraph_build, &config.paths.cpp_source())
        .arg(format!("-DCMAKE_CUDA_ARCHITECTURES={}", config.cuda_architectures))
        .args(test_switches(config))
        .arg(format!("-DUSE_CUGRAPH_OPS={}", on_off(config.with_cugraphops)))
        .arg(format!("-DCMAKE_CXX11_ABI={}", on_off(config.cxx11_abi)));
    with_generator(config, cmd)
}

pub fn configure_libcugraph_etl(config: &BuildConfig) -> CommandSpec {
    let cmd = configure_base(
        config,
        &config.paths.libcugraph_etl_build,
        &config.paths.etl_source(),
    )
    .arg(format!("-DCMAKE_CUDA_ARCHITECTURES={}", config.cuda_architectures))
    .args(test_switches(config))
    .arg(format!("-DCMAKE_CXX11_ABI={}", on_off(config.cxx11_abi)))
    .arg(format!(
        "-DCMAKE_PREFIX_PATH={}",
        config.paths.libcugraph_build.display()
    ));
    with_generator(config, cmd)
}

/// Minimal configure for a docs-only build, which never compiles device code.
pub fn configure_docs(config: &BuildConfig) -> CommandSpec {
    let cmd = configure_base(config, &config.paths.libcugraph_build, &config.paths.cpp_source());
    with_generator(config, cmd)
}

pub fn build_command(config: &BuildConfig, build_dir: &Path, target: Option<&str>) -> CommandSpec {
    let mut cmd = CommandSpec::new("cmake")
        .arg("--build")
        .arg_path(build_dir)
        .arg(format!("-j{}", config.parallel_level));
    if let Some(target) = target {
        cmd = cmd.args(["--target", target]);
    }
    if config.verbose {
        cmd = cmd.arg("-v");
    }
    cmd.current_dir(build_dir)
}

fn install_target(config: &BuildConfig) -> Option<&'static str> {
    config.install.then_some("install")
}

fn configure_base(config: &BuildConfig, build_dir: &Path, source: &Path) -> CommandSpec {
    let mut cmd = CommandSpec::new("cmake")
        .arg("-B")
        .arg_path(build_dir)
        .arg("-S")
        .arg_path(source)
        .current_dir(build_dir);
    if let Some(prefix) = &config.install_prefix {
        cmd = cmd.arg(format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()));
    }
    cmd.arg(format!("-DCMAKE_BUILD_TYPE={}", config.build_type))
}

fn test_switches(config: &BuildConfig) -> [String; 3] {
    [
        format!("-DBUILD_TESTS={}", on_off(config.cpp_tests)),
        format!("-DBUILD_CUGRAPH_MG_TESTS={}", on_off(config.cpp_mg_tests)),
        format!("-DBUILD_CUGRAPH_MTMG_TESTS={}", on_off(config.cpp_mtmg_tests)),
    ]
}

fn with_generator(config: &BuildConfig, mut cmd: CommandSpec) -> CommandSpec {
    if config.ninja_generator {
        cmd = cmd.args(["-G", "Ninja"]);
    }
    if config.verbose {
        cmd = cmd.arg("--log-level=VERBOSE");
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Invocation, Token};
    use crate::config::Environment;
    use crate::util::process::testing::RecordingRunner;
    use std::path::PathBuf;

    fn config(tokens: &[Token], env: &[(&str, &str)]) -> BuildConfig {
        let env: Environment = env.iter().copied().collect();
        BuildConfig::resolve(
            &Invocation::new(tokens.iter().copied()),
            &env,
            PathBuf::from("/repo"),
        )
        .unwrap()
    }

    #[test]
    fn test_default_configure() {
        let cmd = configure_libcugraph(&config(&[], &[("PARALLEL_LEVEL", "8")]));
        assert_eq!(cmd.program, "cmake");
        assert_eq!(&cmd.args[..4], ["-B", "/repo/cpp/build", "-S", "/repo/cpp"]);
        for expected in [
            "-DCMAKE_BUILD_TYPE=Release",
            "-DCMAKE_CUDA_ARCHITECTURES=NATIVE",
            "-DBUILD_TESTS=ON",
            "-DBUILD_CUGRAPH_MG_TESTS=OFF",
            "-DBUILD_CUGRAPH_MTMG_TESTS=OFF",
            "-DUSE_CUGRAPH_OPS=ON",
            "-DCMAKE_CXX11_ABI=ON",
            "Ninja",
        ] {
            assert!(cmd.has_arg(expected), "missing {expected} in {cmd}");
        }
        assert!(!cmd.args.iter().any(|a| a.starts_with("-DCMAKE_INSTALL_PREFIX")));
        assert!(!cmd.has_arg("--log-level=VERBOSE"));
    }

    #[test]
    fn test_flags_reach_configure() {
        let cmd = configure_libcugraph(&config(
            &[
                Token::Debug,
                Token::Verbose,
                Token::AllGpuArch,
                Token::SkipCppTests,
                Token::WithoutCugraphOps,
                Token::CmakeDefaultGenerator,
            ],
            &[("INSTALL_PREFIX", "/opt/rapids")],
        ));
        for expected in [
            "-DCMAKE_INSTALL_PREFIX=/opt/rapids",
            "-DCMAKE_BUILD_TYPE=Debug",
            "-DCMAKE_CUDA_ARCHITECTURES=RAPIDS",
            "-DBUILD_TESTS=OFF",
            "-DUSE_CUGRAPH_OPS=OFF",
            "--log-level=VERBOSE",
        ] {
            assert!(cmd.has_arg(expected), "missing {expected} in {cmd}");
        }
        assert!(!cmd.has_arg("Ninja"));
    }

    #[test]
    fn test_etl_finds_libcugraph_build() {
        let cmd = configure_libcugraph_etl(&config(&[], &[]));
        assert!(cmd.has_arg("/repo/cpp/libcugraph_etl"));
        assert!(cmd.has_arg("-DCMAKE_PREFIX_PATH=/repo/cpp/build"));
        assert!(!cmd.args.iter().any(|a| a.starts_with("-DUSE_CUGRAPH_OPS")));
    }

    #[test]
    fn test_build_command() {
        let cfg = config(&[Token::Verbose], &[("PARALLEL_LEVEL", "4")]);
        let cmd = build_command(&cfg, Path::new("/b"), install_target(&cfg));
        assert_eq!(cmd.args, ["--build", "/b", "-j4", "--target", "install", "-v"]);

        let cfg = config(&[Token::NoInstall], &[("PARALLEL_LEVEL", "4")]);
        let cmd = build_command(&cfg, Path::new("/b"), install_target(&cfg));
        assert_eq!(cmd.args, ["--build", "/b", "-j4"]);
    }

    #[test]
    fn test_clean_target_runs_no_tools() {
        let repo = tempfile::tempdir().unwrap();
        let build = repo.path().join("cpp/build");
        fs::create_dir_all(build.join("CMakeFiles")).unwrap();
        let cfg = BuildConfig::resolve(
            &Invocation::new([Token::CleanTarget, Token::Libcugraph]),
            &Environment::default(),
            repo.path().to_path_buf(),
        )
        .unwrap();

        let runner = RecordingRunner::default();
        build_libcugraph(&cfg, &runner).unwrap();

        assert!(runner.calls().is_empty());
        assert!(!build.exists());
    }
}
