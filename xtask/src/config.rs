//! Build configuration: hardcoded defaults, then environment, then flags.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::{Invocation, Token};

/// Snapshot of the process environment taken once at startup.
///
/// Values are kept as `OsString` so path overrides survive non-UTF-8 bytes.
/// Empty values count as unset, matching `${VAR:=default}` semantics.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    vars: BTreeMap<String, OsString>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v)))
                .collect(),
        }
    }

    fn raw(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .get(key)
            .map(OsString::as_os_str)
            .filter(|value| !value.is_empty())
    }

    /// A text-valued variable. A set value that is not UTF-8 is an error.
    pub fn get(&self, key: &str) -> Result<Option<&str>> {
        self.raw(key)
            .map(|value| {
                value
                    .to_str()
                    .with_context(|| format!("{key} is not valid UTF-8: {}", value.to_string_lossy()))
            })
            .transpose()
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.raw(key).map(PathBuf::from)
    }
}

impl<K: Into<String>, V: Into<OsString>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BuildType {
    Release,
    Debug,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => f.write_str("Release"),
            Self::Debug => f.write_str("Debug"),
        }
    }
}

/// Directories the stages read and write.
#[derive(Clone, Debug, Serialize)]
pub struct BuildPaths {
    pub repo_root: PathBuf,
    pub libcugraph_build: PathBuf,
    pub libcugraph_etl_build: PathBuf,
}

impl BuildPaths {
    pub fn resolve(repo_root: PathBuf, env: &Environment) -> Self {
        let libcugraph_build = env
            .get_path("LIBCUGRAPH_BUILD_DIR")
            .unwrap_or_else(|| repo_root.join("cpp/build"));
        let libcugraph_etl_build = env
            .get_path("LIBCUGRAPH_ETL_BUILD_DIR")
            .unwrap_or_else(|| repo_root.join("cpp/libcugraph_etl/build"));
        Self {
            repo_root,
            libcugraph_build,
            libcugraph_etl_build,
        }
    }

    /// Every directory the `clean` target empties.
    pub fn build_dirs(&self) -> [&Path; 2] {
        [&self.libcugraph_build, &self.libcugraph_etl_build]
    }

    pub fn cpp_source(&self) -> PathBuf {
        self.repo_root.join("cpp")
    }

    pub fn etl_source(&self) -> PathBuf {
        self.repo_root.join("cpp/libcugraph_etl")
    }

    pub fn python_root(&self) -> PathBuf {
        self.repo_root.join("python")
    }

    pub fn docs_root(&self) -> PathBuf {
        self.repo_root.join("docs/cugraph")
    }

    pub fn doxygen_xml(&self) -> PathBuf {
        self.repo_root.join("cpp/doxygen/xml")
    }
}

/// Resolved settings shared by every stage. Never mutated after [`BuildConfig::resolve`].
#[derive(Clone, Debug, Serialize)]
pub struct BuildConfig {
    pub paths: BuildPaths,
    pub build_type: BuildType,
    pub verbose: bool,
    pub install: bool,
    pub cpp_tests: bool,
    pub cpp_mg_tests: bool,
    pub cpp_mtmg_tests: bool,
    pub all_gpu_arch: bool,
    pub cuda_architectures: String,
    pub with_cugraphops: bool,
    pub ninja_generator: bool,
    pub clean_targets: bool,
    pub python_develop: bool,
    pub parallel_level: usize,
    pub install_prefix: Option<PathBuf>,
    pub cxx11_abi: bool,
    pub extra_cmake_args: String,
}

impl BuildConfig {
    pub fn resolve(invocation: &Invocation, env: &Environment, repo_root: PathBuf) -> Result<Self> {
        let mut config = Self::defaults(BuildPaths::resolve(repo_root, env));
        config.apply_env(env)?;
        for token in invocation.tokens() {
            config.apply_token(token);
        }
        Ok(config)
    }

    fn defaults(paths: BuildPaths) -> Self {
        Self {
            paths,
            build_type: BuildType::Release,
            verbose: false,
            install: true,
            cpp_tests: true,
            cpp_mg_tests: false,
            cpp_mtmg_tests: false,
            all_gpu_arch: false,
            cuda_architectures: "NATIVE".to_string(),
            with_cugraphops: true,
            ninja_generator: true,
            clean_targets: false,
            python_develop: false,
            parallel_level: std::thread::available_parallelism().map_or(1, usize::from),
            install_prefix: None,
            cxx11_abi: true,
            extra_cmake_args: String::new(),
        }
    }

    fn apply_env(&mut self, env: &Environment) -> Result<()> {
        self.install_prefix = ["INSTALL_PREFIX", "PREFIX", "CONDA_PREFIX"]
            .into_iter()
            .find_map(|key| env.get_path(key));

        if let Some(raw) = env.get("PARALLEL_LEVEL")? {
            let level: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("PARALLEL_LEVEL must be a positive integer, got '{raw}'"))?;
            if level == 0 {
                bail!("PARALLEL_LEVEL must be a positive integer, got '{raw}'");
            }
            self.parallel_level = level;
        }

        if let Some(raw) = env.get("BUILD_ABI")? {
            self.cxx11_abi = parse_switch("BUILD_ABI", raw)?;
        }
        if let Some(arch) = env.get("CUGRAPH_CMAKE_CUDA_ARCHITECTURES")? {
            self.cuda_architectures = arch.to_string();
        }
        if let Some(args) = env.get("EXTRA_CMAKE_ARGS")? {
            self.extra_cmake_args = args.to_string();
        }
        Ok(())
    }

    fn apply_token(&mut self, token: Token) {
        match token {
            Token::Verbose => self.verbose = true,
            Token::Debug => self.build_type = BuildType::Debug,
            Token::NoInstall => self.install = false,
            Token::AllGpuArch => {
                self.all_gpu_arch = true;
                self.cuda_architectures = "RAPIDS".to_string();
            }
            Token::SkipCppTests => self.cpp_tests = false,
            Token::WithoutCugraphOps => self.with_cugraphops = false,
            Token::CppMtmgTests => self.cpp_mtmg_tests = true,
            Token::CppMgTests | Token::All => self.cpp_mg_tests = true,
            Token::CmakeDefaultGenerator => self.ninja_generator = false,
            Token::PyDevelop => self.python_develop = true,
            Token::CleanTarget => self.clean_targets = true,
            Token::Clean
            | Token::Uninstall
            | Token::Libcugraph
            | Token::LibcugraphEtl
            | Token::Pylibcugraph
            | Token::Cugraph
            | Token::CugraphService
            | Token::CugraphPyg
            | Token::CugraphDgl
            | Token::Docs => {}
        }
    }

    /// `SKBUILD_CMAKE_ARGS` for Python packages with native extensions.
    pub fn skbuild_cmake_args(&self) -> String {
        let extra = self.extra_cmake_args.trim();
        if extra.contains("DFIND_CUGRAPH_CPP") {
            return extra.to_string();
        }
        if extra.is_empty() {
            return "-DFIND_CUGRAPH_CPP=ON".to_string();
        }
        format!("{extra} -DFIND_CUGRAPH_CPP=ON")
    }
}

pub fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

fn parse_switch(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "ON" | "1" | "TRUE" | "YES" => Ok(true),
        "OFF" | "0" | "FALSE" | "NO" => Ok(false),
        _ => bail!("{key} must be ON or OFF, got '{raw}'"),
    }
}
