use clap::ValueEnum;
use std::collections::BTreeSet;
use std::fmt;

/// Every token `xtask` accepts. Anything else is an invalid option.
///
/// Variant order is significant: flag rules are applied in this order, so when
/// two tokens touch the same setting the later variant wins regardless of where
/// the tokens appeared on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Token {
    /// remove all existing build artifacts and configuration (start over)
    #[value(name = "clean")]
    Clean,

    /// uninstall libcugraph and cugraph from a prior build/install (see also -n)
    #[value(name = "uninstall")]
    Uninstall,

    /// build libcugraph.so and SG test binaries
    #[value(name = "libcugraph")]
    Libcugraph,

    /// build libcugraph_etl.so and SG test binaries
    #[value(name = "libcugraph_etl")]
    LibcugraphEtl,

    /// build the pylibcugraph Python package
    #[value(name = "pylibcugraph")]
    Pylibcugraph,

    /// build the cugraph Python package
    #[value(name = "cugraph")]
    Cugraph,

    /// build the cugraph-service client and server Python packages
    #[value(name = "cugraph-service")]
    CugraphService,

    /// build the cugraph-pyg Python package
    #[value(name = "cugraph-pyg")]
    CugraphPyg,

    /// build the cugraph-dgl Python package
    #[value(name = "cugraph-dgl")]
    CugraphDgl,

    /// build libcugraph and libcugraph_etl MG tests (adds MPI as a dependency)
    #[value(name = "cpp-mgtests")]
    CppMgTests,

    /// build libcugraph MTMG tests (adds UCX as a dependency)
    #[value(name = "cpp-mtmgtests")]
    CppMtmgTests,

    /// build the docs
    #[value(name = "docs")]
    Docs,

    /// build everything
    #[value(name = "all")]
    All,

    /// verbose build mode
    #[value(name = "-v")]
    Verbose,

    /// build for debug
    #[value(name = "-g")]
    Debug,

    /// do not install after a successful build (does not affect Python packages)
    #[value(name = "-n")]
    NoInstall,

    /// install the Python packages in editable mode
    #[value(name = "--pydevelop")]
    PyDevelop,

    /// build for all supported GPU architectures
    #[value(name = "--allgpuarch")]
    AllGpuArch,

    /// do not build the SG test binaries as part of the libcugraph and libcugraph_etl targets
    #[value(name = "--skip_cpp_tests")]
    SkipCppTests,

    /// do not build algos that require cugraph-ops
    #[value(name = "--without_cugraphops")]
    WithoutCugraphOps,

    /// use the default cmake generator instead of ninja
    #[value(name = "--cmake_default_generator")]
    CmakeDefaultGenerator,

    /// clean an individual target (to start over completely, use the clean target)
    #[value(name = "--clean")]
    CleanTarget,
}

impl Token {
    pub fn is_flag(self) -> bool {
        matches!(
            self,
            Self::Verbose
                | Self::Debug
                | Self::NoInstall
                | Self::PyDevelop
                | Self::AllGpuArch
                | Self::SkipCppTests
                | Self::WithoutCugraphOps
                | Self::CmakeDefaultGenerator
                | Self::CleanTarget
        )
    }

    /// Bare words that only tune the configuration. They do not turn off the
    /// default build the way a real target does.
    pub fn is_modifier(self) -> bool {
        matches!(self, Self::CppMgTests | Self::CppMtmgTests)
    }

    pub fn selects_work(self) -> bool {
        !self.is_flag() && !self.is_modifier()
    }

    pub fn build_target(self) -> Option<BuildTarget> {
        match self {
            Self::Libcugraph => Some(BuildTarget::Libcugraph),
            Self::LibcugraphEtl => Some(BuildTarget::LibcugraphEtl),
            Self::Pylibcugraph => Some(BuildTarget::Pylibcugraph),
            Self::Cugraph => Some(BuildTarget::Cugraph),
            Self::CugraphService => Some(BuildTarget::CugraphService),
            Self::CugraphPyg => Some(BuildTarget::CugraphPyg),
            Self::CugraphDgl => Some(BuildTarget::CugraphDgl),
            _ => None,
        }
    }
}

/// A unit of build work, in the order builds run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildTarget {
    Libcugraph,
    LibcugraphEtl,
    Pylibcugraph,
    Cugraph,
    CugraphService,
    CugraphPyg,
    CugraphDgl,
}

impl BuildTarget {
    pub const ORDER: [Self; 7] = [
        Self::Libcugraph,
        Self::LibcugraphEtl,
        Self::Pylibcugraph,
        Self::Cugraph,
        Self::CugraphService,
        Self::CugraphPyg,
        Self::CugraphDgl,
    ];

    /// What a bare `xtask` builds.
    pub const DEFAULT: [Self; 4] = [
        Self::Libcugraph,
        Self::LibcugraphEtl,
        Self::Pylibcugraph,
        Self::Cugraph,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Libcugraph => "libcugraph",
            Self::LibcugraphEtl => "libcugraph_etl",
            Self::Pylibcugraph => "pylibcugraph",
            Self::Cugraph => "cugraph",
            Self::CugraphService => "cugraph-service",
            Self::CugraphPyg => "cugraph-pyg",
            Self::CugraphDgl => "cugraph-dgl",
        }
    }

    pub fn is_native(self) -> bool {
        matches!(self, Self::Libcugraph | Self::LibcugraphEtl)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    tokens: BTreeSet<Token>,
}

impl Invocation {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn has(&self, token: Token) -> bool {
        self.tokens.contains(&token)
    }

    /// Tokens in vocabulary order.
    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().copied()
    }

    pub fn is_default_build(&self) -> bool {
        !self.tokens.iter().any(|token| token.selects_work())
    }

    pub fn wants_docs(&self) -> bool {
        self.has(Token::Docs) || self.has(Token::All)
    }

    /// Build targets this invocation selects, in execution order.
    pub fn build_targets(&self) -> Vec<BuildTarget> {
        if self.is_default_build() {
            return BuildTarget::DEFAULT.to_vec();
        }
        if self.has(Token::All) {
            return BuildTarget::ORDER.to_vec();
        }
        let selected: BTreeSet<BuildTarget> =
            self.tokens.iter().filter_map(|t| t.build_target()).collect();
        selected.into_iter().collect()
    }
}
