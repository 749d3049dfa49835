//! Command-line vocabulary and parsing.
//!
//! `xtask` keeps the positional `build.sh` surface (`xtask clean libcugraph -g`)
//! rather than subcommands, so parsing is a lookup of each token in [`Token`].

mod types;

pub use types::{BuildTarget, Invocation, Token};

use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::Path;

const HELP_FLAGS: [&str; 2] = ["-h", "--help"];

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    Help,
    Run(Invocation),
}

/// Parse raw arguments (program name excluded).
///
/// A help flag anywhere wins over everything else, including tokens that
/// would otherwise be rejected.
pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Parsed, UsageError> {
    if args.iter().any(|arg| HELP_FLAGS.contains(&arg.as_ref())) {
        return Ok(Parsed::Help);
    }

    let tokens = args
        .iter()
        .map(|arg| {
            let arg = arg.as_ref();
            <Token as ValueEnum>::from_str(arg, false)
                .map_err(|_| UsageError::InvalidOption(arg.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Parsed::Run(Invocation::new(tokens)))
}

pub fn usage(libcugraph_build_dir: &Path) -> String {
    let mut out = String::from("xtask [<target> ...] [<flag> ...]\n where <target> is:\n");
    for token in Token::value_variants().iter().filter(|t| !t.is_flag()) {
        push_entry(&mut out, *token);
    }
    out.push_str(" and <flag> is:\n");
    for token in Token::value_variants().iter().filter(|t| t.is_flag()) {
        push_entry(&mut out, *token);
    }
    out.push_str("   -h, --help                  - print this text\n\n");
    out.push_str(
        " default action (no args) is to build and install 'libcugraph' then 'libcugraph_etl' then 'pylibcugraph' then 'cugraph' targets\n\n",
    );
    let _ = writeln!(
        out,
        " libcugraph build dir is: {}\n",
        libcugraph_build_dir.display()
    );
    out.push_str(" Set env var LIBCUGRAPH_BUILD_DIR to override libcugraph build dir.\n");
    out
}

fn push_entry(out: &mut String, token: Token) {
    if let Some(value) = token.to_possible_value() {
        let help = value.get_help().map(ToString::to_string).unwrap_or_default();
        let _ = writeln!(out, "   {:<27} - {help}", value.get_name());
    }
}
