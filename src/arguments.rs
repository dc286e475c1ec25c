use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;

/// Which write pattern to render with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default)]
pub enum Format {
    #[default]
    Dev,
    Prod,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Dev => f.write_str("dev"),
            Format::Prod => f.write_str("prod"),
        }
    }
}

/// Value of `--bump` that only increments the auto fields.
pub const AUTO_BUMP: &str = "auto";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Command line tool to automate version bumping",
    bin_name = "vbump"
)]
pub struct Arguments {
    /// Print the current version in 'dev' [default] or 'prod' format
    #[arg(long, short = 'c', value_enum, ignore_case = true, num_args = 0..=1, default_missing_value = "dev")]
    pub current_version: Option<Format>,
    /// Bump the given field [default: the auto fields only]
    #[arg(long, short, value_name = "FIELD", num_args = 0..=1, default_missing_value = AUTO_BUMP)]
    pub bump: Option<String>,
    /// Write the version into the [write] files in 'dev' [default] or 'prod' format
    #[arg(long, short, value_enum, ignore_case = true, num_args = 0..=1, default_missing_value = "dev")]
    pub write: Option<Format>,
    /// Report what would change without saving the config or rewriting files
    #[arg(long, short)]
    pub dry_run: bool,
    /// Perform all actions without status output
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,
    /// Print an example config file to stdout and exit
    #[arg(long, short)]
    pub init: bool,
    /// Config file holding the current version
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    #[arg(long, short)]
    pub verbose: bool,
}

impl Arguments {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Off
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// The field named by `--bump`, or `None` for an auto-only bump.
    ///
    /// `auto` is only taken literally when the record has a field of that name.
    pub fn bump_field<'a>(&'a self, fields: &[String]) -> Option<&'a str> {
        let requested = self.bump.as_deref()?;
        if requested == AUTO_BUMP && !fields.iter().any(|field| field == AUTO_BUMP) {
            return None;
        }
        Some(requested)
    }
}
