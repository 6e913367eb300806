//! CLI definitions for the `hierconf` binary.
//!
//! Everything after a bare `--` on the command line is split off before clap
//! sees it and becomes the input of the argv source.

use crate::format::FileFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// File format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for FileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => FileFormat::Json,
            FormatArg::Yaml => FileFormat::Yaml,
        }
    }
}

/// Layered configuration lookup: argv > env > file
#[derive(Parser, Debug)]
#[command(name = "hierconf", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/hierconf/config.json)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// File format (default: by extension)
    #[arg(long, value_enum, global = true)]
    pub format: Option<FormatArg>,

    /// Separator that nests environment variable names (e.g. "__")
    #[arg(long, global = true)]
    pub env_separator: Option<String>,

    /// Only read environment variables matching this pattern
    #[arg(long, global = true)]
    pub env_match: Option<String>,

    /// Key separator for lookups
    #[arg(short, long, default_value = ":", global = true)]
    pub separator: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged value at KEY as JSON
    Get { key: String },

    /// Set KEY in the config file and save it
    Set {
        key: String,
        value: String,

        /// Parse VALUE as JSON instead of storing a string
        #[arg(long)]
        json: bool,
    },

    /// Remove KEY from the config file and save it
    Delete { key: String },

    /// Print the whole merged configuration
    Dump,
}

/// Split raw process arguments at the first bare `--`.
///
/// Returns the arguments for clap and the tokens for the argv source.
pub fn split_passthrough<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let own: Vec<String> = args.by_ref().take_while(|a| a != "--").collect();
    (own, args.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_passthrough() {
        let (own, rest) = split_passthrough(strings(&[
            "hierconf", "get", "db:host", "--", "--db:host", "x",
        ]));
        assert_eq!(own, ["hierconf", "get", "db:host"]);
        assert_eq!(rest, ["--db:host", "x"]);

        let (own, rest) = split_passthrough(strings(&["hierconf", "dump"]));
        assert_eq!(own, ["hierconf", "dump"]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::try_parse_from(["hierconf", "--format", "yaml", "set", "a:b", "1", "--json"])
            .unwrap();
        assert_eq!(cli.format, Some(FormatArg::Yaml));
        assert_eq!(cli.log, "2");
        match cli.command {
            Command::Set { key, value, json } => {
                assert_eq!(key, "a:b");
                assert_eq!(value, "1");
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hierconf", "get", "x", "-v", "--env-separator", "__"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.env_separator.as_deref(), Some("__"));
        assert_eq!(cli.separator, ":");
    }
}
