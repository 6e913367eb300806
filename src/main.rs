//! hierconf
//!
//! Reads a key from layered configuration (argv > env > file), or edits the
//! config file in place.

use anyhow::{Context, Result, bail};
use clap::Parser;
use hierconf::cli::{Cli, Command, split_passthrough};
use hierconf::logging::{self, LogOutput};
use hierconf::{ArgvOptions, EnvOptions, FileOptions, Hierarchy};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

const FILE_SOURCE: &str = "file";

fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(dir.join("hierconf").join("config.json"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let (args, passthrough) = split_passthrough(std::env::args());
    let cli = Cli::parse_from(args);

    logging::init(cli.verbose, &LogOutput::parse(&cli.log))?;

    let path = match cli.file {
        Some(path) => path,
        None => default_config_path()?,
    };

    let mut env = EnvOptions::default();
    if let Some(sep) = &cli.env_separator {
        env = env.separator(sep.clone());
    }
    if let Some(pattern) = &cli.env_match {
        env = env.match_pattern(pattern)?;
    }

    let mut file = FileOptions::new(&path);
    if let Some(format) = cli.format {
        file = file.format(format.into());
    }

    let mut config = Hierarchy::new().with_separator(cli.separator.clone());
    config
        .argv_from(ArgvOptions::default().separator(cli.separator.clone()), passthrough)?
        .env(env)?
        .file_with(FILE_SOURCE, file)?;
    config.load()?;
    debug!(sources = ?config.names(), path = %path.display(), "Hierarchy loaded");

    match cli.command {
        Command::Get { key } => match config.get(&key)? {
            Some(value) => print_json(value)?,
            None => bail!("Key not found: {key}"),
        },
        Command::Set { key, value, json } => {
            let value = if json {
                serde_json::from_str(&value)
                    .with_context(|| format!("Value for '{key}' is not valid JSON"))?
            } else {
                Value::String(value)
            };
            config.set_in(FILE_SOURCE, &key, value)?;
            config.save_source(FILE_SOURCE)?;
        }
        Command::Delete { key } => {
            if !config.delete_in(FILE_SOURCE, &key)? {
                warn!(key = %key, "Key not present");
            }
            config.save_source(FILE_SOURCE)?;
        }
        Command::Dump => {
            let snapshot = config.snapshot()?;
            print_json(&snapshot)?;
        }
    }

    Ok(())
}
