//! Subscriber setup for the `hierconf` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. `--log` picks the writer:
//! `0`/`off`, `1`/`stdout`, `2`/`stderr` (default) or a file name (append).
//! `RUST_LOG` directives, when set, refine the level picked by `-v`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogOutput {
    pub fn parse(s: &str) -> Self {
        match s {
            "0" | "off" => LogOutput::Off,
            "1" | "stdout" => LogOutput::Stdout,
            "2" | "stderr" => LogOutput::Stderr,
            filename => LogOutput::File(PathBuf::from(filename)),
        }
    }
}

/// `DEBUG` when verbose, `INFO` otherwise.
pub fn level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::INFO }
}

/// Filter with `level` as the default directive, refined by `directives`.
pub fn env_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Install the global subscriber.
pub fn init(verbose: bool, output: &LogOutput) -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(level(verbose), directives.as_deref());
    match output {
        LogOutput::Off => {}
        LogOutput::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogOutput::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        assert_eq!(LogOutput::parse("0"), LogOutput::Off);
        assert_eq!(LogOutput::parse("off"), LogOutput::Off);
        assert_eq!(LogOutput::parse("1"), LogOutput::Stdout);
        assert_eq!(LogOutput::parse("stdout"), LogOutput::Stdout);
        assert_eq!(LogOutput::parse("2"), LogOutput::Stderr);
        assert_eq!(LogOutput::parse("stderr"), LogOutput::Stderr);
        assert_eq!(
            LogOutput::parse("hierconf.log"),
            LogOutput::File(PathBuf::from("hierconf.log"))
        );
    }

    #[test]
    fn test_level() {
        assert_eq!(level(true), Level::DEBUG);
        assert_eq!(level(false), Level::INFO);
    }

    #[test]
    fn test_env_filter_directives() {
        let default = env_filter(Level::INFO, None).to_string();
        assert!(default.contains("info"));

        let refined = env_filter(Level::INFO, Some("hierconf=debug")).to_string();
        assert!(refined.contains("hierconf=debug"));
    }

    #[test]
    fn test_off_installs_nothing() {
        assert!(init(false, &LogOutput::Off).is_ok());
    }
}
