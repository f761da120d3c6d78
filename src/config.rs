//! Command-line configuration.

use crate::password::DEFAULT_PBKDF2_ITERATIONS;
use clap::Parser;
use std::path::PathBuf;

/// Interactive per-user task tracker
#[derive(Parser, Debug)]
#[command(name = "tasker", author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding users.json and the per-user task files
    #[arg(short, long, env = "TASKER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Logging output: 0/off (default), 1/stdout, 2/stderr, or filename.
    /// Stdout logs are interleaved with the menus; prefer 2 or a file when
    /// running on a terminal.
    #[arg(short, long, env = "TASKER_LOG", default_value = "off")]
    pub log: String,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// PBKDF2 iterations used for newly stored passwords
    #[arg(
        long,
        env = "TASKER_PBKDF2_ITERATIONS",
        default_value_t = DEFAULT_PBKDF2_ITERATIONS,
        hide = true
    )]
    pub pbkdf2_iterations: u32,
}

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "0" | "off" => Self::Off,
            "1" | "stdout" => Self::Stdout,
            "2" | "stderr" => Self::Stderr,
            filename => Self::File(PathBuf::from(filename)),
        }
    }

    /// Whether records would land on the same screen as the menus.
    pub fn mixes_with_ui(&self, interactive: bool) -> bool {
        interactive && *self == Self::Stdout
    }
}

impl Cli {
    pub fn log_target(&self) -> LogTarget {
        LogTarget::parse(&self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plain_invocation() {
        let cli = Cli::try_parse_from(["tasker"]).unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("."));
        assert_eq!(cli.log_target(), LogTarget::Off);
        assert!(!cli.verbose);
        assert_eq!(cli.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["tasker", "-d", "/tmp/tasks", "--log", "2", "-v"]).unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(cli.log_target(), LogTarget::Stderr);
        assert!(cli.verbose);
    }

    #[test]
    fn log_target_parsing() {
        assert_eq!(LogTarget::parse("0"), LogTarget::Off);
        assert_eq!(LogTarget::parse("stdout"), LogTarget::Stdout);
        assert_eq!(LogTarget::parse("1"), LogTarget::Stdout);
        assert_eq!(
            LogTarget::parse("tasker.log"),
            LogTarget::File(PathBuf::from("tasker.log"))
        );
    }

    #[test]
    fn only_stdout_on_a_terminal_mixes_with_ui() {
        assert!(LogTarget::Stdout.mixes_with_ui(true));
        assert!(!LogTarget::Stdout.mixes_with_ui(false));
        assert!(!LogTarget::Stderr.mixes_with_ui(true));
        assert!(!LogTarget::Off.mixes_with_ui(true));
        assert!(!LogTarget::File(PathBuf::from("tasker.log")).mixes_with_ui(true));
    }
}
