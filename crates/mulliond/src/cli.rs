//! Command-line surface of the `mulliond` binary.
//!
//! One binary serves both roles: started bare it becomes the window
//! manager; started with a control flag it acts on a running instance and
//! exits. The modes are mutually exclusive; `--display` composes with any
//! of them.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Command-line interface for the mullion window-management daemon.
#[derive(Parser, Debug)]
#[command(
    name = "mulliond",
    about = "The mullion window-management daemon",
    disable_version_flag = true,
    group = ArgGroup::new("mode")
        .args(["version", "print_config", "restart", "exit"])
        .multiple(false)
)]
pub struct Cli {
    /// Print version information and exit.
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Resolve the configuration, print it, and exit. FILE overrides the
    /// derived rc path.
    #[arg(short = 'p', long = "print-config", value_name = "FILE")]
    pub print_config: Option<Option<PathBuf>>,

    /// Ask a running instance to restart in place, then exit.
    #[arg(long)]
    pub restart: bool,

    /// Ask a running instance to exit, then exit.
    #[arg(long)]
    pub exit: bool,

    /// Connect to the named display instead of `$DISPLAY`.
    #[arg(long, value_name = "NAME")]
    pub display: Option<String>,
}
