//! Top-level process control flow.
//!
//! Mode selection, the restart loop, and exit handling. The daemon path
//! opens the connection once, then repeats the four-phase cycle while
//! restarts are requested, holding the connection open throughout; the
//! utility paths never enter the loop and leave through [`terminate`].

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, ExitCode};

use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, error, info, warn};

use mullion_config::{Config, ConfigError, LogSettings};

use crate::cli::Cli;
use crate::control::{self, ControlMessage};
use crate::dispatch::{ControlDispatcher, EventSink};
use crate::display::{Display, DisplayError, DisplayServer};
use crate::events;
use crate::lifecycle::{Orchestrator, StartupError};
use crate::placeholder;
use crate::state::RunState;
use crate::telemetry;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Shell used to run the configured exit command.
const SHELL: &str = "/bin/sh";

/// Trait abstracting configuration loading for testability.
///
/// This is also the seam the external configuration parser plugs into:
/// subsystem state is populated as a side effect of the initialize hooks
/// before `load` runs and the startup hooks after.
pub trait ConfigSource {
    /// Resolves the configuration for one cycle.
    fn load(&self, path: &Path) -> Config;
}

/// Loader that reads the rc file, falling back to built-in defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigSource;

impl ConfigSource for SystemConfigSource {
    fn load(&self, path: &Path) -> Config {
        match Config::load(path) {
            Ok(config) => config,
            Err(ConfigError::Missing { .. }) => {
                debug!(
                    target: PROCESS_TARGET,
                    path = %path.display(),
                    "no rc file; using built-in defaults"
                );
                Config::default()
            }
            Err(source) => {
                warn!(
                    target: PROCESS_TARGET,
                    %source,
                    "ignoring unusable rc file; using built-in defaults"
                );
                Config::default()
            }
        }
    }
}

/// Errors that abort the daemon run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A subsystem failed to start.
    #[error("subsystem startup failed: {0}")]
    Startup(#[from] StartupError),
    /// The event loop lost the connection.
    #[error("event loop failed: {0}")]
    EventLoop(#[from] DisplayError),
}

/// Terminal action once the restart loop has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExitAction {
    /// End the process with the given status.
    Terminate(u8),
    /// Replace the process image with a shell running the command.
    Exec(String),
}

/// Selects the terminal action from the last resolved configuration.
pub(crate) fn exit_action(config: &Config) -> ExitAction {
    match &config.exit_command {
        Some(command) => ExitAction::Exec(command.clone()),
        None => ExitAction::Terminate(0),
    }
}

/// Entry point: parses the command line and runs the selected mode.
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(parse_error) => return exit_for_cli_error(&parse_error),
    };

    let mut orchestrator = match Orchestrator::canonical(placeholder::builtin_hooks()) {
        Ok(orchestrator) => orchestrator,
        Err(registry_error) => {
            eprintln!("error: invalid subsystem registry: {registry_error}");
            return ExitCode::FAILURE;
        }
    };

    // $HOME is consulted exactly once, at startup.
    let rc_path = mullion_config::config_path();

    if cli.version {
        println!("{}", about_text());
        return terminate(&mut orchestrator, 0);
    }

    if let Some(path_override) = cli.print_config {
        let path = path_override.unwrap_or(rc_path);
        return print_config(&mut orchestrator, &path);
    }

    if cli.restart {
        send_control(ControlMessage::Restart, cli.display.as_deref());
        return terminate(&mut orchestrator, 0);
    }

    if cli.exit {
        send_control(ControlMessage::Exit, cli.display.as_deref());
        return terminate(&mut orchestrator, 0);
    }

    run_daemon(cli.display.as_deref(), &mut orchestrator, &rc_path)
}

/// Runs Initialize and the config resolution, prints the result, exits.
/// Never enters the event loop.
fn print_config(orchestrator: &mut Orchestrator, path: &Path) -> ExitCode {
    init_utility_telemetry();
    orchestrator.run_initialize();
    let config = SystemConfigSource.load(path);
    match config.render() {
        Ok(rendered) => {
            print!("{rendered}");
            terminate(orchestrator, 0)
        }
        Err(render_error) => {
            eprintln!("error: {render_error}");
            terminate(orchestrator, 1)
        }
    }
}

fn run_daemon(
    display_name: Option<&str>,
    orchestrator: &mut Orchestrator,
    config_path: &Path,
) -> ExitCode {
    let boot_config = SystemConfigSource.load(config_path);
    if let Err(telemetry_error) = telemetry::initialise(&boot_config.log) {
        eprintln!("error: {telemetry_error}");
        return terminate(orchestrator, 1);
    }

    let state = RunState::new();
    let mut display = match Display::open(display_name) {
        Ok(display) => display,
        Err(open_error) => {
            println!("error: {open_error}");
            return terminate(orchestrator, 1);
        }
    };
    let atoms = match display.startup_session(&state) {
        Ok(atoms) => atoms,
        Err(session_error) => {
            println!("error: {session_error}");
            display.close();
            return terminate(orchestrator, 1);
        }
    };
    let facts = display.facts();
    info!(
        target: PROCESS_TARGET,
        root = facts.root,
        width = facts.width,
        height = facts.height,
        "managing display"
    );

    let mut sink = ControlDispatcher::new(atoms);
    let outcome = run_cycles(
        &display,
        &state,
        orchestrator,
        &SystemConfigSource,
        config_path,
        &mut sink,
    );
    display.close();

    match outcome {
        Ok(config) => perform_exit(orchestrator, &exit_action(&config)),
        Err(run_error) => {
            error!(target: PROCESS_TARGET, %run_error, "daemon run failed");
            terminate(orchestrator, 1)
        }
    }
}

/// Repeats the four-phase cycle against the live connection while
/// restarts are requested. Returns the last resolved configuration.
pub(crate) fn run_cycles(
    server: &dyn DisplayServer,
    state: &RunState,
    orchestrator: &mut Orchestrator,
    config_source: &dyn ConfigSource,
    config_path: &Path,
    sink: &mut dyn EventSink,
) -> Result<Config, RunError> {
    loop {
        state.begin_cycle();
        orchestrator.run_initialize();
        let config = config_source.load(config_path);
        if let Err(startup_error) = orchestrator.run_startup(server) {
            orchestrator.run_shutdown(server);
            orchestrator.run_destroy();
            return Err(startup_error.into());
        }
        let loop_result = events::run(server, sink, state);
        orchestrator.run_shutdown(server);
        orchestrator.run_destroy();
        loop_result.map_err(RunError::EventLoop)?;
        if !state.restart_requested() {
            return Ok(config);
        }
        info!(target: PROCESS_TARGET, "restarting in place");
    }
}

/// Runs the destroy phase defensively and yields the exit status.
///
/// Used by every utility path and as the tail of the daemon path; the
/// destroy hooks' idempotence makes the extra invocation safe.
fn terminate(orchestrator: &mut Orchestrator, code: u8) -> ExitCode {
    orchestrator.run_destroy();
    ExitCode::from(code)
}

/// Performs the terminal action of the daemon path.
fn perform_exit(orchestrator: &mut Orchestrator, action: &ExitAction) -> ExitCode {
    match action {
        ExitAction::Exec(command) => {
            info!(target: PROCESS_TARGET, command = %command, "handing off to exit command");
            let exec_error = Command::new(SHELL).arg("-c").arg(command).exec();
            warn!(
                target: PROCESS_TARGET,
                %exec_error,
                command = %command,
                "exec of exit command failed"
            );
            terminate(orchestrator, 1)
        }
        ExitAction::Terminate(code) => terminate(orchestrator, *code),
    }
}

fn send_control(message: ControlMessage, display_name: Option<&str>) {
    init_utility_telemetry();
    if let Err(send_error) = control::send(message, display_name) {
        // Best effort: no reachable server or no running instance is not a
        // failure of this invocation.
        warn!(
            target: PROCESS_TARGET,
            %send_error,
            kind = ?message,
            "control message not delivered"
        );
    }
}

fn init_utility_telemetry() {
    let _ = telemetry::initialise(&LogSettings::default());
}

fn exit_for_cli_error(parse_error: &clap::Error) -> ExitCode {
    let _ = parse_error.print();
    match parse_error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn about_text() -> String {
    format!(
        "{} v{} - the mullion window-management daemon",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}
