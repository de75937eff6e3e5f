//! Four-phase subsystem lifecycle orchestration.
//!
//! Every subsystem participates in four phases per restart cycle:
//! initialize (no connection dependency), startup (wires state to the live
//! connection), shutdown (detaches from the connection), and destroy
//! (frees internal state). The order hooks run in within a phase is a
//! dependency contract, not a style choice — subsystems read state written
//! by earlier hooks in the same phase — so the orders are explicit tables
//! validated against the registered hooks at construction time.
//!
//! The destroy phase is contractually idempotent: the exit paths invoke it
//! once at the end of a cycle and again defensively while terminating, and
//! every hook must tolerate running on already-freed state.

use thiserror::Error;
use tracing::trace;

use crate::display::{DisplayError, DisplayServer};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// The canonical subsystem names, in declaration order.
///
/// Declaration order doubles as the initialize/destroy order; startup and
/// shutdown use their own dependency-derived tables below.
pub const SUBSYSTEM_NAMES: &[&str] = &[
    "border",
    "client",
    "clock",
    "color",
    "command",
    "cursor",
    "desktop",
    "dialog",
    "dock",
    "font",
    "group",
    "hint",
    "icon",
    "key",
    "outline",
    "pager",
    "placement",
    "popup",
    "root-menu",
    "screen",
    "swallow",
    "taskbar",
    "timing",
    "tray",
    "tray-button",
];

/// Startup order. Command state first so later hooks can register startup
/// commands; colors before everything that renders (icons, fonts, borders);
/// tray components before the tray that docks them; clients late so every
/// decoration dependency exists; placement after clients.
pub const STARTUP_ORDER: &[&str] = &[
    "command",
    "screen",
    "group",
    "color",
    "icon",
    "font",
    "cursor",
    "outline",
    "pager",
    "swallow",
    "clock",
    "taskbar",
    "tray-button",
    "dock",
    "tray",
    "key",
    "desktop",
    "hint",
    "border",
    "client",
    "placement",
    "timing",
    "dialog",
    "popup",
    "root-menu",
];

/// Shutdown order. Outline rendering goes down before the dialogs that may
/// still reference it; interactive surfaces before the state they present;
/// clients before the visuals they borrow; command state last.
pub const SHUTDOWN_ORDER: &[&str] = &[
    "outline",
    "dialog",
    "popup",
    "key",
    "pager",
    "root-menu",
    "dock",
    "tray",
    "tray-button",
    "taskbar",
    "swallow",
    "clock",
    "border",
    "client",
    "icon",
    "cursor",
    "font",
    "color",
    "group",
    "desktop",
    "placement",
    "hint",
    "timing",
    "screen",
    "command",
];

/// One of the four lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Creates subsystem-internal state; no connection available.
    Initialize,
    /// Wires subsystem state to the live connection.
    Startup,
    /// Detaches subsystem state from the connection.
    Shutdown,
    /// Frees subsystem-internal state; idempotent.
    Destroy,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error reported by a startup hook.
#[derive(Debug, Error)]
#[error("subsystem '{name}' failed to start: {message}")]
pub struct HookError {
    /// Name of the failing subsystem.
    pub name: &'static str,
    /// What went wrong, in the subsystem's words.
    pub message: String,
}

/// Errors surfaced by the startup phase.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A startup hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),
    /// Restoring the stacking order after the hooks failed.
    #[error("failed to restore stacking order: {0}")]
    Restack(#[from] DisplayError),
}

/// A named unit participating in the four-phase lifecycle.
///
/// All four callbacks are optional; the defaults do nothing. `destroy` must
/// be idempotent: it may run more than once per cycle and must tolerate
/// already-freed state.
pub trait Subsystem {
    /// Stable name used by the phase-order tables.
    fn name(&self) -> &'static str;

    /// Creates internal state. Runs before any connection-dependent setup
    /// and must not assume a live connection.
    fn initialize(&mut self) {}

    /// Wires internal state to the live connection.
    fn startup(&mut self, server: &dyn DisplayServer) -> Result<(), HookError> {
        let _ = server;
        Ok(())
    }

    /// Detaches internal state from the connection. Must be safe to run
    /// even if startup partially failed.
    fn shutdown(&mut self, server: &dyn DisplayServer) {
        let _ = server;
    }

    /// Frees internal state. Must be idempotent.
    fn destroy(&mut self) {}
}

/// The four per-phase order tables.
#[derive(Debug, Clone, Copy)]
pub struct PhaseOrders {
    /// Order for the initialize phase.
    pub initialize: &'static [&'static str],
    /// Order for the startup phase.
    pub startup: &'static [&'static str],
    /// Order for the shutdown phase.
    pub shutdown: &'static [&'static str],
    /// Order for the destroy phase.
    pub destroy: &'static [&'static str],
}

impl PhaseOrders {
    /// The canonical orders for the built-in subsystem set.
    pub fn canonical() -> Self {
        Self {
            initialize: SUBSYSTEM_NAMES,
            startup: STARTUP_ORDER,
            shutdown: SHUTDOWN_ORDER,
            destroy: SUBSYSTEM_NAMES,
        }
    }
}

/// Errors detected while validating the hook registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two hooks were registered under the same name.
    #[error("duplicate subsystem '{name}'")]
    DuplicateHook {
        /// The repeated name.
        name: &'static str,
    },
    /// An order table names a subsystem that is not registered.
    #[error("{phase} order names unknown subsystem '{name}'")]
    UnknownName {
        /// Phase whose table is invalid.
        phase: Phase,
        /// The unknown name.
        name: &'static str,
    },
    /// An order table omits a registered subsystem.
    #[error("{phase} order omits subsystem '{name}'")]
    MissingName {
        /// Phase whose table is invalid.
        phase: Phase,
        /// The omitted name.
        name: &'static str,
    },
    /// An order table lists a subsystem twice.
    #[error("{phase} order repeats subsystem '{name}'")]
    RepeatedName {
        /// Phase whose table is invalid.
        phase: Phase,
        /// The repeated name.
        name: &'static str,
    },
}

/// Runs the four phases over a validated hook registry.
pub struct Orchestrator {
    hooks: Vec<Box<dyn Subsystem>>,
    initialize_sequence: Vec<usize>,
    startup_sequence: Vec<usize>,
    shutdown_sequence: Vec<usize>,
    destroy_sequence: Vec<usize>,
}

impl Orchestrator {
    /// Validates the hooks against the order tables and builds the runner.
    ///
    /// Each table must be exactly a permutation of the registered hook
    /// names; anything else is a wiring bug reported as a [`RegistryError`].
    pub fn new(hooks: Vec<Box<dyn Subsystem>>, orders: PhaseOrders) -> Result<Self, RegistryError> {
        let names: Vec<&'static str> = hooks.iter().map(|hook| hook.name()).collect();
        for (position, &name) in names.iter().enumerate() {
            if names[..position].contains(&name) {
                return Err(RegistryError::DuplicateHook { name });
            }
        }
        Ok(Self {
            initialize_sequence: resolve(&names, orders.initialize, Phase::Initialize)?,
            startup_sequence: resolve(&names, orders.startup, Phase::Startup)?,
            shutdown_sequence: resolve(&names, orders.shutdown, Phase::Shutdown)?,
            destroy_sequence: resolve(&names, orders.destroy, Phase::Destroy)?,
            hooks,
        })
    }

    /// Builds a runner over the canonical order tables.
    pub fn canonical(hooks: Vec<Box<dyn Subsystem>>) -> Result<Self, RegistryError> {
        Self::new(hooks, PhaseOrders::canonical())
    }

    /// Runs the initialize phase. Once per cycle, before any
    /// connection-dependent setup.
    pub fn run_initialize(&mut self) {
        for position in 0..self.initialize_sequence.len() {
            let index = self.initialize_sequence[position];
            trace_hook(Phase::Initialize, self.hooks[index].name());
            self.hooks[index].initialize();
        }
    }

    /// Runs the startup phase, then reasserts the stacking order.
    ///
    /// Subsystems may change stacking while wiring themselves up; the
    /// trailing restack guarantees the server reflects a consistent order
    /// before the event loop starts.
    pub fn run_startup(&mut self, server: &dyn DisplayServer) -> Result<(), StartupError> {
        for position in 0..self.startup_sequence.len() {
            let index = self.startup_sequence[position];
            trace_hook(Phase::Startup, self.hooks[index].name());
            self.hooks[index].startup(server)?;
        }
        server.restack_children()?;
        server.flush()?;
        Ok(())
    }

    /// Runs the shutdown phase. Safe to run after a partial startup.
    pub fn run_shutdown(&mut self, server: &dyn DisplayServer) {
        for position in 0..self.shutdown_sequence.len() {
            let index = self.shutdown_sequence[position];
            trace_hook(Phase::Shutdown, self.hooks[index].name());
            self.hooks[index].shutdown(server);
        }
    }

    /// Runs the destroy phase. Idempotent: invoked once per cycle and
    /// again on the terminating paths.
    pub fn run_destroy(&mut self) {
        for position in 0..self.destroy_sequence.len() {
            let index = self.destroy_sequence[position];
            trace_hook(Phase::Destroy, self.hooks[index].name());
            self.hooks[index].destroy();
        }
    }
}

fn trace_hook(phase: Phase, name: &'static str) {
    trace!(target: LIFECYCLE_TARGET, %phase, subsystem = name, "running hook");
}

fn resolve(
    names: &[&'static str],
    table: &'static [&'static str],
    phase: Phase,
) -> Result<Vec<usize>, RegistryError> {
    let mut sequence = Vec::with_capacity(table.len());
    let mut seen = vec![false; names.len()];
    for &name in table {
        let index = names
            .iter()
            .position(|&candidate| candidate == name)
            .ok_or(RegistryError::UnknownName { phase, name })?;
        if seen[index] {
            return Err(RegistryError::RepeatedName { phase, name });
        }
        seen[index] = true;
        sequence.push(index);
    }
    if let Some(index) = seen.iter().position(|&covered| !covered) {
        return Err(RegistryError::MissingName {
            phase,
            name: names[index],
        });
    }
    Ok(sequence)
}
