//! Process-lifecycle core of the mullion window-management daemon.
//!
//! `mulliond` owns the one connection to the X server, sequences the
//! startup and teardown of the window-management subsystems over four
//! ordered phases, runs the central event-dispatch loop, and speaks a
//! root-window client-message protocol through which a second invocation
//! of the binary can ask a running instance to restart in place or exit.
//!
//! Restart-in-place is the load-bearing design point: the connection is
//! opened once and survives any number of restart cycles, while every
//! subsystem's state is torn down and rebuilt around it. The phase orders
//! in [`lifecycle`] are dependency contracts; the destroy phase is
//! contractually idempotent because the exit paths run it defensively.
//!
//! The subsystems themselves (borders, clients, colors, ...) live outside
//! this crate and participate through the [`lifecycle::Subsystem`],
//! [`dispatch::EventSink`], and [`process::ConfigSource`] seams.

mod cli;
pub mod control;
pub mod dispatch;
pub mod display;
pub mod events;
pub mod lifecycle;
pub mod placeholder;
mod process;
pub mod signals;
pub mod state;
pub mod telemetry;

pub use control::{ControlAtoms, ControlMessage, EXIT_ATOM_NAME, RESTART_ATOM_NAME};
pub use dispatch::{ControlDispatcher, EventSink};
pub use display::{ContextKeys, Display, DisplayError, DisplayServer, ScreenFacts};
pub use lifecycle::{
    HookError, Orchestrator, Phase, PhaseOrders, RegistryError, SHUTDOWN_ORDER, STARTUP_ORDER,
    SUBSYSTEM_NAMES, StartupError, Subsystem,
};
pub use process::{ConfigSource, RunError, SystemConfigSource, run};
pub use state::RunState;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
