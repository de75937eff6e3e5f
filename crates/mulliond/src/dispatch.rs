//! Event dispatch seam and the built-in control dispatcher.
//!
//! Turning raw protocol events into semantic window-management actions is
//! the job of the subsystem dispatchers, which plug in through
//! [`EventSink`]. The lifecycle core ships [`ControlDispatcher`], which
//! covers the part of dispatch the core owns: recognizing control messages
//! addressed to the root window and logging protocol errors.

use tracing::{debug, info, trace, warn};
use x11rb::protocol::Event;

use crate::control::{ControlAtoms, ControlMessage};
use crate::state::RunState;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Receives every event taken off the connection by the event loop.
pub trait EventSink {
    /// Handles one event. Runs on the single control thread; never
    /// concurrently with lifecycle phases.
    fn dispatch(&mut self, event: Event, state: &RunState);
}

/// Dispatcher handling the events the lifecycle core owns.
#[derive(Debug, Clone, Copy)]
pub struct ControlDispatcher {
    atoms: ControlAtoms,
}

impl ControlDispatcher {
    /// Builds a dispatcher recognizing the given control atoms.
    pub fn new(atoms: ControlAtoms) -> Self {
        Self { atoms }
    }
}

impl EventSink for ControlDispatcher {
    fn dispatch(&mut self, event: Event, state: &RunState) {
        match event {
            Event::ClientMessage(message) => match self.atoms.classify(&message) {
                Some(ControlMessage::Restart) => {
                    info!(target: DISPATCH_TARGET, "restart requested by control message");
                    state.request_restart();
                }
                Some(ControlMessage::Exit) => {
                    info!(target: DISPATCH_TARGET, "exit requested by control message");
                    state.request_exit();
                }
                None => {
                    debug!(
                        target: DISPATCH_TARGET,
                        message_type = message.type_,
                        window = message.window,
                        "ignoring unrecognized client message"
                    );
                }
            },
            Event::Error(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error_kind = ?error.error_kind,
                    major_opcode = error.major_opcode,
                    bad_value = error.bad_value,
                    "X protocol error"
                );
            }
            other => {
                trace!(target: DISPATCH_TARGET, event = ?other, "event outside core dispatch");
            }
        }
    }
}
