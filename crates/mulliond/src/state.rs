//! Process-wide run flags shared by the lifecycle core.
//!
//! The original design kept these as three loose globals; here they form one
//! explicit structure handed by reference to the orchestrator, the event
//! loop, and the control-message dispatcher. Single-writer rules: the signal
//! handler writes the exit flag only, the control dispatcher writes the two
//! request flags, and connection startup writes the initializing flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop/restart flags for the daemon run.
#[derive(Debug)]
pub struct RunState {
    exit_requested: Arc<AtomicBool>,
    restart_requested: AtomicBool,
    initializing: AtomicBool,
}

impl RunState {
    /// Creates a fresh state with no requests pending.
    pub fn new() -> Self {
        Self {
            exit_requested: Arc::new(AtomicBool::new(false)),
            restart_requested: AtomicBool::new(false),
            initializing: AtomicBool::new(false),
        }
    }

    /// Shared handle to the exit flag, for signal-handler registration.
    ///
    /// The handler sets this flag and performs no other work; teardown
    /// happens synchronously once the event loop observes it.
    pub fn exit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exit_requested)
    }

    /// Requests a cooperative stop of the event loop.
    pub fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }

    /// Requests an in-place restart: the event loop stops and the restart
    /// loop runs another cycle against the live connection.
    pub fn request_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
        self.exit_requested.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    /// True once an in-place restart has been requested.
    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }

    /// Clears both request flags at the top of a restart cycle.
    pub fn begin_cycle(&self) {
        self.exit_requested.store(false, Ordering::SeqCst);
        self.restart_requested.store(false, Ordering::SeqCst);
    }

    /// Marks the start of connection startup.
    ///
    /// Invariant: the flag is true only while the connection session is
    /// being established and never overlaps event-loop execution.
    pub fn begin_initializing(&self) {
        self.initializing.store(true, Ordering::SeqCst);
    }

    /// Marks the end of connection startup.
    pub fn end_initializing(&self) {
        self.initializing.store(false, Ordering::SeqCst);
    }

    /// True while the connection session is being established.
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
