//! The central event-dispatch loop.
//!
//! Single-threaded and cooperative: each iteration checks the exit flag,
//! takes the next queued event, and hands it to the dispatcher. The only
//! suspension point is the wait for the next event; a stop request takes
//! effect at the next iteration boundary, never mid-dispatch. A signal
//! delivered during a dispatch is therefore honored after that dispatch
//! completes, and events still queued behind a stop request are not
//! dispatched.

use std::thread;
use std::time::Duration;

use crate::dispatch::EventSink;
use crate::display::{DisplayError, DisplayServer};
use crate::state::RunState;

/// How long to park when the event queue is empty.
///
/// Parking instead of a hard blocking wait gives the loop its
/// once-per-iteration flag checkpoint, so an asynchronous signal is
/// observed promptly even while the session is idle.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs the dispatch loop until a stop is requested.
pub fn run(
    server: &dyn DisplayServer,
    sink: &mut dyn EventSink,
    state: &RunState,
) -> Result<(), DisplayError> {
    debug_assert!(
        !state.is_initializing(),
        "event loop must not overlap connection startup"
    );
    while !state.exit_requested() {
        match server.poll_event()? {
            Some(event) => sink.dispatch(event, state),
            None => thread::sleep(IDLE_POLL_INTERVAL),
        }
    }
    Ok(())
}
