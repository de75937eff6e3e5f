//! Termination-signal handling.
//!
//! Signals are the only genuine asynchrony in the process. The handlers set
//! the shared exit flag and nothing else; the event loop observes the flag
//! at its next iteration boundary and all teardown runs synchronously from
//! there. `signal-hook` keeps the handlers installed across deliveries.

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::flag;

/// Installs handlers for the termination-class signals.
///
/// Each delivery of SIGTERM, SIGINT, or SIGHUP stores `true` into `exit`.
/// Handlers stay registered for the remainder of the process.
pub fn install(exit: &Arc<AtomicBool>) -> io::Result<()> {
    for signal in [SIGTERM, SIGINT, SIGHUP] {
        flag::register(signal, Arc::clone(exit))?;
    }
    Ok(())
}
