//! Test suites for the mullion lifecycle core.

mod process_behaviour;
mod support;
