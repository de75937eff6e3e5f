//! Inert subsystem hooks.
//!
//! The real subsystems live outside this crate and register through
//! [`Subsystem`]. Until they are wired in, the shipped binary runs the
//! full phase machinery over inert stand-ins, one per canonical name, so
//! the orchestration paths are exercised end to end.

use crate::lifecycle::{SUBSYSTEM_NAMES, Subsystem};

/// A subsystem hook with no behavior.
#[derive(Debug, Clone, Copy)]
pub struct InertSubsystem {
    name: &'static str,
}

impl InertSubsystem {
    /// Builds an inert hook with the given name.
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Subsystem for InertSubsystem {
    fn name(&self) -> &'static str {
        self.name
    }
}

/// One inert hook per canonical subsystem name.
pub fn builtin_hooks() -> Vec<Box<dyn Subsystem>> {
    SUBSYSTEM_NAMES
        .iter()
        .map(|&name| Box::new(InertSubsystem::new(name)) as Box<dyn Subsystem>)
        .collect()
}
