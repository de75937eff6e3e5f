//! Test harness utilities: recording hooks, scripted servers, and event
//! builders.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use x11rb::protocol::Event;
use x11rb::protocol::xproto::ClientMessageEvent;

use mullion_config::Config;

use crate::control::{ControlAtoms, ControlMessage};
use crate::dispatch::EventSink;
use crate::display::{DisplayError, DisplayServer, ScreenFacts};
use crate::lifecycle::{HookError, Subsystem};
use crate::process::ConfigSource;
use crate::state::RunState;

/// Atom standing in for `_MULLION_RESTART` in tests.
pub const TEST_RESTART_ATOM: u32 = 401;

/// Atom standing in for `_MULLION_EXIT` in tests.
pub const TEST_EXIT_ATOM: u32 = 402;

/// Control atoms used by scripted dispatch.
pub fn test_atoms() -> ControlAtoms {
    ControlAtoms {
        restart: TEST_RESTART_ATOM,
        exit: TEST_EXIT_ATOM,
    }
}

/// Screen facts for a fake 1280x800 display.
pub fn test_facts() -> ScreenFacts {
    ScreenFacts {
        screen: 0,
        root: 1,
        width: 1280,
        height: 800,
        depth: 24,
        visual: 32,
        colormap: 33,
        colormap_capacity: 1,
        have_shape: true,
    }
}

/// Shared, ordered log of calls observed by the test doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("call log poisoned").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("call log poisoned").clone()
    }
}

/// Observable state of a recording hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookState {
    /// Number of initialize calls over the hook's lifetime.
    pub generation: u32,
    /// Whether internal state currently exists.
    pub created: bool,
    /// Whether the hook is currently wired to the connection.
    pub wired: bool,
}

/// Instrumented stand-in for a subsystem hook.
pub struct RecordingSubsystem {
    name: &'static str,
    log: CallLog,
    state: Arc<Mutex<HookState>>,
    fail_startup: bool,
}

impl RecordingSubsystem {
    pub fn new(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            state: Arc::new(Mutex::new(HookState::default())),
            fail_startup: false,
        }
    }

    /// A hook whose startup always fails.
    pub fn failing(name: &'static str, log: CallLog) -> Self {
        Self {
            fail_startup: true,
            ..Self::new(name, log)
        }
    }

    /// Handle observing the hook's state from outside the registry.
    pub fn state(&self) -> Arc<Mutex<HookState>> {
        Arc::clone(&self.state)
    }
}

impl Subsystem for RecordingSubsystem {
    fn name(&self) -> &'static str {
        self.name
    }

    fn initialize(&mut self) {
        self.log.record(format!("{}:initialize", self.name));
        let mut state = self.state.lock().expect("hook state poisoned");
        state.generation += 1;
        state.created = true;
    }

    fn startup(&mut self, _server: &dyn DisplayServer) -> Result<(), HookError> {
        self.log.record(format!("{}:startup", self.name));
        if self.fail_startup {
            return Err(HookError {
                name: self.name,
                message: "deliberate failure".to_owned(),
            });
        }
        self.state.lock().expect("hook state poisoned").wired = true;
        Ok(())
    }

    fn shutdown(&mut self, _server: &dyn DisplayServer) {
        self.log.record(format!("{}:shutdown", self.name));
        self.state.lock().expect("hook state poisoned").wired = false;
    }

    fn destroy(&mut self) {
        self.log.record(format!("{}:destroy", self.name));
        let mut state = self.state.lock().expect("hook state poisoned");
        state.created = false;
        state.wired = false;
    }
}

/// Builds recording hooks for the given names, returning the boxed hooks
/// together with their state handles.
pub fn recording_hooks(
    names: &[&'static str],
    log: &CallLog,
) -> (Vec<Box<dyn Subsystem>>, Vec<Arc<Mutex<HookState>>>) {
    let mut hooks: Vec<Box<dyn Subsystem>> = Vec::with_capacity(names.len());
    let mut states = Vec::with_capacity(names.len());
    for &name in names {
        let hook = RecordingSubsystem::new(name, log.clone());
        states.push(hook.state());
        hooks.push(Box::new(hook));
    }
    (hooks, states)
}

/// Fake display server replaying a scripted event sequence.
pub struct ScriptedServer {
    facts: ScreenFacts,
    events: Mutex<VecDeque<Event>>,
    log: CallLog,
    fail_poll: bool,
}

impl ScriptedServer {
    pub fn new(log: CallLog) -> Self {
        Self {
            facts: test_facts(),
            events: Mutex::new(VecDeque::new()),
            log,
            fail_poll: false,
        }
    }

    pub fn with_events(log: CallLog, events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events.into()),
            ..Self::new(log)
        }
    }

    /// A server whose poll always reports a dead connection.
    pub fn failing_poll(log: CallLog) -> Self {
        Self {
            fail_poll: true,
            ..Self::new(log)
        }
    }
}

impl DisplayServer for ScriptedServer {
    fn facts(&self) -> &ScreenFacts {
        &self.facts
    }

    fn poll_event(&self) -> Result<Option<Event>, DisplayError> {
        if self.fail_poll {
            return Err(DisplayError::AlreadyManaged);
        }
        Ok(self.events.lock().expect("event queue poisoned").pop_front())
    }

    fn flush(&self) -> Result<(), DisplayError> {
        self.log.record("server:flush");
        Ok(())
    }

    fn restack_children(&self) -> Result<(), DisplayError> {
        self.log.record("server:restack");
        Ok(())
    }
}

/// Builds a 32-bit zero-payload client message carrying the given atom.
pub fn client_message(atom: u32) -> Event {
    Event::ClientMessage(ClientMessageEvent::new(
        32,
        test_facts().root,
        atom,
        [0u32; 5],
    ))
}

/// A scripted restart request.
pub fn restart_message() -> Event {
    client_message(TEST_RESTART_ATOM)
}

/// A scripted exit request.
pub fn exit_message() -> Event {
    client_message(TEST_EXIT_ATOM)
}

/// Sink that mirrors the control dispatcher while logging every dispatch.
pub struct RecordingSink {
    atoms: ControlAtoms,
    log: CallLog,
}

impl RecordingSink {
    pub fn new(log: CallLog) -> Self {
        Self {
            atoms: test_atoms(),
            log,
        }
    }
}

impl EventSink for RecordingSink {
    fn dispatch(&mut self, event: Event, state: &RunState) {
        self.log.record("sink:dispatch");
        if let Event::ClientMessage(message) = event {
            match self.atoms.classify(&message) {
                Some(ControlMessage::Restart) => state.request_restart(),
                Some(ControlMessage::Exit) => state.request_exit(),
                None => {}
            }
        }
    }
}

/// Sink that requests exit from inside every dispatch, standing in for a
/// signal delivered while a dispatch is in flight.
pub struct ExitingSink {
    log: CallLog,
}

impl ExitingSink {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl EventSink for ExitingSink {
    fn dispatch(&mut self, _event: Event, state: &RunState) {
        self.log.record("sink:dispatch");
        state.request_exit();
    }
}

/// Config source yielding a fixed configuration and counting loads.
pub struct TestConfigSource {
    config: Config,
    loads: AtomicUsize,
}

impl TestConfigSource {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Default for TestConfigSource {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConfigSource for TestConfigSource {
    fn load(&self, _path: &Path) -> Config {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.config.clone()
    }
}
