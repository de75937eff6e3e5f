//! Behavioural tests for the restart loop, the event loop, and signal
//! handling.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;

use signal_hook::consts::signal::SIGTERM;

use crate::display::DisplayServer;
use crate::events;
use crate::lifecycle::{Orchestrator, PhaseOrders};
use crate::process::{RunError, run_cycles};
use crate::signals;
use crate::state::RunState;

use super::support::{
    CallLog, ExitingSink, RecordingSink, ScriptedServer, TestConfigSource, client_message,
    exit_message, recording_hooks, restart_message,
};

const NAMES: &[&str] = &["alpha", "beta"];

const ORDERS: PhaseOrders = PhaseOrders {
    initialize: NAMES,
    startup: NAMES,
    shutdown: NAMES,
    destroy: NAMES,
};

const FLAG_WAIT: Duration = Duration::from_secs(2);

#[rstest]
fn restart_message_runs_a_second_cycle() {
    let log = CallLog::default();
    let (hooks, states) = recording_hooks(NAMES, &log);
    let mut orchestrator = Orchestrator::new(hooks, ORDERS).expect("test registry should validate");
    let server =
        ScriptedServer::with_events(log.clone(), vec![restart_message(), exit_message()]);
    let state = RunState::new();
    let config_source = TestConfigSource::default();
    let mut sink = RecordingSink::new(log.clone());

    let config = run_cycles(
        &server,
        &state,
        &mut orchestrator,
        &config_source,
        Path::new("/nonexistent/.mullionrc"),
        &mut sink,
    )
    .expect("run should end cleanly");

    // Two full cycles: config re-resolved and hook state rebuilt each time,
    // while the server identity never changes.
    assert_eq!(config_source.loads(), 2);
    assert_eq!(config, mullion_config::Config::default());
    for hook_state in &states {
        let snapshot = hook_state.lock().expect("hook state poisoned").clone();
        assert_eq!(snapshot.generation, 2);
        assert!(!snapshot.created);
        assert!(!snapshot.wired);
    }
    assert_eq!(server.facts(), &super::support::test_facts());
    assert_eq!(
        log.entries()
            .iter()
            .filter(|entry| *entry == "server:restack")
            .count(),
        2
    );
    assert!(state.exit_requested());
    assert!(!state.restart_requested());
}

#[rstest]
fn exit_message_ends_after_one_cycle() {
    let log = CallLog::default();
    let (hooks, states) = recording_hooks(NAMES, &log);
    let mut orchestrator = Orchestrator::new(hooks, ORDERS).expect("test registry should validate");
    let server = ScriptedServer::with_events(log.clone(), vec![exit_message()]);
    let state = RunState::new();
    let config_source = TestConfigSource::default();
    let mut sink = RecordingSink::new(log.clone());

    run_cycles(
        &server,
        &state,
        &mut orchestrator,
        &config_source,
        Path::new("/nonexistent/.mullionrc"),
        &mut sink,
    )
    .expect("run should end cleanly");

    assert_eq!(config_source.loads(), 1);
    for hook_state in &states {
        assert_eq!(
            hook_state.lock().expect("hook state poisoned").generation,
            1
        );
    }
    assert!(!state.restart_requested());
}

#[rstest]
fn failed_startup_aborts_run_with_teardown() {
    let log = CallLog::default();
    let (mut hooks, _) = recording_hooks(&["alpha"], &log);
    hooks.push(Box::new(super::support::RecordingSubsystem::failing(
        "beta",
        log.clone(),
    )));
    let mut orchestrator = Orchestrator::new(hooks, ORDERS).expect("test registry should validate");
    let server = ScriptedServer::new(log.clone());
    let state = RunState::new();
    let config_source = TestConfigSource::default();
    let mut sink = RecordingSink::new(log.clone());

    let error = run_cycles(
        &server,
        &state,
        &mut orchestrator,
        &config_source,
        Path::new("/nonexistent/.mullionrc"),
        &mut sink,
    )
    .expect_err("startup failure should abort the run");

    assert!(matches!(error, RunError::Startup(_)));
    let entries = log.entries();
    assert!(entries.contains(&"alpha:shutdown".to_owned()));
    assert!(entries.contains(&"alpha:destroy".to_owned()));
}

#[rstest]
fn dead_connection_aborts_run_with_teardown() {
    let log = CallLog::default();
    let (hooks, _) = recording_hooks(NAMES, &log);
    let mut orchestrator = Orchestrator::new(hooks, ORDERS).expect("test registry should validate");
    let server = ScriptedServer::failing_poll(log.clone());
    let state = RunState::new();
    let config_source = TestConfigSource::default();
    let mut sink = RecordingSink::new(log.clone());

    let error = run_cycles(
        &server,
        &state,
        &mut orchestrator,
        &config_source,
        Path::new("/nonexistent/.mullionrc"),
        &mut sink,
    )
    .expect_err("a dead connection should abort the run");

    assert!(matches!(error, RunError::EventLoop(_)));
    let entries = log.entries();
    assert!(entries.contains(&"alpha:shutdown".to_owned()));
    assert!(entries.contains(&"beta:destroy".to_owned()));
}

#[rstest]
fn stop_request_during_dispatch_allows_at_most_one_dispatch() {
    let log = CallLog::default();
    let server = ScriptedServer::with_events(
        log.clone(),
        vec![client_message(999), client_message(999), client_message(999)],
    );
    let state = RunState::new();
    let mut sink = ExitingSink::new(log.clone());

    events::run(&server, &mut sink, &state).expect("event loop should end cleanly");

    let dispatches = log
        .entries()
        .iter()
        .filter(|entry| *entry == "sink:dispatch")
        .count();
    assert_eq!(dispatches, 1);
}

#[rstest]
fn queued_events_behind_a_stop_are_not_dispatched() {
    let log = CallLog::default();
    let server = ScriptedServer::with_events(
        log.clone(),
        vec![client_message(999), client_message(999)],
    );
    let state = RunState::new();
    state.request_exit();
    let mut sink = RecordingSink::new(log.clone());

    events::run(&server, &mut sink, &state).expect("event loop should end cleanly");

    assert!(
        !log.entries().contains(&"sink:dispatch".to_owned()),
        "no dispatch may happen after a stop request"
    );
}

#[rstest]
fn idle_loop_observes_stop_requests() {
    let log = CallLog::default();
    let server = ScriptedServer::new(log.clone());
    let state = RunState::new();
    // Stop arrives while the loop is parked on an empty queue.
    let flag = state.exit_flag();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    let mut sink = RecordingSink::new(log.clone());
    events::run(&server, &mut sink, &state).expect("event loop should end cleanly");
    stopper.join().expect("stopper thread should finish");

    assert!(state.exit_requested());
}

#[rstest]
fn termination_signal_sets_the_exit_flag() {
    let state = RunState::new();
    signals::install(&state.exit_flag()).expect("signal handlers should install");

    signal_hook::low_level::raise(SIGTERM).expect("raising SIGTERM should succeed");

    let deadline = Instant::now() + FLAG_WAIT;
    while !state.exit_requested() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(state.exit_requested());
}
