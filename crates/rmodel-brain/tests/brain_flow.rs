// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

/*!
End-to-end brain runs.

These tests validate:
- Neurons run in link order and counters match the run
- Selectors route along named cast groups, including cycles
- Failures, panics and unknown destinations never wedge a run
- Shutdown is idempotent and a shut down brain starts again on entry
*/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rmodel_brain::{
    Blueprint, Brain, BrainConfig, BrainError, BrainState, CastPolicy, LinkState, ProcessorError,
    StateEvent, END_NEURON_ID,
};
use rmodel_config::LoggingConfig;
use rmodel_memory::InMemoryStore;
use rmodel_observability::{init_console_logging, CrateDebugFlags};

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

fn init_test_logging() {
    let _ = init_console_logging(&LoggingConfig::default(), &CrateDebugFlags::default());
}

fn brain_with(bp: &Blueprint, config: BrainConfig) -> Brain {
    Brain::with_parts(bp, config, Arc::new(InMemoryStore::new())).expect("Failed to build brain")
}

fn run_to_sleep(brain: &Brain) {
    brain.entry().expect("entry failed");
    assert!(brain.wait_timeout(RUN_TIMEOUT), "brain did not go back to sleep");
    assert_eq!(brain.state(), BrainState::Sleeping);
}

/// Poll `condition` until it holds or `RUN_TIMEOUT` passes
fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + RUN_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Neuron that appends its name to a shared trace
fn traced(bp: &mut Blueprint, name: &'static str, trace: &Arc<Mutex<Vec<&'static str>>>) -> String {
    let trace = Arc::clone(trace);
    bp.add_neuron_with_id(
        name,
        rmodel_brain::FnProcessor::new(move |_ctx| {
            trace.lock().push(name);
            Ok(())
        }),
    )
    .expect("Failed to add neuron")
}

#[test]
fn test_linear_flow_runs_in_order() {
    init_test_logging();
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let a = traced(&mut bp, "a", &trace);
    let b = traced(&mut bp, "b", &trace);
    bp.add_entry_link_to(&a).unwrap();
    let ab = bp.add_link(&a, &b).unwrap();
    bp.add_end_link_from(&b).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    assert_eq!(*trace.lock(), vec!["a", "b"]);
    for id in [&a, &b] {
        let status = brain.neuron_status(id).unwrap();
        assert_eq!(status.counters.processed, 1);
        assert_eq!(status.counters.succeeded, 1);
        assert_eq!(status.counters.failed, 0);
    }
    let link = brain.link_status(&ab).unwrap();
    assert_eq!(link.counters.processed, 1);
    assert_eq!(link.counters.succeeded, 1);

    let snapshot = serde_json::to_value(brain.neuron_status(&b).unwrap()).unwrap();
    assert_eq!(snapshot["counters"]["processed"], 1);

    let counts = brain.state_counts();
    assert_eq!(counts.neuron_activated, 0);
    assert_eq!(counts.link_ready, 0);
    assert_eq!(counts.link_wait, 0);
}

#[test]
fn test_processor_reads_and_writes_memory() {
    let mut bp = Blueprint::new();
    let greet = bp.add_neuron_fn(|ctx| {
        let name = ctx
            .get_memory("name")?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| ProcessorError::msg("name is not set"))?;
        ctx.set_memory("greeting", format!("Hello, {}!", name))?;
        Ok(())
    });
    bp.add_entry_link_to(&greet).unwrap();
    bp.add_end_link_from(&greet).unwrap();

    let brain = Brain::new(&bp).unwrap();
    brain.entry_with_memory([("name", "Clay Zhang")]).unwrap();
    assert!(brain.wait_timeout(RUN_TIMEOUT));

    let greeting = brain.get_memory("greeting").unwrap().unwrap();
    assert_eq!(greeting.as_str(), Some("Hello, Clay Zhang!"));
    assert_eq!(brain.neuron_status(&greet).unwrap().counters.succeeded, 1);
}

#[test]
fn test_selector_routes_to_one_branch() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let router = traced(&mut bp, "router", &trace);
    let left = traced(&mut bp, "left", &trace);
    let right = traced(&mut bp, "right", &trace);
    bp.add_entry_link_to(&router).unwrap();
    let to_left = bp.add_link(&router, &left).unwrap();
    let to_right = bp.add_link(&router, &right).unwrap();
    bp.add_cast_group(&router, "left", &[to_left.clone()]).unwrap();
    bp.add_cast_group(&router, "right", &[to_right.clone()]).unwrap();
    bp.bind_select_fn(&router, |ctx| {
        ctx.get_memory("direction")
            .ok()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "left".to_string())
    })
    .unwrap();
    bp.add_end_link_from(&left).unwrap();
    bp.add_end_link_from(&right).unwrap();

    let brain = Brain::new(&bp).unwrap();
    brain.entry_with_memory([("direction", "right")]).unwrap();
    assert!(brain.wait_timeout(RUN_TIMEOUT));

    assert_eq!(*trace.lock(), vec!["router", "right"]);
    assert_eq!(brain.link_status(&to_left).unwrap().counters.processed, 0);
    assert_eq!(brain.link_status(&to_right).unwrap().counters.processed, 1);
}

#[test]
fn test_self_loop_until_selector_stops() {
    let mut bp = Blueprint::new();
    let counter = bp.add_neuron_fn(|ctx| {
        let count = ctx.get_memory("count")?.and_then(|v| v.as_i64()).unwrap_or(0);
        ctx.set_memory("count", count + 1)?;
        Ok(())
    });
    bp.add_entry_link_to(&counter).unwrap();
    let again = bp.add_link(&counter, &counter).unwrap();
    let done = bp.add_end_link_from(&counter).unwrap();
    bp.add_cast_group(&counter, "again", &[again]).unwrap();
    bp.add_cast_group(&counter, "done", &[done]).unwrap();
    bp.bind_select_fn(&counter, |ctx| {
        let count = ctx
            .get_memory("count")
            .ok()
            .flatten()
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let group = if count < 3 { "again" } else { "done" };
        group.to_string()
    })
    .unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    assert_eq!(brain.get_memory("count").unwrap().and_then(|v| v.as_i64()), Some(3));
    assert_eq!(brain.neuron_status(&counter).unwrap().counters.processed, 3);
}

#[test]
fn test_trigger_group_waits_for_every_link() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let a = traced(&mut bp, "a", &trace);
    let b = traced(&mut bp, "b", &trace);
    let join = traced(&mut bp, "join", &trace);
    bp.add_entry_link_to(&a).unwrap();
    bp.add_entry_link_to(&b).unwrap();
    let from_a = bp.add_link(&a, &join).unwrap();
    let from_b = bp.add_link(&b, &join).unwrap();
    bp.add_trigger_group(&join, &[from_a, from_b]).unwrap();
    bp.add_end_link_from(&join).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    let trace = trace.lock();
    assert_eq!(trace.len(), 3);
    assert_eq!(trace.last(), Some(&"join"));
    assert_eq!(brain.neuron_status(&join).unwrap().counters.processed, 1);
}

#[test]
fn test_unknown_destination_does_not_stop_the_run() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let a = traced(&mut bp, "a", &trace);
    let b = traced(&mut bp, "b", &trace);
    bp.add_entry_link_to(&a).unwrap();
    let dangling = bp.add_link(&a, "missing-neuron").unwrap();
    bp.add_link(&a, &b).unwrap();
    bp.add_end_link_from(&b).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    assert_eq!(*trace.lock(), vec!["a", "b"]);
    let status = brain.link_status(&dangling).unwrap();
    assert_eq!(status.counters.failed, 1);
}

#[test]
fn test_end_neuron_is_never_dispatched() {
    let mut bp = Blueprint::new();
    let a = bp.add_neuron_fn(|_ctx| Ok(()));
    bp.add_entry_link_to(&a).unwrap();
    bp.add_end_link_from(&a).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);
    run_to_sleep(&brain);

    let end = brain.neuron_status(END_NEURON_ID).unwrap();
    assert_eq!(end.counters.processed, 0);
    assert_eq!(brain.neuron_status(&a).unwrap().counters.processed, 2);
}

#[test]
fn test_failure_casts_under_always_policy() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let failing = bp.add_neuron_fn(|_ctx| Err(ProcessorError::msg("boom")));
    let next = traced(&mut bp, "next", &trace);
    bp.add_entry_link_to(&failing).unwrap();
    bp.add_link(&failing, &next).unwrap();
    bp.add_end_link_from(&next).unwrap();

    let brain = brain_with(&bp, BrainConfig::default());
    run_to_sleep(&brain);

    let status = brain.neuron_status(&failing).unwrap();
    assert_eq!(status.counters.failed, 1);
    assert_eq!(status.counters.succeeded, 0);
    assert_eq!(*trace.lock(), vec!["next"]);
}

#[test]
fn test_failure_stops_branch_under_on_success_policy() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let failing = bp.add_neuron_fn(|_ctx| Err(ProcessorError::msg("boom")));
    let next = traced(&mut bp, "next", &trace);
    bp.add_entry_link_to(&failing).unwrap();
    let link = bp.add_link(&failing, &next).unwrap();
    bp.add_end_link_from(&next).unwrap();

    let config = BrainConfig {
        cast_policy: CastPolicy::OnSuccess,
        ..BrainConfig::default()
    };
    let brain = brain_with(&bp, config);
    run_to_sleep(&brain);

    assert!(trace.lock().is_empty());
    assert_eq!(brain.neuron_status(&failing).unwrap().counters.failed, 1);
    assert_eq!(brain.link_status(&link).unwrap().counters.processed, 0);
}

#[test]
fn test_panicking_processor_counts_as_failure() {
    let mut bp = Blueprint::new();
    let panicking = bp.add_neuron_fn(|_ctx| panic!("processor blew up"));
    bp.add_entry_link_to(&panicking).unwrap();
    bp.add_end_link_from(&panicking).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    let status = brain.neuron_status(&panicking).unwrap();
    assert_eq!(status.counters.processed, 1);
    assert_eq!(status.counters.failed, 1);
}

#[test]
fn test_recast_arms_idle_links() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut bp = Blueprint::new();
    let a = traced(&mut bp, "a", &trace);
    let b = traced(&mut bp, "b", &trace);
    bp.add_entry_link_to(&a).unwrap();
    bp.add_link(&a, &b).unwrap();
    bp.add_end_link_from(&b).unwrap();

    let config = BrainConfig {
        recast_backoff_ms: 10,
        ..BrainConfig::default()
    };
    let brain = brain_with(&bp, config);
    brain.recast(&a).unwrap();
    assert!(brain.wait_timeout(RUN_TIMEOUT));

    // a casts without running; b runs from the forced link
    assert_eq!(*trace.lock(), vec!["b"]);
    assert_eq!(brain.neuron_status(&a).unwrap().counters.processed, 0);

    assert!(matches!(
        brain.recast("nobody"),
        Err(BrainError::NeuronNotFound(id)) if id == "nobody"
    ));
}

#[test]
fn test_trig_links_rejects_unknown_link() {
    let mut bp = Blueprint::new();
    let a = bp.add_neuron_fn(|_ctx| Ok(()));
    let entry = bp.add_entry_link_to(&a).unwrap();
    bp.add_end_link_from(&a).unwrap();

    let brain = Brain::new(&bp).unwrap();
    let result = brain.trig_links(&[entry.as_str(), "no-such-link"]);
    assert!(matches!(result, Err(BrainError::LinkNotFound(_))));
    // nothing was queued, so the brain never started
    assert_eq!(brain.state(), BrainState::Shutdown);
}

#[test]
fn test_entry_without_entry_links_is_a_noop() {
    let mut bp = Blueprint::new();
    bp.add_neuron_fn(|_ctx| Ok(()));

    let brain = Brain::new(&bp).unwrap();
    brain.entry().unwrap();
    assert_eq!(brain.state(), BrainState::Shutdown);
}

#[test]
fn test_shutdown_is_idempotent_and_restart_works() {
    let mut bp = Blueprint::new();
    let a = bp.add_neuron_fn(|_ctx| Ok(()));
    bp.add_entry_link_to(&a).unwrap();
    bp.add_end_link_from(&a).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    brain.shutdown();
    assert_eq!(brain.state(), BrainState::Shutdown);
    brain.shutdown();
    assert_eq!(brain.state(), BrainState::Shutdown);
    assert_eq!(brain.wait(), BrainState::Shutdown);

    run_to_sleep(&brain);
    assert_eq!(brain.neuron_status(&a).unwrap().counters.processed, 2);
}

#[test]
fn test_request_shutdown_goes_through_the_queue() {
    let mut bp = Blueprint::new();
    let a = bp.add_neuron_fn(|_ctx| Ok(()));
    bp.add_entry_link_to(&a).unwrap();

    let brain = Brain::new(&bp).unwrap();
    brain.request_shutdown().unwrap();
    assert_eq!(brain.state(), BrainState::Shutdown);

    brain.start().unwrap();
    assert_eq!(brain.state(), BrainState::Sleeping);
    brain.request_shutdown().unwrap();

    let deadline = Instant::now() + RUN_TIMEOUT;
    while brain.state() != BrainState::Shutdown && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(brain.state(), BrainState::Shutdown);
}

#[test]
fn test_state_subscription_sees_run_and_sleep() {
    let mut bp = Blueprint::new();
    let a = bp.add_neuron_fn(|_ctx| Ok(()));
    bp.add_entry_link_to(&a).unwrap();
    bp.add_end_link_from(&a).unwrap();

    let brain = Brain::new(&bp).unwrap();
    let events = brain.subscribe_state();
    run_to_sleep(&brain);
    brain.shutdown();

    let targets: Vec<BrainState> = events
        .try_iter()
        .map(|event| match event {
            StateEvent::BrainStateChanged { to, .. } => to,
        })
        .collect();
    assert_eq!(
        targets,
        vec![
            BrainState::Sleeping,
            BrainState::Running,
            BrainState::Sleeping,
            BrainState::Shutdown
        ]
    );
}

#[test]
fn test_nested_brain_runs_inside_a_processor() {
    let mut bp = Blueprint::new();
    let outer = bp.add_neuron_fn(|ctx| {
        let mut inner_bp = Blueprint::new();
        let inner = inner_bp.add_neuron_fn(|ctx| {
            ctx.set_memory("answer", 42i64)?;
            Ok(())
        });
        inner_bp.add_entry_link_to(&inner)?;
        inner_bp.add_end_link_from(&inner)?;

        let inner_brain = ctx.run_brain(&inner_bp)?;
        let answer = inner_brain
            .get_memory("answer")?
            .ok_or_else(|| ProcessorError::msg("inner brain wrote nothing"))?;
        ctx.set_memory("inner_answer", answer)?;
        Ok(())
    });
    bp.add_entry_link_to(&outer).unwrap();
    bp.add_end_link_from(&outer).unwrap();

    let brain = Brain::new(&bp).unwrap();
    run_to_sleep(&brain);

    let answer = brain.get_memory("inner_answer").unwrap();
    assert_eq!(answer.and_then(|v| v.as_i64()), Some(42));
    assert_eq!(brain.neuron_status(&outer).unwrap().counters.succeeded, 1);
}

#[test]
fn test_invalid_runtime_settings_are_rejected() {
    let bp = Blueprint::new();
    let config = BrainConfig {
        worker_num: 0,
        ..BrainConfig::default()
    };
    let result = Brain::with_parts(&bp, config, Arc::new(InMemoryStore::new()));
    assert!(matches!(result, Err(BrainError::Runtime(_))));
}

#[test]
fn test_concurrent_start_never_exposes_shutdown() {
    for _ in 0..50 {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron_fn(|_ctx| Ok(()));
        bp.add_entry_link_to(&a).unwrap();
        let brain = Arc::new(Brain::new(&bp).unwrap());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let brain = Arc::clone(&brain);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    brain.start().unwrap();
                    brain.state()
                })
            })
            .collect();

        for handle in handles {
            assert_ne!(handle.join().unwrap(), BrainState::Shutdown);
        }
    }
}

#[test]
fn test_forced_cast_retries_while_link_is_still_ready() {
    let mut bp = Blueprint::new();
    let a = bp.add_neuron_fn(|_ctx| Ok(()));
    let b = bp.add_neuron_fn(|_ctx| Ok(()));
    let join = bp.add_neuron_fn(|_ctx| Ok(()));
    let from_a = bp.add_link(&a, &join).unwrap();
    let from_b = bp.add_link(&b, &join).unwrap();
    bp.add_trigger_group(&join, &[from_a.clone(), from_b.clone()]).unwrap();

    let config = BrainConfig {
        recast_backoff_ms: 50,
        ..BrainConfig::default()
    };
    let brain = brain_with(&bp, config);

    // First cast arms the link; the second finds it still Ready and backs off.
    brain.recast(&a).unwrap();
    brain.recast(&a).unwrap();
    brain.recast(&b).unwrap();

    assert!(wait_for(|| brain.neuron_status(&join).unwrap().counters.succeeded == 1));
    // The retry lands once the join consumed the first cast.
    assert!(wait_for(|| brain.link_status(&from_a).unwrap().counters.processed == 2));
    assert_eq!(brain.link_status(&from_a).unwrap().state, LinkState::Ready);
    assert_eq!(brain.link_status(&from_b).unwrap().counters.processed, 1);
    assert_eq!(brain.neuron_status(&join).unwrap().counters.processed, 1);

    brain.force_sleep();
    assert_eq!(brain.wait(), BrainState::Sleeping);
    assert_eq!(brain.state_counts().link_ready, 0);
}

#[test]
fn test_cast_group_transitions_for_unselected_links() {
    let mut bp = Blueprint::new();
    let router = bp.add_neuron_fn(|_ctx| Ok(()));
    let left = bp.add_neuron_fn(|_ctx| Ok(()));
    let right = bp.add_neuron_fn(|_ctx| Ok(()));
    bp.add_entry_link_to(&router).unwrap();
    let to_left = bp.add_link(&router, &left).unwrap();
    let to_right = bp.add_link(&router, &right).unwrap();
    bp.add_cast_group(&router, "left", &[to_left.clone()]).unwrap();
    bp.add_cast_group(&router, "right", &[to_right.clone()]).unwrap();
    bp.bind_select_fn(&router, |_ctx| "right".to_string()).unwrap();

    let brain = Brain::new(&bp).unwrap();

    // Normal cast: the unselected link armed at dispatch goes back to Init.
    run_to_sleep(&brain);
    assert_eq!(brain.link_status(&to_left).unwrap().counters.processed, 0);
    assert_eq!(brain.neuron_status(&right).unwrap().counters.processed, 1);

    // Forced cast: the unselected link is re-armed and holds the brain awake.
    brain.recast(&router).unwrap();
    assert!(wait_for(|| brain.neuron_status(&right).unwrap().counters.succeeded == 2));
    assert_eq!(brain.link_status(&to_left).unwrap().state, LinkState::Wait);
    assert_eq!(brain.link_status(&to_left).unwrap().counters.processed, 0);
    assert_eq!(brain.neuron_status(&left).unwrap().counters.processed, 0);
    assert!(!brain.wait_timeout(Duration::from_millis(50)));

    brain.force_sleep();
    assert_eq!(brain.wait(), BrainState::Sleeping);
    assert_eq!(brain.link_status(&to_left).unwrap().state, LinkState::Init);
}

#[test]
fn test_fan_out_through_single_slot_queues() {
    const FAN_OUT: usize = 20;
    let hits = Arc::new(AtomicUsize::new(0));
    let mut bp = Blueprint::new();
    let hub = bp.add_neuron_fn(|_ctx| Ok(()));
    bp.add_entry_link_to(&hub).unwrap();
    let leaves: Vec<String> = (0..FAN_OUT)
        .map(|_| {
            let hits = Arc::clone(&hits);
            let leaf = bp.add_neuron_fn(move |_ctx| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            bp.add_link(&hub, &leaf).unwrap();
            leaf
        })
        .collect();

    let config = BrainConfig {
        worker_num: 1,
        neuron_queue_len: 1,
        event_queue_len: 1,
        ..BrainConfig::default()
    };
    let brain = brain_with(&bp, config);
    run_to_sleep(&brain);

    assert_eq!(hits.load(Ordering::SeqCst), FAN_OUT);
    for leaf in &leaves {
        assert_eq!(brain.neuron_status(leaf).unwrap().counters.succeeded, 1);
    }
    assert_eq!(brain.state_counts().link_ready, 0);
}
