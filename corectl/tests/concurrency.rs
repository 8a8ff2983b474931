//! Concurrency tests for the controller
//!
//! Readers hammer the controller from several threads while another thread
//! drives start/stop, verifying that:
//! - transient Starting/Stopping states are never observable
//! - Running is never observed before on_startup was delivered
//! - racing starts produce exactly one winner

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use corectl::mock::{MockEngine, RecordingCallback};
use corectl::{Callback, CoreController, CoreState, Error};

const READERS: usize = 8;

/// Readers only ever see Stopped or Running while a slow start is in flight
#[test]
fn test_no_transient_state_visible() {
    let recorder = Arc::new(RecordingCallback::new());
    let callback: Arc<dyn Callback> = recorder.clone();
    let engine = Arc::new(MockEngine::new());
    engine.set_start_delay(Duration::from_millis(50));

    let controller = Arc::new(
        CoreController::builder()
            .callback(&callback)
            .engine(engine.clone())
            .build()
            .unwrap(),
    );

    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(READERS + 1));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let controller = controller.clone();
            let recorder = recorder.clone();
            let done = done.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut saw_running = false;
                while !done.load(Ordering::SeqCst) {
                    let state = controller.state();
                    assert!(
                        matches!(state, CoreState::Stopped | CoreState::Running),
                        "observed transient state {:?}",
                        state
                    );
                    if controller.is_running() {
                        saw_running = true;
                        assert!(recorder.count("OnStartup") >= 1);
                    }
                }
                saw_running
            })
        })
        .collect();

    barrier.wait();
    for _ in 0..3 {
        controller.start("cfg").unwrap();
        thread::sleep(Duration::from_millis(5));
        controller.stop().unwrap();
    }
    controller.start("cfg").unwrap();
    thread::sleep(Duration::from_millis(20));
    done.store(true, Ordering::SeqCst);

    let any_running = readers
        .into_iter()
        .map(|r| r.join().unwrap())
        .fold(false, |acc, saw| acc | saw);
    assert!(any_running);
    assert_eq!(recorder.count("OnStartup"), 4);
    assert_eq!(recorder.count("OnShutdown"), 3);
}

/// Concurrent starts: exactly one succeeds, the rest see AlreadyRunning
#[test]
fn test_racing_starts() {
    let recorder = Arc::new(RecordingCallback::new());
    let callback: Arc<dyn Callback> = recorder.clone();
    let engine = Arc::new(MockEngine::new());
    let controller = Arc::new(
        CoreController::builder()
            .callback(&callback)
            .engine(engine.clone())
            .build()
            .unwrap(),
    );
    let barrier = Arc::new(Barrier::new(READERS));

    let results: Vec<_> = (0..READERS)
        .map(|_| {
            let controller = controller.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                controller.start("cfg")
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let already = results
        .iter()
        .filter(|r| matches!(r, Err(Error::AlreadyRunning)))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(already, READERS - 1);
    assert_eq!(engine.starts(), 1);
    assert_eq!(recorder.count("OnStartup"), 1);
}

/// Events from one controller arrive strictly alternating across start/stop cycles
#[test]
fn test_events_strictly_ordered() {
    let recorder = Arc::new(RecordingCallback::new());
    let callback: Arc<dyn Callback> = recorder.clone();
    let controller = Arc::new(CoreController::new(Some(&callback)));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let controller = controller.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let _ = controller.start("cfg");
                    let _ = controller.stop();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let events = recorder.events();
    assert!(!events.is_empty());
    for (i, event) in events.iter().enumerate() {
        let expected = if i % 2 == 0 { "OnStartup" } else { "OnShutdown" };
        assert_eq!(event, expected, "event {} out of order: {:?}", i, events);
    }
}
