use std::collections::BTreeSet;
use std::sync::mpsc;
use std::time::Duration;

use haltpoint_engine::{Breakpoint, Config};
use haltpoint_sim::ThreadDriver;
use test_log::test;

use crate::common::{self, Recorder, Stop};

const THREADS: usize = 4;
const LINES: u32 = 200;

#[test]
fn one_thread_processes_events_at_a_time() {
    let recorder = Recorder::new();
    let config = Config {
        tracing: true,
        ..Config::default()
    };
    let debugger = common::debugger_with_config(&recorder, config);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let worker = debugger.clone();
            let (_, handle) = debugger.host().spawn(move || {
                let driver = ThreadDriver::new(&worker);
                for line in 1..=LINES {
                    driver.line("w.src", line);
                }
            });
            handle
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(recorder.max_concurrent_callbacks(), 1);

    let traced = recorder.traced();
    assert_eq!(traced.len(), THREADS * LINES as usize);

    // every thread is traced in program order
    for thnum in 2..THREADS + 2 {
        let lines: Vec<_> = traced
            .iter()
            .filter(|(traced_thnum, _, _)| *traced_thnum == thnum)
            .map(|(_, _, line)| *line)
            .collect();
        assert_eq!(lines, (1..=LINES).collect::<Vec<_>>());
    }
}

#[test]
fn every_thread_stops_at_breakpoint() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let id = debugger.add_breakpoint(Breakpoint::at("w.src", 2)).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let worker = debugger.clone();
            let (_, handle) = debugger.host().spawn(move || {
                let driver = ThreadDriver::new(&worker);
                for line in 1..=3 {
                    driver.line("w.src", line);
                }
            });
            handle
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(recorder.max_concurrent_callbacks(), 1);
    assert_eq!(recorder.breakpoint_count(), THREADS);

    let stopped: BTreeSet<_> = recorder
        .stops()
        .into_iter()
        .filter_map(|stop| match stop {
            Stop::Breakpoint { thnum, id: hit } if hit == id => Some(thnum),
            _ => None,
        })
        .collect();
    assert_eq!(stopped, (2..THREADS + 2).collect::<BTreeSet<_>>());

    let breakpoint = debugger.breakpoint(id).unwrap().unwrap();
    assert_eq!(breakpoint.hit_count(), THREADS as u64);
}

#[test]
fn stepping_is_per_thread() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);

    // stepping of the main thread
    debugger.current_context().unwrap().step(1, false).unwrap();

    let worker = debugger.clone();
    let (_, handle) = debugger.host().spawn(move || {
        ThreadDriver::new(&worker).line("w.src", 1);
    });
    handle.join().unwrap();

    assert!(recorder.stops().is_empty());

    ThreadDriver::new(&debugger).line("a.src", 1);
    assert_eq!(recorder.line_stops(), [("a.src".to_owned(), 1)]);
}

#[test]
fn queued_threads_finish_after_suspend_and_resume() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let mut go = Vec::new();
    let mut handles = Vec::new();

    for _ in 0..THREADS {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let (worker, done_tx) = (debugger.clone(), done_tx.clone());
        let (_, handle) = debugger.host().spawn(move || {
            go_rx.recv().unwrap();
            let driver = ThreadDriver::new(&worker);
            for line in 1..=LINES {
                driver.line("w.src", line);
            }
            done_tx.send(()).unwrap();
        });
        go.push(go_tx);
        handles.push(handle);
    }

    // the workers queue up behind the stopped main thread, then get
    // suspended
    recorder.on_stop(move |debugger, _| {
        for tx in go {
            tx.send(()).unwrap();
        }
        std::thread::sleep(Duration::from_millis(50));
        debugger.suspend_all().unwrap();
    });
    ThreadDriver::new(&debugger).line("a.src", 1);

    assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

    debugger.resume_all().unwrap();
    for _ in 0..THREADS {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(recorder.line_stops(), [("a.src".to_owned(), 1)]);
    assert_eq!(recorder.max_concurrent_callbacks(), 1);
}

#[test]
fn suspend_and_resume_within_stop_keep_queue() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let mut go = Vec::new();
    let mut handles = Vec::new();

    for _ in 0..THREADS {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let (worker, done_tx) = (debugger.clone(), done_tx.clone());
        let (_, handle) = debugger.host().spawn(move || {
            go_rx.recv().unwrap();
            ThreadDriver::new(&worker).line("w.src", 1);
            done_tx.send(()).unwrap();
        });
        go.push(go_tx);
        handles.push(handle);
    }

    recorder.on_stop(move |debugger, _| {
        for tx in go {
            tx.send(()).unwrap();
        }
        std::thread::sleep(Duration::from_millis(50));
        debugger.suspend_all().unwrap();
        debugger.resume_all().unwrap();
    });
    ThreadDriver::new(&debugger).line("a.src", 1);

    for _ in 0..THREADS {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
