use std::sync::mpsc;

use haltpoint_engine::{Breakpoint, Error, StopReason};
use haltpoint_sim::ThreadDriver;
use test_log::test;

use crate::common::{self, Recorder, Stop};

#[test]
fn step_stops_at_any_depth() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    debugger.current_context().unwrap().step(3, false).unwrap();

    driver.line("a.src", 1);
    driver.call("Foo", "bar", "b.src", 10);
    driver.line("b.src", 11);
    driver.line("b.src", 12);
    driver.ret();
    driver.line("a.src", 2);

    assert_eq!(
        recorder.stops(),
        [Stop::line("b.src", 12, 2, StopReason::Step)]
    );
}

#[test]
fn step_over_skips_deeper_calls() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    driver.call("Foo", "run", "a.src", 1);

    let context = debugger.current_context().unwrap();
    context.step_over(1, Some(0), false).unwrap();

    driver.call("Foo", "inner", "b.src", 5);
    driver.line("b.src", 6);
    driver.line("b.src", 7);
    driver.ret();
    driver.line("a.src", 2);
    driver.line("a.src", 3);

    assert_eq!(
        recorder.stops(),
        [Stop::line("a.src", 2, 2, StopReason::Step)]
    );
}

#[test]
fn step_over_stops_when_frame_returns() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    driver.call("Foo", "run", "a.src", 1);

    let context = debugger.current_context().unwrap();
    context.step_over(5, None, false).unwrap();

    driver.line("a.src", 2);
    driver.ret();
    driver.line("main.src", 7);

    assert_eq!(
        recorder.stops(),
        [Stop::line("main.src", 7, 1, StopReason::Step)]
    );
}

#[test]
fn step_over_outer_frame() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    driver.call("Foo", "run", "a.src", 1);
    driver.call("Foo", "inner", "b.src", 5);

    // counts line events back in the caller of the innermost frame
    let context = debugger.current_context().unwrap();
    context.step_over(1, Some(1), false).unwrap();

    driver.line("b.src", 6);
    driver.line("b.src", 7);
    driver.ret();
    driver.line("a.src", 2);
    driver.line("a.src", 3);

    assert_eq!(
        recorder.stops(),
        [Stop::line("a.src", 2, 2, StopReason::Step)]
    );
}

#[test]
fn stop_frame_waits_for_outer_frame() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    driver.call("Foo", "run", "a.src", 1);
    driver.call("Foo", "inner", "b.src", 5);

    let context = debugger.current_context().unwrap();
    context.stop_frame(1).unwrap();

    // the innermost frame returning is not enough
    driver.line("b.src", 6);
    driver.ret();
    driver.line("a.src", 2);
    driver.ret();
    driver.line("main.src", 7);
    driver.line("main.src", 8);

    assert_eq!(
        recorder.stops(),
        [Stop::line("main.src", 7, 1, StopReason::Step)]
    );
}

#[test]
fn finish_stops_after_return() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger
        .add_breakpoint(Breakpoint::at("b.src", 11))
        .unwrap();

    recorder.on_stop(|_, context| {
        assert_eq!(context.stack_size(), Ok(2));
        context.stop_frame(0).unwrap();
    });

    driver.call("Foo", "bar", "b.src", 10);
    driver.line("b.src", 11);
    driver.line("b.src", 12);
    driver.ret();
    driver.line("main.src", 5);
    driver.line("main.src", 6);

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(id),
            Stop::line("b.src", 11, 2, StopReason::Breakpoint),
            Stop::line("main.src", 5, 1, StopReason::Step),
        ]
    );
}

#[test]
fn forced_step_requires_moving() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();
    recorder.on_stop(|_, context| context.step(1, true).unwrap());

    driver.line("a.src", 1);
    driver.line("a.src", 1);
    driver.line("a.src", 2);

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(id),
            Stop::line("a.src", 1, 1, StopReason::Breakpoint),
            Stop::line("a.src", 2, 1, StopReason::Step),
        ]
    );
}

#[test]
fn unforced_step_counts_same_line() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();
    recorder.on_stop(|_, context| context.step(1, false).unwrap());

    driver.line("a.src", 1);
    driver.line("a.src", 1);

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(id),
            Stop::line("a.src", 1, 1, StopReason::Breakpoint),
            Stop::line("a.src", 1, 1, StopReason::Step),
        ]
    );
}

#[test]
fn stepping_arguments_are_checked() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let context = debugger.current_context().unwrap();

    assert!(matches!(
        context.step(-1, false),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        context.step_over(-1, None, false),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        context.step_over(1, Some(1), false),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        context.stop_frame(-1),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        context.stop_frame(1),
        Err(Error::InvalidArgument(_))
    ));

    assert_eq!(context.step_over(1, Some(0), false), Ok(()));
    assert_eq!(context.stop_frame(0), Ok(()));
}

#[test]
fn pause_stops_other_thread() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);

    let (tx, rx) = mpsc::channel::<()>();
    let worker = debugger.clone();

    let (thread, handle) = debugger.host().spawn(move || {
        rx.recv().unwrap();

        let driver = ThreadDriver::new(&worker);
        driver.line("w.src", 1);
        driver.line("w.src", 2);
    });

    let context = debugger.thread_context(&thread).unwrap();
    assert_eq!(context.pause(), Ok(true));

    // pausing the calling thread is meaningless
    assert_eq!(debugger.current_context().unwrap().pause(), Ok(false));

    tx.send(()).unwrap();
    handle.join().unwrap();

    assert_eq!(
        recorder.stops(),
        [Stop::Line {
            thnum: context.thnum(),
            path: "w.src".to_owned(),
            line: 1,
            depth: 1,
            reason: StopReason::Step,
        }]
    );
}
