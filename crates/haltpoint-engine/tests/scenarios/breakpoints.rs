use haltpoint_engine::{Breakpoint, BreakpointId, BreakpointSource, HitCondition, StopReason};
use haltpoint_sim::ThreadDriver;
use test_log::test;

use crate::common::{self, Recorder, Stop};

#[test]
fn breakpoint_reported_once_per_encounter() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger
        .add_breakpoint(Breakpoint::at("a.src", 10))
        .unwrap();

    // call and line events at the same location
    driver.call("Foo", "bar", "a.src", 10);
    driver.line("a.src", 10);

    // back on the line after a nested call: stops, without reporting the
    // breakpoint a second time
    driver.call("Foo", "baz", "b.src", 1);
    driver.line("b.src", 2);
    driver.ret();
    driver.line("a.src", 10);

    // the line is left and reached again
    driver.line("a.src", 11);
    driver.line("a.src", 10);

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(id),
            Stop::line("a.src", 10, 2, StopReason::Breakpoint),
            Stop::line("a.src", 10, 2, StopReason::Step),
            Stop::breakpoint(id),
            Stop::line("a.src", 10, 2, StopReason::Breakpoint),
        ]
    );

    let breakpoint = debugger.breakpoint(id).unwrap().unwrap();
    assert_eq!(breakpoint.hit_count(), 3);
}

#[test]
fn failing_condition_never_stops() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let unbound = debugger
        .add_breakpoint(Breakpoint::at("a.src", 5).with_condition("y > 1"))
        .unwrap();
    let malformed = debugger
        .add_breakpoint(Breakpoint::at("a.src", 6).with_condition("x >"))
        .unwrap();

    driver.set_local("x", 1_i64);
    driver.line("a.src", 5);
    driver.line("a.src", 6);

    assert!(recorder.stops().is_empty());
    for id in [unbound, malformed] {
        assert_eq!(debugger.breakpoint(id).unwrap().unwrap().hit_count(), 0);
    }
}

#[test]
fn condition_reads_innermost_locals() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger
        .add_breakpoint(Breakpoint::at("a.src", 2).with_condition("x > 3"))
        .unwrap();

    driver.set_local("x", 1_i64);
    driver.line("a.src", 2);

    driver.line("a.src", 1);
    driver.set_local("x", 5_i64);
    driver.line("a.src", 2);

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(id),
            Stop::line("a.src", 2, 1, StopReason::Breakpoint),
        ]
    );
}

#[test]
fn hit_condition_counts_every_hit() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let third = debugger
        .add_breakpoint(Breakpoint::at("a.src", 1).with_hit_condition(HitCondition::Equal(3)))
        .unwrap();
    let never = debugger
        .add_breakpoint(Breakpoint::at("a.src", 2).with_hit_condition(HitCondition::Modulo(0)))
        .unwrap();

    for _ in 0..5 {
        driver.line("a.src", 1);
        driver.line("a.src", 2);
    }

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(third),
            Stop::line("a.src", 1, 1, StopReason::Breakpoint),
        ]
    );

    assert_eq!(debugger.breakpoint(third).unwrap().unwrap().hit_count(), 5);
    assert_eq!(debugger.breakpoint(never).unwrap().unwrap().hit_count(), 5);
}

#[test]
fn method_breakpoint_stops_on_call() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger
        .add_breakpoint(Breakpoint::on_method("Foo", "bar"))
        .unwrap();

    driver.call("Foo", "baz", "a.src", 1);
    driver.ret();
    driver.call("Qux", "bar", "a.src", 5);
    driver.ret();
    driver.call("Foo", "bar", "a.src", 10);

    assert_eq!(
        recorder.stops(),
        [
            Stop::breakpoint(id),
            Stop::line("a.src", 10, 2, StopReason::Breakpoint),
        ]
    );
}

#[test]
fn disabled_and_removed_breakpoints_never_stop() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let id = debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();

    assert_eq!(debugger.set_breakpoint_enabled(id, false), Ok(true));
    assert_eq!(
        debugger.set_breakpoint_enabled(BreakpointId(99), false),
        Ok(false)
    );
    driver.line("a.src", 1);

    assert_eq!(debugger.set_breakpoint_enabled(id, true), Ok(true));
    let removed = debugger.remove_breakpoint(id).unwrap().unwrap();
    assert_eq!(removed.id(), id);
    assert_eq!(removed.hit_count(), 0);

    driver.line("a.src", 2);
    driver.line("a.src", 1);

    assert!(recorder.stops().is_empty());
    assert!(debugger.breakpoints().unwrap().is_empty());
}

#[test]
fn breakpoints_are_listed_in_order() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);

    let first = debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();
    let second = debugger
        .add_breakpoint(Breakpoint::on_method("Foo", "bar").with_condition("x"))
        .unwrap();

    debugger.remove_breakpoint(first).unwrap();
    let third = debugger.add_breakpoint(Breakpoint::at("a.src", 1)).unwrap();

    assert_ne!(first, third);

    let breakpoints = debugger.breakpoints().unwrap();
    let ids: Vec<_> = breakpoints.iter().map(Breakpoint::id).collect();
    assert_eq!(ids, [second, third]);

    assert_eq!(
        breakpoints[0].source(),
        &BreakpointSource::Method {
            class: "Foo".to_owned(),
            method: "bar".to_owned(),
        }
    );
    assert_eq!(breakpoints[0].condition(), Some("x"));
    assert!(breakpoints[1].is_enabled());
}

#[test]
fn context_breakpoint_stops_once_as_step() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let global = debugger
        .add_breakpoint(Breakpoint::at("a.src", 3))
        .unwrap();

    let context = debugger.current_context().unwrap();
    context.set_breakpoint(Breakpoint::at("a.src", 3)).unwrap();
    assert_eq!(context.breakpoint(), Some(BreakpointId::CONTEXT));

    // checked before the global breakpoint, then disarmed
    driver.line("a.src", 1);
    driver.line("a.src", 3);
    driver.line("a.src", 4);
    driver.line("a.src", 3);

    assert_eq!(
        recorder.stops(),
        [
            Stop::line("a.src", 3, 1, StopReason::Step),
            Stop::breakpoint(global),
            Stop::line("a.src", 3, 1, StopReason::Breakpoint),
        ]
    );
    assert_eq!(context.breakpoint(), Some(global));
    assert_eq!(debugger.breakpoint(global).unwrap().unwrap().hit_count(), 1);
}

#[test]
fn context_breakpoint_honors_condition() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    let context = debugger.current_context().unwrap();
    context
        .set_breakpoint(Breakpoint::at("a.src", 5).with_condition("x > 1"))
        .unwrap();

    driver.set_local("x", 1_i64);
    driver.line("a.src", 5);
    driver.set_local("x", 2_i64);
    driver.line("a.src", 6);
    driver.line("a.src", 5);
    driver.line("a.src", 6);
    driver.line("a.src", 5);

    assert_eq!(
        recorder.stops(),
        [Stop::line("a.src", 5, 1, StopReason::Step)]
    );
    assert_eq!(context.breakpoint(), None);
}

#[test]
fn context_breakpoint_on_method() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let driver = ThreadDriver::new(&debugger);

    debugger
        .current_context()
        .unwrap()
        .set_breakpoint(Breakpoint::on_method("Foo", "bar"))
        .unwrap();

    driver.call("Foo", "baz", "b.src", 1);
    driver.ret();
    driver.call("Foo", "bar", "b.src", 10);
    driver.line("b.src", 11);

    assert_eq!(
        recorder.stops(),
        [Stop::line("b.src", 10, 2, StopReason::Step)]
    );
}
