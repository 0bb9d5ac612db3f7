use haltpoint_engine::StopReason;
use haltpoint_sim::ThreadDriver;
use test_log::test;

use crate::common::{self, Recorder, Stop};

fn catchpoint(class: &str) -> Stop {
    Stop::Catchpoint {
        thnum: 1,
        class: class.to_owned(),
        reason: StopReason::Catchpoint,
    }
}

#[test]
fn catchpoint_matches_subclasses() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let host = debugger.host();
    common::define_exceptions(host);

    debugger.add_catchpoint("Foo").unwrap();

    let driver = ThreadDriver::new(&debugger);
    driver.call("Baz", "run", "a.src", 3);
    driver.raise(&host.exception("Bar"));
    driver.raise(&host.exception("Other"));

    assert_eq!(recorder.stops(), [catchpoint("Bar")]);
    assert_eq!(debugger.catchpoints().unwrap(), [("Foo".to_owned(), 1)]);

    // the stop reason only lasts for the callback
    let context = debugger.current_context().unwrap();
    assert_eq!(context.stop_reason(), StopReason::None);
}

#[test]
fn closest_ancestor_wins() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let host = debugger.host();
    common::define_exceptions(host);

    debugger.add_catchpoint("Exception").unwrap();
    debugger.add_catchpoint("Foo").unwrap();

    let driver = ThreadDriver::new(&debugger);
    driver.raise(&host.exception("Bar"));
    driver.raise(&host.exception("Other"));

    assert_eq!(recorder.stops(), [catchpoint("Bar"), catchpoint("Other")]);
    assert_eq!(
        debugger.catchpoints().unwrap(),
        [("Exception".to_owned(), 1), ("Foo".to_owned(), 1)]
    );

    // registering a catchpoint again resets its count
    debugger.add_catchpoint("Foo").unwrap();
    assert_eq!(
        debugger.catchpoints().unwrap(),
        [("Exception".to_owned(), 1), ("Foo".to_owned(), 0)]
    );

    assert_eq!(debugger.remove_catchpoint("Foo"), Ok(true));
    assert_eq!(debugger.remove_catchpoint("Foo"), Ok(false));
}

#[test]
fn raise_outside_any_frame_is_ignored() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let host = debugger.host();
    common::define_exceptions(host);

    debugger.add_catchpoint("Exception").unwrap();

    let driver = ThreadDriver::new(&debugger);
    driver.ret();
    assert_eq!(debugger.current_context().unwrap().depth(), 0);

    driver.raise(&host.exception("Bar"));

    assert!(recorder.stops().is_empty());
    assert_eq!(
        debugger.catchpoints().unwrap(),
        [("Exception".to_owned(), 0)]
    );
}

#[test]
fn raise_within_catchpoint_callback_is_ignored() {
    let recorder = Recorder::new();
    let debugger = common::debugger(&recorder);
    let host = debugger.host();
    common::define_exceptions(host);

    debugger.add_catchpoint("Foo").unwrap();

    recorder.on_stop(|debugger, _| {
        let host = debugger.host();
        ThreadDriver::new(debugger).raise(&host.exception("Foo"));
    });

    let driver = ThreadDriver::new(&debugger);
    driver.raise(&host.exception("Bar"));

    assert_eq!(recorder.stops(), [catchpoint("Bar")]);
    assert_eq!(debugger.catchpoints().unwrap(), [("Foo".to_owned(), 1)]);
}
