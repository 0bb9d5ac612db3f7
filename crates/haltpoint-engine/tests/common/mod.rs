mod handler;

use haltpoint_engine::{Builder, Config, Debugger};
use haltpoint_sim::SimHost;

pub use self::handler::{Recorder, Stop};

/// Builds and starts a debugger over a fresh simulated host.
pub fn debugger(recorder: &Recorder) -> Debugger<SimHost> {
    debugger_with_config(recorder, Config::default())
}

/// Builds and starts a debugger over a fresh simulated host.
pub fn debugger_with_config(recorder: &Recorder, config: Config) -> Debugger<SimHost> {
    let debugger = Builder::new()
        .with_host(SimHost::new())
        .with_handler(recorder.clone())
        .with_config(config)
        .build();

    assert!(debugger.start());
    debugger
}

/// Declares the `Bar < Foo < Exception` hierarchy.
pub fn define_exceptions(host: &SimHost) {
    host.define_class("Exception", None);
    host.define_class("Foo", Some("Exception"));
    host.define_class("Bar", Some("Foo"));
    host.define_class("Other", Some("Exception"));
}
