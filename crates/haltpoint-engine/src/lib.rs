//! This crate implements the execution-control core of a source-level
//! debugger embedded in a language runtime.
//!
//! The runtime (the *host*) reports every relevant execution event (line
//! advance, call, return, raised exception) to a [Debugger] session, which
//! decides whether the current thread must stop, and arbitrates between the
//! debug commands (step, step-over, breakpoints, pause) and the concurrently
//! running threads. At most one thread processes debugger events at any
//! time: the others block until it is done.
//!
//! Two main components are provided:
//! - A trait to implement the front end of the debugger, notified when a
//!   thread stops (see [StopHandler](self::handler::StopHandler)).
//! - A few traits to plug the debugger into a host runtime (see the
//!   [host](self::host) module).
//!
//! # Handling stops
//!
//! ```
//! use haltpoint_engine::handler::StopHandler;
//! use haltpoint_engine::{Breakpoint, Builder, Context, Debugger};
//! use haltpoint_sim::{SimHost, ThreadDriver};
//!
//! struct StepTwice;
//!
//! impl StopHandler<SimHost> for StepTwice {
//!     fn at_line(
//!         &self,
//!         _debugger: &Debugger<SimHost>,
//!         context: &Context<SimHost>,
//!         _path: &str,
//!         line: u32,
//!     ) {
//!         // the stopped frames can be inspected here
//!         assert_eq!(context.frame_line(0).unwrap(), line);
//!
//!         // stop again two lines later
//!         context.step(2, false).unwrap();
//!     }
//! }
//!
//! // initialize the debugger
//! let debugger = Builder::new()
//!     .with_host(SimHost::new())
//!     .with_handler(StepTwice)
//!     .build();
//!
//! debugger.start();
//! debugger.add_breakpoint(Breakpoint::at("main.src", 2)).unwrap();
//!
//! // feed the debugger with events of the current thread
//! let driver = ThreadDriver::new(&debugger);
//! driver.line("main.src", 1);
//! driver.line("main.src", 2); // breakpoint
//! driver.line("main.src", 3);
//! driver.line("main.src", 4); // step
//! ```
//!
//! # Plugging a host runtime
//!
//! The [Host](self::host::Host) trait, along with the
//! [Thread](self::host::Thread), [Exception](self::host::Exception) and
//! [TracePoint](self::host::TracePoint) traits, expose the runtime to the
//! debugger. The runtime then forwards its execution events to
//! [Debugger::on_line], [Debugger::on_call], [Debugger::on_return],
//! [Debugger::on_raise], [Debugger::on_foreign_call] and
//! [Debugger::on_foreign_return], from the thread executing them.
//!
//! The `haltpoint-sim` crate provides a simulated runtime, mostly useful for
//! testing.

mod breakpoint;
mod config;
mod context;
mod debugger;
mod error;

/// Module containing traits for handling stops.
pub mod handler;

/// Module containing traits for plugging a host runtime.
pub mod host;

mod registry;
mod snapshot;
mod token;

pub use self::breakpoint::{Breakpoint, BreakpointId, BreakpointSource, HitCondition};
pub use self::config::Config;
pub use self::context::{Context, ContextFlags, StopReason};
pub use self::debugger::{Builder, Debugger, PostMortem};
pub use self::error::{Error, LoadError, ProgramError, Result};
pub use self::snapshot::{Frame, Location, ScopeSnapshot};
