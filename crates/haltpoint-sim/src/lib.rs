//! This crate provides a simulated host runtime for `haltpoint-engine`.
//!
//! The runtime has threads (bound to OS threads), call stacks with local
//! variables, a class hierarchy and exceptions, and evaluates a minimal
//! condition language. Execution is scripted through a [ThreadDriver],
//! which reports the matching events to the debugger.
//!
//! <div class="warning">
//!
//! *This crate is not meant to instrument real programs! It merely
//! implements the host traits of `haltpoint-engine`, so that the debugger
//! can be driven deterministically (e.g., in tests or trace replays).*
//!
//! </div>
//!
//! # Condition language
//!
//! Breakpoint conditions are evaluated within the innermost frame's local
//! variables, and may be:
//! - `true` or `false`,
//! - `name`, true unless the variable is `nil` or `false`,
//! - `name <op> integer`, with `<op>` among `== != < <= > >=`.
//!
//! Referring to an unbound variable, or comparing a non-integer variable,
//! is an evaluation error.

mod driver;
mod error;
mod eval;
mod exception;
mod host;
mod thread;
mod value;

pub use self::driver::ThreadDriver;
pub use self::error::EvalError;
pub use self::exception::SimException;
pub use self::host::SimHost;
pub use self::thread::SimThread;
pub use self::value::SimValue;
