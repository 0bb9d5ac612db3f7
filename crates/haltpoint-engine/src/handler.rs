use crate::breakpoint::Breakpoint;
use crate::context::Context;
use crate::debugger::Debugger;
use crate::host::Host;

/// Trait for implementing the front end of the debugger.
///
/// Every callback runs on the stopped thread, while it holds the execution
/// token: no other thread processes debugger events until the callback
/// returns. The stopped thread's frames can be inspected through `context`
/// for the duration of the callback.
pub trait StopHandler<H: Host>: Send + Sync + 'static {
    /// Function called when a thread stops at a line.
    ///
    /// This is the interactive stop: stepping commands issued on `context`
    /// apply once the callback returns.
    fn at_line(&self, _debugger: &Debugger<H>, _context: &Context<H>, _path: &str, _line: u32) {}

    /// Function called when a breakpoint is hit.
    ///
    /// On a line event, [at_line](Self::at_line) is called right after.
    fn at_breakpoint(
        &self,
        _debugger: &Debugger<H>,
        _context: &Context<H>,
        _breakpoint: &Breakpoint,
    ) {
    }

    /// Function called when a raised exception matches a catchpoint.
    fn at_catchpoint(
        &self,
        _debugger: &Debugger<H>,
        _context: &Context<H>,
        _exception: &H::Exception,
    ) {
    }

    /// Function called on every line event of a traced thread.
    fn at_tracing(
        &self,
        _debugger: &Debugger<H>,
        _context: &Context<H>,
        _path: &str,
        _line: u32,
    ) {
    }
}

/// Handler ignoring every stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl<H: Host> StopHandler<H> for NoopHandler {}
