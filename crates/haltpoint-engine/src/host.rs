use std::fmt::Debug;
use std::hash::Hash;

use crate::snapshot::ScopeSnapshot;

/// Trait implementing the runtime side of the debugger.
///
/// The instrumented runtime (the *host*) owns threads, call stacks and
/// objects. The engine only ever observes them through this trait, the
/// [Thread] and [Exception] traits, and the [TracePoint] handed over with
/// each event.
pub trait Host: Send + Sync + 'static {
    /// Type of a host thread handle.
    type Thread: Thread;

    /// Type of a host object (receivers, classes, bindings).
    type Value: Clone + Debug + Send + Sync + 'static;

    /// Type of a raised host exception.
    type Exception: Exception;

    /// Error returned when evaluating a condition expression.
    type EvalError: std::error::Error;

    /// Returns the thread executing the caller.
    fn current_thread(&self) -> Self::Thread;

    /// Returns every live thread of the host.
    fn threads(&self) -> Vec<Self::Thread>;

    /// Walks the thread's call stack and returns its exact height.
    ///
    /// Only called when a debug context is created, to seed its depth.
    fn stack_size(&self, thread: &Self::Thread) -> usize;

    /// Evaluates a breakpoint condition within the given lexical scope.
    fn evaluate(
        &self,
        expression: &str,
        binding: Option<&Self::Value>,
    ) -> Result<bool, Self::EvalError>;
}

/// Trait for implementing a host thread handle.
pub trait Thread: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Scheduling status of the thread.
    fn status(&self) -> ThreadStatus;

    /// Whether the thread belongs to the debugger itself.
    ///
    /// Events of such threads never stop.
    fn is_debugger_thread(&self) -> bool {
        false
    }

    /// Whether the thread has not terminated yet.
    fn is_alive(&self) -> bool {
        !matches!(self.status(), ThreadStatus::Dead)
    }
}

/// Scheduling status of a host thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// The thread is runnable.
    Running,

    /// The thread is sleeping (blocked by the host).
    Sleeping,

    /// The thread has terminated.
    Dead,
}

/// Trait for implementing a raised host exception.
pub trait Exception: Debug + Send + Sync {
    /// Identity of the exception object, stable while it propagates.
    fn identity(&self) -> u64;

    /// Qualified names of the exception's type ancestry, from the most
    /// specific type to the least specific one.
    fn ancestors(&self) -> Vec<String>;
}

/// Execution point that fired an event.
pub trait TracePoint<H: Host + ?Sized> {
    /// Source file of the execution point.
    fn path(&self) -> &str;

    /// Source line of the execution point.
    fn line(&self) -> u32;

    /// Walks the live stack of the current thread.
    ///
    /// The returned snapshot is only valid for the duration of the event.
    fn inspect(&self) -> ScopeSnapshot<H::Value>;

    /// Lexical scope of the innermost frame.
    fn binding(&self) -> Option<H::Value> {
        self.inspect().innermost_binding().cloned()
    }
}
