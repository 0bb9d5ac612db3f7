/// Error type of this crate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The debugger session was not started (or was stopped).
    #[error("debugger is not started")]
    NotStarted,

    /// A frame index is outside of the inspected stack.
    #[error("invalid frame number {index}, stack (0...{count})")]
    InvalidFrame {
        /// Requested frame index.
        index: usize,

        /// Number of frames in the inspected stack.
        count: usize,
    },

    /// An argument of a context operation is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Frame information was queried outside of a stop callback.
    #[error("inspected frame information is not available")]
    InspectionUnavailable,

    /// The context was already suspended.
    #[error("thread is already suspended")]
    AlreadySuspended,

    /// The context is not suspended.
    #[error("thread is not suspended")]
    NotSuspended,

    /// The operation cannot be applied to a post-mortem context.
    #[error("context is a post-mortem copy")]
    DeadContext,
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Error of the program run by [debug_load](crate::Debugger::debug_load).
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct ProgramError<E>(pub E);

/// Error returned by [debug_load](crate::Debugger::debug_load).
#[derive(thiserror::Error, Debug)]
pub enum LoadError<E> {
    /// A debugger error occurred.
    #[error(transparent)]
    Debugger(#[from] Error),

    /// The loaded program failed.
    #[error(transparent)]
    Program(#[from] ProgramError<E>),
}
