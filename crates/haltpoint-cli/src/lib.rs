//! Crate implementing the CLI commands.

mod cli;
mod config;
mod handler;
mod replay;
mod report;
mod script;

pub use self::cli::{CliAction, CliOpts};
pub use self::config::{ReplayConfig, parse_config};
pub use self::handler::ReplayHandler;
pub use self::replay::evaluate_replay;
pub use self::report::Report;
pub use self::script::{
    CallEvent, Catch, ClassDecl, Count, Event, LineEvent, LocalEvent, MethodBreak, OnStop,
    PositionBreak, RaiseEvent, Script, ScriptError, StopCommand, ThreadScript, parse_script,
};
