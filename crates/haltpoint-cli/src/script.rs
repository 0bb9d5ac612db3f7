use std::path::Path;

use haltpoint_engine::{Breakpoint, HitCondition};
use miette::IntoDiagnostic;

/// Scripted execution, replayed under the debugger.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct Script {
    /// Classes of the simulated runtime.
    #[knus(children(name = "class"))]
    pub classes: Vec<ClassDecl>,

    /// Position breakpoints.
    #[knus(children(name = "break"))]
    pub breakpoints: Vec<PositionBreak>,

    /// Method breakpoints.
    #[knus(children(name = "break-method"))]
    pub method_breakpoints: Vec<MethodBreak>,

    /// Catchpoints.
    #[knus(children(name = "catch"))]
    pub catchpoints: Vec<Catch>,

    /// Commands issued on interactive stops.
    #[knus(child, default)]
    pub on_stop: OnStop,

    /// Threads, replayed in declaration order.
    #[knus(children(name = "thread"))]
    pub threads: Vec<ThreadScript>,
}

/// Class declaration.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct ClassDecl {
    /// Name of the class.
    #[knus(argument)]
    pub name: String,

    /// Name of the parent class.
    #[knus(property)]
    pub parent: Option<String>,
}

/// Breakpoint on a source position.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct PositionBreak {
    /// Source file.
    #[knus(argument)]
    pub path: String,

    /// Source line.
    #[knus(argument)]
    pub line: u32,

    /// Condition expression.
    #[knus(property)]
    pub condition: Option<String>,

    /// Hit condition (`>=n`, `==n` or `%n`).
    #[knus(property)]
    pub hit: Option<String>,
}

/// Breakpoint on a method.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct MethodBreak {
    /// Class defining the method.
    #[knus(argument)]
    pub class: String,

    /// Method name.
    #[knus(argument)]
    pub method: String,

    /// Condition expression.
    #[knus(property)]
    pub condition: Option<String>,

    /// Hit condition (`>=n`, `==n` or `%n`).
    #[knus(property)]
    pub hit: Option<String>,
}

/// Catchpoint on an exception class.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct Catch {
    /// Exception class.
    #[knus(argument)]
    pub class: String,
}

/// Commands issued on interactive stops, one per stop.
#[derive(Debug, Default, PartialEq, knus::Decode)]
pub struct OnStop {
    /// Commands, in order.
    #[knus(children)]
    pub commands: Vec<StopCommand>,
}

/// Command issued on an interactive stop.
#[derive(Debug, Clone, PartialEq, knus::Decode)]
pub enum StopCommand {
    /// Resumes execution.
    Continue,

    /// Stops after some line events, at any depth.
    Step(Count),

    /// Stops after some line events, without descending into calls.
    Next(Count),

    /// Stops once the current frame returns.
    Finish,
}

/// Repetition count of a stepping command.
#[derive(Debug, Clone, PartialEq, knus::Decode)]
pub struct Count {
    /// Number of lines.
    #[knus(argument, default = 1)]
    pub count: i64,
}

/// Events of a simulated thread.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct ThreadScript {
    /// Whether the thread belongs to the debugger.
    #[knus(property, default)]
    pub debugger: bool,

    /// Events, in order.
    #[knus(children)]
    pub events: Vec<Event>,
}

/// Execution event of a simulated thread.
#[derive(Debug, PartialEq, knus::Decode)]
pub enum Event {
    /// Moves to a new line.
    Line(LineEvent),

    /// Calls a method.
    Call(CallEvent),

    /// Returns from the innermost frame.
    Return,

    /// Raises an exception.
    Raise(RaiseEvent),

    /// Calls code without source-level visibility.
    ForeignCall,

    /// Returns from code without source-level visibility.
    ForeignReturn,

    /// Binds a local variable.
    Local(LocalEvent),
}

/// Line event.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct LineEvent {
    /// Source file.
    #[knus(argument)]
    pub path: String,

    /// Source line.
    #[knus(argument)]
    pub line: u32,
}

/// Call event.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct CallEvent {
    /// Class defining the method.
    #[knus(argument)]
    pub class: String,

    /// Method name.
    #[knus(argument)]
    pub method: String,

    /// Source file of the method.
    #[knus(argument)]
    pub path: String,

    /// Source line of the method.
    #[knus(argument)]
    pub line: u32,
}

/// Raise event.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct RaiseEvent {
    /// Class of the raised exception.
    #[knus(argument)]
    pub class: String,
}

/// Local variable binding.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct LocalEvent {
    /// Variable name.
    #[knus(argument)]
    pub name: String,

    /// Integer value.
    #[knus(argument)]
    pub value: i64,
}

/// Error of a script whose content is invalid.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ScriptError {
    /// A hit condition could not be parsed.
    #[error("invalid hit condition {0:?} (expected >=n, ==n or %n)")]
    InvalidHitCondition(String),
}

/// Parses a hit condition.
fn parse_hit_condition(hit: &str) -> Result<HitCondition, ScriptError> {
    let invalid = || ScriptError::InvalidHitCondition(hit.to_owned());

    let (make, value): (fn(u64) -> HitCondition, _) = if let Some(value) = hit.strip_prefix(">=")
    {
        (HitCondition::GreaterOrEqual, value)
    } else if let Some(value) = hit.strip_prefix("==") {
        (HitCondition::Equal, value)
    } else if let Some(value) = hit.strip_prefix('%') {
        (HitCondition::Modulo, value)
    } else {
        return Err(invalid());
    };

    value.trim().parse().map(make).map_err(|_| invalid())
}

fn with_options(
    mut breakpoint: Breakpoint,
    condition: Option<&String>,
    hit: Option<&String>,
) -> Result<Breakpoint, ScriptError> {
    if let Some(condition) = condition {
        breakpoint = breakpoint.with_condition(condition.clone());
    }

    if let Some(hit) = hit {
        breakpoint = breakpoint.with_hit_condition(parse_hit_condition(hit)?);
    }

    Ok(breakpoint)
}

impl PositionBreak {
    /// Converts the declaration into a debugger breakpoint.
    pub fn to_breakpoint(&self) -> Result<Breakpoint, ScriptError> {
        with_options(
            Breakpoint::at(self.path.clone(), self.line),
            self.condition.as_ref(),
            self.hit.as_ref(),
        )
    }
}

impl MethodBreak {
    /// Converts the declaration into a debugger breakpoint.
    pub fn to_breakpoint(&self) -> Result<Breakpoint, ScriptError> {
        with_options(
            Breakpoint::on_method(self.class.clone(), self.method.clone()),
            self.condition.as_ref(),
            self.hit.as_ref(),
        )
    }
}

/// Parses an execution script file.
pub fn parse_script(path: &Path) -> miette::Result<Script> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<script>");

    Ok(knus::parse(filename, &content)?)
}
