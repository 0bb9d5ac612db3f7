use std::collections::BTreeMap;

use haltpoint_engine::host::{Host, TracePoint};
use haltpoint_engine::{Debugger, Frame, Location, ScopeSnapshot};

use crate::exception::SimException;
use crate::host::SimHost;
use crate::value::SimValue;

/// Label of the frames pushed by foreign calls.
const FOREIGN_LABEL: &str = "<foreign>";

/// Driver of the simulated thread bound to the current OS thread.
///
/// Each function mutates the simulated call stack the way a runtime would,
/// and reports the matching event to the debugger.
pub struct ThreadDriver {
    debugger: Debugger<SimHost>,
}

impl ThreadDriver {
    /// Creates a driver reporting events to `debugger`.
    pub fn new(debugger: &Debugger<SimHost>) -> Self {
        Self {
            debugger: debugger.clone(),
        }
    }

    fn host(&self) -> &SimHost {
        self.debugger.host()
    }

    /// Location of the innermost frame.
    fn location(&self) -> (String, u32) {
        self.host().with_frames(|frames| {
            frames.last().map_or_else(
                || (String::new(), 0),
                |frame| (frame.location.path.clone(), frame.location.line),
            )
        })
    }

    fn trace_point(&self) -> SimTracePoint<'_> {
        let (path, line) = self.location();

        SimTracePoint {
            host: self.host(),
            path,
            line,
        }
    }

    /// Moves the innermost frame to a new line.
    pub fn line(&self, path: &str, line: u32) {
        self.host().with_frames(|frames| {
            if let Some(frame) = frames.last_mut() {
                frame.location.path = path.to_owned();
                frame.location.line = line;
            }
        });

        self.debugger.on_line(&self.trace_point());
    }

    /// Calls `class#method`, defined at `path:line`.
    pub fn call(&self, class: &str, method: &str, path: &str, line: u32) {
        self.host().with_frames(|frames| {
            frames.push(Frame {
                location: Location {
                    path: path.to_owned(),
                    line,
                    label: method.to_owned(),
                },
                receiver: SimValue::Object {
                    class: class.to_owned(),
                },
                class: Some(SimValue::Class(class.to_owned())),
                binding: Some(SimValue::Binding(BTreeMap::new())),
            });
        });

        self.debugger.on_call(&self.trace_point(), class, method);
    }

    /// Returns from the innermost frame.
    pub fn ret(&self) {
        self.debugger.on_return(&self.trace_point());

        self.host().with_frames(|frames| {
            frames.pop();
        });
    }

    /// Raises an exception from the innermost frame.
    ///
    /// The call stack is left untouched: the exception unwinds through
    /// [ret](Self::ret) calls.
    pub fn raise(&self, exception: &SimException) {
        self.debugger.on_raise(&self.trace_point(), exception);
    }

    /// Calls into code without source-level visibility.
    pub fn foreign_call(&self) {
        let (path, line) = self.location();

        self.host().with_frames(|frames| {
            frames.push(Frame {
                location: Location {
                    path,
                    line,
                    label: FOREIGN_LABEL.to_owned(),
                },
                receiver: SimValue::Nil,
                class: None,
                binding: None,
            });
        });

        self.debugger.on_foreign_call();
    }

    /// Returns from code without source-level visibility.
    pub fn foreign_return(&self) {
        self.debugger.on_foreign_return();

        self.host().with_frames(|frames| {
            frames.pop();
        });
    }

    /// Binds a local variable in the innermost frame.
    pub fn set_local(&self, name: &str, value: impl Into<SimValue>) {
        let value = value.into();

        self.host().with_frames(|frames| {
            if let Some(frame) = frames.last_mut() {
                let binding = frame
                    .binding
                    .get_or_insert_with(|| SimValue::Binding(BTreeMap::new()));

                if let SimValue::Binding(locals) = binding {
                    locals.insert(name.to_owned(), value);
                }
            }
        });
    }

    /// Height of the simulated call stack.
    pub fn stack_height(&self) -> usize {
        self.host().with_frames(|frames| frames.len())
    }
}

/// Execution point of the current simulated thread.
struct SimTracePoint<'a> {
    host: &'a SimHost,
    path: String,
    line: u32,
}

impl TracePoint<SimHost> for SimTracePoint<'_> {
    fn path(&self) -> &str {
        &self.path
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn inspect(&self) -> ScopeSnapshot<SimValue> {
        self.host.snapshot(&self.host.current_thread())
    }
}
