use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use haltpoint_engine::handler::StopHandler;
use haltpoint_engine::{Breakpoint, BreakpointId, Context, Debugger, StopReason};
use haltpoint_sim::{SimException, SimHost};
use parking_lot::Mutex;

/// Command run by the handler on an interactive stop.
type Command = Box<dyn FnOnce(&Debugger<SimHost>, &Context<SimHost>) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stop {
    Line {
        thnum: usize,
        path: String,
        line: u32,
        depth: i64,
        reason: StopReason,
    },
    Breakpoint {
        thnum: usize,
        id: BreakpointId,
    },
    Catchpoint {
        thnum: usize,
        class: String,
        reason: StopReason,
    },
}

impl Stop {
    pub fn line(path: &str, line: u32, depth: i64, reason: StopReason) -> Self {
        Self::Line {
            thnum: 1,
            path: path.to_owned(),
            line,
            depth,
            reason,
        }
    }

    pub const fn breakpoint(id: BreakpointId) -> Self {
        Self::Breakpoint { thnum: 1, id }
    }
}

/// Stop handler recording every callback.
///
/// Commands queued with [on_stop](Self::on_stop) are run in order, one per
/// line or catchpoint stop.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

#[derive(Default)]
struct RecorderInner {
    stops: Mutex<Vec<Stop>>,
    commands: Mutex<VecDeque<Command>>,
    traced: Mutex<Vec<(usize, String, u32)>>,
    inside: AtomicUsize,
    max_inside: AtomicUsize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_stop(&self, f: impl FnOnce(&Debugger<SimHost>, &Context<SimHost>) + Send + 'static) {
        self.inner.commands.lock().push_back(Box::new(f));
    }

    pub fn stops(&self) -> Vec<Stop> {
        self.inner.stops.lock().clone()
    }

    pub fn line_stops(&self) -> Vec<(String, u32)> {
        self.stops()
            .into_iter()
            .filter_map(|stop| match stop {
                Stop::Line { path, line, .. } => Some((path, line)),
                _ => None,
            })
            .collect()
    }

    pub fn breakpoint_count(&self) -> usize {
        self.stops()
            .iter()
            .filter(|stop| matches!(stop, Stop::Breakpoint { .. }))
            .count()
    }

    pub fn traced(&self) -> Vec<(usize, String, u32)> {
        self.inner.traced.lock().clone()
    }

    /// Highest number of callbacks observed running at the same time.
    pub fn max_concurrent_callbacks(&self) -> usize {
        self.inner.max_inside.load(Ordering::SeqCst)
    }

    fn enter(&self) -> CallbackGuard<'_> {
        let inside = self.inner.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_inside.fetch_max(inside, Ordering::SeqCst);

        // leaves room for another thread to sneak in
        std::thread::yield_now();

        CallbackGuard {
            inside: &self.inner.inside,
        }
    }

    fn run_command(&self, debugger: &Debugger<SimHost>, context: &Context<SimHost>) {
        let command = self.inner.commands.lock().pop_front();
        if let Some(command) = command {
            command(debugger, context);
        }
    }
}

struct CallbackGuard<'a> {
    inside: &'a AtomicUsize,
}

impl Drop for CallbackGuard<'_> {
    fn drop(&mut self) {
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StopHandler<SimHost> for Recorder {
    fn at_line(
        &self,
        debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        path: &str,
        line: u32,
    ) {
        let _guard = self.enter();

        assert_eq!(context.frame_file(0).unwrap(), path);
        assert_eq!(context.frame_line(0).unwrap(), line);

        self.inner.stops.lock().push(Stop::Line {
            thnum: context.thnum(),
            path: path.to_owned(),
            line,
            depth: context.depth(),
            reason: context.stop_reason(),
        });

        self.run_command(debugger, context);
    }

    fn at_breakpoint(
        &self,
        _debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        breakpoint: &Breakpoint,
    ) {
        let _guard = self.enter();

        assert_eq!(context.breakpoint(), Some(breakpoint.id()));

        self.inner.stops.lock().push(Stop::Breakpoint {
            thnum: context.thnum(),
            id: breakpoint.id(),
        });
    }

    fn at_catchpoint(
        &self,
        debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        exception: &SimException,
    ) {
        let _guard = self.enter();

        self.inner.stops.lock().push(Stop::Catchpoint {
            thnum: context.thnum(),
            class: exception.class().to_owned(),
            reason: context.stop_reason(),
        });

        self.run_command(debugger, context);
    }

    fn at_tracing(
        &self,
        _debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        path: &str,
        line: u32,
    ) {
        let _guard = self.enter();

        self.inner
            .traced
            .lock()
            .push((context.thnum(), path.to_owned(), line));
    }
}
