use std::sync::atomic::Ordering;

use super::Debugger;
use crate::breakpoint::{self, Breakpoint, BreakpointId, BreakpointSource};
use crate::context::{Context, ContextFlags, StopReason};
use crate::host::{Exception, Host, TracePoint};

/// Event processed by a thread holding the execution token.
///
/// The token is released when dropped.
struct EventScope<'a, H: Host> {
    debugger: &'a Debugger<H>,
    context: Context<H>,
}

impl<H: Host> Drop for EventScope<'_, H> {
    fn drop(&mut self) {
        self.debugger.cleanup(&self.context);
    }
}

/// Guard flagging a context as running a catchpoint callback.
struct Catching<'a, H: Host> {
    context: &'a Context<H>,
}

impl<'a, H: Host> Catching<'a, H> {
    fn new(context: &'a Context<H>) -> Self {
        let mut state = context.lock();
        state.flags.insert(ContextFlags::CATCHING);
        state.stop_reason = StopReason::Catchpoint;
        drop(state);

        Self { context }
    }
}

impl<H: Host> Drop for Catching<'_, H> {
    fn drop(&mut self) {
        self.context.lock().flags.remove(ContextFlags::CATCHING);
    }
}

impl<H: Host> Debugger<H> {
    /// Processes a line event of the calling thread.
    #[tracing::instrument(
        name = "Line",
        level = "trace",
        skip_all,
        fields(path = tp.path(), line = tp.line())
    )]
    pub fn on_line(&self, tp: &impl TracePoint<H>) {
        let Some((context, _)) = self.resolve() else {
            return;
        };

        let (path, line) = (tp.path(), tp.line());

        let Some(scope) = self.enter(context, path, line) else {
            return;
        };
        let context = &scope.context;

        let moved = context.lock().has_moved(path, line);

        if self.tracing() || context.lock().flags.contains(ContextFlags::TRACING) {
            let _inspection = context.inspect(tp.inspect());
            self.shared.handler.at_tracing(self, context, path, line);
        }

        let step_stop = context.lock().advance_on_line(moved);
        let breakpoint = self.check_breakpoints(context, tp, |source| {
            source.matches_position(path, line)
        });

        if step_stop || breakpoint.is_some() {
            context.lock().stepping.reset();
            self.report_stop(context, tp, breakpoint);
        }
    }

    /// Processes a call event of the calling thread.
    ///
    /// `class` is the class defining the called `method`.
    #[tracing::instrument(name = "Call", level = "trace", skip(self, tp))]
    pub fn on_call(&self, tp: &impl TracePoint<H>, class: &str, method: &str) {
        let Some((context, created)) = self.resolve() else {
            return;
        };

        // a new context already accounts for the called frame
        if !created {
            context.lock().depth += 1;
        }

        let Some(scope) = self.enter(context, tp.path(), tp.line()) else {
            return;
        };
        let context = &scope.context;

        let breakpoint = self.check_breakpoints(context, tp, |source| {
            source.matches_method(class, method)
        });

        if breakpoint.is_some() {
            self.report_stop(context, tp, breakpoint);
        }
    }

    /// Processes a return event of the calling thread.
    #[tracing::instrument(name = "Return", level = "trace", skip_all)]
    pub fn on_return(&self, tp: &impl TracePoint<H>) {
        let Some((context, _)) = self.resolve() else {
            return;
        };

        context.lock().depth -= 1;

        let Some(scope) = self.enter(context, tp.path(), tp.line()) else {
            return;
        };

        scope.context.lock().frame_returned();
    }

    /// Processes a call of the calling thread into code without source-level
    /// visibility.
    pub fn on_foreign_call(&self) {
        let Some((context, created)) = self.resolve() else {
            return;
        };

        if !created {
            context.lock().depth += 1;
        }
    }

    /// Processes a return of the calling thread from code without
    /// source-level visibility.
    pub fn on_foreign_return(&self) {
        let Some((context, _)) = self.resolve() else {
            return;
        };

        let mut state = context.lock();
        state.depth -= 1;
        state.flags.insert(ContextFlags::ENABLE_BKPT);
    }

    /// Processes an exception raised by the calling thread.
    #[tracing::instrument(name = "Raise", level = "trace", skip_all)]
    pub fn on_raise(&self, tp: &impl TracePoint<H>, exception: &H::Exception) {
        let Some((context, _)) = self.resolve() else {
            return;
        };

        let Some(scope) = self.enter(context, tp.path(), tp.line()) else {
            return;
        };
        let context = &scope.context;

        if self.post_mortem() {
            self.record_post_mortem(context, tp, exception);
        }

        {
            let state = context.lock();
            if state.depth <= 0 || state.flags.contains(ContextFlags::CATCHING) {
                return;
            }
        }

        let ancestors = exception.ancestors();

        let class = {
            let mut state = self.shared.state.lock();
            if state.catchpoints.is_empty() {
                return;
            }
            match state.catchpoints.hit(&ancestors) {
                Some(class) => class,
                None => return,
            }
        };

        tracing::info!(thnum = context.thnum(), class, "catchpoint hit");

        let _catching = Catching::new(context);
        self.shared
            .last_thnum
            .store(context.thnum(), Ordering::Relaxed);

        let _inspection = context.inspect(tp.inspect());
        self.shared.handler.at_catchpoint(self, context, exception);
    }

    /// Resolves the context of the calling thread, if the session is
    /// started.
    fn resolve(&self) -> Option<(Context<H>, bool)> {
        if !self.is_started() {
            return None;
        }

        let thread = self.shared.host.current_thread();
        Some(self.resolve_thread(&thread))
    }

    /// Common entry of every event handler.
    ///
    /// Returns `None` if the event must not be processed any further.
    fn enter(&self, context: Context<H>, path: &str, line: u32) -> Option<EventScope<'_, H>> {
        self.shared.event_count.fetch_add(1, Ordering::Relaxed);

        if context.is_ignored() {
            tracing::trace!(thnum = context.thnum(), "ignored thread");
            return None;
        }

        if !self.shared.token.acquire(&context) {
            tracing::debug!(thnum = context.thnum(), "re-entrant event");
            return None;
        }

        let scope = EventScope {
            debugger: self,
            context,
        };

        if !self.is_started() {
            return None;
        }

        let (skipped, depth) = {
            let mut state = scope.context.lock();
            let skipped = state.flags.contains(ContextFlags::SKIPPED);

            // one breakpoint per line at most
            if !skipped && state.has_moved(path, line) {
                state.flags.insert(ContextFlags::ENABLE_BKPT);
            }

            (skipped, state.depth)
        };

        if skipped {
            tracing::debug!(thnum = scope.context.thnum(), "skipped event");
            return None;
        }

        tracing::trace!(thnum = scope.context.thnum(), depth, path, line, "event");
        Some(scope)
    }

    /// Common exit of every event handler.
    fn cleanup(&self, context: &Context<H>) {
        context.lock().stop_reason = StopReason::None;

        let event_count = self.event_count();
        self.shared
            .state
            .lock()
            .registry
            .sweep_if_due(event_count, self.shared.config.sweep_interval);

        self.shared.token.release(context);
    }

    /// Returns the first accepted breakpoint among the candidates, if
    /// breakpoints are armed for the context.
    fn check_breakpoints(
        &self,
        context: &Context<H>,
        tp: &impl TracePoint<H>,
        matches: impl Fn(&BreakpointSource) -> bool,
    ) -> Option<Breakpoint> {
        let mut candidates = {
            let state = context.lock();
            if !state.flags.contains(ContextFlags::ENABLE_BKPT) {
                return None;
            }

            // the breakpoint set on the context comes first
            state
                .context_breakpoint()
                .and_then(|bp| bp.candidate(&matches))
                .into_iter()
                .collect::<Vec<_>>()
        };

        candidates.extend(self.shared.state.lock().breakpoints.candidates(&matches));
        if candidates.is_empty() {
            return None;
        }

        let mut binding = None;

        breakpoint::accept(
            candidates,
            |condition| {
                let binding = binding.get_or_insert_with(|| tp.binding());

                match self.shared.host.evaluate(condition, binding.as_ref()) {
                    Ok(holds) => holds,
                    Err(e) => {
                        tracing::debug!(condition, error = %e, "breakpoint condition failed");
                        false
                    }
                }
            },
            |id| {
                if id == BreakpointId::CONTEXT {
                    context.lock().hit_context_breakpoint()
                } else {
                    self.shared.state.lock().breakpoints.hit(id)
                }
            },
        )
    }

    /// Reports an interactive stop of the context.
    ///
    /// A breakpoint already reported by the context is not reported again,
    /// and is cleared instead.
    fn report_stop(
        &self,
        context: &Context<H>,
        tp: &impl TracePoint<H>,
        breakpoint: Option<Breakpoint>,
    ) {
        let (path, line) = (tp.path(), tp.line());

        let breakpoint = {
            let mut state = context.lock();
            state.stop_reason = StopReason::Step;

            match breakpoint {
                Some(bp) if state.breakpoint.as_ref().map(Breakpoint::id) == Some(bp.id()) => {
                    state.breakpoint = None;
                    None
                }
                Some(bp) => {
                    state.breakpoint = Some(bp.clone());
                    state.stop_reason = StopReason::Breakpoint;
                    Some(bp)
                }
                None => None,
            }
        };

        self.shared
            .last_thnum
            .store(context.thnum(), Ordering::Relaxed);

        let _inspection = context.inspect(tp.inspect());

        if let Some(bp) = &breakpoint {
            tracing::info!(thnum = context.thnum(), id = %bp.id(), "breakpoint hit");
            self.shared.handler.at_breakpoint(self, context, bp);
        }

        context.lock().save_location(path, line);

        tracing::info!(thnum = context.thnum(), path, line, "stopped");
        self.shared.handler.at_line(self, context, path, line);
    }
}
