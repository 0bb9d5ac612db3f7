use std::collections::VecDeque;
use std::sync::Arc;

use haltpoint_engine::handler::StopHandler;
use haltpoint_engine::{Breakpoint, Context, Debugger};
use haltpoint_sim::{SimException, SimHost};
use parking_lot::Mutex;

use crate::report::Report;
use crate::script::StopCommand;

/// Stop handler recording reports, and issuing scripted commands on
/// interactive stops.
#[derive(Clone)]
pub struct ReplayHandler {
    reports: Arc<Mutex<Vec<Report>>>,
    commands: Arc<Mutex<VecDeque<StopCommand>>>,
}

impl ReplayHandler {
    /// Initializes the handler with the commands to issue, in order.
    pub fn new(commands: impl IntoIterator<Item = StopCommand>) -> Self {
        Self {
            reports: Arc::default(),
            commands: Arc::new(Mutex::new(commands.into_iter().collect())),
        }
    }

    /// Records a report emitted outside of a stop callback.
    pub fn push(&self, report: Report) {
        self.reports.lock().push(report);
    }

    /// Reports recorded so far.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    fn issue_next_command(&self, context: &Context<SimHost>) {
        let Some(command) = self.commands.lock().pop_front() else {
            return;
        };

        tracing::debug!(thnum = context.thnum(), ?command, "issuing command");

        let res = match &command {
            StopCommand::Continue => Ok(()),
            StopCommand::Step(count) => context.step(count.count, false),
            StopCommand::Next(count) => context.step_over(count.count, None, false),
            StopCommand::Finish => context.stop_frame(0),
        };

        if let Err(e) = res {
            tracing::warn!(?command, error = %e, "command rejected");
        }
    }
}

impl StopHandler<SimHost> for ReplayHandler {
    fn at_line(
        &self,
        _debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        path: &str,
        line: u32,
    ) {
        self.push(Report::Stop {
            thnum: context.thnum(),
            path: path.to_owned(),
            line,
            depth: context.depth(),
            reason: context.stop_reason(),
        });

        self.issue_next_command(context);
    }

    fn at_breakpoint(
        &self,
        _debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        breakpoint: &Breakpoint,
    ) {
        self.push(Report::Breakpoint {
            thnum: context.thnum(),
            id: breakpoint.id(),
            source: breakpoint.source().to_string(),
            hits: breakpoint.hit_count(),
        });
    }

    fn at_catchpoint(
        &self,
        _debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        exception: &SimException,
    ) {
        self.push(Report::Catchpoint {
            thnum: context.thnum(),
            class: exception.class().to_owned(),
        });
    }

    fn at_tracing(
        &self,
        _debugger: &Debugger<SimHost>,
        context: &Context<SimHost>,
        path: &str,
        line: u32,
    ) {
        self.push(Report::Trace {
            thnum: context.thnum(),
            path: path.to_owned(),
            line,
        });
    }
}
