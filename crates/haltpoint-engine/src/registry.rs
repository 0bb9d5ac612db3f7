use std::collections::HashMap;
use std::sync::Weak;

use crate::context::Context;
use crate::debugger::Shared;
use crate::host::{Host, Thread};

/// Debug contexts of a session, keyed by host thread.
pub(crate) struct Registry<H: Host> {
    contexts: HashMap<H::Thread, Context<H>>,

    /// Most recently looked-up context.
    last: Option<Context<H>>,

    next_thnum: usize,

    /// Event count at the last liveness sweep.
    last_sweep: u64,
}

impl<H: Host> Registry<H> {
    pub(crate) fn new() -> Self {
        Self {
            contexts: HashMap::new(),
            last: None,
            next_thnum: 0,
            last_sweep: 0,
        }
    }

    /// Returns the context of `thread`, if it was created.
    pub(crate) fn lookup(&mut self, thread: &H::Thread) -> Option<Context<H>> {
        if let Some(last) = &self.last {
            if last.thread() == thread {
                return Some(last.clone());
            }
        }

        let context = self.contexts.get(thread)?.clone();
        self.last = Some(context.clone());
        Some(context)
    }

    /// Returns the context of `thread`, creating it if needed.
    ///
    /// The returned boolean tells whether the context was just created.
    pub(crate) fn lookup_or_create(
        &mut self,
        host: &H,
        thread: &H::Thread,
        session: &Weak<Shared<H>>,
    ) -> (Context<H>, bool) {
        if let Some(context) = self.lookup(thread) {
            return (context, false);
        }

        self.next_thnum += 1;

        let depth = i64::try_from(host.stack_size(thread)).unwrap_or(i64::MAX);
        let context = Context::new(thread.clone(), self.next_thnum, depth, session.clone());

        tracing::debug!(thnum = self.next_thnum, depth, ?thread, "new debug context");

        self.contexts.insert(thread.clone(), context.clone());
        self.last = Some(context.clone());

        (context, true)
    }

    /// Returns the contexts of every live host thread, ordered by thread
    /// number.
    ///
    /// Contexts of terminated threads are dropped.
    pub(crate) fn all(&mut self, host: &H, session: &Weak<Shared<H>>) -> Vec<Context<H>> {
        let mut contexts: Vec<_> = host
            .threads()
            .iter()
            .filter(|thread| thread.is_alive())
            .map(|thread| self.lookup_or_create(host, thread, session).0)
            .collect();

        self.contexts = contexts
            .iter()
            .map(|context| (context.thread().clone(), context.clone()))
            .collect();
        self.last = None;

        contexts.sort_by_key(Context::thnum);
        contexts
    }

    /// Drops the contexts of terminated threads, if at least `interval`
    /// events were processed since the last sweep.
    pub(crate) fn sweep_if_due(&mut self, event_count: u64, interval: u64) {
        if event_count.saturating_sub(self.last_sweep) < interval {
            return;
        }
        self.last_sweep = event_count;

        let before = self.contexts.len();
        self.contexts.retain(|thread, _| thread.is_alive());

        if self
            .last
            .as_ref()
            .is_some_and(|last| !last.thread().is_alive())
        {
            self.last = None;
        }

        tracing::debug!(dropped = before - self.contexts.len(), "swept debug contexts");
    }

    /// Known contexts, in no particular order.
    pub(crate) fn contexts(&self) -> impl Iterator<Item = &Context<H>> {
        self.contexts.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns the live context with the given thread number.
    pub(crate) fn find_thnum(&self, thnum: usize) -> Option<Context<H>> {
        self.contexts
            .values()
            .find(|context| context.thnum() == thnum)
            .cloned()
    }
}
