use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::context::Context;
use crate::host::Host;

/// Process-wide permit allowing a single thread to process debugger events.
pub(crate) struct ExecutionToken<H: Host> {
    state: Mutex<TokenState<H>>,
}

struct TokenState<H: Host> {
    /// Thread currently processing an event.
    holder: Option<H::Thread>,

    /// Contexts blocked until the token is released (FIFO).
    ///
    /// A context leaves the queue when it takes the token.
    waiting: VecDeque<Context<H>>,
}

impl<H: Host> TokenState<H> {
    fn dequeue(&mut self, context: &Context<H>) {
        self.waiting.retain(|waiting| !waiting.ptr_eq(context));
    }
}

impl<H: Host> ExecutionToken<H> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(TokenState {
                holder: None,
                waiting: VecDeque::new(),
            }),
        }
    }

    /// Blocks the calling thread until it holds the token on behalf of
    /// `context`.
    ///
    /// The thread is also blocked while `context` is suspended.
    ///
    /// Returns `false` without blocking if the calling thread already holds
    /// the token (event fired from within a stop callback).
    pub(crate) fn acquire(&self, context: &Context<H>) -> bool {
        let thread = context.thread();

        loop {
            let mut state = self.state.lock();

            match &state.holder {
                Some(holder) if holder == thread => return false,
                Some(_) => {
                    if !state.waiting.iter().any(|waiting| waiting.ptr_eq(context)) {
                        state.waiting.push_back(context.clone());
                    }
                    drop(state);

                    tracing::trace!(thnum = context.thnum(), "waiting for execution token");
                    context.wakeup().wait();
                    continue;
                }
                None => {}
            }

            state.dequeue(context);

            if context.halt_if_suspended() {
                // the token stays free: the next waiting thread may take it
                let next = state.waiting.pop_front();
                drop(state);

                if let Some(next) = next {
                    next.wakeup().notify();
                }

                tracing::debug!(thnum = context.thnum(), "suspended");
                context.resumed().wait();
                continue;
            }

            state.holder = Some(thread.clone());
            return true;
        }
    }

    /// Releases the token held on behalf of `context`, and wakes up the next
    /// waiting thread, if any.
    ///
    /// The woken thread competes again for the token. Nothing happens if the
    /// token is not held by the thread of `context` (e.g., after a session
    /// restart from within a stop callback).
    pub(crate) fn release(&self, context: &Context<H>) {
        let next = {
            let mut state = self.state.lock();
            if state.holder.as_ref() != Some(context.thread()) {
                return;
            }

            state.holder = None;
            state.waiting.pop_front()
        };

        if let Some(next) = next {
            next.wakeup().notify();
        }
    }

    /// Resets the token (session teardown), waking up every waiting thread.
    pub(crate) fn reset(&self) {
        let waiting = {
            let mut state = self.state.lock();
            state.holder = None;
            std::mem::take(&mut state.waiting)
        };

        for context in waiting {
            context.wakeup().notify();
        }
    }
}

/// One-permit wakeup signal of a thread blocked by the debugger.
///
/// A notification sent before the thread starts waiting is not lost.
#[derive(Default)]
pub(crate) struct Wakeup {
    signaled: Mutex<bool>,
    cvar: Condvar,
}

impl Wakeup {
    /// Blocks until notified, consuming the notification.
    pub(crate) fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cvar.wait(&mut signaled);
        }
        *signaled = false;
    }

    pub(crate) fn notify(&self) {
        *self.signaled.lock() = true;
        self.cvar.notify_one();
    }
}
