use std::collections::HashMap;

use super::Debugger;
use crate::context::Context;
use crate::host::{Exception, Host, TracePoint};

/// Debugger state attached to a raised exception.
///
/// It is recorded when an exception is raised while post-mortem mode is
/// enabled, so the raise point can be inspected once the exception escaped.
pub struct PostMortem<H: Host> {
    /// Source file of the raise point.
    pub path: String,

    /// Source line of the raise point.
    pub line: u32,

    /// Lexical bindings of the raise point.
    pub binding: Option<H::Value>,

    /// Frozen copy of the raising thread's context.
    pub context: Context<H>,
}

impl<H: Host> Clone for PostMortem<H> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            line: self.line,
            binding: self.binding.clone(),
            context: self.context.clone(),
        }
    }
}

impl<H: Host> std::fmt::Debug for PostMortem<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostMortem")
            .field("path", &self.path)
            .field("line", &self.line)
            .field("binding", &self.binding)
            .field("context", &self.context)
            .finish()
    }
}

/// Post-mortem states of a session, keyed by exception identity.
///
/// Only the last exception raised by each thread is kept: an exception
/// escaping uncaught is the last one its thread raised.
pub(crate) struct PostMortems<H: Host> {
    by_identity: HashMap<u64, PostMortem<H>>,

    /// Identity of the last exception raised by each thread number.
    by_thnum: HashMap<usize, u64>,
}

impl<H: Host> PostMortems<H> {
    pub(crate) fn new() -> Self {
        Self {
            by_identity: HashMap::new(),
            by_thnum: HashMap::new(),
        }
    }

    /// Records the post-mortem state of an exception, replacing the one of
    /// the previous exception raised by the same thread.
    fn insert(&mut self, identity: u64, post_mortem: PostMortem<H>) {
        let thnum = post_mortem.context.thnum();

        if let Some(previous) = self.by_thnum.insert(thnum, identity) {
            if previous != identity {
                self.by_identity.remove(&previous);
            }
        }

        self.by_identity.insert(identity, post_mortem);
    }

    fn get(&self, identity: u64) -> Option<&PostMortem<H>> {
        self.by_identity.get(&identity)
    }

    fn remove(&mut self, identity: u64) -> Option<PostMortem<H>> {
        let post_mortem = self.by_identity.remove(&identity)?;

        let thnum = post_mortem.context.thnum();
        if self.by_thnum.get(&thnum) == Some(&identity) {
            self.by_thnum.remove(&thnum);
        }

        Some(post_mortem)
    }

    pub(crate) fn clear(&mut self) {
        self.by_identity.clear();
        self.by_thnum.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_identity.len()
    }
}

impl<H: Host> Debugger<H> {
    /// Post-mortem state recorded for `exception`, if any.
    ///
    /// Only the last exception raised by each thread has one.
    pub fn post_mortem_for(&self, exception: &H::Exception) -> Option<PostMortem<H>> {
        self.shared
            .post_mortems
            .lock()
            .get(exception.identity())
            .cloned()
    }

    /// Removes and returns the post-mortem state recorded for `exception`.
    pub fn take_post_mortem(&self, exception: &H::Exception) -> Option<PostMortem<H>> {
        self.shared
            .post_mortems
            .lock()
            .remove(exception.identity())
    }

    /// Number of post-mortem states currently recorded.
    pub fn post_mortem_count(&self) -> usize {
        self.shared.post_mortems.lock().len()
    }

    /// Records a post-mortem copy of `context` for a raised exception.
    pub(super) fn record_post_mortem(
        &self,
        context: &Context<H>,
        tp: &impl TracePoint<H>,
        exception: &H::Exception,
    ) {
        let snapshot = tp.inspect();
        let binding = snapshot.innermost_binding().cloned();

        let post_mortem = PostMortem {
            path: tp.path().to_owned(),
            line: tp.line(),
            binding,
            context: context.post_mortem_copy(snapshot),
        };

        tracing::debug!(
            identity = exception.identity(),
            path = %post_mortem.path,
            line = post_mortem.line,
            "post-mortem context recorded"
        );

        self.shared
            .post_mortems
            .lock()
            .insert(exception.identity(), post_mortem);
    }
}
