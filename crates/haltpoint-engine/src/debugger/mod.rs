mod builder;
mod dispatch;
mod post_mortem;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

pub use self::builder::Builder;
pub use self::post_mortem::PostMortem;
use self::post_mortem::PostMortems;
use crate::breakpoint::{Breakpoint, BreakpointId, BreakpointSet, CatchpointSet};
use crate::config::Config;
use crate::context::{Context, ContextFlags};
use crate::error::{Error, LoadError, ProgramError, Result};
use crate::handler::StopHandler;
use crate::host::Host;
use crate::registry::Registry;
use crate::token::ExecutionToken;

/// Debugger session observing a host runtime.
///
/// The session is fed with the execution events of the host (see
/// [on_line](Self::on_line) and friends), and decides for each of them
/// whether the current thread must stop. Handles are cheap to clone and
/// refer to the same session.
pub struct Debugger<H: Host> {
    shared: Arc<Shared<H>>,
}

impl<H: Host> Clone for Debugger<H> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Callback run by [Debugger::run_exit_hooks].
type ExitHook = Box<dyn FnOnce() + Send>;

/// State of a session shared by its handles and contexts.
pub(crate) struct Shared<H: Host> {
    pub(crate) host: H,
    handler: Box<dyn StopHandler<H>>,
    config: Config,

    /// Number of nested [Debugger::start] calls.
    start_count: Mutex<usize>,
    started: AtomicBool,

    state: Mutex<SessionState<H>>,
    token: ExecutionToken<H>,

    tracing: AtomicBool,
    post_mortem: AtomicBool,
    event_count: AtomicU64,

    /// Thread number of the last stopped context (0 if none).
    last_thnum: AtomicUsize,

    post_mortems: Mutex<PostMortems<H>>,

    /// Hooks registered with [Debugger::at_exit], in registration order.
    exit_hooks: Mutex<Vec<ExitHook>>,
}

impl<H: Host> Shared<H> {
    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

/// Per-session collections, reset on each start.
struct SessionState<H: Host> {
    registry: Registry<H>,
    breakpoints: BreakpointSet,
    catchpoints: CatchpointSet,
}

impl<H: Host> SessionState<H> {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            breakpoints: BreakpointSet::default(),
            catchpoints: CatchpointSet::default(),
        }
    }
}

impl<H: Host> Debugger<H> {
    pub(crate) fn new(host: H, handler: Box<dyn StopHandler<H>>, config: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                host,
                handler,
                tracing: AtomicBool::new(config.tracing),
                post_mortem: AtomicBool::new(config.post_mortem),
                config,
                start_count: Mutex::new(0),
                started: AtomicBool::new(false),
                state: Mutex::new(SessionState::new()),
                token: ExecutionToken::new(),
                event_count: AtomicU64::new(0),
                last_thnum: AtomicUsize::new(0),
                post_mortems: Mutex::new(PostMortems::new()),
                exit_hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Host runtime observed by the session.
    pub fn host(&self) -> &H {
        &self.shared.host
    }

    /// Settings of the session.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Starts the session.
    ///
    /// Starts are reference-counted: the session is only stopped once
    /// [stop](Self::stop) was called as many times as this function.
    ///
    /// Returns `true` if the session was not started before.
    #[tracing::instrument(name = "Start", skip(self))]
    pub fn start(&self) -> bool {
        let mut start_count = self.shared.start_count.lock();
        *start_count += 1;

        if self.is_started() {
            return false;
        }

        *self.shared.state.lock() = SessionState::new();
        self.shared.post_mortems.lock().clear();
        self.shared.last_thnum.store(0, Ordering::Relaxed);
        self.shared
            .tracing
            .store(self.shared.config.tracing, Ordering::Relaxed);
        self.shared
            .post_mortem
            .store(self.shared.config.post_mortem, Ordering::Relaxed);
        self.shared.started.store(true, Ordering::Release);

        let thread = self.shared.host.current_thread();
        self.resolve_thread(&thread);

        tracing::info!("debugger started");
        true
    }

    /// Stops the session.
    ///
    /// Returns `true` if the session is actually stopped (last nested
    /// start).
    #[tracing::instrument(name = "Stop", skip(self))]
    pub fn stop(&self) -> Result<bool> {
        let mut start_count = self.shared.start_count.lock();
        if !self.is_started() {
            return Err(Error::NotStarted);
        }

        *start_count = start_count.saturating_sub(1);
        if *start_count > 0 {
            return Ok(false);
        }

        self.shared.started.store(false, Ordering::Release);
        let state = std::mem::replace(&mut *self.shared.state.lock(), SessionState::new());
        self.shared.token.reset();

        for context in state.registry.contexts() {
            context.resume_unchecked();
        }

        tracing::info!("debugger stopped");
        Ok(true)
    }

    /// Whether the session is started.
    pub fn is_started(&self) -> bool {
        self.shared.is_started()
    }

    fn check_started(&self) -> Result<()> {
        if self.is_started() {
            Ok(())
        } else {
            Err(Error::NotStarted)
        }
    }

    /// Returns the context of `thread`, creating it if needed.
    ///
    /// The returned boolean tells whether the context was just created.
    fn resolve_thread(&self, thread: &H::Thread) -> (Context<H>, bool) {
        let weak = Arc::downgrade(&self.shared);
        self.shared
            .state
            .lock()
            .registry
            .lookup_or_create(&self.shared.host, thread, &weak)
    }

    /// Context of the calling thread.
    pub fn current_context(&self) -> Result<Context<H>> {
        self.check_started()?;
        let thread = self.shared.host.current_thread();
        Ok(self.resolve_thread(&thread).0)
    }

    /// Context of the given thread.
    pub fn thread_context(&self, thread: &H::Thread) -> Result<Context<H>> {
        self.check_started()?;
        Ok(self.resolve_thread(thread).0)
    }

    /// Contexts of every live thread, ordered by thread number.
    pub fn contexts(&self) -> Result<Vec<Context<H>>> {
        self.check_started()?;
        let weak = Arc::downgrade(&self.shared);
        Ok(self
            .shared
            .state
            .lock()
            .registry
            .all(&self.shared.host, &weak))
    }

    /// Context of the thread which stopped last.
    pub fn last_context(&self) -> Result<Option<Context<H>>> {
        self.check_started()?;

        let thnum = self.shared.last_thnum.load(Ordering::Relaxed);
        if thnum == 0 {
            return Ok(None);
        }

        Ok(self.shared.state.lock().registry.find_thnum(thnum))
    }

    /// Number of live contexts known to the session.
    pub fn context_count(&self) -> Result<usize> {
        self.check_started()?;
        Ok(self.shared.state.lock().registry.len())
    }

    /// Suspends every thread but the calling one.
    pub fn suspend_all(&self) -> Result<()> {
        let current = self.current_context()?;

        for context in self.contexts()? {
            if !context.ptr_eq(&current) {
                context.suspend_unchecked();
            }
        }

        tracing::debug!("suspended all threads");
        Ok(())
    }

    /// Resumes every thread but the calling one.
    pub fn resume_all(&self) -> Result<()> {
        let current = self.current_context()?;

        for context in self.contexts()? {
            if !context.ptr_eq(&current) {
                context.resume_unchecked();
            }
        }

        tracing::debug!("resumed all threads");
        Ok(())
    }

    /// Whether line events of every thread are traced.
    pub fn tracing(&self) -> bool {
        self.shared.tracing.load(Ordering::Relaxed)
    }

    /// Enables or disables the tracing of line events of every thread.
    pub fn set_tracing(&self, enabled: bool) {
        self.shared.tracing.store(enabled, Ordering::Relaxed);
    }

    /// Whether raised exceptions carry a post-mortem context.
    pub fn post_mortem(&self) -> bool {
        self.shared.post_mortem.load(Ordering::Relaxed)
    }

    /// Enables or disables post-mortem contexts.
    pub fn set_post_mortem(&self, enabled: bool) -> Result<()> {
        self.check_started()?;
        self.shared.post_mortem.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    /// Number of events processed since the debugger was built.
    pub fn event_count(&self) -> u64 {
        self.shared.event_count.load(Ordering::Relaxed)
    }

    /// Adds a breakpoint, returning its identifier.
    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> Result<BreakpointId> {
        self.check_started()?;

        let id = self.shared.state.lock().breakpoints.add(breakpoint);
        tracing::debug!(%id, "breakpoint added");

        Ok(id)
    }

    /// Removes a breakpoint, returning it if it existed.
    pub fn remove_breakpoint(&self, id: BreakpointId) -> Result<Option<Breakpoint>> {
        self.check_started()?;
        Ok(self.shared.state.lock().breakpoints.remove(id))
    }

    /// Returns a breakpoint by identifier.
    pub fn breakpoint(&self, id: BreakpointId) -> Result<Option<Breakpoint>> {
        self.check_started()?;
        Ok(self.shared.state.lock().breakpoints.get(id).cloned())
    }

    /// Returns every breakpoint, in insertion order.
    pub fn breakpoints(&self) -> Result<Vec<Breakpoint>> {
        self.check_started()?;
        Ok(self.shared.state.lock().breakpoints.list())
    }

    /// Enables or disables a breakpoint.
    ///
    /// Returns `false` if the breakpoint does not exist.
    pub fn set_breakpoint_enabled(&self, id: BreakpointId, enabled: bool) -> Result<bool> {
        self.check_started()?;
        Ok(self
            .shared
            .state
            .lock()
            .breakpoints
            .set_enabled(id, enabled))
    }

    /// Registers a catchpoint on the given exception class (and its
    /// subclasses).
    ///
    /// The hit count of an existing catchpoint is reset.
    pub fn add_catchpoint(&self, class: impl Into<String>) -> Result<()> {
        self.check_started()?;
        self.shared.state.lock().catchpoints.add(class.into());
        Ok(())
    }

    /// Removes a catchpoint, returning whether it existed.
    pub fn remove_catchpoint(&self, class: &str) -> Result<bool> {
        self.check_started()?;
        Ok(self.shared.state.lock().catchpoints.remove(class))
    }

    /// Returns every catchpoint with its hit count, in registration order.
    pub fn catchpoints(&self) -> Result<Vec<(String, u64)>> {
        self.check_started()?;
        Ok(self.shared.state.lock().catchpoints.list())
    }

    /// Runs `f` with the events of the calling thread ignored.
    pub fn skip<T>(&self, f: impl FnOnce() -> T) -> T {
        let Ok(context) = self.current_context() else {
            return f();
        };

        let _skipped = SkipGuard::new(context);
        f()
    }

    /// Registers a hook run by [run_exit_hooks](Self::run_exit_hooks) when
    /// the host program exits.
    pub fn at_exit(&self, hook: impl FnOnce() + Send + 'static) {
        self.shared.exit_hooks.lock().push(Box::new(hook));
    }

    /// Runs the hooks registered with [at_exit](Self::at_exit), most recent
    /// first, and forgets them.
    ///
    /// While a session is started, the events of the calling thread are
    /// ignored during each hook.
    pub fn run_exit_hooks(&self) {
        let hooks = std::mem::take(&mut *self.shared.exit_hooks.lock());
        tracing::debug!(count = hooks.len(), "running exit hooks");

        for hook in hooks.into_iter().rev() {
            self.skip(hook);
        }
    }

    /// Runs `program` under the debugger.
    ///
    /// If `stop` is set, the calling thread stops on its first line event.
    ///
    /// On success, the session is stopped. On failure, every other thread
    /// is suspended and the program error is returned, while the session
    /// stays started for post-mortem inspection.
    #[tracing::instrument(name = "DebugLoad", skip(self, program))]
    pub fn debug_load<T, E>(
        &self,
        stop: bool,
        program: impl FnOnce() -> core::result::Result<T, E>,
    ) -> core::result::Result<T, LoadError<E>> {
        self.start();

        let context = self.current_context()?;
        if stop {
            context.lock().stepping.stop_next = 1;
        }

        match program() {
            Ok(value) => {
                if self.is_started() {
                    self.stop()?;
                }
                Ok(value)
            }
            Err(e) => {
                tracing::info!("program failed");

                if self.is_started() {
                    self.suspend_all()?;
                }
                context.lock().stepping.reset();

                Err(ProgramError(e).into())
            }
        }
    }
}

/// Guard flagging a context as skipped until dropped.
struct SkipGuard<H: Host> {
    context: Context<H>,
    was_skipped: bool,
}

impl<H: Host> SkipGuard<H> {
    fn new(context: Context<H>) -> Self {
        let was_skipped = {
            let mut state = context.lock();
            let was_skipped = state.flags.contains(ContextFlags::SKIPPED);
            state.flags.insert(ContextFlags::SKIPPED);
            was_skipped
        };

        Self {
            context,
            was_skipped,
        }
    }
}

impl<H: Host> Drop for SkipGuard<H> {
    fn drop(&mut self) {
        self.context
            .lock()
            .flags
            .set(ContextFlags::SKIPPED, self.was_skipped);
    }
}
