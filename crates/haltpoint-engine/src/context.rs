use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use crate::breakpoint::{Breakpoint, BreakpointId};
use crate::debugger::Shared;
use crate::host::{Host, Thread, ThreadStatus};
use crate::snapshot::{Frame, Location, ScopeSnapshot, SharedSnapshot};
use crate::token::Wakeup;
use crate::{Error, Result};

/// Value of a disabled stepping counter.
pub(crate) const DISABLED: i64 = -1;

bitflags::bitflags! {
    /// Flags of a debug context.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContextFlags: u16 {
        /// Events of the thread never stop.
        const IGNORE = 1 << 0;
        /// The thread is suspended.
        const SUSPEND = 1 << 1;
        /// The thread was runnable when suspended.
        const WAS_RUNNING = 1 << 2;
        /// Line events of the thread are traced.
        const TRACING = 1 << 3;
        /// The thread runs a skipped region.
        const SKIPPED = 1 << 4;
        /// The context is a post-mortem copy.
        const DEAD = 1 << 5;
        /// The thread runs a catchpoint callback.
        const CATCHING = 1 << 6;
        /// Breakpoints may fire on the next event.
        const ENABLE_BKPT = 1 << 7;
        /// A line event was processed since the last stop.
        const STEPPED = 1 << 8;
        /// Stepping requires the cursor to leave the current line.
        const FORCE_MOVE = 1 << 9;
    }
}

/// Reason why a context stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The context is not stopped.
    #[default]
    None,

    /// A stepping target was reached.
    Step,

    /// A breakpoint was hit.
    Breakpoint,

    /// A catchpoint was hit.
    Catchpoint,

    /// The context is a post-mortem copy.
    PostMortem,
}

/// Stepping state machine of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SteppingTarget {
    /// Line events left before stopping.
    pub(crate) stop_next: i64,

    /// Line events left (at `dest_frame`) before stopping.
    pub(crate) stop_line: i64,

    /// Depth at which line events are counted, any depth if disabled.
    pub(crate) dest_frame: i64,

    /// Depth whose return arms a stop on the next line event.
    pub(crate) stop_frame: i64,
}

impl SteppingTarget {
    pub(crate) const fn disabled() -> Self {
        Self {
            stop_next: DISABLED,
            stop_line: DISABLED,
            dest_frame: DISABLED,
            stop_frame: DISABLED,
        }
    }

    /// Disables the line counters (`stop_frame` is kept).
    pub(crate) fn reset(&mut self) {
        self.stop_next = DISABLED;
        self.stop_line = DISABLED;
        self.dest_frame = DISABLED;
    }
}

/// Mutable state of a debug context.
pub(crate) struct ContextState<V> {
    pub(crate) depth: i64,
    pub(crate) stepping: SteppingTarget,
    pub(crate) last_location: Option<(String, u32)>,
    /// Last reported breakpoint, or the breakpoint set on this context.
    pub(crate) breakpoint: Option<Breakpoint>,
    pub(crate) flags: ContextFlags,
    pub(crate) stop_reason: StopReason,
    pub(crate) inspected: Option<SharedSnapshot<V>>,
    pub(crate) thread_pause: bool,
}

impl<V> ContextState<V> {
    fn new(depth: i64, flags: ContextFlags) -> Self {
        Self {
            depth,
            stepping: SteppingTarget::disabled(),
            last_location: None,
            breakpoint: None,
            flags,
            stop_reason: StopReason::None,
            inspected: None,
            thread_pause: false,
        }
    }

    /// Stack height used by frame-relative commands.
    pub(crate) fn stack_size(&self) -> i64 {
        match &self.inspected {
            Some(snapshot) => i64::try_from(snapshot.len()).unwrap_or(i64::MAX),
            None => self.depth,
        }
    }

    /// Whether `(path, line)` differs from the last processed location.
    pub(crate) fn has_moved(&self, path: &str, line: u32) -> bool {
        self.last_location
            .as_ref()
            .is_none_or(|(last_path, last_line)| last_path != path || *last_line != line)
    }

    /// The breakpoint set on this context, if it is still armed.
    pub(crate) fn context_breakpoint(&self) -> Option<&Breakpoint> {
        self.breakpoint
            .as_ref()
            .filter(|bp| bp.id() == BreakpointId::CONTEXT)
    }

    /// Counts a hit of the breakpoint set on this context.
    ///
    /// Returns the breakpoint if its hit condition is met.
    pub(crate) fn hit_context_breakpoint(&mut self) -> Option<Breakpoint> {
        let bp = self
            .breakpoint
            .as_mut()
            .filter(|bp| bp.id() == BreakpointId::CONTEXT)?;
        bp.hit().then(|| bp.clone())
    }

    /// Records the location of a stop.
    pub(crate) fn save_location(&mut self, path: &str, line: u32) {
        self.last_location = Some((path.to_owned(), line));
        self.flags
            .remove(ContextFlags::ENABLE_BKPT | ContextFlags::STEPPED | ContextFlags::FORCE_MOVE);
    }

    /// Advances the stepping counters on a line event.
    ///
    /// Returns whether stepping requires a stop at this line.
    pub(crate) fn advance_on_line(&mut self, moved: bool) -> bool {
        self.flags.insert(ContextFlags::STEPPED);

        let counts = moved || !self.flags.contains(ContextFlags::FORCE_MOVE);
        let target = &mut self.stepping;

        if target.dest_frame == DISABLED || self.depth == target.dest_frame {
            if counts {
                target.stop_next = (target.stop_next - 1).max(DISABLED);
                target.stop_line = (target.stop_line - 1).max(DISABLED);
                self.flags.remove(ContextFlags::STEPPED);
            }
        } else if self.depth < target.dest_frame {
            target.stop_next = 0;
        }

        if std::mem::take(&mut self.thread_pause) {
            target.stop_next = 0;
        }

        target.stop_next == 0 || target.stop_line == 0
    }

    /// Arms a stop on the next line event if the `stop_frame` target
    /// returned.
    ///
    /// `depth` must already account for the return.
    pub(crate) fn frame_returned(&mut self) {
        if self.stepping.stop_frame != DISABLED && self.depth + 1 == self.stepping.stop_frame {
            self.stepping.stop_next = 1;
            self.stepping.stop_frame = DISABLED;
        }

        self.flags.insert(ContextFlags::ENABLE_BKPT);
    }
}

/// Debug context of a host thread.
///
/// A context is created on the first event of its thread, and tracks the
/// thread's stepping progress, flags and stop reason. Handles are cheap to
/// clone and refer to the same context.
pub struct Context<H: Host> {
    inner: Arc<ContextInner<H>>,
}

struct ContextInner<H: Host> {
    thread: H::Thread,
    thnum: usize,
    session: Weak<Shared<H>>,
    state: Mutex<ContextState<H::Value>>,

    /// Signaled when the execution token may be free.
    wakeup: Wakeup,

    /// Signaled when the context is resumed.
    resumed: Wakeup,
}

impl<H: Host> Clone for Context<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host> std::fmt::Debug for Context<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Context")
            .field("thread", &self.inner.thread)
            .field("thnum", &self.inner.thnum)
            .field("depth", &state.depth)
            .field("flags", &state.flags)
            .finish()
    }
}

impl<H: Host> Context<H> {
    pub(crate) fn new(
        thread: H::Thread,
        thnum: usize,
        depth: i64,
        session: Weak<Shared<H>>,
    ) -> Self {
        let flags = if thread.is_debugger_thread() {
            ContextFlags::IGNORE
        } else {
            ContextFlags::empty()
        };

        Self {
            inner: Arc::new(ContextInner {
                thread,
                thnum,
                session,
                state: Mutex::new(ContextState::new(depth, flags)),
                wakeup: Wakeup::default(),
                resumed: Wakeup::default(),
            }),
        }
    }

    /// Copies this context into an inert post-mortem context holding the
    /// given snapshot.
    pub(crate) fn post_mortem_copy(&self, snapshot: ScopeSnapshot<H::Value>) -> Self {
        let state = self.lock();

        let copy = ContextState {
            depth: state.depth,
            stepping: SteppingTarget::disabled(),
            last_location: state.last_location.clone(),
            breakpoint: None,
            flags: state.flags | ContextFlags::DEAD,
            stop_reason: StopReason::None,
            inspected: Some(Arc::new(snapshot)),
            thread_pause: false,
        };

        Self {
            inner: Arc::new(ContextInner {
                thread: self.inner.thread.clone(),
                thnum: self.inner.thnum,
                session: self.inner.session.clone(),
                state: Mutex::new(copy),
                wakeup: Wakeup::default(),
                resumed: Wakeup::default(),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ContextState<H::Value>> {
        self.inner.state.lock()
    }

    pub(crate) fn wakeup(&self) -> &Wakeup {
        &self.inner.wakeup
    }

    pub(crate) fn resumed(&self) -> &Wakeup {
        &self.inner.resumed
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attaches a snapshot to the context until the returned guard is
    /// dropped.
    pub(crate) fn inspect(&self, snapshot: ScopeSnapshot<H::Value>) -> Inspection<'_, H> {
        self.lock().inspected = Some(Arc::new(snapshot));
        Inspection { context: self }
    }

    /// Marks the context as blocked if suspended.
    ///
    /// Returns whether the calling thread must wait to be resumed.
    pub(crate) fn halt_if_suspended(&self) -> bool {
        let mut state = self.lock();
        if state.flags.contains(ContextFlags::SUSPEND) {
            state.flags.insert(ContextFlags::WAS_RUNNING);
            true
        } else {
            false
        }
    }

    /// Suspends the context without any argument check.
    pub(crate) fn suspend_unchecked(&self) {
        let mut state = self.lock();

        match self.inner.thread.status() {
            ThreadStatus::Running => state.flags.insert(ContextFlags::WAS_RUNNING),
            ThreadStatus::Sleeping => state.flags.remove(ContextFlags::WAS_RUNNING),
            ThreadStatus::Dead => return,
        }

        state.flags.insert(ContextFlags::SUSPEND);
    }

    /// Resumes the context without any argument check.
    pub(crate) fn resume_unchecked(&self) {
        let was_running = {
            let mut state = self.lock();
            if !state.flags.contains(ContextFlags::SUSPEND) {
                return;
            }
            state.flags.remove(ContextFlags::SUSPEND);
            state.flags.contains(ContextFlags::WAS_RUNNING)
        };

        if was_running {
            self.inner.resumed.notify();
        }
    }

    fn session(&self) -> Result<Arc<Shared<H>>> {
        self.inner
            .session
            .upgrade()
            .filter(|shared| shared.is_started())
            .ok_or(Error::NotStarted)
    }

    fn live_state(&self) -> Result<MutexGuard<'_, ContextState<H::Value>>> {
        self.session()?;

        let state = self.lock();
        if state.flags.contains(ContextFlags::DEAD) {
            return Err(Error::DeadContext);
        }
        Ok(state)
    }

    fn is_current(&self, shared: &Shared<H>) -> bool {
        shared.host.current_thread() == self.inner.thread
    }

    /// Host thread of this context.
    pub fn thread(&self) -> &H::Thread {
        &self.inner.thread
    }

    /// Sequence number of this context, used for thread numbering.
    ///
    /// Numbers start at 1 and are never reused within a session.
    pub fn thnum(&self) -> usize {
        self.inner.thnum
    }

    /// Tracked call-stack height of the thread.
    ///
    /// This value is maintained from call and return events, and may
    /// transiently become negative.
    pub fn depth(&self) -> i64 {
        self.lock().depth
    }

    /// Flags of this context.
    pub fn flags(&self) -> ContextFlags {
        self.lock().flags
    }

    /// Reason of the current stop.
    pub fn stop_reason(&self) -> StopReason {
        let state = self.lock();
        if state.flags.contains(ContextFlags::DEAD) {
            StopReason::PostMortem
        } else {
            state.stop_reason
        }
    }

    /// Breakpoint being reported by this context, if any.
    ///
    /// [`BreakpointId::CONTEXT`] denotes the breakpoint set with
    /// [`Context::set_breakpoint`].
    pub fn breakpoint(&self) -> Option<BreakpointId> {
        self.lock().breakpoint.as_ref().map(Breakpoint::id)
    }

    /// Sets a one-shot breakpoint on this context only.
    ///
    /// It is checked before the global breakpoints, and replaces the
    /// breakpoint last reported by this context. Its first hit stops the
    /// context as a step and disarms it.
    pub fn set_breakpoint(&self, breakpoint: Breakpoint) -> Result<()> {
        let mut state = self.live_state()?;
        state.breakpoint = Some(breakpoint.into_context_breakpoint());
        Ok(())
    }

    /// Whether events of this context never stop.
    pub fn is_ignored(&self) -> bool {
        self.lock().flags.contains(ContextFlags::IGNORE)
    }

    /// Whether this context is a post-mortem copy.
    pub fn is_dead(&self) -> bool {
        self.lock().flags.contains(ContextFlags::DEAD)
    }

    /// Whether this context is suspended.
    pub fn is_suspended(&self) -> Result<bool> {
        self.session()?;
        Ok(self.lock().flags.contains(ContextFlags::SUSPEND))
    }

    /// Whether line events of this context are traced.
    pub fn tracing(&self) -> Result<bool> {
        self.session()?;
        Ok(self.lock().flags.contains(ContextFlags::TRACING))
    }

    /// Enables or disables the tracing of line events of this context.
    pub fn set_tracing(&self, enabled: bool) -> Result<()> {
        self.session()?;
        self.lock().flags.set(ContextFlags::TRACING, enabled);
        Ok(())
    }

    /// Stops after `steps` line events, at any depth.
    ///
    /// If `force` is set, only line events leaving the current line are
    /// counted.
    pub fn step(&self, steps: i64, force: bool) -> Result<()> {
        let mut state = self.live_state()?;

        if steps < 0 {
            return Err(Error::InvalidArgument(
                "steps argument can't be negative".to_owned(),
            ));
        }

        state.stepping.stop_next = steps;
        state.stepping.dest_frame = DISABLED;
        state.flags.set(ContextFlags::FORCE_MOVE, force);

        Ok(())
    }

    /// Stops after `lines` line events at the depth of the given frame
    /// (the innermost one by default), without descending into calls.
    ///
    /// The stepping also stops as soon as that frame returns.
    pub fn step_over(&self, lines: i64, frame: Option<i64>, force: bool) -> Result<()> {
        let mut state = self.live_state()?;

        let stack_size = state.stack_size();
        if stack_size <= 0 {
            return Err(Error::InvalidArgument(
                "no stack frame to step over".to_owned(),
            ));
        }

        if lines < 0 {
            return Err(Error::InvalidArgument(
                "lines argument can't be negative".to_owned(),
            ));
        }

        let dest_frame = match frame {
            None => stack_size,
            Some(frame) if (0..stack_size).contains(&frame) => stack_size - frame,
            Some(_) => {
                return Err(Error::InvalidArgument(
                    "frame number out of range".to_owned(),
                ));
            }
        };

        state.stepping.stop_line = lines;
        state.stepping.dest_frame = dest_frame;
        state.flags.remove(ContextFlags::STEPPED);
        state.flags.set(ContextFlags::FORCE_MOVE, force);

        Ok(())
    }

    /// Stops on the first line event after the given frame returns.
    pub fn stop_frame(&self, frame: i64) -> Result<()> {
        let mut state = self.live_state()?;

        let stack_size = state.stack_size();
        if frame < 0 || frame >= stack_size {
            return Err(Error::InvalidArgument(
                "stop frame is out of range".to_owned(),
            ));
        }

        state.stepping.stop_frame = stack_size - frame;

        Ok(())
    }

    /// Requests the thread to stop on its next line event.
    ///
    /// Returns `false` if the request does not apply (post-mortem context,
    /// or context of the calling thread).
    pub fn pause(&self) -> Result<bool> {
        let shared = self.session()?;

        if self.is_current(&shared) {
            return Ok(false);
        }

        let mut state = self.lock();
        if state.flags.contains(ContextFlags::DEAD) {
            return Ok(false);
        }

        state.thread_pause = true;
        Ok(true)
    }

    /// Suspends the thread, which blocks on its next event until resumed.
    ///
    /// Suspending the context of the calling thread has no effect.
    pub fn suspend(&self) -> Result<()> {
        let shared = self.session()?;

        {
            let state = self.lock();
            if state.flags.contains(ContextFlags::DEAD) {
                return Err(Error::DeadContext);
            }
            if state.flags.contains(ContextFlags::SUSPEND) {
                return Err(Error::AlreadySuspended);
            }
        }

        if !self.is_current(&shared) {
            self.suspend_unchecked();
        }

        Ok(())
    }

    /// Resumes a suspended thread.
    pub fn resume(&self) -> Result<()> {
        let shared = self.session()?;

        {
            let state = self.lock();
            if state.flags.contains(ContextFlags::DEAD) {
                return Err(Error::DeadContext);
            }
            if !state.flags.contains(ContextFlags::SUSPEND) {
                return Err(Error::NotSuspended);
            }
        }

        if !self.is_current(&shared) {
            self.resume_unchecked();
        }

        Ok(())
    }

    /// Stack height of the thread.
    ///
    /// This is the height of the inspected stack during a stop callback,
    /// or the tracked depth otherwise.
    pub fn stack_size(&self) -> Result<usize> {
        self.session()?;
        Ok(usize::try_from(self.lock().stack_size()).unwrap_or(0))
    }

    fn with_frame<T>(&self, index: usize, f: impl FnOnce(&Frame<H::Value>) -> T) -> Result<T> {
        let snapshot = self.snapshot()?;
        snapshot.frame(index).map(f)
    }

    fn snapshot(&self) -> Result<SharedSnapshot<H::Value>> {
        self.session()?;
        self.lock()
            .inspected
            .clone()
            .ok_or(Error::InspectionUnavailable)
    }

    /// Number of frames of the inspected stack.
    pub fn frame_count(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }

    /// Location of the frame at `index`.
    pub fn frame_location(&self, index: usize) -> Result<Location> {
        self.with_frame(index, |frame| frame.location.clone())
    }

    /// Source file of the frame at `index`.
    pub fn frame_file(&self, index: usize) -> Result<String> {
        self.with_frame(index, |frame| frame.location.path.clone())
    }

    /// Source line of the frame at `index`.
    pub fn frame_line(&self, index: usize) -> Result<u32> {
        self.with_frame(index, |frame| frame.location.line)
    }

    /// Method name of the frame at `index`.
    pub fn frame_method(&self, index: usize) -> Result<String> {
        self.with_frame(index, |frame| frame.location.label.clone())
    }

    /// Receiver of the frame at `index`.
    pub fn frame_self(&self, index: usize) -> Result<H::Value> {
        self.with_frame(index, |frame| frame.receiver.clone())
    }

    /// Class defining the method of the frame at `index`.
    pub fn frame_class(&self, index: usize) -> Result<Option<H::Value>> {
        self.with_frame(index, |frame| frame.class.clone())
    }

    /// Lexical bindings of the frame at `index`.
    pub fn frame_binding(&self, index: usize) -> Result<Option<H::Value>> {
        self.with_frame(index, |frame| frame.binding.clone())
    }
}

/// Guard detaching the inspected snapshot of a context when dropped.
pub(crate) struct Inspection<'a, H: Host> {
    context: &'a Context<H>,
}

impl<H: Host> Drop for Inspection<'_, H> {
    fn drop(&mut self) {
        self.context.lock().inspected = None;
    }
}
