use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use haltpoint_engine::Frame;
use haltpoint_engine::host::{Thread, ThreadStatus};

use crate::host::HostState;
use crate::value::SimValue;

/// Identifier of the thread registered when a host is created.
pub(crate) const MAIN_THREAD_ID: u64 = 1;

thread_local! {
    /// Simulated thread bound to the current OS thread.
    static CURRENT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Returns the simulated thread bound to the current OS thread.
///
/// OS threads not spawned through a host run the main thread.
pub(crate) fn current_id() -> u64 {
    CURRENT.get().unwrap_or(MAIN_THREAD_ID)
}

pub(crate) fn bind_current(id: u64) {
    CURRENT.set(Some(id));
}

/// State of a simulated thread.
pub(crate) struct ThreadRecord {
    pub(crate) status: ThreadStatus,
    pub(crate) debugger_thread: bool,

    /// Call stack, outermost frame first.
    pub(crate) frames: Vec<Frame<SimValue>>,
}

/// Handle of a simulated thread.
#[derive(Clone)]
pub struct SimThread {
    pub(crate) id: u64,
    pub(crate) host: Arc<HostState>,
}

impl SimThread {
    /// Identifier of the thread within its host.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for SimThread {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.host, &other.host)
    }
}

impl Eq for SimThread {}

impl Hash for SimThread {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for SimThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SimThread").field(&self.id).finish()
    }
}

impl Thread for SimThread {
    fn status(&self) -> ThreadStatus {
        self.host
            .threads
            .lock()
            .get(&self.id)
            .map_or(ThreadStatus::Dead, |record| record.status)
    }

    fn is_debugger_thread(&self) -> bool {
        self.host
            .threads
            .lock()
            .get(&self.id)
            .is_some_and(|record| record.debugger_thread)
    }
}
