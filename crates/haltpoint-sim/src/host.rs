use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use haltpoint_engine::host::{Host, ThreadStatus};
use haltpoint_engine::{Frame, Location, ScopeSnapshot};
use parking_lot::Mutex;

use crate::error::EvalError;
use crate::exception::SimException;
use crate::thread::{self, MAIN_THREAD_ID, SimThread, ThreadRecord};
use crate::value::SimValue;

/// Simulated host runtime.
///
/// The host owns simulated threads and their call stacks. Events are fed to
/// the debugger through a [ThreadDriver](crate::ThreadDriver), from the OS
/// thread running the simulated thread.
///
/// The OS thread creating the host runs the main thread.
#[derive(Clone)]
pub struct SimHost {
    state: Arc<HostState>,
}

pub(crate) struct HostState {
    pub(crate) threads: Mutex<HashMap<u64, ThreadRecord>>,

    /// Class hierarchy (class name to parent name).
    classes: Mutex<HashMap<String, Option<String>>>,

    next_thread_id: AtomicU64,
    next_identity: AtomicU64,
}

impl SimHost {
    /// Creates a host with a main thread.
    pub fn new() -> Self {
        let state = HostState {
            threads: Mutex::new(HashMap::new()),
            classes: Mutex::new(HashMap::new()),
            next_thread_id: AtomicU64::new(MAIN_THREAD_ID + 1),
            next_identity: AtomicU64::new(1),
        };

        let host = Self {
            state: Arc::new(state),
        };
        host.register_thread(MAIN_THREAD_ID, "<main>");
        host
    }

    fn register_thread(&self, id: u64, label: &str) {
        let record = ThreadRecord {
            status: ThreadStatus::Running,
            debugger_thread: false,
            frames: vec![Frame {
                location: Location {
                    path: label.to_owned(),
                    line: 0,
                    label: label.to_owned(),
                },
                receiver: SimValue::Object {
                    class: "Object".to_owned(),
                },
                class: None,
                binding: Some(SimValue::Binding(BTreeMap::new())),
            }],
        };

        self.state.threads.lock().insert(id, record);
    }

    fn handle(&self, id: u64) -> SimThread {
        SimThread {
            id,
            host: self.state.clone(),
        }
    }

    /// Main thread of the host.
    pub fn main_thread(&self) -> SimThread {
        self.handle(MAIN_THREAD_ID)
    }

    /// Runs `f` on a new OS thread, bound to a new simulated thread.
    ///
    /// The simulated thread is dead once `f` returns.
    pub fn spawn<F, T>(&self, f: F) -> (SimThread, JoinHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = self.state.next_thread_id.fetch_add(1, Ordering::Relaxed);
        self.register_thread(id, "<thread>");

        let exit = ThreadExit { host: self.clone(), id };

        let handle = std::thread::spawn(move || {
            thread::bind_current(id);
            let _exit = exit;
            f()
        });

        tracing::debug!(id, "simulated thread spawned");

        (self.handle(id), handle)
    }

    /// Sets the scheduling status of a thread.
    pub fn set_status(&self, thread: &SimThread, status: ThreadStatus) {
        if let Some(record) = self.state.threads.lock().get_mut(&thread.id) {
            record.status = status;
        }
    }

    /// Marks a thread as belonging to the debugger.
    ///
    /// This must be done before the first event of the thread.
    pub fn set_debugger_thread(&self, thread: &SimThread, debugger_thread: bool) {
        if let Some(record) = self.state.threads.lock().get_mut(&thread.id) {
            record.debugger_thread = debugger_thread;
        }
    }

    /// Declares a class, with an optional parent class.
    pub fn define_class(&self, name: impl Into<String>, parent: Option<&str>) {
        self.state
            .classes
            .lock()
            .insert(name.into(), parent.map(ToOwned::to_owned));
    }

    /// Ancestry of a class, from the class itself to its root.
    pub fn ancestors(&self, class: &str) -> Vec<String> {
        let classes = self.state.classes.lock();

        let mut ancestors = vec![class.to_owned()];
        let mut seen = HashSet::from([class.to_owned()]);

        while let Some(Some(parent)) = ancestors.last().and_then(|c| classes.get(c)) {
            if !seen.insert(parent.clone()) {
                break;
            }
            ancestors.push(parent.clone());
        }

        ancestors
    }

    /// Creates an exception of the given class, with a unique identity.
    pub fn exception(&self, class: impl Into<String>) -> SimException {
        let class = class.into();

        SimException {
            identity: self.state.next_identity.fetch_add(1, Ordering::Relaxed),
            ancestors: self.ancestors(&class),
            class,
        }
    }

    /// Captures the call stack of a thread, innermost frame first.
    pub fn snapshot(&self, thread: &SimThread) -> ScopeSnapshot<SimValue> {
        let frames = self
            .state
            .threads
            .lock()
            .get(&thread.id)
            .map(|record| record.frames.iter().rev().cloned().collect())
            .unwrap_or_default();

        ScopeSnapshot::new(frames)
    }

    /// Runs `f` on the call stack of the current thread.
    pub(crate) fn with_frames<R>(&self, f: impl FnOnce(&mut Vec<Frame<SimValue>>) -> R) -> R {
        let id = thread::current_id();

        let mut threads = self.state.threads.lock();
        let mut empty = Vec::new();

        f(threads
            .get_mut(&id)
            .map_or(&mut empty, |record| &mut record.frames))
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for SimHost {
    type Thread = SimThread;
    type Value = SimValue;
    type Exception = SimException;
    type EvalError = EvalError;

    fn current_thread(&self) -> SimThread {
        self.handle(thread::current_id())
    }

    fn threads(&self) -> Vec<SimThread> {
        let mut ids: Vec<_> = self
            .state
            .threads
            .lock()
            .iter()
            .filter(|(_, record)| record.status != ThreadStatus::Dead)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();

        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    fn stack_size(&self, thread: &SimThread) -> usize {
        self.state
            .threads
            .lock()
            .get(&thread.id)
            .map_or(0, |record| record.frames.len())
    }

    fn evaluate(&self, expression: &str, binding: Option<&SimValue>) -> Result<bool, EvalError> {
        crate::eval::evaluate(expression, binding)
    }
}

/// Marks a spawned thread as dead when its OS thread exits.
struct ThreadExit {
    host: SimHost,
    id: u64,
}

impl Drop for ThreadExit {
    fn drop(&mut self) {
        if let Some(record) = self.host.state.threads.lock().get_mut(&self.id) {
            record.status = ThreadStatus::Dead;
        }

        tracing::debug!(id = self.id, "simulated thread exited");
    }
}
