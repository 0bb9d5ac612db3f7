use std::sync::Arc;

/// Source location of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Source file.
    pub path: String,

    /// Source line.
    pub line: u32,

    /// Label of the frame (usually the method name).
    pub label: String,
}

/// Descriptor of a single stack frame.
#[derive(Debug, Clone)]
pub struct Frame<V> {
    /// Location of the frame.
    pub location: Location,

    /// Receiver object of the frame.
    pub receiver: V,

    /// Class defining the executed method, if any.
    pub class: Option<V>,

    /// Lexical bindings of the frame, if available.
    pub binding: Option<V>,
}

/// Capture of a thread's call stack, taken while an event is processed.
///
/// Frames are ordered from the innermost (index 0) to the outermost.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot<V> {
    frames: Vec<Frame<V>>,
}

impl<V> ScopeSnapshot<V> {
    /// Creates a snapshot from frames ordered innermost first.
    pub const fn new(frames: Vec<Frame<V>>) -> Self {
        Self { frames }
    }

    /// Number of frames in the snapshot.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the snapshot has no frame.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the frame at `index`.
    pub fn frame(&self, index: usize) -> crate::Result<&Frame<V>> {
        self.frames.get(index).ok_or(crate::Error::InvalidFrame {
            index,
            count: self.frames.len(),
        })
    }

    /// Iterates over the frames, innermost first.
    pub fn frames(&self) -> impl Iterator<Item = &Frame<V>> {
        self.frames.iter()
    }

    /// Lexical bindings of the innermost frame.
    pub fn innermost_binding(&self) -> Option<&V> {
        self.frames.first().and_then(|frame| frame.binding.as_ref())
    }
}

/// Shared, read-only snapshot attached to a debug context.
pub(crate) type SharedSnapshot<V> = Arc<ScopeSnapshot<V>>;
