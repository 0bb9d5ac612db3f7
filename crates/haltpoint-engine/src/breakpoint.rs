use std::fmt;

use indexmap::IndexMap;

/// Identifier of a breakpoint, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub u32);

impl BreakpointId {
    /// Identifier of the breakpoints set on a context (see
    /// [Context::set_breakpoint](crate::Context::set_breakpoint)).
    pub const CONTEXT: Self = Self(0);
}

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location matched by a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointSource {
    /// Source position, matched on line events.
    Position {
        /// Source file.
        path: String,

        /// Source line.
        line: u32,
    },

    /// Method, matched on call events.
    Method {
        /// Class defining the method.
        class: String,

        /// Method name.
        method: String,
    },
}

impl BreakpointSource {
    pub(crate) fn matches_position(&self, path: &str, line: u32) -> bool {
        matches!(self, Self::Position { path: p, line: l } if p == path && *l == line)
    }

    pub(crate) fn matches_method(&self, class: &str, method: &str) -> bool {
        matches!(self, Self::Method { class: c, method: m } if c == class && m == method)
    }
}

impl fmt::Display for BreakpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position { path, line } => write!(f, "{path}:{line}"),
            Self::Method { class, method } => write!(f, "{class}#{method}"),
        }
    }
}

/// Predicate over the hit count of a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCondition {
    /// Hit count is at least the value.
    GreaterOrEqual(u64),

    /// Hit count equals the value.
    Equal(u64),

    /// Hit count is a multiple of the value (never met for zero).
    Modulo(u64),
}

impl HitCondition {
    /// Whether the predicate holds for the given hit count.
    pub fn is_met(&self, hit_count: u64) -> bool {
        match *self {
            Self::GreaterOrEqual(value) => hit_count >= value,
            Self::Equal(value) => hit_count == value,
            Self::Modulo(0) => false,
            Self::Modulo(value) => hit_count % value == 0,
        }
    }
}

/// Breakpoint of a debugger session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    id: BreakpointId,
    source: BreakpointSource,
    condition: Option<String>,
    hit_condition: Option<HitCondition>,
    enabled: bool,
    hit_count: u64,
}

impl Breakpoint {
    fn new(source: BreakpointSource) -> Self {
        Self {
            id: BreakpointId::CONTEXT,
            source,
            condition: None,
            hit_condition: None,
            enabled: true,
            hit_count: 0,
        }
    }

    /// Creates a breakpoint on a source position.
    pub fn at(path: impl Into<String>, line: u32) -> Self {
        Self::new(BreakpointSource::Position {
            path: path.into(),
            line,
        })
    }

    /// Creates a breakpoint on a method.
    pub fn on_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(BreakpointSource::Method {
            class: class.into(),
            method: method.into(),
        })
    }

    /// Specifies an expression which must hold for the breakpoint to fire.
    ///
    /// The expression is evaluated by the host within the innermost scope of
    /// the stopped thread.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Specifies a predicate over the hit count.
    pub fn with_hit_condition(mut self, hit_condition: HitCondition) -> Self {
        self.hit_condition = Some(hit_condition);
        self
    }

    /// Identifier of the breakpoint (assigned when added to a session).
    pub fn id(&self) -> BreakpointId {
        self.id
    }

    /// Location matched by the breakpoint.
    pub fn source(&self) -> &BreakpointSource {
        &self.source
    }

    /// Condition expression of the breakpoint.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Hit count predicate of the breakpoint.
    pub fn hit_condition(&self) -> Option<HitCondition> {
        self.hit_condition
    }

    /// Whether the breakpoint is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of hits whose condition held.
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Turns the breakpoint into a context breakpoint.
    pub(crate) fn into_context_breakpoint(mut self) -> Self {
        self.id = BreakpointId::CONTEXT;
        self.hit_count = 0;
        self
    }

    /// Candidate for an event, if the breakpoint is enabled and matches.
    pub(crate) fn candidate(
        &self,
        matches: impl Fn(&BreakpointSource) -> bool,
    ) -> Option<Candidate> {
        (self.enabled && matches(&self.source)).then(|| Candidate {
            id: self.id,
            condition: self.condition.clone(),
        })
    }

    /// Counts a hit (once its condition held), returning whether the
    /// breakpoint fires.
    pub(crate) fn hit(&mut self) -> bool {
        self.hit_count += 1;
        self.hit_condition
            .is_none_or(|hit_condition| hit_condition.is_met(self.hit_count))
    }
}

/// Breakpoints of a session, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct BreakpointSet {
    breakpoints: Vec<Breakpoint>,
    next_id: u32,
}

impl BreakpointSet {
    pub(crate) fn add(&mut self, mut breakpoint: Breakpoint) -> BreakpointId {
        self.next_id += 1;
        breakpoint.id = BreakpointId(self.next_id);
        self.breakpoints.push(breakpoint);
        BreakpointId(self.next_id)
    }

    pub(crate) fn remove(&mut self, id: BreakpointId) -> Option<Breakpoint> {
        let index = self.breakpoints.iter().position(|bp| bp.id == id)?;
        Some(self.breakpoints.remove(index))
    }

    pub(crate) fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.iter().find(|bp| bp.id == id)
    }

    pub(crate) fn set_enabled(&mut self, id: BreakpointId, enabled: bool) -> bool {
        match self.breakpoints.iter_mut().find(|bp| bp.id == id) {
            Some(bp) => {
                bp.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub(crate) fn list(&self) -> Vec<Breakpoint> {
        self.breakpoints.clone()
    }

    /// Enabled breakpoints matching an event.
    pub(crate) fn candidates(
        &self,
        matches: impl Fn(&BreakpointSource) -> bool,
    ) -> Vec<Candidate> {
        self.breakpoints
            .iter()
            .filter_map(|bp| bp.candidate(&matches))
            .collect()
    }

    /// Counts a hit of a breakpoint whose condition held.
    ///
    /// Returns the breakpoint if its hit condition is met.
    pub(crate) fn hit(&mut self, id: BreakpointId) -> Option<Breakpoint> {
        let bp = self.breakpoints.iter_mut().find(|bp| bp.id == id)?;
        bp.hit().then(|| bp.clone())
    }
}

/// Breakpoint matching an event, not yet accepted.
#[derive(Debug)]
pub(crate) struct Candidate {
    pub(crate) id: BreakpointId,
    condition: Option<String>,
}

/// Returns the first accepted breakpoint among `candidates`.
///
/// A candidate is accepted if its condition holds (`evaluate`) and its hit
/// condition is met once its hit count is incremented (`hit`). Evaluation
/// happens without any lock held, since the host may run arbitrary code.
pub(crate) fn accept(
    candidates: Vec<Candidate>,
    mut evaluate: impl FnMut(&str) -> bool,
    mut hit: impl FnMut(BreakpointId) -> Option<Breakpoint>,
) -> Option<Breakpoint> {
    candidates.into_iter().find_map(|candidate| {
        if let Some(condition) = &candidate.condition {
            if !evaluate(condition) {
                return None;
            }
        }
        hit(candidate.id)
    })
}

/// Catchpoints of a session, keyed by exception class name.
#[derive(Debug, Default)]
pub(crate) struct CatchpointSet {
    catchpoints: IndexMap<String, u64>,
}

impl CatchpointSet {
    /// Registers a catchpoint, resetting its hit count if it exists.
    pub(crate) fn add(&mut self, class: String) {
        self.catchpoints.insert(class, 0);
    }

    pub(crate) fn remove(&mut self, class: &str) -> bool {
        self.catchpoints.shift_remove(class).is_some()
    }

    pub(crate) fn list(&self) -> Vec<(String, u64)> {
        self.catchpoints
            .iter()
            .map(|(class, count)| (class.clone(), *count))
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.catchpoints.is_empty()
    }

    /// Matches the ancestry of a raised exception, most specific first.
    ///
    /// The first registered ancestor has its hit count incremented and is
    /// returned.
    pub(crate) fn hit<'a>(&mut self, ancestors: &'a [String]) -> Option<&'a str> {
        ancestors.iter().find_map(|ancestor| {
            let count = self.catchpoints.get_mut(ancestor)?;
            *count += 1;
            Some(ancestor.as_str())
        })
    }
}
