use haltpoint_engine::{BreakpointId, StopReason};
use kdl::{KdlDocument, KdlEntry, KdlNode};

/// Report of a debugger callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// A breakpoint was hit.
    Breakpoint {
        /// Thread number.
        thnum: usize,
        /// Identifier of the breakpoint.
        id: BreakpointId,
        /// Location of the breakpoint.
        source: String,
        /// Hit count of the breakpoint.
        hits: u64,
    },

    /// A thread stopped.
    Stop {
        /// Thread number.
        thnum: usize,
        /// Source file.
        path: String,
        /// Source line.
        line: u32,
        /// Call depth.
        depth: i64,
        /// Reason of the stop.
        reason: StopReason,
    },

    /// A raised exception matched a catchpoint.
    Catchpoint {
        /// Thread number.
        thnum: usize,
        /// Class of the exception.
        class: String,
    },

    /// A line was traced.
    Trace {
        /// Thread number.
        thnum: usize,
        /// Source file.
        path: String,
        /// Source line.
        line: u32,
    },

    /// A raised exception carries a post-mortem context.
    PostMortem {
        /// Thread number.
        thnum: usize,
        /// Class of the exception.
        class: String,
        /// Source file of the raise point.
        path: String,
        /// Source line of the raise point.
        line: u32,
        /// Call depth at the raise point.
        depth: i64,
    },
}

const fn reason_name(reason: StopReason) -> &'static str {
    match reason {
        StopReason::None => "none",
        StopReason::Step => "step",
        StopReason::Breakpoint => "breakpoint",
        StopReason::Catchpoint => "catchpoint",
        StopReason::PostMortem => "post-mortem",
    }
}

impl Report {
    fn dump_to_kdl_node(&self) -> KdlNode {
        match self {
            Self::Breakpoint {
                thnum,
                id,
                source,
                hits,
            } => {
                let mut node = KdlNode::new("breakpoint");
                node.entries_mut().push(i128::from(id.0).into());
                push_thread(&mut node, *thnum);
                node.entries_mut()
                    .push(KdlEntry::new_prop("at", source.as_str()));
                node.entries_mut()
                    .push(KdlEntry::new_prop("hits", i128::from(*hits)));
                node
            }
            Self::Stop {
                thnum,
                path,
                line,
                depth,
                reason,
            } => {
                let mut node = KdlNode::new("stop");
                push_location(&mut node, path, *line);
                push_thread(&mut node, *thnum);
                node.entries_mut()
                    .push(KdlEntry::new_prop("depth", i128::from(*depth)));
                node.entries_mut()
                    .push(KdlEntry::new_prop("reason", reason_name(*reason)));
                node
            }
            Self::Catchpoint { thnum, class } => {
                let mut node = KdlNode::new("catchpoint");
                node.entries_mut().push(KdlEntry::new(class.as_str()));
                push_thread(&mut node, *thnum);
                node
            }
            Self::Trace { thnum, path, line } => {
                let mut node = KdlNode::new("trace");
                push_location(&mut node, path, *line);
                push_thread(&mut node, *thnum);
                node
            }
            Self::PostMortem {
                thnum,
                class,
                path,
                line,
                depth,
            } => {
                let mut node = KdlNode::new("post-mortem");
                node.entries_mut().push(KdlEntry::new(class.as_str()));
                push_thread(&mut node, *thnum);
                node.entries_mut()
                    .push(KdlEntry::new_prop("at", format!("{path}:{line}")));
                node.entries_mut()
                    .push(KdlEntry::new_prop("depth", i128::from(*depth)));
                node
            }
        }
    }
}

fn push_location(node: &mut KdlNode, path: &str, line: u32) {
    node.entries_mut().push(KdlEntry::new(path));
    node.entries_mut().push(KdlEntry::new(i128::from(line)));
}

fn push_thread(node: &mut KdlNode, thnum: usize) {
    let thnum = i128::try_from(thnum).unwrap_or(i128::MAX);
    node.entries_mut()
        .push(KdlEntry::new_prop("thread", thnum));
}

/// Dumps reports into a KDL document, one node per report.
pub fn dump_to_kdl(reports: &[Report]) -> KdlDocument {
    let mut kdl = KdlDocument::new();

    for report in reports {
        kdl.nodes_mut().push(report.dump_to_kdl_node());
    }

    kdl
}
