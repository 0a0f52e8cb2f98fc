//! Call graph nodes and edges.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{CallGraphNodeId, IcfgNodeId, VarId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphNode {
    pub id: CallGraphNodeId,
    pub function: VarId,
    pub name: String,
    pub source_loc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CallEdgeKind {
    CallRet,
    ThreadFork,
    ThreadJoin,
}

impl CallEdgeKind {
    pub fn code(self) -> i64 {
        match self {
            CallEdgeKind::CallRet => 0,
            CallEdgeKind::ThreadFork => 1,
            CallEdgeKind::ThreadJoin => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(CallEdgeKind::CallRet),
            1 => Some(CallEdgeKind::ThreadFork),
            2 => Some(CallEdgeKind::ThreadJoin),
            _ => None,
        }
    }
}

/// A caller to callee edge, carrying the call sites that realise it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphEdge {
    pub src: CallGraphNodeId,
    pub dst: CallGraphNodeId,
    /// Call-site id disambiguating parallel edges.
    pub call_site_id: u32,
    pub kind: CallEdgeKind,
    pub direct_calls: BTreeSet<IcfgNodeId>,
    pub indirect_calls: BTreeSet<IcfgNodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallGraphEdgeKey {
    pub src: CallGraphNodeId,
    pub dst: CallGraphNodeId,
    pub call_site_id: u32,
}

impl CallGraphEdge {
    pub fn key(&self) -> CallGraphEdgeKey {
        CallGraphEdgeKey {
            src: self.src,
            dst: self.dst,
            call_site_id: self.call_site_id,
        }
    }
}

impl fmt::Display for CallGraphEdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[cs {}]->{}", self.src, self.call_site_id, self.dst)
    }
}
