//! Class hierarchy graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{ChNodeId, VarId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChNode {
    pub id: ChNodeId,
    pub class_name: String,
    /// The global object holding this class's virtual table.
    pub vtable: Option<VarId>,
    pub flags: u32,
    /// One function vector per virtual table of the class.
    pub virtual_functions: Vec<Vec<VarId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChEdgeKind {
    Inheritance,
    Instance,
}

impl ChEdgeKind {
    pub fn code(self) -> i64 {
        match self {
            ChEdgeKind::Inheritance => 0,
            ChEdgeKind::Instance => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ChEdgeKind::Inheritance),
            1 => Some(ChEdgeKind::Instance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChEdge {
    pub src: ChNodeId,
    pub dst: ChNodeId,
    pub kind: ChEdgeKind,
}

impl fmt::Display for ChEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{:?}]->{}", self.src, self.kind, self.dst)
    }
}
