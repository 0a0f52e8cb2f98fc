//! Statements: the edges of the pointer-assignment graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{BlockKey, IcfgNodeId, StmtId, VarId};
use crate::var::AccessPath;

/// Operand list of multi-operand statements. Almost always two entries.
pub type Operands = SmallVec<[VarId; 2]>;

/// A statement connecting `src` to `dst`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvfStmt {
    pub id: StmtId,
    pub src: VarId,
    pub dst: VarId,
    /// The variable this statement's value is attached to, if any.
    pub value: Option<VarId>,
    pub icfg_node: Option<IcfgNodeId>,
    pub block: Option<BlockKey>,
    pub flag: i64,
    #[serde(default)]
    pub labels: EdgeLabels,
    pub kind: StmtKind,
}

/// Context labels a statement hands out, and the counters that number them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLabels {
    /// Label per control-flow node.
    pub inst_labels: BTreeMap<IcfgNodeId, u32>,
    /// Label per variable.
    pub var_labels: BTreeMap<VarId, u32>,
    pub call_edge_counter: u32,
    pub store_edge_counter: u32,
    pub multi_operand_counter: u32,
}

impl EdgeLabels {
    pub fn is_empty(&self) -> bool {
        *self == EdgeLabels::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtKind {
    Addr {
        array_sizes: Vec<VarId>,
    },
    Copy {
        copy_kind: u32,
    },
    Store,
    Load,
    Gep {
        access_path: AccessPath,
        variant_field: bool,
    },
    Call {
        call_site: IcfgNodeId,
        fun_entry: IcfgNodeId,
    },
    Ret {
        call_site: IcfgNodeId,
        fun_exit: IcfgNodeId,
    },
    Phi {
        operands: Operands,
        /// Incoming control-flow node per operand.
        op_icfg_nodes: Vec<IcfgNodeId>,
    },
    Select {
        operands: Operands,
        condition: VarId,
    },
    Cmp {
        operands: Operands,
        predicate: u32,
    },
    BinaryOp {
        operands: Operands,
        opcode: u32,
    },
    UnaryOp {
        opcode: u32,
    },
    Branch {
        /// Successor node and the condition value selecting it.
        successors: Vec<(IcfgNodeId, i32)>,
        condition: VarId,
        br_inst: Option<VarId>,
    },
    ThreadFork {
        call_site: IcfgNodeId,
        fun_entry: IcfgNodeId,
    },
    ThreadJoin {
        call_site: IcfgNodeId,
        fun_exit: IcfgNodeId,
    },
}

/// Fieldless mirror of [`StmtKind`], used as the persisted kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StmtTag {
    Addr,
    Copy,
    Store,
    Load,
    Gep,
    Call,
    Ret,
    Phi,
    Select,
    Cmp,
    BinaryOp,
    UnaryOp,
    Branch,
    ThreadFork,
    ThreadJoin,
}

impl StmtTag {
    pub const ALL: [StmtTag; 15] = [
        StmtTag::Addr,
        StmtTag::Copy,
        StmtTag::Store,
        StmtTag::Load,
        StmtTag::Gep,
        StmtTag::Call,
        StmtTag::Ret,
        StmtTag::Phi,
        StmtTag::Select,
        StmtTag::Cmp,
        StmtTag::BinaryOp,
        StmtTag::UnaryOp,
        StmtTag::Branch,
        StmtTag::ThreadFork,
        StmtTag::ThreadJoin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StmtTag::Addr => "AddrStmt",
            StmtTag::Copy => "CopyStmt",
            StmtTag::Store => "StoreStmt",
            StmtTag::Load => "LoadStmt",
            StmtTag::Gep => "GepStmt",
            StmtTag::Call => "CallPE",
            StmtTag::Ret => "RetPE",
            StmtTag::Phi => "PhiStmt",
            StmtTag::Select => "SelectStmt",
            StmtTag::Cmp => "CmpStmt",
            StmtTag::BinaryOp => "BinaryOPStmt",
            StmtTag::UnaryOp => "UnaryOPStmt",
            StmtTag::Branch => "BranchStmt",
            StmtTag::ThreadFork => "TDForkPE",
            StmtTag::ThreadJoin => "TDJoinPE",
        }
    }
}

impl StmtKind {
    pub fn tag(&self) -> StmtTag {
        match self {
            StmtKind::Addr { .. } => StmtTag::Addr,
            StmtKind::Copy { .. } => StmtTag::Copy,
            StmtKind::Store => StmtTag::Store,
            StmtKind::Load => StmtTag::Load,
            StmtKind::Gep { .. } => StmtTag::Gep,
            StmtKind::Call { .. } => StmtTag::Call,
            StmtKind::Ret { .. } => StmtTag::Ret,
            StmtKind::Phi { .. } => StmtTag::Phi,
            StmtKind::Select { .. } => StmtTag::Select,
            StmtKind::Cmp { .. } => StmtTag::Cmp,
            StmtKind::BinaryOp { .. } => StmtTag::BinaryOp,
            StmtKind::UnaryOp { .. } => StmtTag::UnaryOp,
            StmtKind::Branch { .. } => StmtTag::Branch,
            StmtKind::ThreadFork { .. } => StmtTag::ThreadFork,
            StmtKind::ThreadJoin { .. } => StmtTag::ThreadJoin,
        }
    }
}

impl SvfStmt {
    pub fn tag(&self) -> StmtTag {
        self.kind.tag()
    }
}
