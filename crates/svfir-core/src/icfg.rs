//! Interprocedural control-flow graph nodes and edges.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, BlockKey, ChNodeId, IcfgNodeId, StmtId, TypeId, VarId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcfgNode {
    pub id: IcfgNodeId,
    pub source_loc: String,
    /// Statements attached to this node, in program order.
    pub stmts: Vec<StmtId>,
    pub kind: IcfgNodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcfgNodeKind {
    Global,
    FunEntry {
        function: VarId,
        block: BlockId,
        formal_params: Vec<VarId>,
    },
    FunExit {
        function: VarId,
        block: BlockId,
        formal_ret: Option<VarId>,
    },
    Intra {
        function: VarId,
        block: BlockId,
        is_return: bool,
    },
    Ret {
        function: VarId,
        block: BlockId,
        ty: Option<TypeId>,
        /// The matching call node; patched after call nodes load.
        call_node: Option<IcfgNodeId>,
        actual_ret: Option<VarId>,
    },
    Call(Box<CallSite>),
}

/// Attributes of a call node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub function: VarId,
    pub block: BlockId,
    pub ty: Option<TypeId>,
    pub ret_node: IcfgNodeId,
    pub callee: Option<VarId>,
    pub actual_params: Vec<VarId>,
    pub is_vararg: bool,
    pub indirect_fun_ptr: Option<VarId>,
    pub virtual_call: Option<VirtualCall>,
    /// Class-hierarchy nodes whose virtual tables may serve this call.
    pub ch_nodes: BTreeSet<ChNodeId>,
    pub cha_vtables: BTreeSet<VarId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCall {
    pub vtable_ptr: Option<VarId>,
    pub index: i32,
    pub fun_name: String,
}

/// Fieldless mirror of [`IcfgNodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IcfgNodeTag {
    Global,
    FunEntry,
    FunExit,
    Intra,
    Ret,
    Call,
}

impl IcfgNodeTag {
    pub const ALL: [IcfgNodeTag; 6] = [
        IcfgNodeTag::Global,
        IcfgNodeTag::FunEntry,
        IcfgNodeTag::FunExit,
        IcfgNodeTag::Intra,
        IcfgNodeTag::Ret,
        IcfgNodeTag::Call,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IcfgNodeTag::Global => "GlobalICFGNode",
            IcfgNodeTag::FunEntry => "FunEntryICFGNode",
            IcfgNodeTag::FunExit => "FunExitICFGNode",
            IcfgNodeTag::Intra => "IntraICFGNode",
            IcfgNodeTag::Ret => "RetICFGNode",
            IcfgNodeTag::Call => "CallICFGNode",
        }
    }
}

impl IcfgNodeKind {
    pub fn tag(&self) -> IcfgNodeTag {
        match self {
            IcfgNodeKind::Global => IcfgNodeTag::Global,
            IcfgNodeKind::FunEntry { .. } => IcfgNodeTag::FunEntry,
            IcfgNodeKind::FunExit { .. } => IcfgNodeTag::FunExit,
            IcfgNodeKind::Intra { .. } => IcfgNodeTag::Intra,
            IcfgNodeKind::Ret { .. } => IcfgNodeTag::Ret,
            IcfgNodeKind::Call(_) => IcfgNodeTag::Call,
        }
    }

    /// The basic block holding this node. Global nodes have none.
    pub fn block_key(&self) -> Option<BlockKey> {
        match self {
            IcfgNodeKind::Global => None,
            IcfgNodeKind::FunEntry { function, block, .. }
            | IcfgNodeKind::FunExit { function, block, .. }
            | IcfgNodeKind::Intra { function, block, .. }
            | IcfgNodeKind::Ret { function, block, .. } => Some(BlockKey::new(*function, *block)),
            IcfgNodeKind::Call(site) => Some(BlockKey::new(site.function, site.block)),
        }
    }
}

impl IcfgNode {
    pub fn tag(&self) -> IcfgNodeTag {
        self.kind.tag()
    }
}

/// A control-flow edge between two ICFG nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcfgEdge {
    pub src: IcfgNodeId,
    pub dst: IcfgNodeId,
    pub kind: IcfgEdgeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcfgEdgeKind {
    Intra { condition: Option<BranchCondition> },
    Call { call_pes: Vec<StmtId> },
    Ret { ret_pe: Option<StmtId> },
}

/// Branch condition guarding an intra-procedural edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCondition {
    pub var: VarId,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IcfgEdgeTag {
    Intra,
    Call,
    Ret,
}

impl IcfgEdgeTag {
    pub const ALL: [IcfgEdgeTag; 3] = [IcfgEdgeTag::Intra, IcfgEdgeTag::Call, IcfgEdgeTag::Ret];

    pub fn label(self) -> &'static str {
        match self {
            IcfgEdgeTag::Intra => "IntraCFGEdge",
            IcfgEdgeTag::Call => "CallCFGEdge",
            IcfgEdgeTag::Ret => "RetCFGEdge",
        }
    }
}

/// Identity of an ICFG edge: at most one edge per (src, dst, kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IcfgEdgeKey {
    pub src: IcfgNodeId,
    pub dst: IcfgNodeId,
    pub tag: IcfgEdgeTag,
}

impl IcfgEdge {
    pub fn tag(&self) -> IcfgEdgeTag {
        match self.kind {
            IcfgEdgeKind::Intra { .. } => IcfgEdgeTag::Intra,
            IcfgEdgeKind::Call { .. } => IcfgEdgeTag::Call,
            IcfgEdgeKind::Ret { .. } => IcfgEdgeTag::Ret,
        }
    }

    pub fn key(&self) -> IcfgEdgeKey {
        IcfgEdgeKey {
            src: self.src,
            dst: self.dst,
            tag: self.tag(),
        }
    }
}

impl std::fmt::Display for IcfgEdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-[{}]->{}", self.src, self.tag.label(), self.dst)
    }
}
