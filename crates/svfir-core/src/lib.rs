//! Program-IR data model.
//!
//! Defines the entities persisted by `svfir-graphdb`: type descriptors,
//! program variables, statements, ICFG nodes and edges, call graph, class
//! hierarchy and per-function basic-block graphs, plus the composed
//! [`SvfIr`] that owns them.

pub mod block;
pub mod callgraph;
pub mod chg;
pub mod error;
pub mod graph;
pub mod icfg;
pub mod id;
pub mod stmt;
pub mod types;
pub mod var;

// Re-export commonly used types
pub use block::{BasicBlock, BasicBlockGraph, BlockEdge};
pub use callgraph::{CallEdgeKind, CallGraphEdge, CallGraphEdgeKey, CallGraphNode};
pub use chg::{ChEdge, ChEdgeKind, ChNode};
pub use error::CoreError;
pub use graph::{IrSnapshot, SvfIr};
pub use icfg::{
    BranchCondition, CallSite, IcfgEdge, IcfgEdgeKey, IcfgEdgeKind, IcfgEdgeTag, IcfgNode,
    IcfgNodeKind, IcfgNodeTag, VirtualCall,
};
pub use id::{
    BlockId, BlockKey, CallGraphNodeId, ChNodeId, IcfgNodeId, StInfoId, StmtId, TypeId, VarId,
};
pub use stmt::{EdgeLabels, Operands, StmtKind, StmtTag, SvfStmt};
pub use types::{StInfo, SvfType, SvfTypeKind, TypeTag};
pub use var::{AccessPath, FunObj, ObjTypeInfo, SvfVar, VarKind, VarTag};
