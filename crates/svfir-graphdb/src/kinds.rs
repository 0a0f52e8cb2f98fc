//! The closed set of persisted entity kinds, their stores, and the order
//! in which a load session reads them.

use std::fmt;

use svfir_core::{IcfgEdgeTag, IcfgNodeTag, StmtTag, TypeTag, VarTag};

/// A named partition of the persisted graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Store {
    Types,
    Pag,
    BasicBlocks,
    ClassHierarchy,
    Icfg,
    CallGraph,
}

impl Store {
    pub const ALL: [Store; 6] = [
        Store::Types,
        Store::Pag,
        Store::BasicBlocks,
        Store::ClassHierarchy,
        Store::Icfg,
        Store::CallGraph,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Store::Types => "SVFType",
            Store::Pag => "PAG",
            Store::BasicBlocks => "BasicBlockGraph",
            Store::ClassHierarchy => "CHG",
            Store::Icfg => "ICFG",
            Store::CallGraph => "CallGraph",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tag of one persisted record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Type(TypeTag),
    StInfo,
    Var(VarTag),
    BasicBlock,
    BlockEdge,
    ChNode,
    ChEdge,
    IcfgNode(IcfgNodeTag),
    IcfgEdge(IcfgEdgeTag),
    CallGraphNode,
    CallGraphEdge,
    Stmt(StmtTag),
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Type(tag) => tag.label(),
            EntityKind::StInfo => "StInfo",
            EntityKind::Var(tag) => tag.label(),
            EntityKind::BasicBlock => "SVFBasicBlock",
            EntityKind::BlockEdge => "BasicBlockEdge",
            EntityKind::ChNode => "CHNode",
            EntityKind::ChEdge => "CHEdge",
            EntityKind::IcfgNode(tag) => tag.label(),
            EntityKind::IcfgEdge(tag) => tag.label(),
            EntityKind::CallGraphNode => "CallGraphNode",
            EntityKind::CallGraphEdge => "CallGraphEdge",
            EntityKind::Stmt(tag) => tag.label(),
        }
    }

    pub fn store(self) -> Store {
        match self {
            EntityKind::Type(_) | EntityKind::StInfo => Store::Types,
            EntityKind::Var(_) | EntityKind::Stmt(_) => Store::Pag,
            EntityKind::BasicBlock | EntityKind::BlockEdge => Store::BasicBlocks,
            EntityKind::ChNode | EntityKind::ChEdge => Store::ClassHierarchy,
            EntityKind::IcfgNode(_) | EntityKind::IcfgEdge(_) => Store::Icfg,
            EntityKind::CallGraphNode | EntityKind::CallGraphEdge => Store::CallGraph,
        }
    }

    /// Whether records of this kind are edges with `src`/`dst` endpoints.
    pub fn is_edge(self) -> bool {
        match self {
            EntityKind::BlockEdge
            | EntityKind::ChEdge
            | EntityKind::IcfgEdge(_)
            | EntityKind::CallGraphEdge
            | EntityKind::Stmt(_) => true,
            EntityKind::Type(_)
            | EntityKind::StInfo
            | EntityKind::Var(_)
            | EntityKind::BasicBlock
            | EntityKind::ChNode
            | EntityKind::IcfgNode(_)
            | EntityKind::CallGraphNode => false,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The declared total order in which kinds are read.
///
/// Types precede everything that names a type; variables precede blocks,
/// class hierarchy, ICFG and call graph, which all name variables; return
/// nodes precede call nodes, which name their return node; statements come
/// last because their endpoints are variables and they name ICFG nodes.
/// References that still point forward are deferred.
pub fn load_order() -> Vec<EntityKind> {
    let mut order = Vec::new();
    order.extend(TypeTag::ALL.map(EntityKind::Type));
    order.push(EntityKind::StInfo);
    order.extend(VarTag::ALL.map(EntityKind::Var));
    order.push(EntityKind::BasicBlock);
    order.push(EntityKind::BlockEdge);
    order.push(EntityKind::ChNode);
    order.push(EntityKind::ChEdge);
    order.extend(
        [
            IcfgNodeTag::Global,
            IcfgNodeTag::FunEntry,
            IcfgNodeTag::FunExit,
            IcfgNodeTag::Intra,
            IcfgNodeTag::Ret,
            IcfgNodeTag::Call,
        ]
        .map(EntityKind::IcfgNode),
    );
    order.extend(IcfgEdgeTag::ALL.map(EntityKind::IcfgEdge));
    order.push(EntityKind::CallGraphNode);
    order.push(EntityKind::CallGraphEdge);
    order.extend(StmtTag::ALL.map(EntityKind::Stmt));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn position(kind: EntityKind) -> usize {
        load_order().iter().position(|k| *k == kind).unwrap()
    }

    #[test]
    fn test_every_kind_loaded_once() {
        let order = load_order();
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
        assert_eq!(order.len(), 6 + 1 + 27 + 2 + 2 + 6 + 3 + 2 + 15);
        let labels: HashSet<_> = order.iter().map(|k| k.label()).collect();
        assert_eq!(labels.len(), order.len());
    }

    #[test]
    fn test_dependency_order() {
        assert!(position(EntityKind::Type(TypeTag::Other)) < position(EntityKind::Var(VarTag::Val)));
        assert!(position(EntityKind::Var(VarTag::FunObj)) < position(EntityKind::BasicBlock));
        assert!(position(EntityKind::BasicBlock) < position(EntityKind::BlockEdge));
        assert!(
            position(EntityKind::IcfgNode(IcfgNodeTag::Ret))
                < position(EntityKind::IcfgNode(IcfgNodeTag::Call))
        );
        assert!(position(EntityKind::ChNode) < position(EntityKind::IcfgNode(IcfgNodeTag::Call)));
        assert!(
            position(EntityKind::IcfgNode(IcfgNodeTag::Call)) < position(EntityKind::CallGraphEdge)
        );
        assert_eq!(load_order().last(), Some(&EntityKind::Stmt(StmtTag::ThreadJoin)));
    }

    #[test]
    fn test_edge_kinds() {
        assert!(EntityKind::Stmt(StmtTag::Copy).is_edge());
        assert!(!EntityKind::Var(VarTag::Val).is_edge());
        assert_eq!(EntityKind::Stmt(StmtTag::Copy).store(), Store::Pag);
        assert_eq!(Store::ClassHierarchy.name(), "CHG");
    }
}
