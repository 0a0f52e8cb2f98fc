//! The reference policy table.
//!
//! Every slot through which one entity names another is a [`Field`]. Its
//! [`RefSpec`] says which namespace the id lives in and what happens when
//! the id is the sentinel or not yet loaded. Reconstruction consults this
//! table and nothing else.

/// An id namespace of the persisted graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Type,
    StInfo,
    Var,
    Stmt,
    IcfgNode,
    CallGraphNode,
    ChNode,
    Block,
}

/// What a reference slot tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefPolicy {
    /// Must be present and already loaded; otherwise the owning record is
    /// rejected.
    Mandatory,
    /// Collection members that may point forward. Resolved in the final
    /// pass; an unresolved member is pruned and reported.
    MandatoryDeferred,
    /// The sentinel or a missing target both mean "absent", silently.
    Optional,
    /// The sentinel means "absent"; a target not yet loaded is resolved in
    /// the final pass and reported if it never appears.
    OptionalDeferred,
}

impl RefPolicy {
    pub fn is_deferred(self) -> bool {
        matches!(self, RefPolicy::MandatoryDeferred | RefPolicy::OptionalDeferred)
    }

    /// Whether the sentinel is an acceptable value.
    pub fn allows_absent(self) -> bool {
        matches!(self, RefPolicy::Optional | RefPolicy::OptionalDeferred)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSpec {
    pub target: Namespace,
    pub policy: RefPolicy,
}

/// One reference slot. Collection slots apply their policy per member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    // Type descriptors
    TypeI8,
    TypePtr,
    FunctionRet,
    FunctionParams,
    StructFields,
    StructStInfo,
    ArrayElement,
    ArrayStInfo,
    StInfoFieldTypes,
    StInfoFinfo,
    StInfoFlattenElements,

    // Variables
    VarType,
    VarIcfgNode,
    ObjType,
    ArgFunction,
    GepValBase,
    GepValType,
    AccessPathPointee,
    AccessPathOperand,
    AccessPathOperandType,
    GepObjBase,
    FunValFunction,
    PnFunction,
    FunObjType,
    FunObjRealDef,
    FunObjArgs,

    // Basic blocks
    BlockFunction,
    BlockSuccs,
    BlockPreds,
    BlockIcfgNodes,
    BlockEdgeSrc,
    BlockEdgeDst,

    // Class hierarchy
    ChVtable,
    ChVirtualFunctions,
    ChEdgeSrc,
    ChEdgeDst,

    // ICFG nodes
    IcfgStmts,
    IcfgFunction,
    IcfgBlock,
    FormalParams,
    FormalRet,
    RetCallNode,
    ActualRet,
    CallRetNode,
    Callee,
    ActualParams,
    IndirectFunPtr,
    VtablePtr,
    CallSiteType,
    ChNodes,
    ChaVtables,

    // ICFG edges
    IcfgEdgeSrc,
    IcfgEdgeDst,
    IntraCondition,
    CallCfgPes,
    RetCfgPe,

    // Call graph
    CgFunction,
    CgEdgeSrc,
    CgEdgeDst,
    CgDirectCalls,
    CgIndirectCalls,

    // Statements
    StmtSrc,
    StmtDst,
    StmtValue,
    StmtIcfgNode,
    StmtBlock,
    AddrArraySize,
    StmtCallSite,
    StmtFunEntry,
    StmtFunExit,
    Operands,
    PhiOpIcfgNodes,
    SelectCondition,
    BranchSuccessor,
    BranchCondition,
    BranchInst,
    StmtInstLabels,
    StmtVarLabels,
}

impl Field {
    pub fn spec(self) -> RefSpec {
        use Namespace as N;
        use RefPolicy::*;

        let (target, policy) = match self {
            Field::TypeI8 | Field::TypePtr => (N::Type, OptionalDeferred),
            Field::FunctionParams | Field::StructFields => (N::Type, MandatoryDeferred),
            Field::FunctionRet | Field::ArrayElement => (N::Type, OptionalDeferred),
            Field::StructStInfo | Field::ArrayStInfo => (N::StInfo, OptionalDeferred),
            Field::StInfoFieldTypes | Field::StInfoFinfo | Field::StInfoFlattenElements => {
                (N::Type, Mandatory)
            }

            Field::VarType => (N::Type, Mandatory),
            Field::VarIcfgNode => (N::IcfgNode, OptionalDeferred),
            Field::ObjType
            | Field::GepValType
            | Field::AccessPathPointee
            | Field::AccessPathOperandType
            | Field::FunObjType => (N::Type, Optional),
            Field::AccessPathOperand | Field::FunObjArgs => (N::Var, MandatoryDeferred),
            Field::ArgFunction
            | Field::GepValBase
            | Field::GepObjBase
            | Field::FunValFunction
            | Field::PnFunction
            | Field::FunObjRealDef => (N::Var, OptionalDeferred),

            Field::BlockFunction => (N::Var, Mandatory),
            Field::BlockSuccs | Field::BlockPreds => (N::Block, MandatoryDeferred),
            Field::BlockIcfgNodes => (N::IcfgNode, MandatoryDeferred),
            Field::BlockEdgeSrc | Field::BlockEdgeDst => (N::Block, Mandatory),

            Field::ChVtable | Field::ChVirtualFunctions => (N::Var, Optional),
            Field::ChEdgeSrc | Field::ChEdgeDst => (N::ChNode, Mandatory),

            Field::IcfgStmts => (N::Stmt, MandatoryDeferred),
            Field::IcfgFunction | Field::FormalParams | Field::ActualParams => (N::Var, Mandatory),
            Field::IcfgBlock => (N::Block, Mandatory),
            Field::FormalRet
            | Field::ActualRet
            | Field::Callee
            | Field::IndirectFunPtr
            | Field::VtablePtr
            | Field::ChaVtables => (N::Var, Optional),
            Field::RetCallNode => (N::IcfgNode, OptionalDeferred),
            Field::CallRetNode => (N::IcfgNode, Mandatory),
            Field::CallSiteType => (N::Type, Optional),
            Field::ChNodes => (N::ChNode, Optional),

            Field::IcfgEdgeSrc | Field::IcfgEdgeDst => (N::IcfgNode, Mandatory),
            Field::IntraCondition => (N::Var, Optional),
            Field::CallCfgPes => (N::Stmt, MandatoryDeferred),
            Field::RetCfgPe => (N::Stmt, OptionalDeferred),

            Field::CgFunction => (N::Var, Mandatory),
            Field::CgEdgeSrc | Field::CgEdgeDst => (N::CallGraphNode, Mandatory),
            Field::CgDirectCalls | Field::CgIndirectCalls => (N::IcfgNode, Mandatory),

            Field::StmtSrc
            | Field::StmtDst
            | Field::Operands
            | Field::SelectCondition
            | Field::BranchCondition => (N::Var, Mandatory),
            Field::StmtValue | Field::AddrArraySize | Field::BranchInst => (N::Var, Optional),
            Field::StmtIcfgNode | Field::StmtInstLabels => (N::IcfgNode, Optional),
            Field::StmtVarLabels => (N::Var, Optional),
            Field::StmtBlock => (N::Block, Optional),
            Field::StmtCallSite
            | Field::StmtFunEntry
            | Field::StmtFunExit
            | Field::PhiOpIcfgNodes
            | Field::BranchSuccessor => (N::IcfgNode, Mandatory),
        };
        RefSpec { target, policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_slots_are_deferred() {
        // Slots whose targets load after their owner must be deferrable.
        for field in [
            Field::VarIcfgNode,
            Field::StructStInfo,
            Field::RetCallNode,
            Field::IcfgStmts,
            Field::CallCfgPes,
            Field::RetCfgPe,
            Field::BlockIcfgNodes,
            Field::BlockSuccs,
        ] {
            assert!(field.spec().policy.is_deferred(), "{:?}", field);
        }
    }

    #[test]
    fn test_backward_slots_are_immediate() {
        for field in [
            Field::VarType,
            Field::StmtSrc,
            Field::CallRetNode,
            Field::IcfgEdgeSrc,
            Field::CgEdgeDst,
            Field::BlockEdgeSrc,
        ] {
            let spec = field.spec();
            assert_eq!(spec.policy, RefPolicy::Mandatory, "{:?}", field);
        }
    }

    #[test]
    fn test_targets() {
        assert_eq!(Field::StructStInfo.spec().target, Namespace::StInfo);
        assert_eq!(Field::BlockSuccs.spec().target, Namespace::Block);
        assert_eq!(Field::CgDirectCalls.spec().target, Namespace::IcfgNode);
        assert_eq!(Field::RetCfgPe.spec().target, Namespace::Stmt);
        assert!(Field::ChNodes.spec().policy.allows_absent());
        assert!(!Field::FunctionParams.spec().policy.allows_absent());
    }

    #[test]
    fn test_optional_model_slots_accept_sentinel() {
        // Every single-valued slot the model keeps as `Option` reads the
        // sentinel back as absent.
        for field in [
            Field::FunctionRet,
            Field::StructStInfo,
            Field::ArrayElement,
            Field::ArrayStInfo,
            Field::ArgFunction,
            Field::GepValBase,
            Field::GepObjBase,
            Field::FunValFunction,
            Field::PnFunction,
            Field::RetCallNode,
        ] {
            let policy = field.spec().policy;
            assert!(policy.allows_absent() && policy.is_deferred(), "{:?}", field);
        }
    }
}
