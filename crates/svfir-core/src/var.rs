//! Program variables: the nodes of the pointer-assignment graph.
//!
//! Value variables (`*Val*`) model SSA values; object variables (`*Obj*`)
//! model abstract memory objects and carry an [`ObjTypeInfo`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, IcfgNodeId, TypeId, VarId};

/// A program variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvfVar {
    pub id: VarId,
    pub ty: TypeId,
    /// The ICFG node defining this variable, when there is one.
    pub icfg_node: Option<IcfgNodeId>,
    pub kind: VarKind,
}

/// Memory layout facts about an abstract object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjTypeInfo {
    pub ty: Option<TypeId>,
    pub flags: u32,
    pub max_offset_limit: u32,
    pub elem_num: u32,
    pub byte_size: u32,
}

/// A field-sensitive access path: a flattened field index plus the
/// (index operand, indexed type) chain that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPath {
    pub field_index: i64,
    pub pointee_type: Option<TypeId>,
    pub operands: Vec<(VarId, Option<TypeId>)>,
}

/// Function object attributes, including per-function dominance facts
/// keyed by local block id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunObj {
    pub obj: ObjTypeInfo,
    pub name: String,
    pub is_decl: bool,
    pub intrinsic: bool,
    pub addr_taken: bool,
    pub uncalled: bool,
    pub not_ret: bool,
    pub var_arg: bool,
    pub fun_type: Option<TypeId>,
    /// Defining function for declarations resolved across modules.
    pub real_def: Option<VarId>,
    pub exit_block: Option<BlockId>,
    pub args: Vec<VarId>,
    pub reachable_blocks: Vec<BlockId>,
    pub dom_tree: BTreeMap<BlockId, BTreeSet<BlockId>>,
    pub post_dom_tree: BTreeMap<BlockId, BTreeSet<BlockId>>,
    pub dom_frontier: BTreeMap<BlockId, BTreeSet<BlockId>>,
    pub loops: BTreeMap<BlockId, Vec<BlockId>>,
    pub post_dom_levels: BTreeMap<BlockId, u32>,
    pub post_idom: BTreeMap<BlockId, BlockId>,
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarKind {
    Val,
    Obj(ObjTypeInfo),
    Arg {
        function: Option<VarId>,
        arg_no: u32,
    },
    GepVal {
        base: Option<VarId>,
        gep_type: Option<TypeId>,
        access_path: AccessPath,
        llvm_inst: i64,
    },
    BaseObj(ObjTypeInfo),
    GepObj {
        base: Option<VarId>,
        offset: i64,
    },
    HeapObj(ObjTypeInfo),
    StackObj(ObjTypeInfo),
    FunObj(Box<FunObj>),
    FunVal {
        function: Option<VarId>,
    },
    GlobalVal,
    ConstAggVal,
    ConstDataVal,
    BlackHoleVal,
    ConstFpVal {
        value: f64,
    },
    ConstIntVal {
        zext: u64,
        sext: i64,
    },
    ConstNullPtrVal,
    GlobalObj {
        obj: ObjTypeInfo,
        name: String,
    },
    ConstAggObj(ObjTypeInfo),
    ConstDataObj(ObjTypeInfo),
    ConstFpObj {
        obj: ObjTypeInfo,
        value: f64,
    },
    ConstIntObj {
        obj: ObjTypeInfo,
        zext: u64,
        sext: i64,
    },
    ConstNullPtrObj(ObjTypeInfo),
    RetPn {
        function: Option<VarId>,
    },
    VarArgPn {
        function: Option<VarId>,
    },
    DummyVal,
    DummyObj(ObjTypeInfo),
}

/// Fieldless mirror of [`VarKind`], used as the persisted kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VarTag {
    Val,
    Obj,
    Arg,
    GepVal,
    BaseObj,
    GepObj,
    HeapObj,
    StackObj,
    FunObj,
    FunVal,
    GlobalVal,
    ConstAggVal,
    ConstDataVal,
    BlackHoleVal,
    ConstFpVal,
    ConstIntVal,
    ConstNullPtrVal,
    GlobalObj,
    ConstAggObj,
    ConstDataObj,
    ConstFpObj,
    ConstIntObj,
    ConstNullPtrObj,
    RetPn,
    VarArgPn,
    DummyVal,
    DummyObj,
}

impl VarTag {
    pub const ALL: [VarTag; 27] = [
        VarTag::Val,
        VarTag::Obj,
        VarTag::Arg,
        VarTag::GepVal,
        VarTag::BaseObj,
        VarTag::GepObj,
        VarTag::HeapObj,
        VarTag::StackObj,
        VarTag::FunObj,
        VarTag::FunVal,
        VarTag::GlobalVal,
        VarTag::ConstAggVal,
        VarTag::ConstDataVal,
        VarTag::BlackHoleVal,
        VarTag::ConstFpVal,
        VarTag::ConstIntVal,
        VarTag::ConstNullPtrVal,
        VarTag::GlobalObj,
        VarTag::ConstAggObj,
        VarTag::ConstDataObj,
        VarTag::ConstFpObj,
        VarTag::ConstIntObj,
        VarTag::ConstNullPtrObj,
        VarTag::RetPn,
        VarTag::VarArgPn,
        VarTag::DummyVal,
        VarTag::DummyObj,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VarTag::Val => "ValVar",
            VarTag::Obj => "ObjVar",
            VarTag::Arg => "ArgValVar",
            VarTag::GepVal => "GepValVar",
            VarTag::BaseObj => "BaseObjVar",
            VarTag::GepObj => "GepObjVar",
            VarTag::HeapObj => "HeapObjVar",
            VarTag::StackObj => "StackObjVar",
            VarTag::FunObj => "FunObjVar",
            VarTag::FunVal => "FunValVar",
            VarTag::GlobalVal => "GlobalValVar",
            VarTag::ConstAggVal => "ConstAggValVar",
            VarTag::ConstDataVal => "ConstDataValVar",
            VarTag::BlackHoleVal => "BlackHoleValVar",
            VarTag::ConstFpVal => "ConstFPValVar",
            VarTag::ConstIntVal => "ConstIntValVar",
            VarTag::ConstNullPtrVal => "ConstNullPtrValVar",
            VarTag::GlobalObj => "GlobalObjVar",
            VarTag::ConstAggObj => "ConstAggObjVar",
            VarTag::ConstDataObj => "ConstDataObjVar",
            VarTag::ConstFpObj => "ConstFPObjVar",
            VarTag::ConstIntObj => "ConstIntObjVar",
            VarTag::ConstNullPtrObj => "ConstNullPtrObjVar",
            VarTag::RetPn => "RetValPN",
            VarTag::VarArgPn => "VarArgValPN",
            VarTag::DummyVal => "DummyValVar",
            VarTag::DummyObj => "DummyObjVar",
        }
    }

    /// Whether variables of this kind carry an [`ObjTypeInfo`].
    pub fn is_object(self) -> bool {
        matches!(
            self,
            VarTag::Obj
                | VarTag::BaseObj
                | VarTag::HeapObj
                | VarTag::StackObj
                | VarTag::FunObj
                | VarTag::GlobalObj
                | VarTag::ConstAggObj
                | VarTag::ConstDataObj
                | VarTag::ConstFpObj
                | VarTag::ConstIntObj
                | VarTag::ConstNullPtrObj
                | VarTag::DummyObj
        )
    }
}

impl VarKind {
    pub fn tag(&self) -> VarTag {
        match self {
            VarKind::Val => VarTag::Val,
            VarKind::Obj(_) => VarTag::Obj,
            VarKind::Arg { .. } => VarTag::Arg,
            VarKind::GepVal { .. } => VarTag::GepVal,
            VarKind::BaseObj(_) => VarTag::BaseObj,
            VarKind::GepObj { .. } => VarTag::GepObj,
            VarKind::HeapObj(_) => VarTag::HeapObj,
            VarKind::StackObj(_) => VarTag::StackObj,
            VarKind::FunObj(_) => VarTag::FunObj,
            VarKind::FunVal { .. } => VarTag::FunVal,
            VarKind::GlobalVal => VarTag::GlobalVal,
            VarKind::ConstAggVal => VarTag::ConstAggVal,
            VarKind::ConstDataVal => VarTag::ConstDataVal,
            VarKind::BlackHoleVal => VarTag::BlackHoleVal,
            VarKind::ConstFpVal { .. } => VarTag::ConstFpVal,
            VarKind::ConstIntVal { .. } => VarTag::ConstIntVal,
            VarKind::ConstNullPtrVal => VarTag::ConstNullPtrVal,
            VarKind::GlobalObj { .. } => VarTag::GlobalObj,
            VarKind::ConstAggObj(_) => VarTag::ConstAggObj,
            VarKind::ConstDataObj(_) => VarTag::ConstDataObj,
            VarKind::ConstFpObj { .. } => VarTag::ConstFpObj,
            VarKind::ConstIntObj { .. } => VarTag::ConstIntObj,
            VarKind::ConstNullPtrObj(_) => VarTag::ConstNullPtrObj,
            VarKind::RetPn { .. } => VarTag::RetPn,
            VarKind::VarArgPn { .. } => VarTag::VarArgPn,
            VarKind::DummyVal => VarTag::DummyVal,
            VarKind::DummyObj(_) => VarTag::DummyObj,
        }
    }

    /// The object layout info, for object kinds.
    pub fn obj_info(&self) -> Option<&ObjTypeInfo> {
        match self {
            VarKind::Obj(obj)
            | VarKind::BaseObj(obj)
            | VarKind::HeapObj(obj)
            | VarKind::StackObj(obj)
            | VarKind::ConstAggObj(obj)
            | VarKind::ConstDataObj(obj)
            | VarKind::ConstNullPtrObj(obj)
            | VarKind::DummyObj(obj)
            | VarKind::GlobalObj { obj, .. }
            | VarKind::ConstFpObj { obj, .. }
            | VarKind::ConstIntObj { obj, .. } => Some(obj),
            VarKind::FunObj(fun) => Some(&fun.obj),
            _ => None,
        }
    }
}

impl SvfVar {
    pub fn tag(&self) -> VarTag {
        self.kind.tag()
    }

    pub fn as_function(&self) -> Option<&FunObj> {
        match &self.kind {
            VarKind::FunObj(fun) => Some(fun),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_tags_match_obj_info() {
        let samples = [
            VarKind::Val,
            VarKind::HeapObj(ObjTypeInfo::default()),
            VarKind::FunObj(Box::default()),
            VarKind::ConstIntObj {
                obj: ObjTypeInfo::default(),
                zext: 1,
                sext: 1,
            },
            VarKind::GepObj {
                base: None,
                offset: 4,
            },
        ];
        for kind in &samples {
            assert_eq!(kind.tag().is_object(), kind.obj_info().is_some(), "{:?}", kind);
        }
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<_> = VarTag::ALL.iter().map(|t| t.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), VarTag::ALL.len());
    }
}
