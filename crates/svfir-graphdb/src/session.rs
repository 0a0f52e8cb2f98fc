//! Cross-Reference Index for one load session.
//!
//! A [`LoadSession`] owns every entity built so far, one table per
//! namespace, plus the queue of deferred patches. Its lifetime is exactly
//! one load; nothing here is global.
//!
//! Building a record goes through a [`Binder`], which applies the
//! [`Field`] policy to every reference and collects patches locally. The
//! patches join the session queue only if the record is committed, so a
//! rejected record leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use svfir_core::{
    BasicBlock, BlockEdge, BlockKey, CallGraphEdge, CallGraphEdgeKey, CallGraphNode,
    CallGraphNodeId, ChEdge, ChNode, ChNodeId, IcfgEdge, IcfgEdgeKey, IcfgEdgeKind, IcfgNode,
    IcfgNodeId, IcfgNodeKind, StInfo, StInfoId, StmtId, StmtKind, SvfStmt, SvfType,
    SvfTypeKind, SvfVar, TypeId, VarId, VarKind,
};
use tracing::warn;

use crate::diagnostics::Diagnostic;
use crate::error::RecordError;
use crate::refs::{Field, Namespace, RefPolicy};

/// The id a reference slot points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Type(TypeId),
    StInfo(StInfoId),
    Var(VarId),
    Stmt(StmtId),
    IcfgNode(IcfgNodeId),
    CallGraphNode(CallGraphNodeId),
    ChNode(ChNodeId),
    Block(BlockKey),
}

impl Target {
    pub fn namespace(self) -> Namespace {
        match self {
            Target::Type(_) => Namespace::Type,
            Target::StInfo(_) => Namespace::StInfo,
            Target::Var(_) => Namespace::Var,
            Target::Stmt(_) => Namespace::Stmt,
            Target::IcfgNode(_) => Namespace::IcfgNode,
            Target::CallGraphNode(_) => Namespace::CallGraphNode,
            Target::ChNode(_) => Namespace::ChNode,
            Target::Block(_) => Namespace::Block,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Type(id) => write!(f, "type {}", id),
            Target::StInfo(id) => write!(f, "stinfo {}", id),
            Target::Var(id) => write!(f, "var {}", id),
            Target::Stmt(id) => write!(f, "stmt {}", id),
            Target::IcfgNode(id) => write!(f, "icfg node {}", id),
            Target::CallGraphNode(id) => write!(f, "call graph node {}", id),
            Target::ChNode(id) => write!(f, "class {}", id),
            Target::Block(key) => write!(f, "block {}", key),
        }
    }
}

/// An id type that can be the target of a reference.
pub trait Referent: Copy {
    fn target(self) -> Target;
}

macro_rules! referent {
    ($($ty:ident => $variant:ident),* $(,)?) => {$(
        impl Referent for $ty {
            fn target(self) -> Target {
                Target::$variant(self)
            }
        }
    )*};
}

referent!(
    TypeId => Type,
    StInfoId => StInfo,
    VarId => Var,
    StmtId => Stmt,
    IcfgNodeId => IcfgNode,
    CallGraphNodeId => CallGraphNode,
    ChNodeId => ChNode,
    BlockKey => Block,
);

/// Identity of any entity in the session, nodes and edges alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityRef {
    Type(TypeId),
    StInfo(StInfoId),
    Var(VarId),
    Stmt(StmtId),
    IcfgNode(IcfgNodeId),
    IcfgEdge(IcfgEdgeKey),
    CallGraphNode(CallGraphNodeId),
    CallGraphEdge(CallGraphEdgeKey),
    ChNode(ChNodeId),
    ChEdge(ChEdge),
    Block(BlockKey),
    BlockEdge(BlockEdge),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Type(id) => write!(f, "type {}", id),
            EntityRef::StInfo(id) => write!(f, "stinfo {}", id),
            EntityRef::Var(id) => write!(f, "var {}", id),
            EntityRef::Stmt(id) => write!(f, "stmt {}", id),
            EntityRef::IcfgNode(id) => write!(f, "icfg node {}", id),
            EntityRef::IcfgEdge(key) => write!(f, "icfg edge {}", key),
            EntityRef::CallGraphNode(id) => write!(f, "call graph node {}", id),
            EntityRef::CallGraphEdge(key) => write!(f, "call graph edge {}", key),
            EntityRef::ChNode(id) => write!(f, "class {}", id),
            EntityRef::ChEdge(edge) => write!(f, "class edge {}", edge),
            EntityRef::Block(key) => write!(f, "block {}", key),
            EntityRef::BlockEdge(edge) => write!(
                f,
                "block edge {}:{}->{}",
                edge.function, edge.src, edge.dst
            ),
        }
    }
}

/// A freshly built entity, ready to be registered.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Type(SvfType),
    StInfo(StInfo),
    Var(SvfVar),
    Block(BasicBlock),
    BlockEdge(BlockEdge),
    ChNode(ChNode),
    ChEdge(ChEdge),
    IcfgNode(IcfgNode),
    IcfgEdge(IcfgEdge),
    CallGraphNode(CallGraphNode),
    CallGraphEdge(CallGraphEdge),
    Stmt(SvfStmt),
}

impl Entity {
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Entity::Type(ty) => EntityRef::Type(ty.id),
            Entity::StInfo(info) => EntityRef::StInfo(info.id),
            Entity::Var(var) => EntityRef::Var(var.id),
            Entity::Block(block) => EntityRef::Block(block.key()),
            Entity::BlockEdge(edge) => EntityRef::BlockEdge(*edge),
            Entity::ChNode(node) => EntityRef::ChNode(node.id),
            Entity::ChEdge(edge) => EntityRef::ChEdge(*edge),
            Entity::IcfgNode(node) => EntityRef::IcfgNode(node.id),
            Entity::IcfgEdge(edge) => EntityRef::IcfgEdge(edge.key()),
            Entity::CallGraphNode(node) => EntityRef::CallGraphNode(node.id),
            Entity::CallGraphEdge(edge) => EntityRef::CallGraphEdge(edge.key()),
            Entity::Stmt(stmt) => EntityRef::Stmt(stmt.id),
        }
    }
}

/// A deferred reference, ordered by target so that the queue is keyed by
/// the id it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Patch {
    pub target: Target,
    pub owner: EntityRef,
    pub field: Field,
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

fn missing(field: Field, target: impl fmt::Display) -> RecordError {
    RecordError::MissingReference {
        field,
        target: target.to_string(),
    }
}

/// Applies reference policies while one record is being built.
pub struct Binder<'s> {
    session: &'s LoadSession,
    owner: EntityRef,
    patches: Vec<Patch>,
}

impl<'s> Binder<'s> {
    fn check<I: Referent>(&self, field: Field, id: I) -> (Target, RefPolicy) {
        let spec = field.spec();
        let target = id.target();
        debug_assert_eq!(target.namespace(), spec.target, "{:?}", field);
        (target, spec.policy)
    }

    fn defer(&mut self, field: Field, target: Target) {
        self.patches.push(Patch {
            target,
            owner: self.owner,
            field,
        });
    }

    /// Binds a single-valued reference.
    ///
    /// Returns the id when its target is loaded, `None` when the slot is
    /// absent or deferred, and an error when a mandatory slot cannot be
    /// satisfied. A deferred slot is assigned in the final pass.
    pub fn one<I: Referent>(&mut self, field: Field, raw: Option<I>) -> Result<Option<I>, RecordError> {
        let Some(id) = raw else {
            return if field.spec().policy.allows_absent() {
                Ok(None)
            } else {
                Err(missing(field, "sentinel"))
            };
        };
        let (target, policy) = self.check(field, id);
        if self.session.contains(target) {
            return Ok(Some(id));
        }
        match policy {
            RefPolicy::Mandatory => Err(missing(field, target)),
            RefPolicy::Optional => Ok(None),
            RefPolicy::MandatoryDeferred | RefPolicy::OptionalDeferred => {
                self.defer(field, target);
                Ok(None)
            }
        }
    }

    /// Binds a mandatory slot whose model field is not optional.
    pub fn required<I: Referent>(&mut self, field: Field, raw: Option<I>) -> Result<I, RecordError> {
        match self.one(field, raw)? {
            Some(id) => Ok(id),
            None => Err(missing(field, "an unloaded target")),
        }
    }

    /// Decides whether one collection member is kept.
    ///
    /// Deferred members are kept and confirmed in the final pass.
    pub fn member<I: Referent>(&mut self, field: Field, id: I) -> Result<bool, RecordError> {
        let (target, policy) = self.check(field, id);
        if self.session.contains(target) {
            return Ok(true);
        }
        match policy {
            RefPolicy::Mandatory => Err(missing(field, target)),
            RefPolicy::Optional => Ok(false),
            RefPolicy::MandatoryDeferred | RefPolicy::OptionalDeferred => {
                self.defer(field, target);
                Ok(true)
            }
        }
    }

    /// Binds every member of a collection slot.
    pub fn many<I, C>(&mut self, field: Field, ids: impl IntoIterator<Item = I>) -> Result<C, RecordError>
    where
        I: Referent,
        C: FromIterator<I>,
    {
        let mut kept = Vec::new();
        for id in ids {
            if self.member(field, id)? {
                kept.push(id);
            }
        }
        Ok(kept.into_iter().collect())
    }

    pub fn finish(self) -> Vec<Patch> {
        self.patches
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Per-session tables, one per namespace, plus the patch queue.
#[derive(Debug, Default)]
pub struct LoadSession {
    pub(crate) types: BTreeMap<TypeId, SvfType>,
    pub(crate) st_infos: BTreeMap<StInfoId, StInfo>,
    pub(crate) vars: BTreeMap<VarId, SvfVar>,
    pub(crate) stmts: BTreeMap<StmtId, SvfStmt>,
    pub(crate) icfg_nodes: BTreeMap<IcfgNodeId, IcfgNode>,
    pub(crate) icfg_edges: BTreeMap<IcfgEdgeKey, IcfgEdge>,
    pub(crate) call_graph_nodes: BTreeMap<CallGraphNodeId, CallGraphNode>,
    pub(crate) call_graph_edges: BTreeMap<CallGraphEdgeKey, CallGraphEdge>,
    pub(crate) ch_nodes: BTreeMap<ChNodeId, ChNode>,
    pub(crate) ch_edges: BTreeSet<ChEdge>,
    pub(crate) blocks: BTreeMap<BlockKey, BasicBlock>,
    pub(crate) block_edges: BTreeSet<BlockEdge>,
    pending: BTreeSet<Patch>,
    diagnostics: Vec<Diagnostic>,
    built: usize,
    resolved: bool,
}

impl LoadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, target: Target) -> bool {
        match target {
            Target::Type(id) => self.types.contains_key(&id),
            Target::StInfo(id) => self.st_infos.contains_key(&id),
            Target::Var(id) => self.vars.contains_key(&id),
            Target::Stmt(id) => self.stmts.contains_key(&id),
            Target::IcfgNode(id) => self.icfg_nodes.contains_key(&id),
            Target::CallGraphNode(id) => self.call_graph_nodes.contains_key(&id),
            Target::ChNode(id) => self.ch_nodes.contains_key(&id),
            Target::Block(key) => self.blocks.contains_key(&key),
        }
    }

    pub fn binder(&self, owner: EntityRef) -> Binder<'_> {
        Binder {
            session: self,
            owner,
            patches: Vec::new(),
        }
    }

    /// Registers a built entity together with the patches its binder
    /// collected.
    ///
    /// A repeated node id keeps the first entity and records one
    /// [`Diagnostic::DuplicateEntity`]. A repeated edge is a no-op. In both
    /// cases the new patches are dropped. Returns whether the entity was
    /// inserted.
    pub fn commit(&mut self, entity: Entity, patches: Vec<Patch>) -> bool {
        let entity_ref = entity.entity_ref();
        let inserted = match entity {
            Entity::Type(ty) => insert_node(&mut self.types, ty.id, ty),
            Entity::StInfo(info) => insert_node(&mut self.st_infos, info.id, info),
            Entity::Var(var) => insert_node(&mut self.vars, var.id, var),
            Entity::Block(block) => insert_node(&mut self.blocks, block.key(), block),
            Entity::ChNode(node) => insert_node(&mut self.ch_nodes, node.id, node),
            Entity::IcfgNode(node) => insert_node(&mut self.icfg_nodes, node.id, node),
            Entity::CallGraphNode(node) => insert_node(&mut self.call_graph_nodes, node.id, node),
            Entity::BlockEdge(edge) => Some(self.block_edges.insert(edge)),
            Entity::ChEdge(edge) => Some(self.ch_edges.insert(edge)),
            Entity::IcfgEdge(edge) => Some(insert_edge(&mut self.icfg_edges, edge.key(), edge)),
            Entity::CallGraphEdge(edge) => {
                Some(insert_edge(&mut self.call_graph_edges, edge.key(), edge))
            }
            Entity::Stmt(stmt) => Some(insert_edge(&mut self.stmts, stmt.id, stmt)),
        };
        match inserted {
            Some(true) => {
                self.built += 1;
                self.pending.extend(patches);
                true
            }
            Some(false) => false,
            None => {
                warn!(entity = %entity_ref, "duplicate entity in load session, keeping the first");
                self.diagnostics.push(Diagnostic::DuplicateEntity { entity: entity_ref });
                false
            }
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn entities_built(&self) -> usize {
        self.built
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// The final pass over the patch queue.
    ///
    /// Every patch whose target is now loaded is applied; every other one
    /// is cleared from its owner and reported exactly once. Runs at most
    /// once per session; returns the number of unresolved patches.
    pub fn resolve_deferred(&mut self) -> usize {
        if self.resolved {
            return 0;
        }
        self.resolved = true;

        let mut unresolved = 0;
        for patch in std::mem::take(&mut self.pending) {
            let found = self.contains(patch.target);
            self.apply(patch, found);
            if !found {
                unresolved += 1;
                warn!(
                    owner = %patch.owner,
                    field = ?patch.field,
                    target = %patch.target,
                    "deferred reference never resolved"
                );
                self.diagnostics.push(Diagnostic::UnresolvedReference {
                    owner: patch.owner,
                    field: patch.field,
                    target: patch.target,
                });
            }
        }
        unresolved
    }

    fn apply(&mut self, patch: Patch, found: bool) {
        let Patch {
            target,
            owner,
            field,
        } = patch;
        match owner {
            EntityRef::Type(id) => {
                if let Some(ty) = self.types.get_mut(&id) {
                    patch_type(ty, field, target, found);
                }
            }
            EntityRef::Var(id) => {
                if let Some(var) = self.vars.get_mut(&id) {
                    patch_var(var, field, target, found);
                }
            }
            EntityRef::Block(key) => {
                if let Some(block) = self.blocks.get_mut(&key) {
                    patch_block(block, field, target, found);
                }
            }
            EntityRef::IcfgNode(id) => {
                if let Some(node) = self.icfg_nodes.get_mut(&id) {
                    patch_icfg_node(node, field, target, found);
                }
            }
            EntityRef::IcfgEdge(key) => {
                if let Some(edge) = self.icfg_edges.get_mut(&key) {
                    patch_icfg_edge(edge, field, target, found);
                }
            }
            EntityRef::Stmt(id) => {
                if let Some(stmt) = self.stmts.get_mut(&id) {
                    if let (Field::AccessPathOperand, Target::Var(var), StmtKind::Gep { access_path, .. }) =
                        (field, target, &mut stmt.kind)
                    {
                        retain_operand(&mut access_path.operands, var, found);
                    }
                }
            }
            EntityRef::StInfo(_)
            | EntityRef::CallGraphNode(_)
            | EntityRef::CallGraphEdge(_)
            | EntityRef::ChNode(_)
            | EntityRef::ChEdge(_)
            | EntityRef::BlockEdge(_) => {}
        }
    }
}

fn insert_node<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V) -> Option<bool> {
    if table.contains_key(&key) {
        return None;
    }
    table.insert(key, value);
    Some(true)
}

fn insert_edge<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V) -> bool {
    if table.contains_key(&key) {
        return false;
    }
    table.insert(key, value);
    true
}

// ---------------------------------------------------------------------------
// Patch application
// ---------------------------------------------------------------------------

fn assign<I>(slot: &mut Option<I>, id: I, found: bool) {
    if found {
        *slot = Some(id);
    }
}

fn retain<I: PartialEq>(list: &mut Vec<I>, id: I, found: bool) {
    if !found {
        list.retain(|member| *member != id);
    }
}

fn retain_operand<T>(operands: &mut Vec<(VarId, T)>, var: VarId, found: bool) {
    if !found {
        operands.retain(|(member, _)| *member != var);
    }
}

fn patch_type(ty: &mut SvfType, field: Field, target: Target, found: bool) {
    match (field, target, &mut ty.kind) {
        (Field::TypeI8, Target::Type(t), _) => assign(&mut ty.i8_type, t, found),
        (Field::TypePtr, Target::Type(t), _) => assign(&mut ty.ptr_type, t, found),
        (Field::FunctionRet, Target::Type(t), SvfTypeKind::Function { ret, .. }) => {
            assign(ret, t, found)
        }
        (Field::FunctionParams, Target::Type(t), SvfTypeKind::Function { params, .. }) => {
            retain(params, t, found)
        }
        (Field::StructFields, Target::Type(t), SvfTypeKind::Struct { fields, .. }) => {
            retain(fields, t, found)
        }
        (Field::StructStInfo, Target::StInfo(s), SvfTypeKind::Struct { st_info, .. })
        | (Field::ArrayStInfo, Target::StInfo(s), SvfTypeKind::Array { st_info, .. }) => {
            assign(st_info, s, found)
        }
        (Field::ArrayElement, Target::Type(t), SvfTypeKind::Array { element, .. }) => {
            assign(element, t, found)
        }
        _ => {}
    }
}

fn patch_var(var: &mut SvfVar, field: Field, target: Target, found: bool) {
    match (field, target, &mut var.kind) {
        (Field::VarIcfgNode, Target::IcfgNode(n), _) => assign(&mut var.icfg_node, n, found),
        (Field::ArgFunction, Target::Var(v), VarKind::Arg { function, .. })
        | (Field::FunValFunction, Target::Var(v), VarKind::FunVal { function })
        | (Field::PnFunction, Target::Var(v), VarKind::RetPn { function })
        | (Field::PnFunction, Target::Var(v), VarKind::VarArgPn { function }) => {
            assign(function, v, found)
        }
        (Field::GepValBase, Target::Var(v), VarKind::GepVal { base, .. })
        | (Field::GepObjBase, Target::Var(v), VarKind::GepObj { base, .. }) => {
            assign(base, v, found)
        }
        (Field::AccessPathOperand, Target::Var(v), VarKind::GepVal { access_path, .. }) => {
            retain_operand(&mut access_path.operands, v, found)
        }
        (Field::FunObjRealDef, Target::Var(v), VarKind::FunObj(fun)) => {
            assign(&mut fun.real_def, v, found)
        }
        (Field::FunObjArgs, Target::Var(v), VarKind::FunObj(fun)) => {
            retain(&mut fun.args, v, found)
        }
        _ => {}
    }
}

fn patch_block(block: &mut BasicBlock, field: Field, target: Target, found: bool) {
    match (field, target) {
        (Field::BlockSuccs, Target::Block(key)) => retain(&mut block.succs, key.block, found),
        (Field::BlockPreds, Target::Block(key)) => retain(&mut block.preds, key.block, found),
        (Field::BlockIcfgNodes, Target::IcfgNode(n)) => retain(&mut block.icfg_nodes, n, found),
        _ => {}
    }
}

fn patch_icfg_node(node: &mut IcfgNode, field: Field, target: Target, found: bool) {
    match (field, target, &mut node.kind) {
        (Field::IcfgStmts, Target::Stmt(s), _) => retain(&mut node.stmts, s, found),
        (Field::RetCallNode, Target::IcfgNode(n), IcfgNodeKind::Ret { call_node, .. }) => {
            assign(call_node, n, found)
        }
        _ => {}
    }
}

fn patch_icfg_edge(edge: &mut IcfgEdge, field: Field, target: Target, found: bool) {
    match (field, target, &mut edge.kind) {
        (Field::CallCfgPes, Target::Stmt(s), IcfgEdgeKind::Call { call_pes }) => {
            retain(call_pes, s, found)
        }
        (Field::RetCfgPe, Target::Stmt(s), IcfgEdgeKind::Ret { ret_pe }) => {
            assign(ret_pe, s, found)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(id: u32) -> SvfType {
        SvfType {
            id: TypeId(id),
            byte_size: 8,
            single_value: true,
            i8_type: None,
            ptr_type: None,
            kind: SvfTypeKind::Pointer,
        }
    }

    fn function_type(session: &LoadSession, id: u32, ret: u32, params: &[u32]) -> (Entity, Vec<Patch>) {
        let mut binder = session.binder(EntityRef::Type(TypeId(id)));
        let ret = binder.one(Field::FunctionRet, Some(TypeId(ret))).unwrap();
        let params = binder
            .many(Field::FunctionParams, params.iter().map(|p| TypeId(*p)))
            .unwrap();
        let ty = SvfType {
            kind: SvfTypeKind::Function { ret, params },
            ..pointer(id)
        };
        (Entity::Type(ty), binder.finish())
    }

    #[test]
    fn test_forward_reference_resolves_in_final_pass() {
        let mut session = LoadSession::new();
        // Type 2 names type 1 before type 1 is loaded.
        let (entity, patches) = function_type(&session, 2, 1, &[1]);
        assert_eq!(patches.len(), 2);
        assert!(session.commit(entity, patches));
        assert!(session.commit(Entity::Type(pointer(1)), Vec::new()));

        assert_eq!(session.resolve_deferred(), 0);
        let SvfTypeKind::Function { ret, params } = &session.types[&TypeId(2)].kind else {
            panic!("not a function type");
        };
        assert_eq!(*ret, Some(TypeId(1)));
        assert_eq!(params, &vec![TypeId(1)]);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_unresolved_reported_once_and_pruned() {
        let mut session = LoadSession::new();
        session.commit(Entity::Type(pointer(1)), Vec::new());
        let (entity, patches) = function_type(&session, 2, 9, &[1, 9, 9]);
        session.commit(entity, patches);

        // One patch per (owner, field, target), however often the id repeats.
        assert_eq!(session.pending_count(), 2);
        assert_eq!(session.resolve_deferred(), 2);
        assert_eq!(session.resolve_deferred(), 0);
        assert!(session.is_resolved());

        let SvfTypeKind::Function { ret, params } = &session.types[&TypeId(2)].kind else {
            panic!("not a function type");
        };
        assert_eq!(*ret, None);
        assert_eq!(params, &vec![TypeId(1)]);
        let unresolved: Vec<_> = session.diagnostics().iter().filter(|d| d.is_unresolved()).collect();
        assert_eq!(unresolved.len(), 2);
    }

    #[test]
    fn test_mandatory_reference_rejects_record() {
        let session = LoadSession::new();
        let mut binder = session.binder(EntityRef::Var(VarId(1)));
        let err = binder.required(Field::VarType, Some(TypeId(7))).unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingReference {
                field: Field::VarType,
                target: "type 7".into()
            }
        );
        let err = binder.one::<TypeId>(Field::VarType, None).unwrap_err();
        assert!(matches!(err, RecordError::MissingReference { .. }));
        assert_eq!(binder.one::<TypeId>(Field::FunctionRet, None).unwrap(), None);
        assert!(binder.finish().is_empty());
    }

    #[test]
    fn test_optional_reference_absent_or_missing() {
        let session = LoadSession::new();
        let mut binder = session.binder(EntityRef::Var(VarId(1)));
        assert_eq!(binder.one::<TypeId>(Field::ObjType, None).unwrap(), None);
        assert_eq!(binder.one(Field::ObjType, Some(TypeId(4))).unwrap(), None);
        let kept: Vec<VarId> = binder.many(Field::ChaVtables, [VarId(3)]).unwrap();
        assert!(kept.is_empty());
        assert!(binder.finish().is_empty());
    }

    #[test]
    fn test_duplicate_node_keeps_first_and_drops_patches() {
        let mut session = LoadSession::new();
        assert!(session.commit(Entity::Type(pointer(1)), Vec::new()));
        let (entity, patches) = function_type(&session, 1, 5, &[]);
        assert!(!session.commit(entity, patches));
        assert_eq!(session.types[&TypeId(1)].kind, SvfTypeKind::Pointer);
        assert_eq!(session.pending_count(), 0);
        assert_eq!(
            session.diagnostics(),
            &[Diagnostic::DuplicateEntity {
                entity: EntityRef::Type(TypeId(1))
            }]
        );
        assert_eq!(session.entities_built(), 1);
    }

    #[test]
    fn test_duplicate_edge_is_silent() {
        let mut session = LoadSession::new();
        let edge = ChEdge {
            src: ChNodeId(1),
            dst: ChNodeId(2),
            kind: svfir_core::ChEdgeKind::Inheritance,
        };
        assert!(session.commit(Entity::ChEdge(edge), Vec::new()));
        assert!(!session.commit(Entity::ChEdge(edge), Vec::new()));
        assert_eq!(session.ch_edges.len(), 1);
        assert!(session.diagnostics().is_empty());
    }
}
