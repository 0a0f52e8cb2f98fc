//! The composed program-IR graph.
//!
//! [`SvfIr`] owns one table per namespace, keyed by id, plus secondary
//! indexes derived on insertion:
//! - function id to its [`BasicBlockGraph`]
//! - call-site ICFG node to the call-graph edges it realises
//! - class name to class-hierarchy node
//!
//! Entities reference each other by id only. Edge insertion is idempotent
//! on the edge's identity key; node insertion rejects duplicate ids.
//!
//! Serialization goes through [`IrSnapshot`], a flat list-per-namespace
//! form, because several tables are keyed by composite ids. Deserializing
//! an inconsistent snapshot is an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::block::{BasicBlock, BasicBlockGraph, BlockEdge};
use crate::callgraph::{CallGraphEdge, CallGraphEdgeKey, CallGraphNode};
use crate::chg::{ChEdge, ChNode};
use crate::error::CoreError;
use crate::icfg::{IcfgEdge, IcfgEdgeKey, IcfgNode};
use crate::id::{BlockKey, CallGraphNodeId, ChNodeId, IcfgNodeId, StInfoId, StmtId, TypeId, VarId};
use crate::stmt::SvfStmt;
use crate::types::{StInfo, SvfType};
use crate::var::SvfVar;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IrSnapshot", into = "IrSnapshot")]
pub struct SvfIr {
    types: BTreeMap<TypeId, SvfType>,
    st_infos: BTreeMap<StInfoId, StInfo>,
    vars: BTreeMap<VarId, SvfVar>,
    stmts: BTreeMap<StmtId, SvfStmt>,
    icfg_nodes: BTreeMap<IcfgNodeId, IcfgNode>,
    icfg_edges: BTreeMap<IcfgEdgeKey, IcfgEdge>,
    call_graph_nodes: BTreeMap<CallGraphNodeId, CallGraphNode>,
    call_graph_edges: BTreeMap<CallGraphEdgeKey, CallGraphEdge>,
    ch_nodes: BTreeMap<ChNodeId, ChNode>,
    ch_edges: BTreeSet<ChEdge>,
    block_graphs: BTreeMap<VarId, BasicBlockGraph>,

    // Secondary indexes
    call_site_edges: BTreeMap<IcfgNodeId, BTreeSet<CallGraphEdgeKey>>,
    classes_by_name: BTreeMap<String, ChNodeId>,
}

fn duplicate(kind: &'static str, id: impl ToString) -> CoreError {
    CoreError::DuplicateEntity {
        kind,
        id: id.to_string(),
    }
}

fn not_found(kind: &'static str, id: impl ToString) -> CoreError {
    CoreError::EntityNotFound {
        kind,
        id: id.to_string(),
    }
}

impl SvfIr {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Node insertion
    // -----------------------------------------------------------------------

    pub fn add_type(&mut self, ty: SvfType) -> Result<(), CoreError> {
        if self.types.contains_key(&ty.id) {
            return Err(duplicate("type", ty.id));
        }
        self.types.insert(ty.id, ty);
        Ok(())
    }

    pub fn add_st_info(&mut self, info: StInfo) -> Result<(), CoreError> {
        if self.st_infos.contains_key(&info.id) {
            return Err(duplicate("stinfo", info.id));
        }
        self.st_infos.insert(info.id, info);
        Ok(())
    }

    pub fn add_var(&mut self, var: SvfVar) -> Result<(), CoreError> {
        if self.vars.contains_key(&var.id) {
            return Err(duplicate("var", var.id));
        }
        self.vars.insert(var.id, var);
        Ok(())
    }

    pub fn add_icfg_node(&mut self, node: IcfgNode) -> Result<(), CoreError> {
        if self.icfg_nodes.contains_key(&node.id) {
            return Err(duplicate("icfg node", node.id));
        }
        self.icfg_nodes.insert(node.id, node);
        Ok(())
    }

    pub fn add_call_graph_node(&mut self, node: CallGraphNode) -> Result<(), CoreError> {
        if self.call_graph_nodes.contains_key(&node.id) {
            return Err(duplicate("call graph node", node.id));
        }
        self.call_graph_nodes.insert(node.id, node);
        Ok(())
    }

    pub fn add_ch_node(&mut self, node: ChNode) -> Result<(), CoreError> {
        if self.ch_nodes.contains_key(&node.id) {
            return Err(duplicate("class hierarchy node", node.id));
        }
        self.classes_by_name
            .entry(node.class_name.clone())
            .or_insert(node.id);
        self.ch_nodes.insert(node.id, node);
        Ok(())
    }

    /// Adds a block to its function's block graph, creating the graph on
    /// first use.
    pub fn add_basic_block(&mut self, block: BasicBlock) -> Result<(), CoreError> {
        let key = block.key();
        let graph = self
            .block_graphs
            .entry(block.function)
            .or_insert_with(|| BasicBlockGraph::new(block.function));
        if !graph.insert_block(block) {
            return Err(duplicate("basic block", key));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Edge insertion (idempotent, returns whether the edge was new)
    // -----------------------------------------------------------------------

    /// Adds a statement. A statement whose id is already present is ignored.
    pub fn add_stmt(&mut self, stmt: SvfStmt) -> Result<bool, CoreError> {
        if self.stmts.contains_key(&stmt.id) {
            return Ok(false);
        }
        for end in [stmt.src, stmt.dst] {
            if !self.vars.contains_key(&end) {
                return Err(not_found("var", end));
            }
        }
        self.stmts.insert(stmt.id, stmt);
        Ok(true)
    }

    pub fn add_icfg_edge(&mut self, edge: IcfgEdge) -> Result<bool, CoreError> {
        let key = edge.key();
        if self.icfg_edges.contains_key(&key) {
            return Ok(false);
        }
        for end in [edge.src, edge.dst] {
            if !self.icfg_nodes.contains_key(&end) {
                return Err(not_found("icfg node", end));
            }
        }
        self.icfg_edges.insert(key, edge);
        Ok(true)
    }

    pub fn add_call_graph_edge(&mut self, edge: CallGraphEdge) -> Result<bool, CoreError> {
        let key = edge.key();
        if self.call_graph_edges.contains_key(&key) {
            return Ok(false);
        }
        for end in [edge.src, edge.dst] {
            if !self.call_graph_nodes.contains_key(&end) {
                return Err(not_found("call graph node", end));
            }
        }
        for site in edge.direct_calls.iter().chain(&edge.indirect_calls) {
            self.call_site_edges.entry(*site).or_default().insert(key);
        }
        self.call_graph_edges.insert(key, edge);
        Ok(true)
    }

    pub fn add_ch_edge(&mut self, edge: ChEdge) -> Result<bool, CoreError> {
        if self.ch_edges.contains(&edge) {
            return Ok(false);
        }
        for end in [edge.src, edge.dst] {
            if !self.ch_nodes.contains_key(&end) {
                return Err(not_found("class hierarchy node", end));
            }
        }
        self.ch_edges.insert(edge);
        Ok(true)
    }

    pub fn add_block_edge(&mut self, edge: BlockEdge) -> Result<bool, CoreError> {
        let graph = self
            .block_graphs
            .get_mut(&edge.function)
            .ok_or(CoreError::BlockNotFound {
                key: BlockKey::new(edge.function, edge.src),
            })?;
        for block in [edge.src, edge.dst] {
            if !graph.contains(block) {
                return Err(CoreError::BlockNotFound {
                    key: BlockKey::new(edge.function, block),
                });
            }
        }
        Ok(graph.insert_edge(edge.src, edge.dst))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn ty(&self, id: TypeId) -> Option<&SvfType> {
        self.types.get(&id)
    }

    pub fn st_info(&self, id: StInfoId) -> Option<&StInfo> {
        self.st_infos.get(&id)
    }

    pub fn var(&self, id: VarId) -> Option<&SvfVar> {
        self.vars.get(&id)
    }

    pub fn stmt(&self, id: StmtId) -> Option<&SvfStmt> {
        self.stmts.get(&id)
    }

    pub fn icfg_node(&self, id: IcfgNodeId) -> Option<&IcfgNode> {
        self.icfg_nodes.get(&id)
    }

    pub fn icfg_edge(&self, key: &IcfgEdgeKey) -> Option<&IcfgEdge> {
        self.icfg_edges.get(key)
    }

    pub fn call_graph_node(&self, id: CallGraphNodeId) -> Option<&CallGraphNode> {
        self.call_graph_nodes.get(&id)
    }

    pub fn ch_node(&self, id: ChNodeId) -> Option<&ChNode> {
        self.ch_nodes.get(&id)
    }

    pub fn ch_node_by_name(&self, class_name: &str) -> Option<&ChNode> {
        self.classes_by_name
            .get(class_name)
            .and_then(|id| self.ch_nodes.get(id))
    }

    pub fn block(&self, key: BlockKey) -> Option<&BasicBlock> {
        self.block_graphs
            .get(&key.function)
            .and_then(|graph| graph.block(key.block))
    }

    /// The basic-block graph of `function`, if it has any blocks.
    pub fn block_graph(&self, function: VarId) -> Option<&BasicBlockGraph> {
        self.block_graphs.get(&function)
    }

    /// Call-graph edges realised by the call node `site`.
    pub fn call_edges_at(&self, site: IcfgNodeId) -> impl Iterator<Item = &CallGraphEdge> {
        self.call_site_edges
            .get(&site)
            .into_iter()
            .flatten()
            .filter_map(|key| self.call_graph_edges.get(key))
    }

    pub fn types(&self) -> impl Iterator<Item = &SvfType> {
        self.types.values()
    }

    pub fn st_infos(&self) -> impl Iterator<Item = &StInfo> {
        self.st_infos.values()
    }

    pub fn vars(&self) -> impl Iterator<Item = &SvfVar> {
        self.vars.values()
    }

    pub fn stmts(&self) -> impl Iterator<Item = &SvfStmt> {
        self.stmts.values()
    }

    pub fn icfg_nodes(&self) -> impl Iterator<Item = &IcfgNode> {
        self.icfg_nodes.values()
    }

    pub fn icfg_edges(&self) -> impl Iterator<Item = &IcfgEdge> {
        self.icfg_edges.values()
    }

    pub fn call_graph_nodes(&self) -> impl Iterator<Item = &CallGraphNode> {
        self.call_graph_nodes.values()
    }

    pub fn call_graph_edges(&self) -> impl Iterator<Item = &CallGraphEdge> {
        self.call_graph_edges.values()
    }

    pub fn ch_nodes(&self) -> impl Iterator<Item = &ChNode> {
        self.ch_nodes.values()
    }

    pub fn ch_edges(&self) -> impl Iterator<Item = &ChEdge> {
        self.ch_edges.iter()
    }

    pub fn block_graphs(&self) -> impl Iterator<Item = &BasicBlockGraph> {
        self.block_graphs.values()
    }

    // -----------------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------------

    /// Number of node entities across all namespaces.
    pub fn node_count(&self) -> usize {
        self.types.len()
            + self.st_infos.len()
            + self.vars.len()
            + self.icfg_nodes.len()
            + self.call_graph_nodes.len()
            + self.ch_nodes.len()
            + self.block_graphs.values().map(|g| g.block_count()).sum::<usize>()
    }

    /// Number of edge entities across all namespaces.
    pub fn edge_count(&self) -> usize {
        self.stmts.len()
            + self.icfg_edges.len()
            + self.call_graph_edges.len()
            + self.ch_edges.len()
            + self.block_graphs.values().map(|g| g.edge_count()).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Snapshot form
// ---------------------------------------------------------------------------

/// Flat serializable form of [`SvfIr`]: one list per namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrSnapshot {
    #[serde(default)]
    pub types: Vec<SvfType>,
    #[serde(default)]
    pub st_infos: Vec<StInfo>,
    #[serde(default)]
    pub vars: Vec<SvfVar>,
    #[serde(default)]
    pub stmts: Vec<SvfStmt>,
    #[serde(default)]
    pub icfg_nodes: Vec<IcfgNode>,
    #[serde(default)]
    pub icfg_edges: Vec<IcfgEdge>,
    #[serde(default)]
    pub call_graph_nodes: Vec<CallGraphNode>,
    #[serde(default)]
    pub call_graph_edges: Vec<CallGraphEdge>,
    #[serde(default)]
    pub ch_nodes: Vec<ChNode>,
    #[serde(default)]
    pub ch_edges: Vec<ChEdge>,
    #[serde(default)]
    pub basic_blocks: Vec<BasicBlock>,
    #[serde(default)]
    pub block_edges: Vec<BlockEdge>,
}

impl From<SvfIr> for IrSnapshot {
    fn from(ir: SvfIr) -> Self {
        let mut basic_blocks = Vec::new();
        let mut block_edges = Vec::new();
        for graph in ir.block_graphs.values() {
            basic_blocks.extend(graph.blocks().cloned());
            block_edges.extend(graph.edges());
        }
        IrSnapshot {
            types: ir.types.into_values().collect(),
            st_infos: ir.st_infos.into_values().collect(),
            vars: ir.vars.into_values().collect(),
            stmts: ir.stmts.into_values().collect(),
            icfg_nodes: ir.icfg_nodes.into_values().collect(),
            icfg_edges: ir.icfg_edges.into_values().collect(),
            call_graph_nodes: ir.call_graph_nodes.into_values().collect(),
            call_graph_edges: ir.call_graph_edges.into_values().collect(),
            ch_nodes: ir.ch_nodes.into_values().collect(),
            ch_edges: ir.ch_edges.into_iter().collect(),
            basic_blocks,
            block_edges,
        }
    }
}

impl IrSnapshot {
    /// Builds an [`SvfIr`], stopping at the first inconsistency.
    pub fn into_ir(self) -> Result<SvfIr, CoreError> {
        let mut ir = SvfIr::new();
        for ty in self.types {
            ir.add_type(ty)?;
        }
        for info in self.st_infos {
            ir.add_st_info(info)?;
        }
        for var in self.vars {
            ir.add_var(var)?;
        }
        for block in self.basic_blocks {
            ir.add_basic_block(block)?;
        }
        for edge in self.block_edges {
            ir.add_block_edge(edge)?;
        }
        for node in self.ch_nodes {
            ir.add_ch_node(node)?;
        }
        for edge in self.ch_edges {
            ir.add_ch_edge(edge)?;
        }
        for node in self.icfg_nodes {
            ir.add_icfg_node(node)?;
        }
        for edge in self.icfg_edges {
            ir.add_icfg_edge(edge)?;
        }
        for node in self.call_graph_nodes {
            ir.add_call_graph_node(node)?;
        }
        for edge in self.call_graph_edges {
            ir.add_call_graph_edge(edge)?;
        }
        for stmt in self.stmts {
            ir.add_stmt(stmt)?;
        }
        Ok(ir)
    }
}

impl TryFrom<IrSnapshot> for SvfIr {
    type Error = CoreError;

    fn try_from(snapshot: IrSnapshot) -> Result<Self, CoreError> {
        snapshot.into_ir()
    }
}
