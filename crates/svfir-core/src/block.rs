//! Per-function basic-block graphs.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::id::{BlockId, BlockKey, IcfgNodeId, VarId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub function: VarId,
    pub id: BlockId,
    pub name: String,
    pub succs: Vec<BlockId>,
    pub preds: Vec<BlockId>,
    /// ICFG nodes inside this block, in program order.
    pub icfg_nodes: Vec<IcfgNodeId>,
}

impl BasicBlock {
    pub fn key(&self) -> BlockKey {
        BlockKey::new(self.function, self.id)
    }
}

/// An edge between two blocks of the same function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockEdge {
    pub function: VarId,
    pub src: BlockId,
    pub dst: BlockId,
}

/// The blocks of one function and the edges between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlockGraph {
    pub function: VarId,
    blocks: BTreeMap<BlockId, BasicBlock>,
    edges: BTreeSet<(BlockId, BlockId)>,
}

impl BasicBlockGraph {
    pub fn new(function: VarId) -> Self {
        BasicBlockGraph {
            function,
            blocks: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.values()
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn edges(&self) -> impl Iterator<Item = BlockEdge> + '_ {
        self.edges.iter().map(move |&(src, dst)| BlockEdge {
            function: self.function,
            src,
            dst,
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn insert_block(&mut self, block: BasicBlock) -> bool {
        if self.blocks.contains_key(&block.id) {
            return false;
        }
        self.blocks.insert(block.id, block);
        true
    }

    pub(crate) fn insert_edge(&mut self, src: BlockId, dst: BlockId) -> bool {
        self.edges.insert((src, dst))
    }

    /// A petgraph view of the control flow between this function's blocks.
    pub fn cfg(&self) -> DiGraphMap<BlockId, ()> {
        let mut graph = DiGraphMap::new();
        for id in self.blocks.keys() {
            graph.add_node(*id);
        }
        for &(src, dst) in &self.edges {
            graph.add_edge(src, dst, ());
        }
        graph
    }
}
