//! In-memory implementation of [`GraphDbClient`].
//!
//! [`InMemoryGraphDb`] keeps one partition of nodes and edges per named
//! store and executes [`Statement`]s structurally, with the same matching,
//! merging and paging rules as the SQLite backend. It also logs the query
//! text of every statement and can be told to fail requests, which makes
//! it the collaborator of choice in tests.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GraphDbError;
use crate::record::{edge_json, node_json};
use crate::statement::{NodeMatch, Properties, Statement};
use crate::traits::GraphDbClient;

#[derive(Debug, Clone)]
struct StoredNode {
    label: String,
    properties: Map<String, Value>,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    label: String,
    src: usize,
    dst: usize,
    properties: Map<String, Value>,
}

/// Identity of a merged edge: label, endpoint slots, and key properties.
type EdgeIdentity = (String, usize, usize, String);

#[derive(Debug, Clone, Default)]
struct Partition {
    nodes: Vec<StoredNode>,
    /// Node slots by their `id` property.
    by_id: HashMap<i64, Vec<usize>>,
    edges: Vec<StoredEdge>,
    edge_index: HashMap<EdgeIdentity, usize>,
}

impl Partition {
    fn find(&self, pattern: &NodeMatch) -> Option<usize> {
        let matches = |slot: &usize| {
            let node = &self.nodes[*slot];
            pattern.matches(&node.label, &node.properties)
        };
        match pattern.id() {
            Some(id) => self.by_id.get(&id)?.iter().copied().find(matches),
            None => (0..self.nodes.len()).find(matches),
        }
    }

    fn create(&mut self, label: &str, properties: &Properties) {
        let properties = properties.to_object();
        let slot = self.nodes.len();
        if let Some(id) = properties.get("id").and_then(Value::as_i64) {
            self.by_id.entry(id).or_default().push(slot);
        }
        self.nodes.push(StoredNode {
            label: label.to_string(),
            properties,
        });
    }

    /// Returns false when an endpoint matched nothing.
    fn merge(
        &mut self,
        label: &str,
        src: &NodeMatch,
        dst: &NodeMatch,
        key: &Properties,
        properties: &Properties,
    ) -> bool {
        let (Some(src), Some(dst)) = (self.find(src), self.find(dst)) else {
            return false;
        };
        let identity = (
            label.to_string(),
            src,
            dst,
            Value::Object(key.to_object()).to_string(),
        );
        let slot = match self.edge_index.get(&identity) {
            Some(slot) => *slot,
            None => {
                self.edges.push(StoredEdge {
                    label: label.to_string(),
                    src,
                    dst,
                    properties: key.to_object(),
                });
                self.edge_index.insert(identity, self.edges.len() - 1);
                self.edges.len() - 1
            }
        };
        for (k, v) in properties.iter() {
            self.edges[slot].properties.insert(k.to_string(), v.to_json());
        }
        true
    }

    fn endpoint_id(&self, slot: usize) -> Value {
        self.nodes[slot]
            .properties
            .get("id")
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn node_page(&self, label: &str, skip: usize, limit: usize) -> Vec<Value> {
        self.nodes
            .iter()
            .filter(|n| n.label == label)
            .skip(skip)
            .take(limit)
            .map(|n| node_json(&n.label, n.properties.clone()))
            .collect()
    }

    fn edge_page(&self, label: &str, skip: usize, limit: usize) -> Vec<Value> {
        self.edges
            .iter()
            .filter(|e| e.label == label)
            .skip(skip)
            .take(limit)
            .map(|e| {
                edge_json(
                    &e.label,
                    self.endpoint_id(e.src),
                    self.endpoint_id(e.dst),
                    e.properties.clone(),
                )
            })
            .collect()
    }
}

/// A graph store held entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphDb {
    stores: HashMap<String, Partition>,
    failing_stores: HashSet<String>,
    failing_labels: HashSet<String>,
    log: Vec<String>,
}

impl InMemoryGraphDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every request against `store` fail.
    pub fn fail_store(&mut self, store: &str) {
        self.failing_stores.insert(store.to_string());
    }

    /// Makes every statement carrying `label` fail.
    pub fn fail_label(&mut self, label: &str) {
        self.failing_labels.insert(label.to_string());
    }

    pub fn heal(&mut self) {
        self.failing_stores.clear();
        self.failing_labels.clear();
    }

    /// Query text of every statement executed so far, failed ones included.
    pub fn statements(&self) -> &[String] {
        &self.log
    }

    pub fn node_count(&self, store: &str) -> usize {
        self.stores.get(store).map_or(0, |p| p.nodes.len())
    }

    pub fn edge_count(&self, store: &str) -> usize {
        self.stores.get(store).map_or(0, |p| p.edges.len())
    }

    fn should_fail(&self, store: &str, statement: &Statement) -> bool {
        self.failing_stores.contains(store)
            || statement
                .label()
                .is_some_and(|label| self.failing_labels.contains(label))
    }
}

impl GraphDbClient for InMemoryGraphDb {
    fn execute(&mut self, store: &str, statement: &Statement) -> Result<Vec<Value>, GraphDbError> {
        self.log.push(statement.to_string());
        if self.should_fail(store, statement) {
            return Err(GraphDbError::Transport {
                store: store.to_string(),
                message: "request refused".to_string(),
            });
        }

        let partition = self.stores.entry(store.to_string()).or_default();
        let records = match statement {
            Statement::CreateNode { label, properties } => {
                partition.create(label, properties);
                Vec::new()
            }
            Statement::MergeEdge {
                label,
                src,
                dst,
                key,
                properties,
            } => {
                if !partition.merge(label, src, dst, key, properties) {
                    debug!(store, %statement, "edge endpoints matched nothing");
                }
                Vec::new()
            }
            Statement::MatchNodes { label, skip, limit } => partition.node_page(label, *skip, *limit),
            Statement::MatchEdges { label, skip, limit } => partition.edge_page(label, *skip, *limit),
            Statement::Clear => {
                *partition = Partition::default();
                Vec::new()
            }
        };
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn node(id: u32) -> Statement {
        Statement::CreateNode {
            label: "IntraICFGNode",
            properties: Properties::new().uint("id", id),
        }
    }

    fn call_edge(src: u32, dst: u32, pes: &str) -> Statement {
        Statement::MergeEdge {
            label: "CallCFGEdge",
            src: NodeMatch::by_id(src),
            dst: NodeMatch::by_id(dst),
            key: Properties::new(),
            properties: Properties::new().text("call_pe_ids", pes),
        }
    }

    #[test]
    fn test_merge_is_idempotent_and_updates() {
        let mut db = InMemoryGraphDb::new();
        db.execute("ICFG", &node(5)).unwrap();
        db.execute("ICFG", &node(7)).unwrap();
        db.execute("ICFG", &call_edge(5, 7, "1")).unwrap();
        db.execute("ICFG", &call_edge(5, 7, "1,2")).unwrap();
        assert_eq!(db.edge_count("ICFG"), 1);

        let page = db
            .execute(
                "ICFG",
                &Statement::MatchEdges {
                    label: "CallCFGEdge",
                    skip: 0,
                    limit: 10,
                },
            )
            .unwrap();
        assert_eq!(page.len(), 1);
        let record = Record::from_json(page[0].clone()).unwrap();
        assert_eq!((record.src().unwrap(), record.dst().unwrap()), (5, 7));
        assert_eq!(record.text("call_pe_ids").unwrap(), "1,2");
    }

    #[test]
    fn test_edge_to_missing_node_creates_nothing() {
        let mut db = InMemoryGraphDb::new();
        db.execute("ICFG", &node(5)).unwrap();
        db.execute("ICFG", &call_edge(5, 9, "")).unwrap();
        assert_eq!(db.edge_count("ICFG"), 0);
    }

    #[test]
    fn test_paging_and_clear() {
        let mut db = InMemoryGraphDb::new();
        for id in 0..5 {
            db.execute("ICFG", &node(id)).unwrap();
        }
        let page = |db: &mut InMemoryGraphDb, skip| {
            db.execute(
                "ICFG",
                &Statement::MatchNodes {
                    label: "IntraICFGNode",
                    skip,
                    limit: 2,
                },
            )
            .unwrap()
            .len()
        };
        assert_eq!(page(&mut db, 0), 2);
        assert_eq!(page(&mut db, 4), 1);
        assert_eq!(page(&mut db, 6), 0);

        db.execute("ICFG", &Statement::Clear).unwrap();
        assert_eq!(db.node_count("ICFG"), 0);
        assert_eq!(db.node_count("PAG"), 0);
    }

    #[test]
    fn test_injected_failures() {
        let mut db = InMemoryGraphDb::new();
        db.fail_label("IntraICFGNode");
        assert!(matches!(
            db.execute("ICFG", &node(1)),
            Err(GraphDbError::Transport { .. })
        ));
        db.heal();
        db.fail_store("ICFG");
        assert!(db.execute("ICFG", &Statement::Clear).is_err());
        assert_eq!(db.statements().len(), 2);
        assert_eq!(db.statements()[0], "CREATE (n:IntraICFGNode {id: 1})");
    }
}
