//! SQLite implementation of [`GraphDbClient`].
//!
//! [`SqliteGraphDb`] keeps every named store in one database file, so a
//! persisted graph outlives the process that wrote it. Statements are
//! executed structurally against two tables:
//! - `nodes`: one row per created node, properties as JSON text
//! - `edges`: one row per merged edge, unique on (store, label, endpoints,
//!   key properties), which makes repeated merges update in place
//!
//! Pages are read in insertion order with `LIMIT`/`OFFSET`.

use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GraphDbError;
use crate::record::{edge_json, node_json};
use crate::statement::{NodeMatch, Properties, Statement};
use crate::traits::GraphDbClient;

pub struct SqliteGraphDb {
    conn: Connection,
}

fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn parse_object(text: &str) -> Result<Map<String, Value>, GraphDbError> {
    match serde_json::from_str(text)? {
        Value::Object(map) => Ok(map),
        other => Err(GraphDbError::MalformedResponse {
            store: String::new(),
            reason: format!("stored properties are not an object: {}", other),
        }),
    }
}

impl SqliteGraphDb {
    /// Opens (or creates) a database at `path`.
    pub fn new(path: &str) -> Result<Self, GraphDbError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteGraphDb { conn })
    }

    /// Opens an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, GraphDbError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteGraphDb { conn })
    }

    pub fn node_count(&self, store: &str) -> Result<usize, GraphDbError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE store = ?1",
            params![store],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    pub fn edge_count(&self, store: &str) -> Result<usize, GraphDbError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE store = ?1",
            params![store],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    // -----------------------------------------------------------------------
    // Statement execution
    // -----------------------------------------------------------------------

    fn create_node(&self, store: &str, label: &str, properties: &Properties) -> Result<(), GraphDbError> {
        let object = properties.to_object();
        let node_id = object.get("id").and_then(Value::as_i64);
        self.conn.execute(
            "INSERT INTO nodes (store, label, node_id, properties) VALUES (?1, ?2, ?3, ?4)",
            params![store, label, node_id, Value::Object(object).to_string()],
        )?;
        Ok(())
    }

    /// Row sequence number of the first node matching `pattern`.
    fn find_node(&self, store: &str, pattern: &NodeMatch) -> Result<Option<i64>, GraphDbError> {
        let columns = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(i64, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        };
        let candidates = match pattern.id() {
            Some(id) => self
                .conn
                .prepare_cached(
                    "SELECT seq, label, properties FROM nodes
                     WHERE store = ?1 AND node_id = ?2 ORDER BY seq",
                )?
                .query_map(params![store, id], columns)?
                .collect::<Result<Vec<_>, _>>()?,
            None => self
                .conn
                .prepare_cached("SELECT seq, label, properties FROM nodes WHERE store = ?1 ORDER BY seq")?
                .query_map(params![store], columns)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        for (seq, label, properties) in candidates {
            if pattern.matches(&label, &parse_object(&properties)?) {
                return Ok(Some(seq));
            }
        }
        Ok(None)
    }

    fn merge_edge(
        &self,
        store: &str,
        label: &str,
        src: &NodeMatch,
        dst: &NodeMatch,
        key: &Properties,
        properties: &Properties,
    ) -> Result<bool, GraphDbError> {
        let (Some(src), Some(dst)) = (self.find_node(store, src)?, self.find_node(store, dst)?) else {
            return Ok(false);
        };
        let mut merged = key.to_object();
        merged.extend(properties.to_object());
        self.conn.execute(
            "INSERT INTO edges (store, label, src_seq, dst_seq, edge_key, properties)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (store, label, src_seq, dst_seq, edge_key)
             DO UPDATE SET properties = json_patch(edges.properties, excluded.properties)",
            params![
                store,
                label,
                src,
                dst,
                key.to_json().to_string(),
                Value::Object(merged).to_string()
            ],
        )?;
        Ok(true)
    }

    fn node_page(&self, store: &str, label: &str, skip: usize, limit: usize) -> Result<Vec<Value>, GraphDbError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT properties FROM nodes WHERE store = ?1 AND label = ?2
             ORDER BY seq LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(
            params![store, label, to_sql_count(limit), to_sql_count(skip)],
            |row| row.get::<_, String>(0),
        )?;
        let mut page = Vec::new();
        for row in rows {
            page.push(node_json(label, parse_object(&row?)?));
        }
        Ok(page)
    }

    fn edge_page(&self, store: &str, label: &str, skip: usize, limit: usize) -> Result<Vec<Value>, GraphDbError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT s.node_id, d.node_id, e.properties
             FROM edges e
             JOIN nodes s ON s.seq = e.src_seq
             JOIN nodes d ON d.seq = e.dst_seq
             WHERE e.store = ?1 AND e.label = ?2
             ORDER BY e.seq LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(
            params![store, label, to_sql_count(limit), to_sql_count(skip)],
            |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;
        let mut page = Vec::new();
        for row in rows {
            let (src, dst, properties) = row?;
            page.push(edge_json(
                label,
                src.map_or(Value::Null, Value::from),
                dst.map_or(Value::Null, Value::from),
                parse_object(&properties)?,
            ));
        }
        Ok(page)
    }

    fn clear(&mut self, store: &str) -> Result<(), GraphDbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM edges WHERE store = ?1", params![store])?;
        tx.execute("DELETE FROM nodes WHERE store = ?1", params![store])?;
        tx.commit()?;
        Ok(())
    }
}

impl GraphDbClient for SqliteGraphDb {
    fn execute(&mut self, store: &str, statement: &Statement) -> Result<Vec<Value>, GraphDbError> {
        match statement {
            Statement::CreateNode { label, properties } => {
                self.create_node(store, label, properties)?;
                Ok(Vec::new())
            }
            Statement::MergeEdge {
                label,
                src,
                dst,
                key,
                properties,
            } => {
                if !self.merge_edge(store, label, src, dst, key, properties)? {
                    debug!(store, %statement, "edge endpoints matched nothing");
                }
                Ok(Vec::new())
            }
            Statement::MatchNodes { label, skip, limit } => self.node_page(store, label, *skip, *limit),
            Statement::MatchEdges { label, skip, limit } => self.edge_page(store, label, *skip, *limit),
            Statement::Clear => {
                self.clear(store)?;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn block(id: u32, function: u32) -> Statement {
        Statement::CreateNode {
            label: "SVFBasicBlock",
            properties: Properties::new()
                .uint("id", id)
                .uint("fun_obj_var_id", function)
                .text("bb_name", "it's"),
        }
    }

    fn block_match(id: u32, function: u32) -> NodeMatch {
        NodeMatch::labelled(
            "SVFBasicBlock",
            Properties::new().uint("id", id).uint("fun_obj_var_id", function),
        )
    }

    fn block_edge(src: u32, dst: u32, function: u32) -> Statement {
        Statement::MergeEdge {
            label: "BasicBlockEdge",
            src: block_match(src, function),
            dst: block_match(dst, function),
            key: Properties::new(),
            properties: Properties::new().uint("fun_obj_var_id", function),
        }
    }

    #[test]
    fn test_endpoints_matched_on_every_key() {
        let mut db = SqliteGraphDb::in_memory().unwrap();
        // Block ids repeat across functions.
        for (id, function) in [(0, 10), (1, 10), (0, 11), (1, 11)] {
            db.execute("BasicBlockGraph", &block(id, function)).unwrap();
        }
        db.execute("BasicBlockGraph", &block_edge(0, 1, 11)).unwrap();
        db.execute("BasicBlockGraph", &block_edge(0, 1, 11)).unwrap();
        db.execute("BasicBlockGraph", &block_edge(0, 1, 12)).unwrap();
        assert_eq!(db.edge_count("BasicBlockGraph").unwrap(), 1);

        let page = db
            .execute(
                "BasicBlockGraph",
                &Statement::MatchEdges {
                    label: "BasicBlockEdge",
                    skip: 0,
                    limit: 10,
                },
            )
            .unwrap();
        let record = Record::from_json(page[0].clone()).unwrap();
        assert_eq!(record.int("fun_obj_var_id").unwrap(), 11);
        assert_eq!((record.src().unwrap(), record.dst().unwrap()), (0, 1));
    }

    #[test]
    fn test_node_pages_keep_insertion_order() {
        let mut db = SqliteGraphDb::in_memory().unwrap();
        for id in 0..5 {
            db.execute("BasicBlockGraph", &block(id, 10)).unwrap();
        }
        let page = db
            .execute(
                "BasicBlockGraph",
                &Statement::MatchNodes {
                    label: "SVFBasicBlock",
                    skip: 3,
                    limit: 10,
                },
            )
            .unwrap();
        let ids: Vec<u32> = page
            .into_iter()
            .map(|raw| Record::from_json(raw).unwrap().uint("id").unwrap())
            .collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_clear_only_touches_one_store() {
        let mut db = SqliteGraphDb::in_memory().unwrap();
        db.execute("BasicBlockGraph", &block(0, 10)).unwrap();
        db.execute("BasicBlockGraph", &block(1, 10)).unwrap();
        db.execute("BasicBlockGraph", &block_edge(0, 1, 10)).unwrap();
        db.execute("ICFG", &block(0, 10)).unwrap();

        db.execute("BasicBlockGraph", &Statement::Clear).unwrap();
        assert_eq!(db.node_count("BasicBlockGraph").unwrap(), 0);
        assert_eq!(db.edge_count("BasicBlockGraph").unwrap(), 0);
        assert_eq!(db.node_count("ICFG").unwrap(), 1);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let path = path.to_str().unwrap();
        {
            let mut db = SqliteGraphDb::new(path).unwrap();
            db.execute("BasicBlockGraph", &block(0, 10)).unwrap();
        }
        let db = SqliteGraphDb::new(path).unwrap();
        assert_eq!(db.node_count("BasicBlockGraph").unwrap(), 1);
    }
}
