//! Entity Reconstructor.
//!
//! Reads every kind in [`load_order`] through a [`PagedReader`], turns each
//! record into an entity with the [`Field`](crate::refs::Field) policies
//! applied, and registers it in the [`LoadSession`]. After the last kind the
//! deferred patches are resolved once and the session is handed to the
//! [`GraphAssembler`].
//!
//! ```text
//! Idle -> LoadingKind(k0) -> LoadingKind(k1) -> ... -> ResolvingDeferred -> Assembled
//! ```
//!
//! `Assembled` is terminal and is represented by the [`Assembly`] value that
//! [`Reconstructor::finish`] returns.

mod blocks;
mod callgraph;
mod chg;
mod icfg;
mod stmts;
mod types;
mod vars;

use serde_json::Value;
use svfir_core::{AccessPath, BlockId, BlockKey, TypeId, VarId};
use tracing::{info, warn};

use crate::assemble::{Assembly, GraphAssembler};
use crate::codec::decode_pairs;
use crate::config::DbOptions;
use crate::diagnostics::Diagnostic;
use crate::error::RecordError;
use crate::kinds::{load_order, EntityKind};
use crate::reader::PagedReader;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Binder, Entity, LoadSession, Patch};
use crate::traits::GraphDbClient;

type Built = Result<(Entity, Vec<Patch>), RecordError>;

/// Where a reconstruction currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    /// The named kind has been read completely.
    LoadingKind(EntityKind),
    ResolvingDeferred,
}

/// Builds one entity from one raw record; the single dispatch point over
/// the closed kind set.
pub fn build_record(kind: EntityKind, raw: Value, session: &LoadSession) -> Built {
    let record = Record::from_json(raw)?;
    if record.label() != kind.label() {
        return Err(RecordError::InvalidProperty {
            key: "label".to_string(),
            reason: format!("expected {}, got {}", kind.label(), record.label()),
        });
    }
    match kind {
        EntityKind::Type(tag) => types::build_type(tag, &record, session),
        EntityKind::StInfo => types::build_st_info(&record, session),
        EntityKind::Var(tag) => vars::build_var(tag, &record, session),
        EntityKind::BasicBlock => blocks::build_block(&record, session),
        EntityKind::BlockEdge => blocks::build_block_edge(&record, session),
        EntityKind::ChNode => chg::build_ch_node(&record, session),
        EntityKind::ChEdge => chg::build_ch_edge(&record, session),
        EntityKind::IcfgNode(tag) => icfg::build_icfg_node(tag, &record, session),
        EntityKind::IcfgEdge(tag) => icfg::build_icfg_edge(tag, &record, session),
        EntityKind::CallGraphNode => callgraph::build_call_graph_node(&record, session),
        EntityKind::CallGraphEdge => callgraph::build_call_graph_edge(&record, session),
        EntityKind::Stmt(tag) => stmts::build_stmt(tag, &record, session),
    }
}

/// Drives one load session against one collaborator.
pub struct Reconstructor<'c, C: ?Sized> {
    client: &'c mut C,
    page_size: usize,
    order: Vec<EntityKind>,
    next: usize,
    phase: LoadPhase,
    session: LoadSession,
    records_read: usize,
    pages_fetched: usize,
}

impl<'c, C: GraphDbClient + ?Sized> Reconstructor<'c, C> {
    pub fn new(client: &'c mut C, page_size: usize) -> Self {
        Reconstructor {
            client,
            page_size,
            order: load_order(),
            next: 0,
            phase: LoadPhase::Idle,
            session: LoadSession::new(),
            records_read: 0,
            pages_fetched: 0,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn session(&self) -> &LoadSession {
        &self.session
    }

    /// Advances by one phase: reads the next kind, or resolves the deferred
    /// patches once every kind is read. A no-op in `ResolvingDeferred`.
    pub fn step(&mut self) -> LoadPhase {
        if self.phase == LoadPhase::ResolvingDeferred {
            return self.phase;
        }
        match self.order.get(self.next).copied() {
            Some(kind) => {
                self.next += 1;
                self.load_kind(kind);
                self.phase = LoadPhase::LoadingKind(kind);
            }
            None => {
                let unresolved = self.session.resolve_deferred();
                info!(unresolved, "deferred references resolved");
                self.phase = LoadPhase::ResolvingDeferred;
            }
        }
        self.phase
    }

    fn load_kind(&mut self, kind: EntityKind) {
        let mut reader = PagedReader::new(&mut *self.client, kind, self.page_size);
        let mut read = 0usize;
        let mut built = 0usize;
        for item in reader.by_ref() {
            let raw = match item {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%kind, error = %err, "page request failed");
                    self.session.record(Diagnostic::Transport {
                        store: kind.store(),
                        kind,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            read += 1;
            match build_record(kind, raw, &self.session) {
                Ok((entity, patches)) => {
                    if self.session.commit(entity, patches) {
                        built += 1;
                    }
                }
                Err(err) => {
                    warn!(%kind, error = %err, "record skipped");
                    self.session.record(Diagnostic::rejected(kind, err));
                }
            }
        }
        self.pages_fetched += reader.pages_fetched();
        self.records_read += read;
        if read > 0 {
            info!(%kind, records = read, built, "kind loaded");
        }
    }

    /// Runs the remaining phases and assembles the graph.
    pub fn finish(mut self) -> Assembly {
        while self.step() != LoadPhase::ResolvingDeferred {}
        GraphAssembler::new(self.session)
            .with_counts(self.records_read, self.pages_fetched)
            .assemble()
    }
}

/// Reads the whole persisted graph from `client`.
pub fn load<C: GraphDbClient + ?Sized>(client: &mut C, options: &DbOptions) -> Assembly {
    Reconstructor::new(client, options.page_size).finish()
}

// ---------------------------------------------------------------------------
// Shared record helpers
// ---------------------------------------------------------------------------

fn invalid(key: &str, reason: impl Into<String>) -> RecordError {
    RecordError::InvalidProperty {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// A narrowed integer property.
fn narrow<T: TryFrom<i64>>(record: &Record, key: &str) -> Result<T, RecordError> {
    let raw = record.int(key)?;
    T::try_from(raw).map_err(|_| invalid(key, format!("{} out of range", raw)))
}

fn type_id(record: &Record, key: &str) -> Result<Option<TypeId>, RecordError> {
    Ok(record.id(key)?.map(TypeId))
}

fn var_id(record: &Record, key: &str) -> Result<Option<VarId>, RecordError> {
    Ok(record.id(key)?.map(VarId))
}

/// Parses a `"fun:bb"` block address; the empty string is absent.
fn block_key(record: &Record, key: &str) -> Result<Option<BlockKey>, RecordError> {
    let text = record.text(key)?.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let parsed = text
        .split_once(':')
        .and_then(|(f, b)| Some(BlockKey::new(VarId(f.parse().ok()?), BlockId(b.parse().ok()?))));
    parsed
        .map(Some)
        .ok_or_else(|| invalid(key, format!("'{}' is not a block address", text)))
}

/// The access-path properties shared by GEP values and GEP statements.
fn access_path(record: &Record, binder: &mut Binder<'_>) -> Result<AccessPath, RecordError> {
    let pointee_type = binder.one(Field::AccessPathPointee, type_id(record, "ap_gep_pointee_type_id")?)?;
    let mut operands = Vec::new();
    for (var, ty) in record.decoded("ap_idx_operand_pairs", decode_pairs::<VarId, TypeId>)? {
        if binder.member(Field::AccessPathOperand, var)? {
            operands.push((var, binder.one(Field::AccessPathOperandType, ty)?));
        }
    }
    Ok(AccessPath {
        field_index: record.int("ap_fld_idx")?,
        pointee_type,
        operands,
    })
}

/// The record a store hands back for a written statement.
#[cfg(test)]
pub(crate) fn stored(statement: &crate::statement::Statement) -> Record {
    use crate::statement::{PropertyValue, Statement};
    use serde_json::{json, Map};

    let endpoint = |keys: &crate::statement::Properties| match keys.get("id") {
        Some(PropertyValue::Int(id)) => json!(id),
        other => panic!("endpoint without integer id: {:?}", other),
    };
    let raw = match statement {
        Statement::CreateNode { label, properties } => {
            json!({"label": label, "properties": properties.to_json()})
        }
        Statement::MergeEdge {
            label,
            src,
            dst,
            key,
            properties,
        } => {
            let mut merged = Map::new();
            for (k, v) in key.iter().chain(properties.iter()) {
                merged.insert(k.to_string(), v.to_json());
            }
            json!({
                "label": label,
                "src": endpoint(&src.keys),
                "dst": endpoint(&dst.keys),
                "properties": merged,
            })
        }
        other => panic!("not a write statement: {}", other),
    };
    Record::from_json(raw).unwrap()
}
