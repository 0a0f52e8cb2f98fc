//! Write path: persists a whole [`SvfIr`] statement by statement.
//!
//! A failed statement is logged and recorded, then writing continues with
//! the next one. Nothing is retried and earlier writes are not rolled back.

use std::collections::BTreeMap;

use svfir_core::SvfIr;
use tracing::{info, warn};

use crate::config::DbOptions;
use crate::kinds::Store;
use crate::marshal;
use crate::statement::Statement;
use crate::traits::GraphDbClient;

/// One statement the store rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteFailure {
    pub store: Store,
    pub statement: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    /// Statements accepted, per store.
    pub written: BTreeMap<Store, usize>,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn total_written(&self) -> usize {
        self.written.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn run<C: GraphDbClient + ?Sized>(
    client: &mut C,
    store: Store,
    statement: &Statement,
    report: &mut WriteReport,
) {
    match client.execute(store.name(), statement) {
        Ok(_) => *report.written.entry(store).or_default() += 1,
        Err(err) => {
            warn!(%store, error = %err, "statement failed");
            report.failures.push(WriteFailure {
                store,
                statement: statement.to_string(),
                message: err.to_string(),
            });
        }
    }
}

/// Writes every entity of `ir`, nodes before the edges that match them.
pub fn persist<C: GraphDbClient + ?Sized>(
    ir: &SvfIr,
    client: &mut C,
    options: &DbOptions,
) -> WriteReport {
    let mut report = WriteReport::default();

    if options.clear_before_write {
        for store in Store::ALL {
            run(client, store, &Statement::Clear, &mut report);
        }
        report.written.clear();
    }

    for (store, statement) in marshal::statements_for(ir) {
        run(client, store, &statement, &mut report);
    }

    for (store, count) in &report.written {
        info!(%store, statements = count, "store written");
    }
    if !report.is_complete() {
        warn!(failed = report.failures.len(), "persist finished with failures");
    }
    report
}
