//! The graph-store collaborator contract.

use serde_json::Value;

use crate::error::GraphDbError;
use crate::statement::Statement;

/// A graph store reachable by request/response calls.
///
/// Implementations run one statement against one named store and return
/// the raw records it produced. A query that matches nothing ("no data")
/// returns `Ok` with an empty vector; `Err` is reserved for transport,
/// parse and backend failures. Calls are synchronous and never retried by
/// callers.
pub trait GraphDbClient {
    fn execute(&mut self, store: &str, statement: &Statement) -> Result<Vec<Value>, GraphDbError>;
}

impl<C: GraphDbClient + ?Sized> GraphDbClient for &mut C {
    fn execute(&mut self, store: &str, statement: &Statement) -> Result<Vec<Value>, GraphDbError> {
        (**self).execute(store, statement)
    }
}
