//! Paginated Reader: a lazy record sequence over bounded page requests.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::debug;

use crate::error::GraphDbError;
use crate::kinds::{EntityKind, Store};
use crate::statement::Statement;
use crate::traits::GraphDbClient;

/// Yields every record of one kind from one store, one page at a time.
///
/// A page is requested only when the previous one is consumed. The
/// sequence ends after an empty or short page, and after the first error,
/// which is yielded once.
pub struct PagedReader<'c, C: ?Sized> {
    client: &'c mut C,
    store: Store,
    kind: EntityKind,
    page_size: usize,
    offset: usize,
    buffer: VecDeque<Value>,
    pages_fetched: usize,
    done: bool,
}

impl<'c, C: GraphDbClient + ?Sized> PagedReader<'c, C> {
    pub fn new(client: &'c mut C, kind: EntityKind, page_size: usize) -> Self {
        PagedReader {
            client,
            store: kind.store(),
            kind,
            page_size: page_size.max(1),
            offset: 0,
            buffer: VecDeque::new(),
            pages_fetched: 0,
            done: false,
        }
    }

    /// Restarts the read at an explicit record offset.
    pub fn starting_at(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Offset of the next page request.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn page_statement(&self) -> Statement {
        let label = self.kind.label();
        if self.kind.is_edge() {
            Statement::MatchEdges {
                label,
                skip: self.offset,
                limit: self.page_size,
            }
        } else {
            Statement::MatchNodes {
                label,
                skip: self.offset,
                limit: self.page_size,
            }
        }
    }

    fn fetch(&mut self) -> Result<(), GraphDbError> {
        let statement = self.page_statement();
        let page = self.client.execute(self.store.name(), &statement)?;
        self.pages_fetched += 1;
        debug!(
            store = %self.store,
            kind = %self.kind,
            offset = self.offset,
            records = page.len(),
            "fetched page"
        );
        if page.len() < self.page_size {
            self.done = true;
        }
        self.offset += self.page_size;
        self.buffer.extend(page);
        Ok(())
    }
}

impl<C: GraphDbClient + ?Sized> Iterator for PagedReader<'_, C> {
    type Item = Result<Value, GraphDbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fetch() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use svfir_core::VarTag;

    /// Serves `total` numbered records and logs the page requests.
    struct Numbers {
        total: usize,
        requests: Vec<(usize, usize)>,
        fail_at: Option<usize>,
    }

    impl GraphDbClient for Numbers {
        fn execute(&mut self, store: &str, statement: &Statement) -> Result<Vec<Value>, GraphDbError> {
            let Statement::MatchNodes { skip, limit, .. } = *statement else {
                panic!("unexpected statement {}", statement);
            };
            self.requests.push((skip, limit));
            if self.fail_at == Some(skip) {
                return Err(GraphDbError::Transport {
                    store: store.to_string(),
                    message: "connection reset".into(),
                });
            }
            let end = (skip + limit).min(self.total);
            Ok((skip.min(end)..end).map(|i| json!(i)).collect())
        }
    }

    fn numbers(total: usize) -> Numbers {
        Numbers {
            total,
            requests: Vec::new(),
            fail_at: None,
        }
    }

    const KIND: EntityKind = EntityKind::Var(VarTag::Val);

    #[test]
    fn test_pages_of_2500_by_1000() {
        let mut client = numbers(2500);
        let mut reader = PagedReader::new(&mut client, KIND, 1000);
        let records: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(reader.pages_fetched(), 3);
        assert_eq!(records.len(), 2500);
        assert_eq!(records[0], json!(0));
        assert_eq!(records[2499], json!(2499));
        assert_eq!(client.requests, vec![(0, 1000), (1000, 1000), (2000, 1000)]);
    }

    #[test]
    fn test_exact_multiple_ends_on_empty_page() {
        let mut client = numbers(2000);
        let count = PagedReader::new(&mut client, KIND, 1000).count();
        assert_eq!(count, 2000);
        assert_eq!(client.requests.len(), 3);
    }

    #[test]
    fn test_empty_store() {
        let mut client = numbers(0);
        assert_eq!(PagedReader::new(&mut client, KIND, 10).count(), 0);
        assert_eq!(client.requests, vec![(0, 10)]);
    }

    #[test]
    fn test_restart_from_offset() {
        let mut client = numbers(25);
        let records: Vec<_> = PagedReader::new(&mut client, KIND, 10)
            .starting_at(20)
            .map(Result::unwrap)
            .collect();
        assert_eq!(records, (20..25).map(|i| json!(i)).collect::<Vec<_>>());
    }

    #[test]
    fn test_lazy_until_consumed() {
        let mut client = numbers(100);
        {
            let mut reader = PagedReader::new(&mut client, KIND, 10);
            assert_eq!(reader.next().unwrap().unwrap(), json!(0));
            assert_eq!(reader.offset(), 10);
        }
        assert_eq!(client.requests.len(), 1);
    }

    #[test]
    fn test_error_yielded_once_then_stops() {
        let mut client = numbers(30);
        client.fail_at = Some(10);
        let results: Vec<_> = PagedReader::new(&mut client, KIND, 10).collect();
        assert_eq!(results.len(), 11);
        assert!(results[..10].iter().all(Result::is_ok));
        assert!(matches!(results[10], Err(GraphDbError::Transport { .. })));
        assert_eq!(client.requests.len(), 2);
    }
}
