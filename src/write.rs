//! Shared transactional write protocol (C8).
//!
//! LMDB serializes writers already, so the only transaction-level conflict
//! a single-process embedded user can hit is an `MDB_BAD_TXN`/poisoned
//! commit after the in-memory map was resized by another writer; heed3
//! surfaces that as a plain `heed3::Error`. The protocol here exists mainly
//! to give every representation's add/delete path one place that decides
//! what a given storage outcome means, rather than re-deriving it at each
//! call site:
//!
//! - `GraphError::Rollback` — the whole operation is retried from scratch,
//!   no partial state survives because it was never committed.
//! - `GraphError::DuplicateKey` — `add_node`/`add_edge` hit an existing key;
//!   not a failure, the caller updates degrees instead of inserting.
//! - `GraphError::NodeNotFound` / `GraphError::EdgeNotFound` — tolerated in
//!   delete paths (deleting something already gone is a no-op), propagated
//!   everywhere else.
//! - anything else — fatal, propagated immediately.

use tracing::{debug, warn};

use crate::types::{GraphError, Result};

/// Maximum number of times [`with_retry`] re-attempts an operation that
/// reports `GraphError::Rollback` before giving up and propagating it.
pub const MAX_RETRIES: u32 = 8;

/// Runs `op` against a fresh writer, retrying on `GraphError::Rollback` up
/// to [`MAX_RETRIES`] times. `op` must be idempotent to retry: it is given
/// the attempt count and is expected to start a new `RwTxn` itself (via the
/// `env` it closes over) rather than reuse one across attempts, since a
/// rolled-back transaction cannot be reused.
pub fn with_retry<T>(mut op: impl FnMut(u32) -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(GraphError::Rollback) if attempt < MAX_RETRIES => {
                attempt += 1;
                warn!(attempt, "write rolled back, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Classifies a write outcome for an `add_node`/`add_edge` path: duplicate
/// keys are folded into `Ok(false)` ("already existed, nothing inserted"),
/// a genuine insert reports `Ok(true)`, everything else propagates.
pub fn classify_insert(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(GraphError::DuplicateKey) => {
            debug!("insert found an existing key, treated as update");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Classifies a write outcome for a `delete_node`/`delete_edge` path: a
/// not-found target is tolerated as "already gone", everything else
/// propagates.
pub fn classify_delete(result: Result<()>, not_found: GraphError) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if matches_not_found(&e, &not_found) => Ok(()),
        Err(e) => Err(e),
    }
}

fn matches_not_found(e: &GraphError, template: &GraphError) -> bool {
    matches!(
        (e, template),
        (GraphError::NodeNotFound, GraphError::NodeNotFound)
            | (GraphError::EdgeNotFound, GraphError::EdgeNotFound)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_retry_succeeds_after_transient_rollbacks() {
        let mut calls = 0;
        let result = with_retry(|_attempt| {
            calls += 1;
            if calls < 3 {
                Err(GraphError::Rollback)
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn with_retry_gives_up_after_max_retries() {
        let result: Result<()> = with_retry(|_attempt| Err(GraphError::Rollback));
        assert!(matches!(result, Err(GraphError::Rollback)));
    }

    #[test]
    fn with_retry_does_not_retry_fatal_errors() {
        let mut calls = 0;
        let result: Result<()> = with_retry(|_attempt| {
            calls += 1;
            Err(GraphError::EdgeNotFound)
        });
        assert!(matches!(result, Err(GraphError::EdgeNotFound)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn classify_insert_folds_duplicate_into_false() {
        assert_eq!(classify_insert(Ok(())).unwrap(), true);
        assert_eq!(classify_insert(Err(GraphError::DuplicateKey)).unwrap(), false);
        assert!(classify_insert(Err(GraphError::EdgeNotFound)).is_err());
    }

    #[test]
    fn classify_delete_tolerates_matching_not_found() {
        assert!(classify_delete(Err(GraphError::NodeNotFound), GraphError::NodeNotFound).is_ok());
        assert!(classify_delete(Err(GraphError::EdgeNotFound), GraphError::NodeNotFound).is_err());
    }
}
