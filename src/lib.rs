//! An embedded graph storage engine over an ordered key-value store
//! (LMDB, via `heed3`), supporting three interchangeable physical layouts
//! for the same logical graph: Adjacency-List, Unified Edge-Key, and Split
//! Edge-Key. A graph directory is created with one representation and
//! keeps it for its lifetime; all three expose the same node/edge CRUD,
//! degree, and cursor operations through [`representations::GraphRepresentation`].
//!
//! [`engine::GraphEngine`] is the entry point: it owns the LMDB environment,
//! the metadata table, and hands out [`engine::GraphHandle`]s that threads
//! use to run operations against their own transactions.

pub mod codec;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod metadata;
pub mod representations;
pub mod types;
pub mod write;

pub use codec::{Degree, EdgeWeight, NodeId, MAX_SENTINEL, MIN_SENTINEL};
pub use config::{GraphOpts, Representation};
pub use cursor::{AdjList, Cursor, EdgeCursor, EdgeRecord, InNbdCursor, KeyRange, NodeCursor, NodeRecord, OutNbdCursor, PairRange};
pub use engine::{GraphEngine, GraphHandle};
pub use metadata::Metadata;
pub use types::{GraphError, Result};
