//! Error taxonomy shared by every representation and by the graph engine.

use core::fmt;

/// The outcome kinds a write path can produce, per §7/§8 of the design: a
/// transient conflict and a duplicate key are not failures, they are
/// instructions to the caller (retry, or "update degrees instead of
/// inserting"). Everything else is fatal.
#[derive(Debug)]
pub enum GraphError {
    /// The underlying transaction lost a write-write race. The caller
    /// should retry the whole operation from the top; no state changed.
    Rollback,
    /// `add_edge` tried to create a node that already exists. Not a failure:
    /// the caller degree-updates the existing node instead.
    DuplicateKey,
    /// Lookup of a node that does not exist (or was already deleted).
    NodeNotFound,
    /// Lookup of an edge that does not exist.
    EdgeNotFound,
    /// A degree query found an in/out degree arithmetic underflow, or any
    /// other condition that means an invariant (I1–I8) has been violated.
    InvariantViolation(String),
    /// A named checkpoint was requested but has not been created.
    CheckpointNotFound(String),
    /// A secondary index was requested by name but does not exist.
    IndexNotFound(String),
    /// Error surfaced by the underlying KV store.
    Storage(heed3::Error),
    /// Filesystem error opening/creating the graph directory.
    Io(std::io::Error),
    /// Error (de)serializing `GraphOpts`/the config file.
    Config(serde_json::Error),
    /// A fixed-width byte slice was the wrong length to decode.
    SliceLength,
    /// Catch-all for conditions that don't fit the above, always fatal.
    Other(String),
}

impl std::error::Error for GraphError {}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Rollback => write!(f, "transaction rolled back, retry"),
            GraphError::DuplicateKey => write!(f, "duplicate key"),
            GraphError::NodeNotFound => write!(f, "node not found"),
            GraphError::EdgeNotFound => write!(f, "edge not found"),
            GraphError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            GraphError::CheckpointNotFound(name) => write!(f, "checkpoint not found: {name}"),
            GraphError::IndexNotFound(name) => write!(f, "secondary index not found: {name}"),
            GraphError::Storage(e) => write!(f, "storage error: {e}"),
            GraphError::Io(e) => write!(f, "io error: {e}"),
            GraphError::Config(e) => write!(f, "config error: {e}"),
            GraphError::SliceLength => write!(f, "slice length error"),
            GraphError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<heed3::Error> for GraphError {
    fn from(e: heed3::Error) -> Self {
        // LMDB reports write-write conflicts and duplicate-key puts through
        // its own error variants; surface them as the dedicated outcomes
        // the shared write protocol (write.rs) dispatches on.
        match &e {
            heed3::Error::Mdb(heed3::MdbError::KeyExist) => GraphError::DuplicateKey,
            _ => GraphError::Storage(e),
        }
    }
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError::Io(e)
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Config(e)
    }
}

impl From<&'static str> for GraphError {
    fn from(msg: &'static str) -> Self {
        GraphError::Other(msg.to_string())
    }
}

impl From<String> for GraphError {
    fn from(msg: String) -> Self {
        GraphError::Other(msg)
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
