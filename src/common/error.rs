//! Error taxonomy for the extraction and reduction engine.
//!
//! Every error is scoped to a single app: the batch driver records it and
//! moves on to the next app.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required table or file is absent for this app.
    #[error("missing input: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed json {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed resource xml {}: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    /// Auxiliary data that cannot be used; callers degrade to "absent".
    #[error("unusable auxiliary data {}: {message}", path.display())]
    MalformedAuxiliary { path: PathBuf, message: String },

    #[error("relation code {code} is outside 0..=4")]
    InvalidRelation { code: i64 },

    #[error("node id {id} out of range (table has {len} nodes)")]
    NodeOutOfRange { id: usize, len: usize },

    #[error("malformed edge triple {0:?}")]
    MalformedEdge(String),

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            EngineError::MissingInput { path }
        } else {
            EngineError::Io { path, source }
        }
    }

    /// Errors that only degrade auxiliary inputs instead of failing the app.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::MalformedAuxiliary { .. } | EngineError::Xml { .. }
        )
    }
}
