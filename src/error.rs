use thiserror::Error;

/// Errors surfaced by store operations.
///
/// No variant is fatal to the embedder. A persistence failure leaves the
/// in-memory value in place with a stale persisted copy; a decode failure
/// falls back to the caller-supplied default.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistent backend rejected an operation.
    #[error("persistent store rejected {op} for key `{key}`: {message}")]
    Persistence {
        op: &'static str,
        key: String,
        message: String,
    },

    /// A value could not be encoded as JSON text.
    #[error("failed to encode value for key `{key}`")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored payload could not be decoded.
    #[error("failed to decode stored value for key `{key}`")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
