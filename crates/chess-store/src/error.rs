//! Error types for the store layer.

/// Errors that can occur talking to the hot store or the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Stored bytes could not be deserialized into the requested type.
    #[error("deserialize failed for key {key}: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A transaction did not complete before its `max_wait`/`timeout` budget
    /// elapsed. The caller should surface this to the initiating player as a
    /// transient error; hot-store state is left untouched.
    #[error("transaction timed out after {0:?}")]
    TransactionTimeout(std::time::Duration),

    /// The backing store is unavailable (connection lost, process gone).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
