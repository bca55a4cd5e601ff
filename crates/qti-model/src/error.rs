use thiserror::Error;

/// Errors raised while decoding question records.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The options block does not match the declared question type.
    #[error("invalid options for {qtype} question {id}: {source}")]
    InvalidOptions {
        id: u64,
        qtype: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document is not a list of question records.
    #[error("unexpected question document: {0}")]
    Layout(String),

    #[error("failed to decode question records: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
