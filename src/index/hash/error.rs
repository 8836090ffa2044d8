use thiserror::Error;
use crate::storage::buffer::BufferPoolError;

#[derive(Error, Debug)]
pub enum HashTableError {
    #[error("Block index {0} out of range")]
    BlockIndexOutOfRange(usize),

    #[error("Hash table header does not fit in one page")]
    HeaderOverflow,

    #[error("Hash table block does not fit in one page")]
    BlockOverflow,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Hash table invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Buffer pool error: {0}")]
    BufferPoolError(#[from] BufferPoolError),
}
