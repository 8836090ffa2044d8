// Export public modules
pub mod common;
pub mod storage;
pub mod index;
pub mod transaction;

// Re-export key items for convenient access
pub use storage::buffer::BufferPoolManager;
pub use storage::buffer::BufferPoolError;
pub use storage::disk::DiskManager;
pub use storage::disk::DiskManagerError;
pub use index::hash::LinearProbeHashTable;
pub use index::hash::HashTableError;
pub use transaction::Transaction;
