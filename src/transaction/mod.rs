pub mod wal;
pub mod concurrency;

pub use wal::log_manager::LogManager;
pub use concurrency::{Transaction, TransactionState};
