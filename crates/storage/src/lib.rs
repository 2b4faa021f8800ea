pub mod error;
pub mod last_response;

pub use error::{Result, StoreError};
pub use last_response::{LastResponseStore, MemoryLastResponseStore};

#[cfg(feature = "rocksdb")]
pub use last_response::RocksLastResponseStore;
