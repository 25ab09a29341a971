//! File-based storage backend for velostash.
//!
//! Each key is stored as a separate JSON file with a percent-encoded file name, so a
//! gateway running outside the browser keeps its data across restarts and the data
//! directory stays readable by hand. An optional quota reproduces the capacity limit of a
//! browser storage area.
//!
//! # Example
//!
//! ```no_run
//! use velostash::StorageGateway;
//! use velostash_fs::FileStore;
//!
//! let store = FileStore::with_quota("./data", 5 * 1024 * 1024)?;
//! let mut gateway = StorageGateway::new(store);
//! gateway.bootstrap();
//! # Ok::<(), velostash_fs::FileStoreError>(())
//! ```

mod error;
mod filename;
mod store;

pub use error::FileStoreError;
pub use filename::{decode_from_filename, encode_for_filename};
pub use store::FileStore;
