//! pulsewatch-store — in-memory status store for PulseWatch.
//!
//! Holds exactly one [`StatusRecord`] per registered target for the
//! lifetime of the process. Records start as `unknown` at process start
//! and are replaced whole by the poller after every poll.
//!
//! # Ownership
//!
//! ```text
//! StatusStore  (single writer, owned by the poller)
//!   └── reader() → StatusReader  (Clone, read-only, handed to the API)
//! ```
//!
//! Writes swap an `Arc<StatusRecord>` under a coarse `RwLock`, so a reader
//! observes either the previous record or the new one, never a mix.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{StatusReader, StatusStore};
pub use types::StatusRecord;
