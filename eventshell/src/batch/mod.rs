//! Building blocks for batch operations that tolerate partial success.
//!
//! This module provides:
//! - Fixed-size chunking with LIFO/FIFO work queues
//! - Cursor-driven pagination
//! - Settlement of independently evaluated work units
//! - A guard that bounds resubmission of unprocessed work

mod chunk;
mod paginate;
mod retry;
mod settle;

pub use chunk::{chunk, ChunkQueue, KeyQueue};
pub use paginate::{fetch_all, Page};
pub use retry::{RetryConfig, RetryDecision, RetryGuard};
pub use settle::{FailureRecord, Settlement, SettlementSummary};
