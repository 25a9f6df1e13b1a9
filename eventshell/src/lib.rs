//! # Eventshell
//!
//! Execution shell for event-triggered functions.
//!
//! Eventshell provides:
//!
//! - **Middleware pipelines**: wrap a handler with stages contributing
//!   `before`, `after` and `on_error` hooks
//! - **Partial-failure batches**: evaluate queue records concurrently,
//!   acknowledge the successes and report the rest
//! - **Store batch helpers**: chunked lookups and writes that resubmit
//!   unprocessed work, and cursor-driven pagination
//! - **Trigger decoders**: HTTP JSON and form bodies, notifications and
//!   queue records
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventshell::prelude::*;
//!
//! let pipeline = Pipeline::wrap(JsonHandler::new(|body, _event, _context| async move {
//!     Ok(response::json(200, body.unwrap_or_default()).into_value())
//! }))
//! .with(FnStage::new("auth").on_before(|request| {
//!     request.context_mut()["user"] = "anonymous".into();
//!     Ok(())
//! }));
//!
//! let out = pipeline.invoke(event, context).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod batch;
pub mod clients;
pub mod config;
pub mod errors;
pub mod logging;
pub mod middleware;
pub mod processor;
pub mod queue;
pub mod response;
pub mod store;
pub mod testing;
pub mod triggers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{chunk, fetch_all, Page, RetryConfig, Settlement};
    pub use crate::clients::SharedClient;
    pub use crate::config::{BatchLimits, ShellConfig};
    pub use crate::errors::{AggregateFailure, ErrorStageFailure, ShellError};
    pub use crate::logging::init_logging;
    pub use crate::middleware::{FnStage, Handler, Pipeline, Request, Stage};
    pub use crate::processor::{BatchProcessor, BatchReport, ProcessorConfig, RecordHandler};
    pub use crate::queue::{QueueClient, QueueRecord};
    pub use crate::response::{self, JsonResponse};
    pub use crate::store::{BulkGet, BulkWrite, Store, StoreClient};
    pub use crate::triggers::{
        FifoNotificationHandler, FormHandler, JsonHandler, NotificationHandler, Trigger,
    };
}
