//! Middleware pipeline for event handlers.
//!
//! A [`Pipeline`] wraps a [`Handler`] with [`Stage`]s contributing
//! `before`, `after` and `on_error` hooks. Execution is strictly
//! sequential; there is no internal timeout.

mod engine;
mod handler;
mod request;
mod stage;

pub use engine::Pipeline;
pub use handler::Handler;
pub use request::Request;
pub use stage::{FnStage, Stage};
