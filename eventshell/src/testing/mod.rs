//! Testing utilities for eventshell pipelines and batch helpers.
//!
//! This module provides:
//! - Scripted store and queue clients
//! - A hook-recording pipeline stage
//! - Event fixtures for the supported triggers

mod fixtures;
mod mocks;

pub use fixtures::{form_event, json_event, notification_event, queue_event};
pub use mocks::{RecordingQueue, RecordingStage, ScriptedStore};
