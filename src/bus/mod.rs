//! Event system for pushing state changes to the rendering shell.
//!
//! The event bus provides:
//! - Publish-subscribe pattern for real-time updates
//! - Event batching to reduce frontend re-renders
//!
//! # Architecture
//!
//! Events flow from sync engine / selection / push listener → EventBus →
//! EventBatcher → EventSink:
//! - `EventBus`: In-memory broadcast channel for immediate distribution
//! - `EventBatcher`: Buffers events (100ms/50 events) before handing them to the sink

mod batcher;
mod event_bus;
pub mod event_types;

pub use batcher::{BatchPolicy, EventBatcher, EventSink, LogSink};
pub use event_bus::{BusEvent, EventBus};
