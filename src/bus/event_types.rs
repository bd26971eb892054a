//! Event type and category constants and flush policy.
//!
//! Single source of truth for which events are "immediate" (flushed to the
//! frontend without batching) vs batched.

use super::event_bus::BusEvent;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub const CATEGORY_SYNC: &str = "sync";
pub const CATEGORY_STREAM: &str = "stream";
pub const CATEGORY_SELECTION: &str = "selection";

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const EVENT_SYNC_REFRESHED: &str = "sync.refreshed";
pub const EVENT_SYNC_REFRESH_FAILED: &str = "sync.refresh_failed";
pub const EVENT_SYNC_RESTORED: &str = "sync.restored";

pub const EVENT_STREAM_CONNECTED: &str = "stream.connected";
pub const EVENT_STREAM_SIGNAL: &str = "stream.signal";
pub const EVENT_STREAM_CLOSED: &str = "stream.closed";

pub const EVENT_SELECTION_CHANGED: &str = "selection.changed";
pub const EVENT_SELECTION_CLEARED: &str = "selection.cleared";

// ---------------------------------------------------------------------------
// Flush policy
// ---------------------------------------------------------------------------

/// Returns true if this event should be sent to the frontend immediately
/// instead of being buffered. Immediate events preserve ordering with the
/// current buffer before being sent.
pub fn should_flush_immediately(event: &BusEvent) -> bool {
    if event.category == CATEGORY_SELECTION {
        return true;
    }
    if event.event_type == EVENT_SYNC_REFRESHED || event.event_type == EVENT_SYNC_RESTORED {
        return true;
    }
    event.event_type == EVENT_STREAM_CLOSED
}
