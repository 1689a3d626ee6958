// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default tracking sink.

use coursekit_core::events::{TrackingEvent, TrackingSink};
use tracing::info;

/// Writes tracking events to the log. The default sink; hosts with a real
/// tracking pipeline install their own via `Coordinator::with_sink`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TrackingSink for TracingSink {
    fn emit(&self, event: TrackingEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(target: "coursekit::tracking", %payload, "tracking event"),
            Err(err) => tracing::warn!(%err, "tracking event does not serialize"),
        }
    }
}
