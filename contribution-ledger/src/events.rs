//! Ledger events and the sinks that receive them
//!
//! One event is emitted per state-changing operation. Delivery and durability
//! belong to the sink. Sinks are called while the ledger's write lock is held,
//! so they see events in commit order and must not call back into the ledger.

use crate::types::{Amount, ContributorId, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Envelope for every emitted event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Clock timestamp of the operation
    pub timestamp: Timestamp,

    /// What happened
    pub kind: EventKind,
}

impl LedgerEvent {
    /// New event with a fresh ID
    pub fn new(timestamp: Timestamp, kind: EventKind) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            timestamp,
            kind,
        }
    }
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A record was appended
    ContributionRecorded {
        /// Position in the log
        index: u64,
        /// Contributor
        contributor: ContributorId,
        /// Amount (0 for gasless)
        amount: Amount,
        /// Value-bearing or gasless
        is_value_bearing: bool,
    },

    /// Custodian reassigned
    CustodianChanged {
        /// Old custodian
        previous: ContributorId,
        /// New custodian
        custodian: ContributorId,
    },

    /// Minimum contribution changed
    MinimumContributionUpdated {
        /// Old threshold
        previous: Amount,
        /// New threshold
        minimum: Amount,
    },

    /// Funds moved out of custody
    FundsWithdrawn {
        /// Receiving custodian
        custodian: ContributorId,
        /// Amount transferred
        amount: Amount,
    },
}

/// Receiver of ledger events
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: &LedgerEvent);
}

/// Writes each event as a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &LedgerEvent) {
        match &event.kind {
            EventKind::ContributionRecorded {
                index,
                contributor,
                amount,
                is_value_bearing,
            } => tracing::info!(
                event_id = %event.event_id,
                index,
                contributor = %contributor,
                amount = %amount,
                is_value_bearing,
                "Contribution recorded"
            ),
            EventKind::CustodianChanged {
                previous,
                custodian,
            } => tracing::info!(
                event_id = %event.event_id,
                previous = %previous,
                custodian = %custodian,
                "Custodian changed"
            ),
            EventKind::MinimumContributionUpdated { previous, minimum } => tracing::info!(
                event_id = %event.event_id,
                previous = %previous,
                minimum = %minimum,
                "Minimum contribution updated"
            ),
            EventKind::FundsWithdrawn { custodian, amount } => tracing::info!(
                event_id = %event.event_id,
                custodian = %custodian,
                amount = %amount,
                "Funds withdrawn"
            ),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryEventSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Number of events received
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// No events received yet
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &LedgerEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Fans events out to live subscribers
///
/// Lagging or absent subscribers never block the ledger.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<LedgerEvent>,
}

impl BroadcastEventSink {
    /// Sink buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New subscriber receiving events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: &LedgerEvent) {
        // No receivers is not an error
        let _ = self.sender.send(event.clone());
    }
}

/// Appends one JSON document per event to a writer
pub struct JsonLinesEventSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesEventSink<W> {
    /// Sink writing to `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_event(&self, event: &LedgerEvent) -> crate::Result<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> std::fmt::Debug for JsonLinesEventSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesEventSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> EventSink for JsonLinesEventSink<W> {
    fn emit(&self, event: &LedgerEvent) {
        if let Err(e) = self.write_event(event) {
            tracing::error!(event_id = %event.event_id, "Failed to write event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(index: u64) -> LedgerEvent {
        LedgerEvent::new(
            index as i64,
            EventKind::ContributionRecorded {
                index,
                contributor: ContributorId::new("bob"),
                amount: 150,
                is_value_bearing: true,
            },
        )
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryEventSink::new();
        assert!(sink.is_empty());
        sink.emit(&recorded(0));
        sink.emit(&recorded(1));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1].kind, EventKind::ContributionRecorded { index: 1, .. }));
    }

    #[test]
    fn test_event_ids_are_unique() {
        assert_ne!(recorded(0).event_id, recorded(0).event_id);
    }

    #[test]
    fn test_json_lines_sink() {
        let sink = JsonLinesEventSink::new(Vec::new());
        sink.emit(&recorded(0));
        sink.emit(&LedgerEvent::new(
            5,
            EventKind::FundsWithdrawn {
                custodian: ContributorId::new("alice"),
                amount: 10,
            },
        ));

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: LedgerEvent = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first.kind, EventKind::ContributionRecorded { index: 0, .. }));
        assert!(lines[1].contains("\"funds_withdrawn\""));
    }

    #[tokio::test]
    async fn test_broadcast_sink() {
        let sink = BroadcastEventSink::new(16);
        // Emitting without subscribers must not fail
        sink.emit(&recorded(0));

        let mut rx = sink.subscribe();
        sink.emit(&recorded(1));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event.kind, EventKind::ContributionRecorded { index: 1, .. }));
    }
}
