//! Event types for the MyPokedex event system
//!
//! Provides shared event definitions and the EventBus used by the client
//! services to announce state changes (catalog reloads, collection edits,
//! session transitions).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::PokemonId;

/// Which persisted collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Favorites,
    Team,
}

/// MyPokedex event types
///
/// Events are broadcast via EventBus. Subscribers re-render or re-derive their
/// view from the payload; no event carries state that cannot be re-read from
/// its owning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DexEvent {
    /// A catalog load was applied
    CatalogLoaded {
        /// Number of entities in the new snapshot
        count: usize,
        /// Request ticket of the load that produced the snapshot
        ticket: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Favorites or team content changed
    CollectionChanged {
        collection: CollectionKind,
        /// Full id list after the change
        ids: Vec<PokemonId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session presence changed
    SessionChanged {
        authenticated: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DexEvent {
    /// Event type name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            DexEvent::CatalogLoaded { .. } => "CatalogLoaded",
            DexEvent::CollectionChanged { .. } => "CollectionChanged",
            DexEvent::SessionChanged { .. } => "SessionChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use dex_common::events::{DexEvent, EventBus};
///
/// let event_bus = EventBus::new(64);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(DexEvent::SessionChanged {
///     authenticated: true,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(DexEvent::SessionChanged { authenticated: true, .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DexEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DexEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: DexEvent) -> Result<usize, broadcast::error::SendError<DexEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DexEvent) {
        tracing::trace!(event = event.event_type(), "Emitting event");
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
