//! Change notifications for a shared couple workspace
//!
//! The engine consumes insert/update/delete events through the
//! [`RealtimeFeed`] trait and maps each event into its own domain types
//! before merging it into local state (see
//! [`crate::checkin::CheckInContext::apply_change`]).
//!
//! [`LocalRealtimeHub`] is an in-process feed backed by a tokio broadcast
//! channel. [`crate::storage::MemoryStore`] publishes to it so that two
//! contexts sharing a store observe each other's writes.

use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{CheckInError, Result};

/// Tables that carry change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    CheckIns,
    Notes,
    CategoryProgress,
    SessionSettings,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::CheckIns => "check_ins",
            Table::Notes => "notes",
            Table::CategoryProgress => "category_progress",
            Table::SessionSettings => "session_settings",
        }
    }
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change, delivered as a plain record
///
/// For deletes `record` holds the row as it was before deletion (at minimum
/// its `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub couple_id: String,
    pub record: serde_json::Value,
}

impl ChangeEvent {
    pub fn new(
        table: Table,
        kind: ChangeKind,
        couple_id: impl Into<String>,
        record: serde_json::Value,
    ) -> Self {
        Self {
            table,
            kind,
            couple_id: couple_id.into(),
            record,
        }
    }

    /// Deserialize the payload into a domain type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.record.clone()).map_err(CheckInError::Serialization)?)
    }

    /// The `id` field of the payload, if present
    pub fn record_id(&self) -> Option<&str> {
        self.record.get("id").and_then(|v| v.as_str())
    }
}

/// Boxed stream of change events
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send + 'static>>;

/// Subscription interface scoped to a couple and a table
pub trait RealtimeFeed: Send + Sync {
    /// Stream every change to `table` within the couple's workspace
    ///
    /// The stream ends when the feed shuts down.
    fn subscribe(&self, couple_id: &str, table: Table) -> ChangeStream;
}

/// Subscribe to the tables a live check-in session merges from
pub fn subscribe_session_changes(feed: &dyn RealtimeFeed, couple_id: &str) -> ChangeStream {
    Box::pin(stream::select(
        feed.subscribe(couple_id, Table::CheckIns),
        feed.subscribe(couple_id, Table::Notes),
    ))
}

/// In-process realtime feed
#[derive(Debug, Clone)]
pub struct LocalRealtimeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

const DEFAULT_HUB_CAPACITY: usize = 256;

impl LocalRealtimeHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HUB_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver an event to every current subscriber
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(
            table = event.table.as_str(),
            kind = ?event.kind,
            couple_id = %event.couple_id,
            "Publishing change event"
        );
        let _ = self.sender.send(event);
    }
}

impl Default for LocalRealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeFeed for LocalRealtimeHub {
    fn subscribe(&self, couple_id: &str, table: Table) -> ChangeStream {
        let receiver = self.sender.subscribe();
        let couple_id = couple_id.to_string();

        Box::pin(stream::unfold(receiver, move |mut receiver| {
            let couple_id = couple_id.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) if event.table == table && event.couple_id == couple_id => {
                            return Some((event, receiver));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, table = table.as_str(), "Realtime subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        }))
    }
}
