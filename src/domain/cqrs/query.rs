//! CQRS query handler for case event projection.
//!
//! The CaseQuery applies events to the CaseView projection
//! and broadcasts them to subscribers via tokio channels.

use super::CaseAggregate;
use crate::domain::view::{CaseEventEnvelope, CaseView};
use async_trait::async_trait;
use cqrs_es::Query;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};

/// CQRS query handler that maintains the CaseView projection.
pub struct CaseQuery {
    /// In-memory projection of the case state.
    pub projection: Arc<RwLock<CaseView>>,
    /// Watch channel for snapshot updates (latest view).
    pub snapshot_tx: watch::Sender<CaseView>,
    /// Broadcast channel for event streaming.
    pub event_tx: broadcast::Sender<CaseEventEnvelope>,
}

impl CaseQuery {
    /// Creates a new case query handler.
    pub fn new(
        projection: Arc<RwLock<CaseView>>,
        snapshot_tx: watch::Sender<CaseView>,
        event_tx: broadcast::Sender<CaseEventEnvelope>,
    ) -> Self {
        Self {
            projection,
            snapshot_tx,
            event_tx,
        }
    }
}

#[async_trait]
impl Query<CaseAggregate> for CaseQuery {
    async fn dispatch(&self, aggregate_id: &str, events: &[cqrs_es::EventEnvelope<CaseAggregate>]) {
        let mut view = self.projection.write().await;

        for event in events {
            // Apply event to projection
            view.apply_event(aggregate_id, &event.payload, event.sequence as u64);

            // Broadcast event to subscribers
            let envelope = CaseEventEnvelope::from(event);
            if let Err(e) = self.event_tx.send(envelope) {
                tracing::warn!("Failed to broadcast event: {:?}", e);
            }
        }

        // Send updated view snapshot
        let _ = self.snapshot_tx.send(view.clone());
    }
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod tests;
