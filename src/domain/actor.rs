//! Case actor for CQRS command handling.
//!
//! The CaseActor wraps the CQRS framework and provides a message-based
//! interface for executing commands and querying state. One actor serves
//! one case; its mailbox serializes commands so the event stream of a case
//! has a single writer.

use crate::config::EngineConfig;
use crate::domain::cqrs::CaseAggregate;
use crate::domain::errors::CaseError;
use crate::domain::services::CaseServices;
use crate::domain::view::{CaseEventEnvelope, CaseView};
use crate::domain::CaseCommand;
use crate::domain::CaseQuery;
use crate::engine_paths;
use crate::event_store::{FileEventStore, StoredEvent};
use async_trait::async_trait;
use cqrs_es::{AggregateError, CqrsFramework};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch, RwLock};

/// Messages that can be sent to the case actor.
pub enum CaseMessage {
    /// Execute a command and return the updated view (or error).
    Command(
        Box<CaseCommand>,
        oneshot::Sender<Result<CaseView, CaseError>>,
    ),
    /// Get the current view.
    GetView(oneshot::Sender<CaseView>),
}

/// Arguments for spawning a case actor.
#[derive(Clone)]
pub struct CaseActorArgs {
    /// The aggregate ID (case ID).
    pub aggregate_id: String,
    /// Path to the event log file.
    pub log_path: PathBuf,
    /// Path to the snapshot file.
    pub snapshot_path: PathBuf,
    /// Snapshot after every N events.
    pub snapshot_every: u64,
    /// Shared view for projection.
    pub view: Arc<RwLock<CaseView>>,
    /// Watch channel sender for view snapshots.
    pub snapshot_tx: watch::Sender<CaseView>,
    /// Broadcast channel sender for event streaming.
    pub event_tx: broadcast::Sender<CaseEventEnvelope>,
    /// Services for command handling.
    pub services: CaseServices,
}

/// State maintained by the case actor.
pub struct CaseActorState {
    /// The CQRS framework instance.
    pub cqrs: CqrsFramework<CaseAggregate, FileEventStore>,
    /// The aggregate ID.
    pub aggregate_id: String,
    /// Shared view for reading.
    pub view: Arc<RwLock<CaseView>>,
}

/// The case actor.
pub struct CaseActor;

impl CaseActor {
    /// Builds the CQRS framework from actor arguments.
    pub fn build_cqrs(args: &CaseActorArgs) -> CqrsFramework<CaseAggregate, FileEventStore> {
        let store = FileEventStore::new(
            args.log_path.clone(),
            args.snapshot_path.clone(),
            args.snapshot_every,
        );

        let query = CaseQuery::new(
            args.view.clone(),
            args.snapshot_tx.clone(),
            args.event_tx.clone(),
        );

        CqrsFramework::new(store, vec![Box::new(query)], args.services.clone())
    }
}

#[async_trait]
impl Actor for CaseActor {
    type Msg = CaseMessage;
    type State = CaseActorState;
    type Arguments = CaseActorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let cqrs = CaseActor::build_cqrs(&args);

        Ok(CaseActorState {
            cqrs,
            aggregate_id: args.aggregate_id,
            view: args.view,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CaseMessage::Command(boxed_cmd, reply) => {
                let cmd = *boxed_cmd;
                let result = state.cqrs.execute(&state.aggregate_id, cmd).await;
                let view = state.view.read().await.clone();

                let mapped = match result {
                    Ok(()) => Ok(view),
                    Err(AggregateError::UserError(err)) => Err(err),
                    Err(AggregateError::AggregateConflict) => Err(CaseError::Conflict {
                        message: "aggregate was modified concurrently".to_string(),
                    }),
                    Err(err) => Err(CaseError::Storage {
                        message: err.to_string(),
                    }),
                };

                if reply.send(mapped).is_err() {
                    tracing::debug!("Command reply channel closed");
                }
            }
            CaseMessage::GetView(reply) => {
                let view = state.view.read().await.clone();
                if reply.send(view).is_err() {
                    tracing::debug!("Command reply channel closed");
                }
            }
        }

        Ok(())
    }
}

/// Bootstraps a CaseView by replaying events from an event log file.
///
/// This function reads all events for the given aggregate_id from the event
/// log and applies them to a fresh CaseView. This is used when reopening a
/// case to restore the view state from persisted events.
///
/// Returns `CaseView::default()` if the log file doesn't exist.
pub fn bootstrap_view_from_events(log_path: &Path, aggregate_id: &str) -> CaseView {
    let mut view = CaseView::default();

    let file = match File::open(log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return view,
        Err(_) => return view, // Return default on any error
    };

    let reader = BufReader::new(file);
    let mut skipped_lines = 0;

    for line in reader.lines().map_while(Result::ok) {
        if let Ok(stored) = serde_json::from_str::<StoredEvent>(&line) {
            if stored.aggregate_id == aggregate_id {
                view.apply_event(&stored.aggregate_id, &stored.event, stored.sequence);
            }
        } else {
            skipped_lines += 1;
        }
    }

    if skipped_lines > 0 {
        tracing::warn!("Skipped {} unparseable lines in event log", skipped_lines);
    }

    view
}

/// Helper to create actor arguments for one case.
///
/// Takes a case_id and uses the engine_paths helpers to compute the event
/// log and snapshot paths; snapshot cadence and channel capacity come from
/// the engine configuration.
///
/// For existing cases, this function bootstraps the initial CaseView by
/// replaying events from the event log. For new cases, the view starts
/// empty and will be populated when the StartCase command is sent.
pub fn create_actor_args(
    case_id: &str,
    config: &EngineConfig,
) -> anyhow::Result<(
    CaseActorArgs,
    watch::Receiver<CaseView>,
    broadcast::Receiver<CaseEventEnvelope>,
)> {
    let log_path = engine_paths::case_event_log_path(case_id)?;
    let snapshot_path = engine_paths::case_snapshot_path(case_id)?;

    // Bootstrap the view from existing events (if any)
    let initial_view = bootstrap_view_from_events(&log_path, case_id);
    let view = Arc::new(RwLock::new(initial_view.clone()));
    let (snapshot_tx, snapshot_rx) = watch::channel(initial_view);
    let (event_tx, event_rx) = broadcast::channel(config.event_channel_capacity);

    let args = CaseActorArgs {
        aggregate_id: case_id.to_string(),
        log_path,
        snapshot_path,
        snapshot_every: config.snapshot_every,
        view,
        snapshot_tx,
        event_tx,
        services: CaseServices::default(),
    };

    Ok((args, snapshot_rx, event_rx))
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
