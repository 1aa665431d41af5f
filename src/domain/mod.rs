//! Domain model for event-sourced case state management.
//!
//! This module provides a strongly typed CQRS/ES domain model: commands are
//! validated against the case runtime, recorded as events, and state changes
//! only by folding those events.
//!
//! # Architecture
//!
//! - **Commands** (`cqrs/commands.rs`): Intent to change state
//! - **Events** (`cqrs/events.rs`): Facts that have happened
//! - **Aggregate** (`cqrs/mod.rs`): Command validation and event application
//! - **View** (`view.rs`): Read-only projection for CLI and queries
//!
//! # Usage
//!
//! ```ignore
//! use crate::domain::{CaseCommand, CaseEvent, CaseAggregate};
//!
//! // Commands are dispatched through the actor or CQRS framework
//! let cmd = CaseCommand::StartCase { ... };
//!
//! // Events are applied to rebuild state
//! for event in events {
//!     view.apply_event(aggregate_id, &event, sequence);
//! }
//! ```

pub mod actor;
pub mod cqrs;
pub mod errors;
pub mod services;
pub mod supervisor;
pub mod types;
pub mod view;

// Re-export CQRS types
pub use cqrs::*;

// Re-export commonly used types for convenience
pub use actor::{create_actor_args, CaseActor, CaseActorArgs, CaseMessage};
pub use errors::CaseError;
pub use services::{CaseClock, CaseServices};
pub use supervisor::{CaseSupervisor, SupervisorMsg};
pub use types::{
    CaseFilePath, CaseId, CaseRoleName, DefinitionId, PlanItemId, RepetitionIndex, TimestampUtc,
    UserId,
};
pub use view::{CaseEventEnvelope, CaseView};
