//! CQRS core types for event sourcing.
//!
//! This module contains the core CQRS types:
//! - **Commands**: Intent to change state
//! - **Events**: Facts that have happened
//! - **Aggregate**: Command validation and event application
//! - **Query**: Read-side queries

pub mod commands;
pub mod events;
pub mod query;

pub use commands::{CaseCommand, CaseFileInput};
pub use events::CaseEvent;
pub use query::CaseQuery;

use crate::domain::errors::CaseError;
use crate::domain::services::CaseServices;
use crate::domain::types::TimestampUtc;
use crate::instance::case_file::CaseFileTransition;
use crate::instance::cascade::CascadeExecutor;
use crate::instance::CaseRuntime;
use async_trait::async_trait;
use cqrs_es::{Aggregate, DomainEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Case aggregate state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CaseState {
    /// Aggregate has not been bootstrapped.
    #[default]
    Uninitialized,
    /// Aggregate is active with its case runtime (boxed for memory efficiency).
    Active(Box<CaseRuntime>),
}

/// The case aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CaseAggregate {
    pub state: CaseState,
}

impl CaseAggregate {
    /// Runs one command body against a scratch copy of the runtime and
    /// returns the events it recorded. A failing command discards the copy,
    /// so no partial batch ever reaches the aggregate state.
    fn execute<F>(
        runtime: &CaseRuntime,
        now: TimestampUtc,
        op: F,
    ) -> Result<Vec<CaseEvent>, CaseError>
    where
        F: FnOnce(&mut CascadeExecutor) -> Result<(), CaseError>,
    {
        let mut executor = CascadeExecutor::new(runtime.clone(), now);
        op(&mut executor)?;
        Ok(executor.into_events())
    }
}

#[async_trait]
impl Aggregate for CaseAggregate {
    type Command = CaseCommand;
    type Event = CaseEvent;
    type Error = CaseError;
    type Services = CaseServices;

    fn aggregate_type() -> String {
        "case".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        let now = services.clock.now();

        match (&self.state, command) {
            // StartCase - only valid on an uninitialized aggregate
            (
                CaseState::Uninitialized,
                CaseCommand::StartCase {
                    case_name,
                    definition,
                    inputs,
                    created_by,
                },
            ) => {
                let executor =
                    CascadeExecutor::bootstrap(case_name, definition, inputs, created_by, now)?;
                Ok(executor.into_events())
            }

            (CaseState::Active(_), CaseCommand::StartCase { .. }) => {
                Err(CaseError::validation("the case is already started"))
            }

            (CaseState::Active(runtime), CaseCommand::MakeCaseTransition { user, transition }) => {
                Self::execute(runtime, now, |case| {
                    case.make_case_transition(&user, transition)
                })
            }

            (
                CaseState::Active(runtime),
                CaseCommand::MakePlanItemTransition {
                    user,
                    plan_item_id,
                    transition,
                },
            ) => Self::execute(runtime, now, |case| {
                case.make_plan_item_transition(&user, &plan_item_id, transition)
            }),

            (CaseState::Active(runtime), CaseCommand::CreateCaseFileItem { user, path, value }) => {
                Self::execute(runtime, now, |case| {
                    case.make_case_file_transition(&user, path, CaseFileTransition::Create, value)
                })
            }

            (CaseState::Active(runtime), CaseCommand::UpdateCaseFileItem { user, path, value }) => {
                Self::execute(runtime, now, |case| {
                    case.make_case_file_transition(&user, path, CaseFileTransition::Update, value)
                })
            }

            (
                CaseState::Active(runtime),
                CaseCommand::ReplaceCaseFileItem { user, path, value },
            ) => Self::execute(runtime, now, |case| {
                case.make_case_file_transition(&user, path, CaseFileTransition::Replace, value)
            }),

            (CaseState::Active(runtime), CaseCommand::DeleteCaseFileItem { user, path }) => {
                Self::execute(runtime, now, |case| {
                    case.make_case_file_transition(
                        &user,
                        path,
                        CaseFileTransition::Delete,
                        Value::Null,
                    )
                })
            }

            (
                CaseState::Active(runtime),
                CaseCommand::SetTeamMember {
                    user,
                    member_id,
                    case_roles,
                },
            ) => Self::execute(runtime, now, |case| {
                case.set_team_member(&user, member_id, case_roles)
            }),

            (CaseState::Active(runtime), CaseCommand::RemoveTeamMember { user, member_id }) => {
                Self::execute(runtime, now, |case| {
                    case.remove_team_member(&user, &member_id)
                })
            }

            (
                CaseState::Active(runtime),
                CaseCommand::MigrateDefinition {
                    user,
                    new_definition,
                },
            ) => Self::execute(runtime, now, |case| case.migrate(&user, new_definition)),

            // Any other command before bootstrap
            (CaseState::Uninitialized, _cmd) => Err(CaseError::NotBootstrapped),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match (&mut self.state, event) {
            // CaseDefinitionApplied initializes the aggregate
            (
                CaseState::Uninitialized,
                CaseEvent::CaseDefinitionApplied {
                    case_name,
                    definition,
                    created_by,
                    created_at,
                },
            ) => {
                self.state = CaseState::Active(Box::new(CaseRuntime::new(
                    case_name, definition, created_by, created_at,
                )));
            }

            // Every other event folds through the runtime. The returned
            // criterion firings are dropped here: the reactions they caused
            // live on in the stream as their own events.
            (CaseState::Active(runtime), event) => {
                if let Err(err) = runtime.apply_event(&event) {
                    warn!(
                        event_type = %event.event_type(),
                        error = %err,
                        "event application failed, skipping"
                    );
                }
            }

            // Ignore events on wrong state (shouldn't happen with correct event sourcing)
            (CaseState::Uninitialized, event) => {
                warn!(
                    event_type = %event.event_type(),
                    "event arrived before the case was bootstrapped, skipping"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;
