//! Case commands for the CQRS aggregate.
//!
//! Commands represent intent to change state. The aggregate validates commands
//! and produces events that are persisted to the event log.

use crate::definition::CaseDefinition;
use crate::domain::types::{CaseFilePath, CaseRoleName, PlanItemId, UserId};
use crate::instance::plan_item::Transition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Initial payload for a case file item, applied during case bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFileInput {
    pub path: CaseFilePath,
    pub value: Value,
}

/// Commands that can be executed against the case aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseCommand {
    /// Bootstrap a new case from a definition.
    StartCase {
        case_name: String,
        definition: CaseDefinition,
        inputs: Vec<CaseFileInput>,
        created_by: UserId,
    },

    /// Drive the case plan root through a lifecycle transition
    /// (Suspend, Reactivate, Terminate, Complete).
    MakeCaseTransition { user: UserId, transition: Transition },

    /// Drive a single plan item through a lifecycle transition.
    MakePlanItemTransition {
        user: UserId,
        plan_item_id: PlanItemId,
        transition: Transition,
    },

    /// Create a case file item with an initial value.
    CreateCaseFileItem {
        user: UserId,
        path: CaseFilePath,
        value: Value,
    },

    /// Merge new content into an existing case file item.
    UpdateCaseFileItem {
        user: UserId,
        path: CaseFilePath,
        value: Value,
    },

    /// Replace the content of an existing case file item.
    ReplaceCaseFileItem {
        user: UserId,
        path: CaseFilePath,
        value: Value,
    },

    /// Delete a case file item and its descendants.
    DeleteCaseFileItem { user: UserId, path: CaseFilePath },

    /// Add a team member or change their roles.
    SetTeamMember {
        user: UserId,
        member_id: UserId,
        case_roles: Vec<CaseRoleName>,
    },

    /// Remove a team member.
    RemoveTeamMember { user: UserId, member_id: UserId },

    /// Migrate the running case to a new definition version.
    MigrateDefinition {
        user: UserId,
        new_definition: CaseDefinition,
    },
}
