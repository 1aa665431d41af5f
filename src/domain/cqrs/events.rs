//! Case events for the CQRS aggregate.
//!
//! Events represent facts that have happened. They are the single source of
//! truth for the case state and are persisted to the event log. Each event
//! carries the resulting state (not just the intent), so applying a stream
//! never re-runs business rules.

use crate::definition::CaseDefinition;
use crate::domain::types::{
    CaseFilePath, CaseRoleName, DefinitionId, PlanItemId, RepetitionIndex, TimestampUtc, UserId,
};
use crate::instance::case_file::CaseFileTransition;
use crate::instance::plan_item::{PlanItemKind, State, Transition};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events emitted by the case aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseEvent {
    /// Case was bootstrapped with its definition. First event of every stream.
    CaseDefinitionApplied {
        case_name: String,
        definition: CaseDefinition,
        created_by: UserId,
        created_at: TimestampUtc,
    },

    /// Bootstrap finished: the case plan is wired and buffered case file
    /// transitions were released to the sentry network at this point.
    CaseBootstrapped,

    /// A new definition version was applied to the running case.
    CaseDefinitionMigrated {
        definition: CaseDefinition,
        migrated_at: TimestampUtc,
    },

    /// A team member was added or had their roles changed.
    CaseTeamMemberSet {
        user_id: UserId,
        case_roles: Vec<CaseRoleName>,
    },

    /// A team member was removed.
    CaseTeamMemberRemoved { user_id: UserId },

    /// A plan item instance entered the case (state Null, not yet created).
    PlanItemCreated {
        plan_item_id: PlanItemId,
        definition_id: DefinitionId,
        name: String,
        kind: PlanItemKind,
        index: RepetitionIndex,
        /// Parent stage instance; `None` only for the case plan root.
        stage: Option<PlanItemId>,
        created_at: TimestampUtc,
    },

    /// A plan item took a lifecycle transition.
    PlanItemTransitioned {
        plan_item_id: PlanItemId,
        transition: Transition,
        current_state: State,
        history_state: State,
    },

    /// Outcome of the repetition rule at its evaluation moment.
    RepetitionRuleEvaluated {
        plan_item_id: PlanItemId,
        repeating: bool,
    },

    /// Outcome of the required rule, evaluated at item creation.
    RequiredRuleEvaluated {
        plan_item_id: PlanItemId,
        required: bool,
    },

    /// A plan item was dropped because a migration removed its definition.
    PlanItemDropped { plan_item_id: PlanItemId },

    /// A case file item changed, with the value after the change.
    CaseFileItemTransitioned {
        path: CaseFilePath,
        transition: CaseFileTransition,
        value: Value,
    },
}

impl DomainEvent for CaseEvent {
    fn event_type(&self) -> String {
        match self {
            Self::CaseDefinitionApplied { .. } => "CaseDefinitionApplied".to_string(),
            Self::CaseBootstrapped => "CaseBootstrapped".to_string(),
            Self::CaseDefinitionMigrated { .. } => "CaseDefinitionMigrated".to_string(),
            Self::CaseTeamMemberSet { .. } => "CaseTeamMemberSet".to_string(),
            Self::CaseTeamMemberRemoved { .. } => "CaseTeamMemberRemoved".to_string(),
            Self::PlanItemCreated { .. } => "PlanItemCreated".to_string(),
            Self::PlanItemTransitioned { .. } => "PlanItemTransitioned".to_string(),
            Self::RepetitionRuleEvaluated { .. } => "RepetitionRuleEvaluated".to_string(),
            Self::RequiredRuleEvaluated { .. } => "RequiredRuleEvaluated".to_string(),
            Self::PlanItemDropped { .. } => "PlanItemDropped".to_string(),
            Self::CaseFileItemTransitioned { .. } => "CaseFileItemTransitioned".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1".to_string()
    }
}
