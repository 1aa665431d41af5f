//! Case view projection for CLI and query purposes.
//!
//! The CaseView is derived from CaseEvent only (no direct mutation) and
//! contains only the data required to render a case: plan item summaries,
//! the current case file contents, and the case team. It never re-runs
//! business rules; every event already carries the resulting state.

use crate::domain::cqrs::CaseAggregate;
use crate::domain::types::{
    CaseFilePath, CaseId, CaseRoleName, DefinitionId, PlanItemId, RepetitionIndex, TimestampUtc,
    UserId,
};
use crate::domain::CaseEvent;
use crate::instance::case_file::CaseFileTransition;
use crate::instance::plan_item::{PlanItemKind, State, Transition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Snapshot of one plan item instance as seen by the read model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItemSummary {
    pub definition_id: DefinitionId,
    pub name: String,
    pub kind: PlanItemKind,
    pub index: RepetitionIndex,
    /// Parent stage instance; `None` for the case plan root.
    pub stage: Option<PlanItemId>,
    pub state: State,
    pub last_transition: Option<Transition>,
    pub repeating: bool,
    pub required: bool,
}

/// Last observed change of one case file item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFileItemSummary {
    pub last_transition: CaseFileTransition,
    pub value: Value,
}

/// Read-only view of case state derived from events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseView {
    case_id: Option<CaseId>,
    case_name: Option<String>,
    definition_id: Option<DefinitionId>,
    definition_name: Option<String>,
    definition_fingerprint: Option<String>,
    created_by: Option<UserId>,
    created_at: Option<TimestampUtc>,
    bootstrapped: bool,
    migrated_at: Option<TimestampUtc>,
    plan_items: BTreeMap<PlanItemId, PlanItemSummary>,
    case_file: BTreeMap<CaseFilePath, CaseFileItemSummary>,
    team: BTreeMap<UserId, Vec<CaseRoleName>>,
    last_event_sequence: u64,
}

impl CaseView {
    /// Apply an event to update the view.
    pub fn apply_event(&mut self, aggregate_id: &str, event: &CaseEvent, sequence: u64) {
        // Parse aggregate_id as UUID - log warning on invalid format
        match Uuid::parse_str(aggregate_id) {
            Ok(uuid) => self.case_id = Some(CaseId(uuid)),
            Err(e) => tracing::warn!("Invalid aggregate ID '{}': {}", aggregate_id, e),
        }
        self.last_event_sequence = sequence;

        match event {
            CaseEvent::CaseDefinitionApplied {
                case_name,
                definition,
                created_by,
                created_at,
            } => {
                self.case_name = Some(case_name.clone());
                self.definition_id = Some(definition.id.clone());
                self.definition_name = Some(definition.name.clone());
                self.definition_fingerprint = Some(definition.fingerprint());
                self.created_by = Some(created_by.clone());
                self.created_at = Some(*created_at);
                self.bootstrapped = false;
                self.migrated_at = None;
                self.plan_items.clear();
                self.case_file.clear();
                self.team.clear();
                // The creator joins the team with every declared role, mirroring
                // how the aggregate seeds its team at bootstrap.
                let all_roles = definition
                    .roles
                    .iter()
                    .map(|role| role.name.clone())
                    .collect();
                self.team.insert(created_by.clone(), all_roles);
            }

            CaseEvent::CaseBootstrapped => {
                self.bootstrapped = true;
            }

            CaseEvent::CaseDefinitionMigrated {
                definition,
                migrated_at,
            } => {
                self.definition_id = Some(definition.id.clone());
                self.definition_name = Some(definition.name.clone());
                self.definition_fingerprint = Some(definition.fingerprint());
                self.migrated_at = Some(*migrated_at);
                // Repoint surviving items at their counterparts in the new tree.
                // Items without a counterpart are discarded by the PlanItemDropped
                // events that follow this one.
                for summary in self.plan_items.values_mut() {
                    if let Some(target) =
                        definition.migration_target(&summary.definition_id, &summary.name)
                    {
                        summary.definition_id = target.id.clone();
                        summary.name = target.name.clone();
                    }
                }
            }

            CaseEvent::CaseTeamMemberSet {
                user_id,
                case_roles,
            } => {
                self.team.insert(user_id.clone(), case_roles.clone());
            }

            CaseEvent::CaseTeamMemberRemoved { user_id } => {
                self.team.remove(user_id);
            }

            CaseEvent::PlanItemCreated {
                plan_item_id,
                definition_id,
                name,
                kind,
                index,
                stage,
                ..
            } => {
                self.plan_items.insert(
                    plan_item_id.clone(),
                    PlanItemSummary {
                        definition_id: definition_id.clone(),
                        name: name.clone(),
                        kind: *kind,
                        index: *index,
                        stage: stage.clone(),
                        state: State::Null,
                        last_transition: None,
                        repeating: false,
                        required: false,
                    },
                );
            }

            CaseEvent::PlanItemTransitioned {
                plan_item_id,
                transition,
                current_state,
                ..
            } => match self.plan_items.get_mut(plan_item_id) {
                Some(summary) => {
                    summary.state = *current_state;
                    summary.last_transition = Some(*transition);
                }
                None => {
                    tracing::warn!("Transition for unknown plan item '{}'", plan_item_id);
                }
            },

            CaseEvent::RepetitionRuleEvaluated {
                plan_item_id,
                repeating,
            } => {
                if let Some(summary) = self.plan_items.get_mut(plan_item_id) {
                    summary.repeating = *repeating;
                }
            }

            CaseEvent::RequiredRuleEvaluated {
                plan_item_id,
                required,
            } => {
                if let Some(summary) = self.plan_items.get_mut(plan_item_id) {
                    summary.required = *required;
                }
            }

            CaseEvent::PlanItemDropped { plan_item_id } => {
                if let Some(summary) = self.plan_items.get_mut(plan_item_id) {
                    summary.state = State::Discarded;
                }
            }

            CaseEvent::CaseFileItemTransitioned {
                path,
                transition,
                value,
            } => match transition {
                CaseFileTransition::Delete => {
                    self.case_file.remove(path);
                    let prefix = format!("{}/", path.as_str());
                    self.case_file
                        .retain(|p, _| !p.as_str().starts_with(&prefix));
                }
                _ => {
                    self.case_file.insert(
                        path.clone(),
                        CaseFileItemSummary {
                            last_transition: *transition,
                            value: value.clone(),
                        },
                    );
                }
            },
        }
    }

    /// Returns the case ID.
    pub fn case_id(&self) -> Option<CaseId> {
        self.case_id
    }

    /// Returns the case name.
    pub fn case_name(&self) -> Option<&str> {
        self.case_name.as_deref()
    }

    /// Returns the id of the active definition version.
    pub fn definition_id(&self) -> Option<&DefinitionId> {
        self.definition_id.as_ref()
    }

    /// Returns the name of the active definition version.
    pub fn definition_name(&self) -> Option<&str> {
        self.definition_name.as_deref()
    }

    /// Returns the fingerprint of the active definition version.
    pub fn definition_fingerprint(&self) -> Option<&str> {
        self.definition_fingerprint.as_deref()
    }

    /// Returns the user who started the case.
    pub fn created_by(&self) -> Option<&UserId> {
        self.created_by.as_ref()
    }

    /// Returns when the case was started.
    pub fn created_at(&self) -> Option<TimestampUtc> {
        self.created_at
    }

    /// Returns true once bootstrap has finished.
    pub fn bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Returns when the last migration was applied, if any.
    pub fn migrated_at(&self) -> Option<TimestampUtc> {
        self.migrated_at
    }

    /// Returns the plan item summaries keyed by instance id.
    pub fn plan_items(&self) -> &BTreeMap<PlanItemId, PlanItemSummary> {
        &self.plan_items
    }

    /// Returns the case file contents keyed by path.
    pub fn case_file(&self) -> &BTreeMap<CaseFilePath, CaseFileItemSummary> {
        &self.case_file
    }

    /// Returns the case team with each member's roles.
    pub fn team(&self) -> &BTreeMap<UserId, Vec<CaseRoleName>> {
        &self.team
    }

    /// Returns the last event sequence number.
    pub fn last_event_sequence(&self) -> u64 {
        self.last_event_sequence
    }

    /// Returns the state of the case plan root, which is the state of the
    /// case as a whole.
    pub fn case_state(&self) -> Option<State> {
        self.plan_items
            .values()
            .find(|summary| summary.stage.is_none())
            .map(|summary| summary.state)
    }
}

/// Serializable wrapper for event envelopes used in broadcasting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseEventEnvelope {
    pub aggregate_id: String,
    pub sequence: u64,
    pub event: CaseEvent,
}

impl From<&cqrs_es::EventEnvelope<CaseAggregate>> for CaseEventEnvelope {
    fn from(source: &cqrs_es::EventEnvelope<CaseAggregate>) -> Self {
        Self {
            aggregate_id: source.aggregate_id.clone(),
            sequence: source.sequence as u64,
            event: source.payload.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
