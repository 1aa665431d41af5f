//! Runtime state of one case instance.
//!
//! [`CaseRuntime`] owns the plan item arena, the case file, the sentry
//! network, and the case team. All cross-references between them are ids.
//! State changes arrive exclusively as [`CaseEvent`]s through
//! [`CaseRuntime::apply_event`], the single mutation path shared by live
//! command handling and replay: applying the same event sequence from empty
//! state always reproduces the same runtime. Command handling drives the
//! cascade on a scratch copy through [`cascade::CascadeExecutor`], which emits
//! events and applies them as it goes.

pub mod call_stack;
pub mod cascade;
pub mod case_file;
pub mod plan_item;
pub mod sentry;

use crate::definition::expression::EvaluationError;
use crate::definition::{CaseDefinition, CriterionDefinition};
use crate::domain::cqrs::events::CaseEvent;
use crate::domain::types::{CaseRoleName, PlanItemId, TimestampUtc, UserId};
use case_file::CaseFile;
use plan_item::{PlanItem, State, Transition};
use sentry::{Criterion, CriterionFired, CriterionKind, ObservedTransition, SentryNetwork};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The complete mutable state of a running case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRuntime {
    pub case_name: String,
    pub definition: CaseDefinition,
    pub plan_items: BTreeMap<PlanItemId, PlanItem>,
    pub case_file: CaseFile,
    pub sentry: SentryNetwork,
    /// Case team: member id to the case roles they hold.
    pub team: BTreeMap<UserId, Vec<CaseRoleName>>,
    pub created_by: UserId,
    pub created_at: TimestampUtc,
    /// Case file transitions awaiting release to the sentry network;
    /// `Some` from case start until the `CaseBootstrapped` event.
    bootstrap_buffer: Option<Vec<ObservedTransition>>,
}

impl CaseRuntime {
    /// Fresh runtime for a just-bootstrapped case. The creator joins the team
    /// holding every role the definition declares.
    pub fn new(
        case_name: String,
        definition: CaseDefinition,
        created_by: UserId,
        created_at: TimestampUtc,
    ) -> Self {
        let creator_roles: Vec<CaseRoleName> =
            definition.roles.iter().map(|role| role.name.clone()).collect();
        let mut team = BTreeMap::new();
        team.insert(created_by.clone(), creator_roles);
        Self {
            case_name,
            definition,
            plan_items: BTreeMap::new(),
            case_file: CaseFile::new(),
            sentry: SentryNetwork::new(),
            team,
            created_by,
            created_at,
            bootstrap_buffer: Some(Vec::new()),
        }
    }

    pub fn item(&self, id: &PlanItemId) -> Option<&PlanItem> {
        self.plan_items.get(id)
    }

    /// The case plan root, the only plan item without a parent stage.
    pub fn case_plan(&self) -> Option<&PlanItem> {
        self.plan_items.values().find(|item| item.stage.is_none())
    }

    pub fn children_of<'a>(
        &'a self,
        stage: &'a PlanItemId,
    ) -> impl Iterator<Item = &'a PlanItem> + 'a {
        self.plan_items
            .values()
            .filter(move |item| item.stage.as_ref() == Some(stage))
    }

    /// Child ids of a stage in definition order, repetition instances in
    /// index order. Children whose definition vanished (pending drops during
    /// a migration) come last in arena order.
    pub fn children_in_definition_order(&self, stage: &PlanItemId) -> Vec<PlanItemId> {
        let mut ordered: Vec<PlanItemId> = Vec::new();
        let stage_definition = self
            .item(stage)
            .and_then(|item| self.definition.item_by_id(&item.definition_id));
        if let Some(stage_definition) = stage_definition {
            for child_definition in stage_definition.children() {
                let mut instances: Vec<&PlanItem> = self
                    .children_of(stage)
                    .filter(|child| child.definition_id == child_definition.id)
                    .collect();
                instances.sort_by_key(|child| child.index.0);
                ordered.extend(instances.into_iter().map(|child| child.id.clone()));
            }
        }
        for child in self.children_of(stage) {
            if !ordered.contains(&child.id) {
                ordered.push(child.id.clone());
            }
        }
        ordered
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.team.contains_key(user)
    }

    pub fn has_role(&self, user: &UserId, role: &CaseRoleName) -> bool {
        self.team
            .get(user)
            .map(|roles| roles.contains(role))
            .unwrap_or(false)
    }

    /// Whether no higher-index instance of the same definition exists in the
    /// same stage. Only the latest instance evaluates its repetition rule.
    pub fn is_latest_instance(&self, item: &PlanItem) -> bool {
        !self.plan_items.values().any(|other| {
            other.definition_id == item.definition_id
                && other.stage == item.stage
                && other.index.0 > item.index.0
        })
    }

    /// Completion rule for a stage: no child Active, every required child in a
    /// semi-terminal state.
    pub fn stage_can_complete(&self, stage: &PlanItemId) -> bool {
        self.children_of(stage).all(|child| {
            child.state != State::Active && (!child.required || child.state.is_semi_terminal())
        })
    }

    /// Snapshot of the case file as one JSON document, the context every
    /// expression evaluates against.
    pub fn case_data(&self) -> serde_json::Value {
        self.case_file.as_json()
    }

    /// Applies one event. The sole mutation path: live command handling and
    /// replay both route every event through here, in stream order. Returns
    /// the criteria this event fired; the live executor schedules reactions
    /// from them, replay drops them (the reactions' own events follow in the
    /// stream).
    pub fn apply_event(
        &mut self,
        event: &CaseEvent,
    ) -> Result<Vec<CriterionFired>, EvaluationError> {
        match event {
            CaseEvent::CaseDefinitionApplied { case_name, .. } => {
                warn!(case_name, "definition applied twice, ignoring");
                Ok(Vec::new())
            }
            CaseEvent::CaseBootstrapped => {
                let Some(buffered) = self.bootstrap_buffer.take() else {
                    warn!("bootstrap already released, ignoring");
                    return Ok(Vec::new());
                };
                let case_data = self.case_data();
                let mut fired = Vec::new();
                for observed in &buffered {
                    fired.extend(self.sentry.deliver(observed, &case_data)?);
                }
                Ok(fired)
            }
            CaseEvent::CaseDefinitionMigrated { definition, .. } => {
                self.migrate_definition(definition);
                Ok(Vec::new())
            }
            CaseEvent::CaseTeamMemberSet {
                user_id,
                case_roles,
            } => {
                self.team.insert(user_id.clone(), case_roles.clone());
                Ok(Vec::new())
            }
            CaseEvent::CaseTeamMemberRemoved { user_id } => {
                self.team.remove(user_id);
                Ok(Vec::new())
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
                    PlanItem::new(
                        plan_item_id.clone(),
                        definition_id.clone(),
                        name.clone(),
                        *kind,
                        *index,
                        stage.clone(),
                    ),
                );
                self.connect_criteria_for(plan_item_id);
                Ok(Vec::new())
            }
            CaseEvent::PlanItemTransitioned {
                plan_item_id,
                transition,
                current_state,
                history_state,
            } => {
                let Some(item) = self.plan_items.get_mut(plan_item_id) else {
                    warn!(plan_item = %plan_item_id, "transition for unknown plan item, skipping");
                    return Ok(Vec::new());
                };
                item.state = *current_state;
                item.history_state = *history_state;
                item.last_transition = Some(*transition);
                let definition_id = item.definition_id.clone();
                match transition {
                    Transition::Start | Transition::Enable | Transition::Occur => {
                        self.sentry
                            .release_criteria_of(plan_item_id, Some(CriterionKind::Entry));
                    }
                    _ => {}
                }
                if matches!(current_state, State::Completed | State::Terminated) {
                    self.sentry.release_criteria_of(plan_item_id, None);
                }
                let observed = ObservedTransition::PlanItem {
                    source: definition_id,
                    transition: *transition,
                };
                let case_data = self.case_data();
                self.sentry.deliver(&observed, &case_data)
            }
            CaseEvent::RepetitionRuleEvaluated {
                plan_item_id,
                repeating,
            } => {
                match self.plan_items.get_mut(plan_item_id) {
                    Some(item) => item.repeating = *repeating,
                    None => {
                        warn!(plan_item = %plan_item_id, "rule outcome for unknown plan item, skipping")
                    }
                }
                Ok(Vec::new())
            }
            CaseEvent::RequiredRuleEvaluated {
                plan_item_id,
                required,
            } => {
                match self.plan_items.get_mut(plan_item_id) {
                    Some(item) => item.required = *required,
                    None => {
                        warn!(plan_item = %plan_item_id, "rule outcome for unknown plan item, skipping")
                    }
                }
                Ok(Vec::new())
            }
            CaseEvent::PlanItemDropped { plan_item_id } => {
                match self.plan_items.get_mut(plan_item_id) {
                    Some(item) => {
                        item.history_state = item.state;
                        item.state = State::Discarded;
                    }
                    None => {
                        warn!(plan_item = %plan_item_id, "drop of unknown plan item, skipping")
                    }
                }
                self.sentry.release_criteria_of(plan_item_id, None);
                Ok(Vec::new())
            }
            CaseEvent::CaseFileItemTransitioned {
                path,
                transition,
                value,
            } => {
                self.case_file
                    .apply_transition(path, *transition, value.clone());
                let observed = ObservedTransition::CaseFileItem {
                    source: path.clone(),
                    transition: *transition,
                };
                if let Some(buffer) = &mut self.bootstrap_buffer {
                    debug!(path = %path, transition = %transition, "buffering case file transition until bootstrap completes");
                    buffer.push(observed);
                    return Ok(Vec::new());
                }
                let case_data = self.case_data();
                self.sentry.deliver(&observed, &case_data)
            }
        }
    }

    /// Builds and connects the entry and exit criteria of a freshly created
    /// plan item from its definition.
    fn connect_criteria_for(&mut self, plan_item_id: &PlanItemId) {
        let Some(item) = self.plan_items.get(plan_item_id) else {
            return;
        };
        let Some(definition) = self.definition.item_by_id(&item.definition_id) else {
            warn!(
                plan_item = %plan_item_id,
                definition = %item.definition_id,
                "plan item has no definition in the current tree, criteria not connected"
            );
            return;
        };
        let criteria: Vec<Criterion> = definition
            .entry_criteria
            .iter()
            .map(|criterion| Criterion::from_definition(plan_item_id, CriterionKind::Entry, criterion))
            .chain(
                definition
                    .exit_criteria
                    .iter()
                    .map(|criterion| {
                        Criterion::from_definition(plan_item_id, CriterionKind::Exit, criterion)
                    }),
            )
            .collect();
        for criterion in criteria {
            self.sentry.connect(criterion);
        }
    }

    /// Migration coordinator: repoints surviving plan items at their new
    /// definitions and migrates their criteria. Items without a counterpart
    /// are left untouched; their `PlanItemDropped` events follow in the same
    /// batch.
    fn migrate_definition(&mut self, new_definition: &CaseDefinition) {
        let ids: Vec<PlanItemId> = self.plan_items.keys().cloned().collect();
        for id in ids {
            let Some(item) = self.plan_items.get_mut(&id) else {
                continue;
            };
            let Some(target) = new_definition.migration_target(&item.definition_id, &item.name)
            else {
                debug!(plan_item = %id, "no migration target, expecting drop");
                continue;
            };
            item.definition_id = target.id.clone();
            item.name = target.name.clone();
            let criterion_definitions: Vec<&CriterionDefinition> = target
                .entry_criteria
                .iter()
                .chain(target.exit_criteria.iter())
                .collect();
            self.sentry.migrate_criteria_of(&id, &criterion_definitions);
        }
        self.definition = new_definition.clone();
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
