//! Sentry network: criteria, on-parts, and the subscription registry.
//!
//! Every plan item and case file transition is routed through the network to
//! the criteria subscribed to its source. A criterion marks matching on-parts
//! satisfied (checking their conditions against current case data) and fires
//! exactly once when all on-parts and its if-part hold; firing releases the
//! criterion, so only armed criteria exist in the network. Transitions are
//! transient occurrences: a criterion observes nothing from before it
//! connected. Marks, fires, and releases all happen while an event is applied,
//! which keeps the network's state a pure function of the event stream.

use crate::definition::expression::{evaluate_bool, EvaluationError, Expression};
use crate::definition::{CriterionDefinition, OnPartDefinition};
use crate::domain::types::{CaseFilePath, DefinitionId, PlanItemId};
use crate::instance::case_file::CaseFileTransition;
use crate::instance::plan_item::Transition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Whether a criterion gates its owner's entry or exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Entry,
    Exit,
}

/// Runtime identity of a criterion instance: owning plan item instance plus
/// the criterion definition it was built from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CriterionId(pub String);

impl CriterionId {
    pub fn new(owner: &PlanItemId, definition: &DefinitionId) -> Self {
        Self(format!("{owner}::{definition}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CriterionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The (source, transition) pair an on-part waits for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnPartTrigger {
    PlanItem {
        source: DefinitionId,
        transition: Transition,
    },
    CaseFileItem {
        source: CaseFilePath,
        transition: CaseFileTransition,
    },
}

impl OnPartTrigger {
    /// Subscription key of the trigger's source component.
    pub fn source_key(&self) -> String {
        match self {
            OnPartTrigger::PlanItem { source, .. } => format!("plan:{source}"),
            OnPartTrigger::CaseFileItem { source, .. } => format!("file:{source}"),
        }
    }
}

/// A transition observed on some source component, as routed to the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedTransition {
    PlanItem {
        source: DefinitionId,
        transition: Transition,
    },
    CaseFileItem {
        source: CaseFilePath,
        transition: CaseFileTransition,
    },
}

impl ObservedTransition {
    fn source_key(&self) -> String {
        match self {
            ObservedTransition::PlanItem { source, .. } => format!("plan:{source}"),
            ObservedTransition::CaseFileItem { source, .. } => format!("file:{source}"),
        }
    }

    fn matches(&self, trigger: &OnPartTrigger) -> bool {
        match (self, trigger) {
            (
                ObservedTransition::PlanItem { source, transition },
                OnPartTrigger::PlanItem {
                    source: wanted,
                    transition: wanted_transition,
                },
            ) => source == wanted && transition == wanted_transition,
            (
                ObservedTransition::CaseFileItem { source, transition },
                OnPartTrigger::CaseFileItem {
                    source: wanted,
                    transition: wanted_transition,
                },
            ) => source == wanted && transition == wanted_transition,
            _ => false,
        }
    }
}

/// One dependency of a criterion with its satisfaction flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnPart {
    pub trigger: OnPartTrigger,
    #[serde(default)]
    pub condition: Option<Expression>,
    pub satisfied: bool,
}

impl OnPart {
    fn from_definition(definition: &OnPartDefinition) -> Self {
        let (trigger, condition) = match definition {
            OnPartDefinition::PlanItem { source, transition } => (
                OnPartTrigger::PlanItem {
                    source: source.clone(),
                    transition: *transition,
                },
                None,
            ),
            OnPartDefinition::CaseFileItem {
                source,
                transition,
                condition,
            } => (
                OnPartTrigger::CaseFileItem {
                    source: source.clone(),
                    transition: *transition,
                },
                condition.clone(),
            ),
        };
        Self {
            trigger,
            condition,
            satisfied: false,
        }
    }
}

/// A runtime criterion bound to one plan item instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub owner: PlanItemId,
    pub definition_id: DefinitionId,
    pub kind: CriterionKind,
    pub on_parts: Vec<OnPart>,
    #[serde(default)]
    pub if_part: Option<Expression>,
}

impl Criterion {
    pub fn from_definition(
        owner: &PlanItemId,
        kind: CriterionKind,
        definition: &CriterionDefinition,
    ) -> Self {
        Self {
            id: CriterionId::new(owner, &definition.id),
            owner: owner.clone(),
            definition_id: definition.id.clone(),
            kind,
            on_parts: definition
                .on_parts
                .iter()
                .map(OnPart::from_definition)
                .collect(),
            if_part: definition.if_part.clone(),
        }
    }

    /// Routes one observed transition into the criterion. Returns true when
    /// this observation makes the criterion fire.
    fn observe(
        &mut self,
        observed: &ObservedTransition,
        case_data: &Value,
    ) -> Result<bool, EvaluationError> {
        for on_part in &mut self.on_parts {
            if on_part.satisfied || !observed.matches(&on_part.trigger) {
                continue;
            }
            let holds = match &on_part.condition {
                Some(condition) => evaluate_bool(condition, case_data)?,
                None => true,
            };
            if holds {
                on_part.satisfied = true;
            }
        }
        if !self.on_parts.iter().all(|on_part| on_part.satisfied) {
            return Ok(false);
        }
        if let Some(if_part) = &self.if_part {
            // A false if-part leaves the criterion armed; any later delivery
            // from a subscribed source re-checks it.
            if !evaluate_bool(if_part, case_data)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Swaps in a migrated definition, carrying satisfaction over to on-parts
    /// whose trigger is unchanged.
    fn migrate(&mut self, definition: &CriterionDefinition) {
        let old_parts = std::mem::take(&mut self.on_parts);
        self.on_parts = definition
            .on_parts
            .iter()
            .map(|part_definition| {
                let mut part = OnPart::from_definition(part_definition);
                part.satisfied = old_parts
                    .iter()
                    .any(|old| old.satisfied && old.trigger == part.trigger);
                part
            })
            .collect();
        self.if_part = definition.if_part.clone();
    }
}

/// A criterion that fired during a delivery, with what the reaction needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionFired {
    pub criterion: CriterionId,
    pub owner: PlanItemId,
    pub kind: CriterionKind,
}

/// Per-case registry connecting transition sources to subscribed criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SentryNetwork {
    criteria: BTreeMap<CriterionId, Criterion>,
    /// source key -> criteria subscribed to that source's transitions.
    subscriptions: BTreeMap<String, BTreeSet<CriterionId>>,
}

impl SentryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a criterion under each of its on-part sources. The criterion
    /// observes only transitions delivered from here on.
    pub fn connect(&mut self, criterion: Criterion) {
        let id = criterion.id.clone();
        for on_part in &criterion.on_parts {
            self.subscriptions
                .entry(on_part.trigger.source_key())
                .or_default()
                .insert(id.clone());
        }
        self.criteria.insert(id, criterion);
    }

    /// Unsubscribes a criterion everywhere and drops its record; idempotent.
    pub fn release(&mut self, id: &CriterionId) {
        self.unsubscribe(id);
        self.criteria.remove(id);
    }

    /// Releases every criterion of `owner`, optionally only one kind.
    pub fn release_criteria_of(&mut self, owner: &PlanItemId, kind: Option<CriterionKind>) {
        let ids: Vec<CriterionId> = self
            .criteria
            .values()
            .filter(|criterion| {
                &criterion.owner == owner && kind.map(|k| criterion.kind == k).unwrap_or(true)
            })
            .map(|criterion| criterion.id.clone())
            .collect();
        for id in ids {
            self.release(&id);
        }
    }

    /// Routes an observed transition to all subscribed criteria. Returns the
    /// criteria fired by this delivery, in stable id order; fired criteria are
    /// released before this returns.
    pub fn deliver(
        &mut self,
        observed: &ObservedTransition,
        case_data: &Value,
    ) -> Result<Vec<CriterionFired>, EvaluationError> {
        let Some(subscribed) = self.subscriptions.get(&observed.source_key()) else {
            return Ok(Vec::new());
        };
        let ids: Vec<CriterionId> = subscribed.iter().cloned().collect();
        let mut fired = Vec::new();
        for id in ids {
            if let Some(hit) = self.inform_one(&id, observed, case_data)? {
                fired.push(hit);
            }
        }
        Ok(fired)
    }

    fn inform_one(
        &mut self,
        id: &CriterionId,
        observed: &ObservedTransition,
        case_data: &Value,
    ) -> Result<Option<CriterionFired>, EvaluationError> {
        let Some(criterion) = self.criteria.get_mut(id) else {
            return Ok(None);
        };
        if !criterion.observe(observed, case_data)? {
            return Ok(None);
        }
        let fired = CriterionFired {
            criterion: criterion.id.clone(),
            owner: criterion.owner.clone(),
            kind: criterion.kind,
        };
        self.release(id);
        Ok(Some(fired))
    }

    fn unsubscribe(&mut self, id: &CriterionId) {
        self.subscriptions.retain(|_, subscribed| {
            subscribed.remove(id);
            !subscribed.is_empty()
        });
    }

    /// Migrates the armed criteria of `owner` to the new criterion
    /// definitions, preserving satisfaction of unchanged on-parts. Migration
    /// validation guarantees a match exists; a missing one releases the
    /// criterion with a warning.
    pub fn migrate_criteria_of(
        &mut self,
        owner: &PlanItemId,
        new_definitions: &[&CriterionDefinition],
    ) {
        let ids: Vec<CriterionId> = self
            .criteria
            .values()
            .filter(|criterion| &criterion.owner == owner)
            .map(|criterion| criterion.id.clone())
            .collect();
        for id in ids {
            let keys = {
                let Some(criterion) = self.criteria.get_mut(&id) else {
                    continue;
                };
                let Some(new_definition) = new_definitions
                    .iter()
                    .find(|definition| definition.id == criterion.definition_id)
                else {
                    warn!(criterion = %id, "no matching criterion definition after migration, releasing");
                    self.release(&id);
                    continue;
                };
                criterion.migrate(new_definition);
                criterion
                    .on_parts
                    .iter()
                    .map(|on_part| on_part.trigger.source_key())
                    .collect::<Vec<String>>()
            };
            self.unsubscribe(&id);
            for key in keys {
                self.subscriptions.entry(key).or_default().insert(id.clone());
            }
        }
    }

    pub fn criterion(&self, id: &CriterionId) -> Option<&Criterion> {
        self.criteria.get(id)
    }

    /// Armed criteria of `owner`.
    pub fn criteria_of<'a>(
        &'a self,
        owner: &'a PlanItemId,
    ) -> impl Iterator<Item = &'a Criterion> + 'a {
        self.criteria
            .values()
            .filter(move |criterion| &criterion.owner == owner)
    }

    /// Current subscription table, source key to subscribed criteria ids.
    pub fn subscriptions(&self) -> &BTreeMap<String, BTreeSet<CriterionId>> {
        &self.subscriptions
    }
}

#[cfg(test)]
#[path = "tests/sentry_tests.rs"]
mod tests;
