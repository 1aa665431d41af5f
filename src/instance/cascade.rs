//! Command execution over a scratch runtime.
//!
//! [`CascadeExecutor`] owns a working copy of the [`CaseRuntime`] plus the
//! events it produced. Every emitted event is applied to the copy before the
//! next step runs, so command handling and later replay walk the exact same
//! state sequence. Plan item transitions cascade: recording one transition
//! can fire criteria, and the reactions (more transitions) are scheduled on a
//! [`TransitionCallStack`] so that an outer transition finishes its immediate
//! behavior before any reaction runs, and reactions drain in the order they
//! were scheduled.
//!
//! Any error mid-cascade aborts the whole command: the caller drops the
//! executor, scratch state and events included, and the case is unchanged.

use crate::definition::expression::{evaluate_bool, Expression};
use crate::definition::{CaseDefinition, PlanItemContent};
use crate::domain::cqrs::commands::CaseFileInput;
use crate::domain::cqrs::events::CaseEvent;
use crate::domain::errors::CaseError;
use crate::domain::types::{
    CaseFilePath, CaseRoleName, DefinitionId, PlanItemId, RepetitionIndex, TimestampUtc, UserId,
};
use crate::instance::call_stack::{FrameId, TransitionCallStack};
use crate::instance::case_file::CaseFileTransition;
use crate::instance::plan_item::{PlanItemKind, State, Transition};
use crate::instance::sentry::{CriterionFired, CriterionKind};
use crate::instance::CaseRuntime;
use serde_json::Value;
use tracing::debug;

/// Commands may only request transitions a participant can take; the rest are
/// reserved for the engine's own cascades.
const INTERNAL_TRANSITIONS: [Transition; 4] = [
    Transition::Create,
    Transition::Exit,
    Transition::ParentSuspend,
    Transition::ParentResume,
];

/// One scheduled transition: the item, what it took, and the criteria its
/// record fired (reacted to when the frame's delayed behavior runs).
#[derive(Debug)]
struct CascadeWork {
    item: PlanItemId,
    transition: Transition,
    fires: Vec<CriterionFired>,
}

/// Executes one command against a scratch copy of the case.
#[derive(Debug)]
pub struct CascadeExecutor {
    runtime: CaseRuntime,
    events: Vec<CaseEvent>,
    stack: TransitionCallStack<CascadeWork>,
    now: TimestampUtc,
}

impl CascadeExecutor {
    /// Executor over a working copy of an already-running case.
    pub fn new(runtime: CaseRuntime, now: TimestampUtc) -> Self {
        Self {
            runtime,
            events: Vec::new(),
            stack: TransitionCallStack::new(),
            now,
        }
    }

    /// The events this command produced, in emission order.
    pub fn into_events(self) -> Vec<CaseEvent> {
        self.events
    }

    pub fn runtime(&self) -> &CaseRuntime {
        &self.runtime
    }

    /// Bootstraps a new case: definition, case file inputs, the case plan
    /// root, and finally the release of buffered case file transitions to
    /// the sentry network.
    pub fn bootstrap(
        case_name: String,
        definition: CaseDefinition,
        inputs: Vec<CaseFileInput>,
        created_by: UserId,
        now: TimestampUtc,
    ) -> Result<Self, CaseError> {
        definition
            .validate()
            .map_err(|problems| CaseError::validation(format!("invalid definition: {problems}")))?;
        for input in &inputs {
            if definition.case_file_item(&input.path).is_none() {
                return Err(CaseError::validation(format!(
                    "case file input '{}' is not defined in the case file structure",
                    input.path
                )));
            }
        }
        let runtime = CaseRuntime::new(
            case_name.clone(),
            definition.clone(),
            created_by.clone(),
            now,
        );
        let mut executor = Self::new(runtime, now);
        // The runtime above was built from this event's payload; applying it
        // again would be a no-op, so it goes straight into the batch.
        executor.events.push(CaseEvent::CaseDefinitionApplied {
            case_name,
            definition: definition.clone(),
            created_by,
            created_at: now,
        });
        for input in inputs {
            executor
                .runtime
                .case_file
                .validate_transition(&input.path, CaseFileTransition::Create)
                .map_err(CaseError::validation)?;
            executor.emit(CaseEvent::CaseFileItemTransitioned {
                path: input.path,
                transition: CaseFileTransition::Create,
                value: input.value,
            })?;
        }
        let root = &definition.plan;
        let root_id = executor.create_instance(
            root.id.clone(),
            root.name.clone(),
            root.kind(),
            root.control.required.clone(),
            RepetitionIndex::first(),
            None,
        )?;
        executor.push_transition(&root_id, Transition::Create)?;
        let fires = executor.emit(CaseEvent::CaseBootstrapped)?;
        for fired in &fires {
            executor.react_to_fire(fired)?;
        }
        Ok(executor)
    }

    /// A case-level transition is the same transition on the case plan root.
    pub fn make_case_transition(
        &mut self,
        user: &UserId,
        transition: Transition,
    ) -> Result<(), CaseError> {
        let root_id = self
            .runtime
            .case_plan()
            .map(|root| root.id.clone())
            .ok_or_else(|| CaseError::validation("the case has no case plan"))?;
        self.make_plan_item_transition(user, &root_id, transition)
    }

    pub fn make_plan_item_transition(
        &mut self,
        user: &UserId,
        plan_item_id: &PlanItemId,
        transition: Transition,
    ) -> Result<(), CaseError> {
        self.require_member(user)?;
        if INTERNAL_TRANSITIONS.contains(&transition) {
            return Err(CaseError::validation(format!(
                "transition {transition} is reserved for the engine"
            )));
        }
        let Some(item) = self.runtime.item(plan_item_id) else {
            return Err(CaseError::validation(format!(
                "unknown plan item '{plan_item_id}'"
            )));
        };
        if item.acceptable_target(transition).is_none() {
            return Err(CaseError::validation(format!(
                "plan item '{}' in state {} does not accept {transition}",
                item.name, item.state
            )));
        }
        let name = item.name.clone();
        let guard_completion = item.is_stage() && transition == Transition::Complete;
        self.check_item_authorization(user, plan_item_id, transition)?;
        if guard_completion && !self.runtime.stage_can_complete(plan_item_id) {
            return Err(CaseError::validation(format!(
                "stage '{name}' cannot complete while children are active or required children are pending"
            )));
        }
        self.push_transition(plan_item_id, transition)
    }

    /// Applies one case file transition and reacts to whatever it fires.
    pub fn make_case_file_transition(
        &mut self,
        user: &UserId,
        path: CaseFilePath,
        transition: CaseFileTransition,
        value: Value,
    ) -> Result<(), CaseError> {
        self.require_member(user)?;
        if self.runtime.definition.case_file_item(&path).is_none() {
            return Err(CaseError::validation(format!(
                "path '{path}' is not defined in the case file structure"
            )));
        }
        self.runtime
            .case_file
            .validate_transition(&path, transition)
            .map_err(CaseError::validation)?;
        let fires = self.emit(CaseEvent::CaseFileItemTransitioned {
            path,
            transition,
            value,
        })?;
        for fired in &fires {
            self.react_to_fire(fired)?;
        }
        Ok(())
    }

    /// Adds a member or changes their roles.
    pub fn set_team_member(
        &mut self,
        user: &UserId,
        member_id: UserId,
        case_roles: Vec<CaseRoleName>,
    ) -> Result<(), CaseError> {
        self.require_member(user)?;
        for role in &case_roles {
            if self.runtime.definition.role(role).is_none() {
                return Err(CaseError::validation(format!(
                    "the definition declares no case role '{role}'"
                )));
            }
        }
        self.emit(CaseEvent::CaseTeamMemberSet {
            user_id: member_id,
            case_roles,
        })?;
        Ok(())
    }

    pub fn remove_team_member(
        &mut self,
        user: &UserId,
        member_id: &UserId,
    ) -> Result<(), CaseError> {
        self.require_member(user)?;
        if !self.runtime.is_member(member_id) {
            return Err(CaseError::validation(format!(
                "user '{member_id}' is not a member of the case team"
            )));
        }
        if self.runtime.team.len() == 1 {
            return Err(CaseError::validation(
                "cannot remove the last member of the case team",
            ));
        }
        self.emit(CaseEvent::CaseTeamMemberRemoved {
            user_id: member_id.clone(),
        })?;
        Ok(())
    }

    /// Migrates the case to a new definition revision. Fails closed: the
    /// command is rejected unless every surviving plan item keeps its kind
    /// and every armed criterion has a counterpart in the new definition.
    pub fn migrate(
        &mut self,
        user: &UserId,
        new_definition: CaseDefinition,
    ) -> Result<(), CaseError> {
        self.require_member(user)?;
        new_definition
            .validate()
            .map_err(|problems| CaseError::validation(format!("invalid definition: {problems}")))?;
        let mut dropped: Vec<PlanItemId> = Vec::new();
        for item in self.runtime.plan_items.values() {
            let Some(target) = new_definition.migration_target(&item.definition_id, &item.name)
            else {
                dropped.push(item.id.clone());
                continue;
            };
            if target.kind() != item.kind {
                return Err(CaseError::validation(format!(
                    "migration changes the kind of plan item '{}'",
                    item.name
                )));
            }
            for criterion in self.runtime.sentry.criteria_of(&item.id) {
                let counterparts = match criterion.kind {
                    CriterionKind::Entry => &target.entry_criteria,
                    CriterionKind::Exit => &target.exit_criteria,
                };
                if !counterparts
                    .iter()
                    .any(|candidate| candidate.id == criterion.definition_id)
                {
                    return Err(CaseError::validation(format!(
                        "armed criterion '{}' of plan item '{}' has no counterpart in the new definition",
                        criterion.definition_id, item.name
                    )));
                }
            }
        }
        // Dropping a stage drops everything under it, matched or not.
        loop {
            let orphans: Vec<PlanItemId> = self
                .runtime
                .plan_items
                .values()
                .filter(|item| {
                    !dropped.contains(&item.id)
                        && item
                            .stage
                            .as_ref()
                            .map(|stage| dropped.contains(stage))
                            .unwrap_or(false)
                })
                .map(|item| item.id.clone())
                .collect();
            if orphans.is_empty() {
                break;
            }
            dropped.extend(orphans);
        }
        dropped.sort();
        self.emit(CaseEvent::CaseDefinitionMigrated {
            definition: new_definition,
            migrated_at: self.now,
        })?;
        for plan_item_id in dropped {
            self.emit(CaseEvent::PlanItemDropped { plan_item_id })?;
        }
        Ok(())
    }

    /// Applies the event to the scratch runtime and records it. The returned
    /// fires are criteria satisfied by this event; the caller decides when
    /// their reactions run.
    fn emit(&mut self, event: CaseEvent) -> Result<Vec<CriterionFired>, CaseError> {
        let fired = self
            .runtime
            .apply_event(&event)
            .map_err(|err| CaseError::execution(err.to_string()))?;
        self.events.push(event);
        Ok(fired)
    }

    fn require_member(&self, user: &UserId) -> Result<(), CaseError> {
        if self.runtime.is_member(user) {
            return Ok(());
        }
        Err(CaseError::validation(format!(
            "user '{user}' is not a member of the case team"
        )))
    }

    /// Role checks beyond team membership: user events are guarded by their
    /// authorized roles, human tasks by their performer role.
    fn check_item_authorization(
        &self,
        user: &UserId,
        plan_item_id: &PlanItemId,
        transition: Transition,
    ) -> Result<(), CaseError> {
        let Some(item) = self.runtime.item(plan_item_id) else {
            return Ok(());
        };
        let Some(definition) = self.runtime.definition.item_by_id(&item.definition_id) else {
            return Ok(());
        };
        match &definition.content {
            PlanItemContent::UserEvent { authorized_roles } if transition == Transition::Occur => {
                if !authorized_roles.is_empty()
                    && !authorized_roles
                        .iter()
                        .any(|role| self.runtime.has_role(user, role))
                {
                    return Err(CaseError::validation(format!(
                        "user '{user}' holds no role authorized to raise event '{}'",
                        item.name
                    )));
                }
            }
            PlanItemContent::HumanTask {
                performer: Some(role),
            } if matches!(
                transition,
                Transition::Start | Transition::Complete | Transition::Fault
            ) =>
            {
                if !self.runtime.has_role(user, role) {
                    return Err(CaseError::validation(format!(
                        "user '{user}' does not hold the performer role '{role}' of task '{}'",
                        item.name
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Takes one transition on one plan item. Records the transition and runs
    /// its immediate behavior before returning; the delayed behavior is
    /// postponed onto the call stack and drains when the outermost frame of
    /// the cascade finishes. A transition the item's current state does not
    /// accept is absorbed silently: cascades race, and losing a race is not
    /// an error.
    fn push_transition(
        &mut self,
        plan_item_id: &PlanItemId,
        transition: Transition,
    ) -> Result<(), CaseError> {
        let Some(item) = self.runtime.item(plan_item_id) else {
            debug!(plan_item = %plan_item_id, %transition, "transition for unknown plan item, absorbed");
            return Ok(());
        };
        let Some(target) = item.acceptable_target(transition) else {
            debug!(
                plan_item = %item.name,
                state = %item.state,
                %transition,
                "transition not acceptable, absorbed"
            );
            return Ok(());
        };
        let history = item.state;
        let kind = item.kind;
        let frame = self.stack.open(CascadeWork {
            item: plan_item_id.clone(),
            transition,
            fires: Vec::new(),
        });
        let enclosing = self.stack.begin(frame);
        let fires = self.emit(CaseEvent::PlanItemTransitioned {
            plan_item_id: plan_item_id.clone(),
            transition,
            current_state: target,
            history_state: history,
        })?;
        self.stack.work_mut(frame).fires = fires;
        if kind == PlanItemKind::Stage {
            self.stage_immediate(plan_item_id, transition)?;
        }
        self.stack.end(enclosing);
        if let Some(outermost) = self.stack.postpone(frame) {
            self.drain(outermost)?;
        }
        Ok(())
    }

    /// Containment behavior that must run before any criterion reaction:
    /// entering Active populates the stage, leaving it carries the children
    /// along.
    fn stage_immediate(
        &mut self,
        stage_id: &PlanItemId,
        transition: Transition,
    ) -> Result<(), CaseError> {
        match transition {
            Transition::Start | Transition::Reactivate => self.populate_stage(stage_id),
            Transition::Complete | Transition::Terminate | Transition::Exit => {
                for child_id in self.runtime.children_in_definition_order(stage_id) {
                    let terminal = self
                        .runtime
                        .item(&child_id)
                        .map(|child| child.state.is_terminal())
                        .unwrap_or(true);
                    if !terminal {
                        self.push_transition(&child_id, Transition::Exit)?;
                    }
                }
                Ok(())
            }
            Transition::Suspend | Transition::ParentSuspend => {
                for child_id in self.runtime.children_in_definition_order(stage_id) {
                    let suspendable = self
                        .runtime
                        .item(&child_id)
                        .map(|child| {
                            !child.state.is_terminal() && child.state != State::Suspended
                        })
                        .unwrap_or(false);
                    if suspendable {
                        self.push_transition(&child_id, Transition::ParentSuspend)?;
                    }
                }
                Ok(())
            }
            Transition::Resume | Transition::ParentResume => {
                for child_id in self.runtime.children_in_definition_order(stage_id) {
                    // Only children the stage itself suspended resume with it.
                    let follows = self
                        .runtime
                        .item(&child_id)
                        .map(|child| {
                            child.state == State::Suspended
                                && child.last_transition == Some(Transition::ParentSuspend)
                        })
                        .unwrap_or(false);
                    if follows {
                        self.push_transition(&child_id, Transition::ParentResume)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// First activation (or reactivation) of a stage: one instance per child
    /// definition that has none yet. All instances are created before any of
    /// them transitions, so every sibling criterion is connected before the
    /// first observable move.
    fn populate_stage(&mut self, stage_id: &PlanItemId) -> Result<(), CaseError> {
        let Some(stage) = self.runtime.item(stage_id) else {
            return Ok(());
        };
        let to_create: Vec<(DefinitionId, String, PlanItemKind, Option<Expression>)> = self
            .runtime
            .definition
            .item_by_id(&stage.definition_id)
            .map(|stage_def| {
                stage_def
                    .children()
                    .iter()
                    .filter(|child_def| {
                        !self
                            .runtime
                            .children_of(stage_id)
                            .any(|existing| existing.definition_id == child_def.id)
                    })
                    .map(|child_def| {
                        (
                            child_def.id.clone(),
                            child_def.name.clone(),
                            child_def.kind(),
                            child_def.control.required.clone(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        let mut created = Vec::new();
        for (definition_id, name, kind, required_rule) in to_create {
            created.push(self.create_instance(
                definition_id,
                name,
                kind,
                required_rule,
                RepetitionIndex::first(),
                Some(stage_id.clone()),
            )?);
        }
        for child_id in &created {
            self.push_transition(child_id, Transition::Create)?;
        }
        Ok(())
    }

    /// Emits the creation record (and the required rule outcome when the
    /// definition has one) for a new plan item instance.
    fn create_instance(
        &mut self,
        definition_id: DefinitionId,
        name: String,
        kind: PlanItemKind,
        required_rule: Option<Expression>,
        index: RepetitionIndex,
        stage: Option<PlanItemId>,
    ) -> Result<PlanItemId, CaseError> {
        let plan_item_id = PlanItemId::new();
        self.emit(CaseEvent::PlanItemCreated {
            plan_item_id: plan_item_id.clone(),
            definition_id,
            name,
            kind,
            index,
            stage,
            created_at: self.now,
        })?;
        if let Some(rule) = required_rule {
            let required = self.rule_outcome(&rule)?;
            self.emit(CaseEvent::RequiredRuleEvaluated {
                plan_item_id: plan_item_id.clone(),
                required,
            })?;
        }
        Ok(plan_item_id)
    }

    fn rule_outcome(&self, rule: &Expression) -> Result<bool, CaseError> {
        evaluate_bool(rule, &self.runtime.case_data())
            .map_err(|err| CaseError::execution(err.to_string()))
    }

    /// Drains a finished outermost frame: its own delayed behavior first,
    /// then each postponed child depth-first in postponement order. Driven by
    /// an explicit cursor stack so cascade depth never consumes host stack.
    fn drain(&mut self, outermost: FrameId) -> Result<(), CaseError> {
        let enclosing = self.stack.begin(outermost);
        self.run_delayed(outermost)?;
        let mut cursors = vec![(outermost, enclosing)];
        while let Some(&(frame, _)) = cursors.last() {
            match self.stack.next_child(frame) {
                Some(child) => {
                    let previous = self.stack.begin(child);
                    self.run_delayed(child)?;
                    cursors.push((child, previous));
                }
                None => {
                    if let Some((_, previous)) = cursors.pop() {
                        self.stack.end(previous);
                    }
                }
            }
        }
        Ok(())
    }

    /// Delayed behavior of one recorded transition: react to the criteria it
    /// fired, run the transition's own follow-ups, then give the parent stage
    /// its completion check.
    fn run_delayed(&mut self, frame: FrameId) -> Result<(), CaseError> {
        let item = self.stack.work(frame).item.clone();
        let transition = self.stack.work(frame).transition;
        let fires = std::mem::take(&mut self.stack.work_mut(frame).fires);
        for fired in &fires {
            self.react_to_fire(fired)?;
        }
        match transition {
            Transition::Create => self.begin_lifecycle(&item)?,
            Transition::Complete | Transition::Terminate | Transition::Occur => {
                self.repeat_on_completion(&item)?;
            }
            _ => {}
        }
        self.check_parent_completion(&item)
    }

    /// An exit criterion exits its owner. An entry criterion first gives the
    /// owner its repetition pre-step and then takes the owner out of
    /// Available through its entry transition.
    fn react_to_fire(&mut self, fired: &CriterionFired) -> Result<(), CaseError> {
        match fired.kind {
            CriterionKind::Exit => self.push_transition(&fired.owner, Transition::Exit),
            CriterionKind::Entry => {
                let Some(owner) = self.runtime.item(&fired.owner) else {
                    return Ok(());
                };
                if owner.state != State::Available {
                    debug!(
                        plan_item = %owner.name,
                        state = %owner.state,
                        "entry criterion fired but owner already left Available, absorbed"
                    );
                    return Ok(());
                }
                self.evaluate_repetition(&fired.owner)?;
                let Some(owner) = self.runtime.item(&fired.owner) else {
                    return Ok(());
                };
                let kind = owner.kind;
                let manual = self.manual_activation_outcome(&fired.owner)?;
                self.push_transition(&fired.owner, kind.entry_transition(manual))
            }
        }
    }

    /// Lifecycle begin for a freshly available item without entry criteria:
    /// tasks and stages take their entry transition on their own; milestones
    /// and event listeners keep waiting for an explicit occurrence.
    fn begin_lifecycle(&mut self, plan_item_id: &PlanItemId) -> Result<(), CaseError> {
        let Some(item) = self.runtime.item(plan_item_id) else {
            return Ok(());
        };
        if item.state != State::Available {
            return Ok(());
        }
        let kind = item.kind;
        let has_entry_criteria = self
            .runtime
            .definition
            .item_by_id(&item.definition_id)
            .map(|definition| !definition.entry_criteria.is_empty())
            .unwrap_or(false);
        if has_entry_criteria {
            return Ok(());
        }
        match kind {
            PlanItemKind::Task | PlanItemKind::Stage => {
                let manual = self.manual_activation_outcome(plan_item_id)?;
                self.push_transition(plan_item_id, kind.entry_transition(manual))
            }
            PlanItemKind::Milestone | PlanItemKind::EventListener => Ok(()),
        }
    }

    fn manual_activation_outcome(&self, plan_item_id: &PlanItemId) -> Result<bool, CaseError> {
        let rule = self
            .runtime
            .item(plan_item_id)
            .and_then(|item| self.runtime.definition.item_by_id(&item.definition_id))
            .and_then(|definition| definition.control.manual_activation.clone());
        match rule {
            Some(rule) => self.rule_outcome(&rule),
            None => Ok(false),
        }
    }

    /// Repetition at an entry criterion fire: the latest instance evaluates
    /// its rule, and a true outcome mints the next instance before this one
    /// leaves Available. The sibling connects its own fresh criteria and
    /// waits for the next occurrence.
    fn evaluate_repetition(&mut self, plan_item_id: &PlanItemId) -> Result<(), CaseError> {
        let Some(item) = self.runtime.item(plan_item_id) else {
            return Ok(());
        };
        if !self.runtime.is_latest_instance(item) {
            return Ok(());
        }
        let Some(definition) = self.runtime.definition.item_by_id(&item.definition_id) else {
            return Ok(());
        };
        let Some(rule) = definition.control.repetition.clone() else {
            return Ok(());
        };
        let next = (
            item.definition_id.clone(),
            item.name.clone(),
            item.kind,
            definition.control.required.clone(),
            item.index.next(),
            item.stage.clone(),
        );
        let repeating = self.rule_outcome(&rule)?;
        self.emit(CaseEvent::RepetitionRuleEvaluated {
            plan_item_id: plan_item_id.clone(),
            repeating,
        })?;
        if repeating {
            let (definition_id, name, kind, required_rule, index, stage) = next;
            let sibling =
                self.create_instance(definition_id, name, kind, required_rule, index, stage)?;
            self.push_transition(&sibling, Transition::Create)?;
        }
        Ok(())
    }

    /// Repetition for items without entry criteria happens when the instance
    /// ends instead: the next instance is minted and begins its lifecycle
    /// through its own Create frame.
    fn repeat_on_completion(&mut self, plan_item_id: &PlanItemId) -> Result<(), CaseError> {
        let has_entry_criteria = self
            .runtime
            .item(plan_item_id)
            .and_then(|item| self.runtime.definition.item_by_id(&item.definition_id))
            .map(|definition| !definition.entry_criteria.is_empty())
            .unwrap_or(true);
        if has_entry_criteria {
            return Ok(());
        }
        self.evaluate_repetition(plan_item_id)
    }

    /// After a child settles, an auto-completing parent stage completes as
    /// soon as nothing blocks it.
    fn check_parent_completion(&mut self, plan_item_id: &PlanItemId) -> Result<(), CaseError> {
        let Some(item) = self.runtime.item(plan_item_id) else {
            return Ok(());
        };
        if !item.state.is_semi_terminal() {
            return Ok(());
        }
        let Some(stage_id) = item.stage.clone() else {
            return Ok(());
        };
        let auto_complete = self
            .runtime
            .item(&stage_id)
            .filter(|stage| stage.state == State::Active)
            .and_then(|stage| self.runtime.definition.item_by_id(&stage.definition_id))
            .map(|definition| match &definition.content {
                PlanItemContent::Stage(stage) => stage.auto_complete,
                _ => false,
            })
            .unwrap_or(false);
        if auto_complete && self.runtime.stage_can_complete(&stage_id) {
            self.push_transition(&stage_id, Transition::Complete)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/cascade_tests.rs"]
mod tests;
