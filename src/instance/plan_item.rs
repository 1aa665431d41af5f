//! Plan item lifecycle: states, transitions, and the per-kind state machines.
//!
//! A plan item never has its state assigned directly; every change goes
//! through a [`Transition`] checked against the state machine for the item's
//! kind. Stages and tasks share one machine; milestones and event listeners
//! run reduced machines that only await their Occur.

use crate::domain::types::{DefinitionId, PlanItemId, RepetitionIndex};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a plan item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Exists but not yet created into the case.
    Null,
    Available,
    Enabled,
    Disabled,
    Active,
    Suspended,
    Failed,
    Completed,
    Terminated,
    /// Removed by a definition migration.
    Discarded,
}

impl State {
    /// Terminal states accept no further lifecycle work.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::Completed | State::Terminated | State::Failed | State::Discarded
        )
    }

    /// States that no longer block their parent stage from completing.
    pub fn is_semi_terminal(&self) -> bool {
        self.is_terminal() || matches!(self, State::Disabled)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Null => "null",
            State::Available => "available",
            State::Enabled => "enabled",
            State::Disabled => "disabled",
            State::Active => "active",
            State::Suspended => "suspended",
            State::Failed => "failed",
            State::Completed => "completed",
            State::Terminated => "terminated",
            State::Discarded => "discarded",
        };
        write!(f, "{name}")
    }
}

/// A named request to move a plan item between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Create,
    Enable,
    Disable,
    Reenable,
    Start,
    Suspend,
    Resume,
    ParentSuspend,
    ParentResume,
    Complete,
    Terminate,
    Exit,
    Fault,
    Reactivate,
    Occur,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transition::Create => "create",
            Transition::Enable => "enable",
            Transition::Disable => "disable",
            Transition::Reenable => "reenable",
            Transition::Start => "start",
            Transition::Suspend => "suspend",
            Transition::Resume => "resume",
            Transition::ParentSuspend => "parent_suspend",
            Transition::ParentResume => "parent_resume",
            Transition::Complete => "complete",
            Transition::Terminate => "terminate",
            Transition::Exit => "exit",
            Transition::Fault => "fault",
            Transition::Reactivate => "reactivate",
            Transition::Occur => "occur",
        };
        write!(f, "{name}")
    }
}

/// State machine family a plan item runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemKind {
    Task,
    Stage,
    Milestone,
    EventListener,
}

impl PlanItemKind {
    /// The transition an entry criterion (or an empty entry set) triggers.
    pub fn entry_transition(&self, manual_activation: bool) -> Transition {
        match self {
            PlanItemKind::Task | PlanItemKind::Stage => {
                if manual_activation {
                    Transition::Enable
                } else {
                    Transition::Start
                }
            }
            PlanItemKind::Milestone | PlanItemKind::EventListener => Transition::Occur,
        }
    }
}

impl std::fmt::Display for PlanItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlanItemKind::Task => "task",
            PlanItemKind::Stage => "stage",
            PlanItemKind::Milestone => "milestone",
            PlanItemKind::EventListener => "event_listener",
        };
        write!(f, "{name}")
    }
}

/// Where an accepted transition lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    State(State),
    /// Return to the state recorded before suspension.
    History,
}

/// The transition table: `(kind, state, transition) -> target`, `None` when
/// the transition is not acceptable from that state.
fn target(kind: PlanItemKind, state: State, transition: Transition) -> Option<Target> {
    use State as S;
    use Target as T;
    use Transition as Tr;
    match kind {
        PlanItemKind::Task | PlanItemKind::Stage => match (state, transition) {
            (S::Null, Tr::Create) => Some(T::State(S::Available)),
            (S::Available, Tr::Start) => Some(T::State(S::Active)),
            (S::Available, Tr::Enable) => Some(T::State(S::Enabled)),
            (S::Available | S::Enabled | S::Active, Tr::ParentSuspend) => {
                Some(T::State(S::Suspended))
            }
            (S::Enabled, Tr::Start) => Some(T::State(S::Active)),
            (S::Enabled, Tr::Disable) => Some(T::State(S::Disabled)),
            (S::Disabled, Tr::Reenable) => Some(T::State(S::Enabled)),
            (S::Active, Tr::Suspend) => Some(T::State(S::Suspended)),
            (S::Active, Tr::Complete) => Some(T::State(S::Completed)),
            (S::Active, Tr::Terminate) => Some(T::State(S::Terminated)),
            (S::Active, Tr::Fault) => Some(T::State(S::Failed)),
            (S::Suspended, Tr::Resume | Tr::ParentResume) => Some(T::History),
            (S::Failed, Tr::Reactivate) => Some(T::State(S::Active)),
            (
                S::Available | S::Enabled | S::Disabled | S::Active | S::Suspended | S::Failed,
                Tr::Exit,
            ) => Some(T::State(S::Terminated)),
            _ => None,
        },
        PlanItemKind::Milestone => match (state, transition) {
            (S::Null, Tr::Create) => Some(T::State(S::Available)),
            (S::Available, Tr::Occur) => Some(T::State(S::Completed)),
            (S::Available, Tr::ParentSuspend) => Some(T::State(S::Suspended)),
            (S::Suspended, Tr::ParentResume) => Some(T::State(S::Available)),
            (S::Available | S::Suspended, Tr::Exit) => Some(T::State(S::Terminated)),
            _ => None,
        },
        PlanItemKind::EventListener => match (state, transition) {
            (S::Null, Tr::Create) => Some(T::State(S::Available)),
            (S::Available, Tr::Occur) => Some(T::State(S::Completed)),
            (S::Available, Tr::Suspend | Tr::ParentSuspend) => Some(T::State(S::Suspended)),
            (S::Suspended, Tr::Resume | Tr::ParentResume) => Some(T::State(S::Available)),
            (S::Available | S::Suspended, Tr::Exit) => Some(T::State(S::Terminated)),
            _ => None,
        },
    }
}

/// Runtime record of one activated plan item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: PlanItemId,
    pub definition_id: DefinitionId,
    pub name: String,
    pub kind: PlanItemKind,
    pub index: RepetitionIndex,
    /// Parent stage instance; `None` only for the case plan root.
    pub stage: Option<PlanItemId>,
    pub state: State,
    /// State before the current one; Resume returns here after a suspension.
    pub history_state: State,
    pub last_transition: Option<Transition>,
    /// Recorded outcome of the repetition rule for this instance.
    pub repeating: bool,
    /// Recorded outcome of the required rule for this instance.
    pub required: bool,
}

impl PlanItem {
    pub fn new(
        id: PlanItemId,
        definition_id: DefinitionId,
        name: String,
        kind: PlanItemKind,
        index: RepetitionIndex,
        stage: Option<PlanItemId>,
    ) -> Self {
        Self {
            id,
            definition_id,
            name,
            kind,
            index,
            stage,
            state: State::Null,
            history_state: State::Null,
            last_transition: None,
            repeating: false,
            required: false,
        }
    }

    /// Resolves the state this item would reach by taking `transition`,
    /// or `None` when the transition is not acceptable right now.
    pub fn acceptable_target(&self, transition: Transition) -> Option<State> {
        match target(self.kind, self.state, transition)? {
            Target::State(state) => Some(state),
            Target::History => Some(self.history_state),
        }
    }

    pub fn is_stage(&self) -> bool {
        self.kind == PlanItemKind::Stage
    }
}

#[cfg(test)]
#[path = "tests/plan_item_tests.rs"]
mod tests;
