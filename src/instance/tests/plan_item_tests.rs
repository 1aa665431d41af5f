//! Tests for the per-kind plan item state machines.

use super::*;
use crate::domain::types::{DefinitionId, PlanItemId, RepetitionIndex};
use proptest::prelude::*;

/// A plan item of the given kind, forced into `state`.
fn item(kind: PlanItemKind, state: State) -> PlanItem {
    let mut item = PlanItem::new(
        PlanItemId::from("item-1"),
        DefinitionId::from("def-1"),
        "Item".to_string(),
        kind,
        RepetitionIndex::first(),
        None,
    );
    item.state = state;
    item
}

const ALL_TRANSITIONS: [Transition; 15] = [
    Transition::Create,
    Transition::Enable,
    Transition::Disable,
    Transition::Reenable,
    Transition::Start,
    Transition::Suspend,
    Transition::Resume,
    Transition::ParentSuspend,
    Transition::ParentResume,
    Transition::Complete,
    Transition::Terminate,
    Transition::Exit,
    Transition::Fault,
    Transition::Reactivate,
    Transition::Occur,
];

const ALL_STATES: [State; 10] = [
    State::Null,
    State::Available,
    State::Enabled,
    State::Disabled,
    State::Active,
    State::Suspended,
    State::Failed,
    State::Completed,
    State::Terminated,
    State::Discarded,
];

const ALL_KINDS: [PlanItemKind; 4] = [
    PlanItemKind::Task,
    PlanItemKind::Stage,
    PlanItemKind::Milestone,
    PlanItemKind::EventListener,
];

fn arb_kind() -> impl Strategy<Value = PlanItemKind> {
    (0..ALL_KINDS.len()).prop_map(|i| ALL_KINDS[i])
}

fn arb_state() -> impl Strategy<Value = State> {
    (0..ALL_STATES.len()).prop_map(|i| ALL_STATES[i])
}

fn arb_transition() -> impl Strategy<Value = Transition> {
    (0..ALL_TRANSITIONS.len()).prop_map(|i| ALL_TRANSITIONS[i])
}

#[test]
fn new_item_starts_in_null() {
    let item = PlanItem::new(
        PlanItemId::from("item-1"),
        DefinitionId::from("def-1"),
        "Item".to_string(),
        PlanItemKind::Task,
        RepetitionIndex::first(),
        None,
    );
    assert_eq!(item.state, State::Null);
    assert_eq!(item.history_state, State::Null);
    assert_eq!(item.last_transition, None);
    assert!(!item.repeating);
    assert!(!item.required);
}

#[test]
fn create_is_the_only_transition_from_null() {
    let item = item(PlanItemKind::Task, State::Null);
    assert_eq!(item.acceptable_target(Transition::Create), Some(State::Available));
    for transition in ALL_TRANSITIONS {
        if transition != Transition::Create {
            assert_eq!(item.acceptable_target(transition), None, "{transition}");
        }
    }
}

#[test]
fn task_automatic_path_runs_available_to_completed() {
    assert_eq!(
        item(PlanItemKind::Task, State::Available).acceptable_target(Transition::Start),
        Some(State::Active)
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Active).acceptable_target(Transition::Complete),
        Some(State::Completed)
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Active).acceptable_target(Transition::Terminate),
        Some(State::Terminated)
    );
}

#[test]
fn task_manual_path_passes_through_enabled() {
    assert_eq!(
        item(PlanItemKind::Task, State::Available).acceptable_target(Transition::Enable),
        Some(State::Enabled)
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Enabled).acceptable_target(Transition::Start),
        Some(State::Active)
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Enabled).acceptable_target(Transition::Disable),
        Some(State::Disabled)
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Disabled).acceptable_target(Transition::Reenable),
        Some(State::Enabled)
    );
}

#[test]
fn resume_returns_to_the_recorded_history_state() {
    let mut suspended = item(PlanItemKind::Task, State::Suspended);
    suspended.history_state = State::Active;
    assert_eq!(suspended.acceptable_target(Transition::Resume), Some(State::Active));
    assert_eq!(
        suspended.acceptable_target(Transition::ParentResume),
        Some(State::Active)
    );

    suspended.history_state = State::Enabled;
    assert_eq!(suspended.acceptable_target(Transition::Resume), Some(State::Enabled));
}

#[test]
fn parent_suspend_covers_available_enabled_and_active() {
    for state in [State::Available, State::Enabled, State::Active] {
        assert_eq!(
            item(PlanItemKind::Task, state).acceptable_target(Transition::ParentSuspend),
            Some(State::Suspended),
            "{state}"
        );
    }
    assert_eq!(
        item(PlanItemKind::Task, State::Disabled).acceptable_target(Transition::ParentSuspend),
        None
    );
}

#[test]
fn exit_terminates_every_non_terminal_task_state() {
    for state in [
        State::Available,
        State::Enabled,
        State::Disabled,
        State::Active,
        State::Suspended,
        State::Failed,
    ] {
        assert_eq!(
            item(PlanItemKind::Task, state).acceptable_target(Transition::Exit),
            Some(State::Terminated),
            "{state}"
        );
    }
    assert_eq!(
        item(PlanItemKind::Task, State::Completed).acceptable_target(Transition::Exit),
        None
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Terminated).acceptable_target(Transition::Exit),
        None
    );
}

#[test]
fn terminal_states_accept_no_transition() {
    for state in [State::Completed, State::Terminated, State::Discarded] {
        for transition in ALL_TRANSITIONS {
            assert_eq!(
                item(PlanItemKind::Task, state).acceptable_target(transition),
                None,
                "{state} {transition}"
            );
        }
    }
}

#[test]
fn fault_and_reactivate_round_trip() {
    assert_eq!(
        item(PlanItemKind::Task, State::Active).acceptable_target(Transition::Fault),
        Some(State::Failed)
    );
    assert_eq!(
        item(PlanItemKind::Task, State::Failed).acceptable_target(Transition::Reactivate),
        Some(State::Active)
    );
}

#[test]
fn milestone_waits_for_occur() {
    let available = item(PlanItemKind::Milestone, State::Available);
    assert_eq!(available.acceptable_target(Transition::Occur), Some(State::Completed));
    assert_eq!(available.acceptable_target(Transition::Start), None);
    // Only the parent may suspend a milestone.
    assert_eq!(available.acceptable_target(Transition::Suspend), None);
    assert_eq!(
        available.acceptable_target(Transition::ParentSuspend),
        Some(State::Suspended)
    );
    assert_eq!(
        item(PlanItemKind::Milestone, State::Suspended).acceptable_target(Transition::ParentResume),
        Some(State::Available)
    );
    assert_eq!(available.acceptable_target(Transition::Exit), Some(State::Terminated));
}

#[test]
fn event_listener_accepts_user_suspend() {
    let available = item(PlanItemKind::EventListener, State::Available);
    assert_eq!(available.acceptable_target(Transition::Occur), Some(State::Completed));
    assert_eq!(available.acceptable_target(Transition::Suspend), Some(State::Suspended));
    assert_eq!(
        item(PlanItemKind::EventListener, State::Suspended).acceptable_target(Transition::Resume),
        Some(State::Available)
    );
}

#[test]
fn semi_terminal_includes_disabled_but_terminal_does_not() {
    assert!(State::Disabled.is_semi_terminal());
    assert!(!State::Disabled.is_terminal());
    for state in [State::Completed, State::Terminated, State::Failed, State::Discarded] {
        assert!(state.is_terminal(), "{state}");
        assert!(state.is_semi_terminal(), "{state}");
    }
    assert!(!State::Active.is_semi_terminal());
    assert!(!State::Available.is_semi_terminal());
}

#[test]
fn entry_transition_depends_on_kind_and_manual_activation() {
    assert_eq!(PlanItemKind::Task.entry_transition(false), Transition::Start);
    assert_eq!(PlanItemKind::Task.entry_transition(true), Transition::Enable);
    assert_eq!(PlanItemKind::Stage.entry_transition(false), Transition::Start);
    assert_eq!(PlanItemKind::Stage.entry_transition(true), Transition::Enable);
    assert_eq!(PlanItemKind::Milestone.entry_transition(false), Transition::Occur);
    assert_eq!(PlanItemKind::Milestone.entry_transition(true), Transition::Occur);
    assert_eq!(PlanItemKind::EventListener.entry_transition(false), Transition::Occur);
}

proptest! {
    /// From Null, Create is accepted and lands in Available; every other
    /// transition is rejected, under every machine.
    #[test]
    fn null_accepts_exactly_create_for_every_kind(
        kind in arb_kind(),
        transition in arb_transition(),
    ) {
        let expected = if transition == Transition::Create {
            Some(State::Available)
        } else {
            None
        };
        prop_assert_eq!(item(kind, State::Null).acceptable_target(transition), expected);
    }

    /// Completed, Terminated, and Discarded are sinks under every machine.
    #[test]
    fn sink_states_accept_nothing(kind in arb_kind(), transition in arb_transition()) {
        for state in [State::Completed, State::Terminated, State::Discarded] {
            prop_assert_eq!(
                item(kind, state).acceptable_target(transition),
                None,
                "{} {}",
                state,
                transition
            );
        }
    }

    /// No accepted transition lands back in Null, and Discarded is reachable
    /// only through a migration drop, never through the tables.
    #[test]
    fn accepted_transitions_never_reenter_null_or_discarded(
        kind in arb_kind(),
        state in arb_state(),
        transition in arb_transition(),
    ) {
        let mut subject = item(kind, state);
        // A suspended item's history is always the pre-suspension state.
        subject.history_state = State::Active;
        if let Some(target) = subject.acceptable_target(transition) {
            prop_assert_ne!(target, State::Null);
            prop_assert_ne!(target, State::Discarded);
        }
    }
}
