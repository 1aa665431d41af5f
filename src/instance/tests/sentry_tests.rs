//! Tests for criterion arming, satisfaction, firing, and migration.

use super::*;
use serde_json::json;

fn plan_on_part(source: &str, transition: Transition) -> OnPartDefinition {
    OnPartDefinition::PlanItem {
        source: DefinitionId::from(source),
        transition,
    }
}

fn file_on_part(
    source: &str,
    transition: CaseFileTransition,
    condition: Option<Expression>,
) -> OnPartDefinition {
    OnPartDefinition::CaseFileItem {
        source: CaseFilePath::from(source),
        transition,
        condition,
    }
}

fn criterion_definition(
    id: &str,
    on_parts: Vec<OnPartDefinition>,
    if_part: Option<Expression>,
) -> CriterionDefinition {
    CriterionDefinition {
        id: DefinitionId::from(id),
        on_parts,
        if_part,
    }
}

/// Arms a criterion for `owner` and returns its id.
fn connect(
    network: &mut SentryNetwork,
    owner: &str,
    kind: CriterionKind,
    definition: &CriterionDefinition,
) -> CriterionId {
    let owner = PlanItemId::from(owner);
    let criterion = Criterion::from_definition(&owner, kind, definition);
    let id = criterion.id.clone();
    network.connect(criterion);
    id
}

fn task_transition(source: &str, transition: Transition) -> ObservedTransition {
    ObservedTransition::PlanItem {
        source: DefinitionId::from(source),
        transition,
    }
}

fn file_transition(source: &str, transition: CaseFileTransition) -> ObservedTransition {
    ObservedTransition::CaseFileItem {
        source: CaseFilePath::from(source),
        transition,
    }
}

fn total_above(limit: i64) -> Expression {
    Expression::Gt(
        Box::new(Expression::Path("order/total".to_string())),
        Box::new(Expression::Literal(json!(limit))),
    )
}

#[test]
fn criterion_fires_once_and_is_released() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![plan_on_part("task_a", Transition::Complete)],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);
    assert!(network
        .subscriptions()
        .get("plan:task_a")
        .is_some_and(|subscribed| subscribed.contains(&id)));

    let fired = network
        .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
        .unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].criterion, id);
    assert_eq!(fired[0].owner.as_str(), "item-1");
    assert_eq!(fired[0].kind, CriterionKind::Entry);

    // Released on fire: gone from the registry and the subscription table.
    assert!(network.criterion(&id).is_none());
    assert!(!network.subscriptions().contains_key("plan:task_a"));
    let again = network
        .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
        .unwrap();
    assert!(again.is_empty());
}

#[test]
fn all_on_parts_must_be_satisfied_before_firing() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![
            plan_on_part("task_a", Transition::Complete),
            file_on_part("order", CaseFileTransition::Create, None),
        ],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);

    let fired = network
        .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
        .unwrap();
    assert!(fired.is_empty());
    let armed = network.criterion(&id).unwrap();
    assert!(armed.on_parts[0].satisfied);
    assert!(!armed.on_parts[1].satisfied);

    let fired = network
        .deliver(&file_transition("order", CaseFileTransition::Create), &Value::Null)
        .unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].criterion, id);
}

#[test]
fn repeated_transition_makes_no_extra_progress() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![
            plan_on_part("task_a", Transition::Complete),
            plan_on_part("task_b", Transition::Complete),
        ],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);

    for _ in 0..2 {
        let fired = network
            .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
            .unwrap();
        assert!(fired.is_empty());
    }
    assert!(network.criterion(&id).is_some());

    let fired = network
        .deliver(&task_transition("task_b", Transition::Complete), &Value::Null)
        .unwrap();
    assert_eq!(fired.len(), 1);
}

#[test]
fn on_part_condition_gates_satisfaction() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![file_on_part(
            "order",
            CaseFileTransition::Create,
            Some(total_above(100)),
        )],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);

    // Condition false at delivery time: the occurrence passes by unsatisfied.
    let fired = network
        .deliver(
            &file_transition("order", CaseFileTransition::Create),
            &json!({"order": {"total": 50}}),
        )
        .unwrap();
    assert!(fired.is_empty());
    assert!(!network.criterion(&id).unwrap().on_parts[0].satisfied);

    let fired = network
        .deliver(
            &file_transition("order", CaseFileTransition::Create),
            &json!({"order": {"total": 150}}),
        )
        .unwrap();
    assert_eq!(fired.len(), 1);
}

#[test]
fn false_if_part_leaves_the_criterion_armed() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![plan_on_part("task_a", Transition::Complete)],
        Some(total_above(100)),
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);

    let fired = network
        .deliver(
            &task_transition("task_a", Transition::Complete),
            &json!({"order": {"total": 50}}),
        )
        .unwrap();
    assert!(fired.is_empty());
    let armed = network.criterion(&id).unwrap();
    assert!(armed.on_parts[0].satisfied);

    // A later delivery from a subscribed source re-checks the if-part.
    let fired = network
        .deliver(
            &task_transition("task_a", Transition::Complete),
            &json!({"order": {"total": 150}}),
        )
        .unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].criterion, id);
}

#[test]
fn unrelated_source_and_transition_are_ignored() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![plan_on_part("task_a", Transition::Complete)],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);

    let fired = network
        .deliver(&task_transition("task_z", Transition::Complete), &Value::Null)
        .unwrap();
    assert!(fired.is_empty());

    // Same source, different transition.
    let fired = network
        .deliver(&task_transition("task_a", Transition::Start), &Value::Null)
        .unwrap();
    assert!(fired.is_empty());
    assert!(!network.criterion(&id).unwrap().on_parts[0].satisfied);
}

#[test]
fn release_criteria_of_filters_by_kind() {
    let mut network = SentryNetwork::new();
    let entry = criterion_definition(
        "enter",
        vec![plan_on_part("task_a", Transition::Complete)],
        None,
    );
    let exit = criterion_definition(
        "leave",
        vec![plan_on_part("task_b", Transition::Complete)],
        None,
    );
    let entry_id = connect(&mut network, "item-1", CriterionKind::Entry, &entry);
    let exit_id = connect(&mut network, "item-1", CriterionKind::Exit, &exit);
    let owner = PlanItemId::from("item-1");

    network.release_criteria_of(&owner, Some(CriterionKind::Entry));
    assert!(network.criterion(&entry_id).is_none());
    assert!(network.criterion(&exit_id).is_some());

    network.release_criteria_of(&owner, None);
    assert_eq!(network.criteria_of(&owner).count(), 0);
    assert!(network.subscriptions().is_empty());
}

#[test]
fn fired_criteria_come_in_criterion_id_order() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![plan_on_part("task_a", Transition::Complete)],
        None,
    );
    // Connected in reverse order; delivery still reports in id order.
    connect(&mut network, "item-b", CriterionKind::Entry, &definition);
    connect(&mut network, "item-a", CriterionKind::Entry, &definition);

    let fired = network
        .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
        .unwrap();
    assert_eq!(fired.len(), 2);
    assert_eq!(fired[0].owner.as_str(), "item-a");
    assert_eq!(fired[1].owner.as_str(), "item-b");
}

#[test]
fn condition_over_non_numeric_data_is_an_error() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![file_on_part(
            "order",
            CaseFileTransition::Create,
            Some(total_above(100)),
        )],
        None,
    );
    connect(&mut network, "item-1", CriterionKind::Entry, &definition);

    let result = network.deliver(
        &file_transition("order", CaseFileTransition::Create),
        &json!({"order": {"total": "plenty"}}),
    );
    assert!(result.is_err());
}

#[test]
fn migration_carries_satisfaction_for_unchanged_triggers() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![
            plan_on_part("task_a", Transition::Complete),
            plan_on_part("task_b", Transition::Complete),
        ],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);
    let owner = PlanItemId::from("item-1");

    network
        .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
        .unwrap();
    network.migrate_criteria_of(&owner, &[&definition]);

    let armed = network.criterion(&id).unwrap();
    assert!(armed.on_parts[0].satisfied);
    assert!(!armed.on_parts[1].satisfied);

    let fired = network
        .deliver(&task_transition("task_b", Transition::Complete), &Value::Null)
        .unwrap();
    assert_eq!(fired.len(), 1);
}

#[test]
fn migration_resubscribes_changed_triggers() {
    let mut network = SentryNetwork::new();
    let old = criterion_definition(
        "enter",
        vec![
            plan_on_part("task_a", Transition::Complete),
            plan_on_part("task_b", Transition::Complete),
        ],
        None,
    );
    let new = criterion_definition(
        "enter",
        vec![
            plan_on_part("task_c", Transition::Complete),
            plan_on_part("task_b", Transition::Complete),
        ],
        None,
    );
    connect(&mut network, "item-1", CriterionKind::Entry, &old);
    let owner = PlanItemId::from("item-1");

    network
        .deliver(&task_transition("task_a", Transition::Complete), &Value::Null)
        .unwrap();
    network.migrate_criteria_of(&owner, &[&new]);

    assert!(!network.subscriptions().contains_key("plan:task_a"));
    assert!(network.subscriptions().contains_key("plan:task_c"));

    // The old satisfaction of task_a does not count toward the new trigger.
    let fired = network
        .deliver(&task_transition("task_c", Transition::Complete), &Value::Null)
        .unwrap();
    assert!(fired.is_empty());
    let fired = network
        .deliver(&task_transition("task_b", Transition::Complete), &Value::Null)
        .unwrap();
    assert_eq!(fired.len(), 1);
}

#[test]
fn migration_releases_criteria_without_a_matching_definition() {
    let mut network = SentryNetwork::new();
    let definition = criterion_definition(
        "enter",
        vec![plan_on_part("task_a", Transition::Complete)],
        None,
    );
    let id = connect(&mut network, "item-1", CriterionKind::Entry, &definition);
    let owner = PlanItemId::from("item-1");

    network.migrate_criteria_of(&owner, &[]);
    assert!(network.criterion(&id).is_none());
    assert_eq!(network.criteria_of(&owner).count(), 0);
    assert!(network.subscriptions().is_empty());
}
