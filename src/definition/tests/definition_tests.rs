//! Tests for definition loading, lookup, and validation.

use super::*;
use tempfile::TempDir;

const ORDER_CASE_YAML: &str = r#"
id: order_case
name: Order Fulfillment
plan:
  id: root
  name: Case Plan
  content:
    type: stage
    auto_complete: false
    items:
      - id: review
        name: Review Order
        content:
          type: human_task
          performer: approver
      - id: big_order
        name: Big Order
        entry_criteria:
          - id: enter
            on_parts:
              - source_type: case_file_item
                source: order
                transition: create
                condition:
                  gt:
                    - path: order/total
                    - literal: 100
        content:
          type: milestone
case_file:
  - name: order
    children:
      - name: lines
roles:
  - name: approver
"#;

fn task(id: &str, name: &str) -> ItemDefinition {
    ItemDefinition {
        id: DefinitionId::from(id),
        name: name.to_string(),
        control: ItemControl::default(),
        entry_criteria: Vec::new(),
        exit_criteria: Vec::new(),
        content: PlanItemContent::HumanTask { performer: None },
    }
}

fn stage_item(id: &str, name: &str, items: Vec<ItemDefinition>) -> ItemDefinition {
    ItemDefinition {
        content: PlanItemContent::Stage(StageDefinition {
            auto_complete: false,
            items,
        }),
        ..task(id, name)
    }
}

fn definition(items: Vec<ItemDefinition>) -> CaseDefinition {
    CaseDefinition {
        id: DefinitionId::from("case_def"),
        name: "Order Case".to_string(),
        plan: stage_item("root", "Case Plan", items),
        case_file: vec![CaseFileItemDefinition {
            name: "order".to_string(),
            children: vec![CaseFileItemDefinition {
                name: "lines".to_string(),
                children: Vec::new(),
            }],
        }],
        roles: vec![CaseRoleDefinition {
            name: CaseRoleName::from("approver"),
            description: None,
        }],
    }
}

#[test]
fn parses_the_yaml_definition_format() {
    let definition: CaseDefinition = serde_yaml::from_str(ORDER_CASE_YAML).unwrap();
    assert_eq!(definition.name, "Order Fulfillment");
    assert!(definition.validate().is_ok());

    let names: Vec<&str> = definition
        .all_items()
        .iter()
        .map(|item| item.name.as_str())
        .collect();
    assert_eq!(names, ["Case Plan", "Review Order", "Big Order"]);

    let review = definition.item_by_id(&DefinitionId::from("review")).unwrap();
    assert_eq!(review.kind(), PlanItemKind::Task);
    assert!(matches!(
        &review.content,
        PlanItemContent::HumanTask {
            performer: Some(role)
        } if role.as_str() == "approver"
    ));

    let big_order = definition.item_by_id(&DefinitionId::from("big_order")).unwrap();
    assert_eq!(big_order.kind(), PlanItemKind::Milestone);
    assert_eq!(big_order.entry_criteria.len(), 1);
    let criterion = &big_order.entry_criteria[0];
    assert!(matches!(
        &criterion.on_parts[0],
        OnPartDefinition::CaseFileItem {
            source,
            transition: CaseFileTransition::Create,
            condition: Some(Expression::Gt(_, _)),
        } if source.as_str() == "order"
    ));
}

#[test]
fn all_items_walks_the_plan_tree_root_first() {
    let definition = definition(vec![
        stage_item("stage_1", "Stage One", vec![task("task_x", "Task X")]),
        task("task_w", "Task W"),
    ]);
    let ids: Vec<&str> = definition
        .all_items()
        .iter()
        .map(|item| item.id.as_str())
        .collect();
    assert_eq!(ids, ["root", "stage_1", "task_x", "task_w"]);
}

#[test]
fn migration_target_prefers_id_then_falls_back_to_name() {
    let definition = definition(vec![task("task_a", "Task A")]);

    let by_id = definition.migration_target(&DefinitionId::from("task_a"), "Renamed");
    assert_eq!(by_id.unwrap().id.as_str(), "task_a");

    let by_name = definition.migration_target(&DefinitionId::from("old_id"), "Task A");
    assert_eq!(by_name.unwrap().id.as_str(), "task_a");

    assert!(definition
        .migration_target(&DefinitionId::from("old_id"), "Gone")
        .is_none());
}

#[test]
fn case_file_items_resolve_by_path() {
    let definition = definition(vec![task("task_a", "Task A")]);
    assert_eq!(
        definition.case_file_item(&CaseFilePath::from("order")).unwrap().name,
        "order"
    );
    assert_eq!(
        definition
            .case_file_item(&CaseFilePath::from("order/lines"))
            .unwrap()
            .name,
        "lines"
    );
    assert!(definition.case_file_item(&CaseFilePath::from("order/bogus")).is_none());
    assert!(definition.case_file_item(&CaseFilePath::from("shipment")).is_none());
}

#[test]
fn fingerprint_is_short_and_content_sensitive() {
    let one = definition(vec![task("task_a", "Task A")]);
    let same = definition(vec![task("task_a", "Task A")]);
    let other = definition(vec![task("task_a", "Task A renamed")]);

    assert_eq!(one.fingerprint().len(), 12);
    assert_eq!(one.fingerprint(), same.fingerprint());
    assert_ne!(one.fingerprint(), other.fingerprint());
}

#[test]
fn validate_rejects_a_non_stage_root() {
    let mut definition = definition(Vec::new());
    definition.plan = task("root", "Case Plan");
    let problems = definition.validate().unwrap_err();
    assert!(problems.contains("must be a stage"), "{problems}");
}

#[test]
fn validate_rejects_duplicate_plan_item_ids() {
    let definition = definition(vec![task("task_a", "Task A"), task("task_a", "Task A again")]);
    let problems = definition.validate().unwrap_err();
    assert!(problems.contains("duplicate plan item id 'task_a'"), "{problems}");
}

#[test]
fn validate_rejects_unknown_on_part_sources() {
    let mut waiting = task("task_b", "Task B");
    waiting.entry_criteria.push(CriterionDefinition {
        id: DefinitionId::from("enter"),
        on_parts: vec![
            OnPartDefinition::PlanItem {
                source: DefinitionId::from("ghost_item"),
                transition: Transition::Complete,
            },
            OnPartDefinition::CaseFileItem {
                source: CaseFilePath::from("ghost/path"),
                transition: CaseFileTransition::Create,
                condition: None,
            },
        ],
        if_part: None,
    });
    let definition = definition(vec![waiting]);

    let problems = definition.validate().unwrap_err();
    assert!(problems.contains("unknown plan item 'ghost_item'"), "{problems}");
    assert!(problems.contains("unknown case file item 'ghost/path'"), "{problems}");
    // Both findings come back in one pass.
    assert!(problems.contains("; "), "{problems}");
}

#[test]
fn validate_rejects_unknown_role_references() {
    let rogue_event = ItemDefinition {
        content: PlanItemContent::UserEvent {
            authorized_roles: vec![CaseRoleName::from("ghost_role")],
        },
        ..task("event_e", "Event E")
    };
    let rogue_task = ItemDefinition {
        content: PlanItemContent::HumanTask {
            performer: Some(CaseRoleName::from("ghost_role")),
        },
        ..task("task_p", "Task P")
    };
    let definition = definition(vec![rogue_event, rogue_task]);

    let problems = definition.validate().unwrap_err();
    assert!(
        problems.contains("user event 'Event E' references unknown role 'ghost_role'"),
        "{problems}"
    );
    assert!(
        problems.contains("human task 'Task P' references unknown role 'ghost_role'"),
        "{problems}"
    );
}

#[test]
fn load_case_definition_reads_and_validates_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("order_case.yaml");
    std::fs::write(&path, ORDER_CASE_YAML).unwrap();

    let definition = load_case_definition(&path).unwrap();
    assert_eq!(definition.name, "Order Fulfillment");
}

#[test]
fn load_case_definition_rejects_invalid_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    let broken = ORDER_CASE_YAML.replace("type: stage", "type: human_task");
    std::fs::write(&path, broken).unwrap();

    let error = load_case_definition(&path).unwrap_err();
    assert!(error.to_string().contains("Invalid definition"), "{error}");
}

#[test]
fn load_case_definition_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    let error = load_case_definition(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(error.to_string().contains("Failed to read"), "{error}");
}
