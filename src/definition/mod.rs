//! Typed, immutable case definition tree.
//!
//! The engine consumes definitions read-only: a case plan (a tree of stages,
//! tasks, milestones and event listeners wired together by entry/exit
//! criteria), a case file structure, and the case roles. Definitions are plain
//! serde data; the YAML form loaded here is a direct serialization of these
//! types, not an authoring format.

pub mod expression;

use crate::domain::types::{CaseFilePath, CaseRoleName, DefinitionId};
use crate::instance::case_file::CaseFileTransition;
use crate::instance::plan_item::{PlanItemKind, Transition};
use anyhow::{Context, Result};
use expression::Expression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A complete case definition: plan, case file structure, and roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDefinition {
    pub id: DefinitionId,
    pub name: String,
    /// The root plan item; its content must be a stage (the case plan).
    pub plan: ItemDefinition,
    /// Root items of the case file structure.
    #[serde(default)]
    pub case_file: Vec<CaseFileItemDefinition>,
    #[serde(default)]
    pub roles: Vec<CaseRoleDefinition>,
}

/// Definition of one plan item inside a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: DefinitionId,
    pub name: String,
    #[serde(default)]
    pub control: ItemControl,
    #[serde(default)]
    pub entry_criteria: Vec<CriterionDefinition>,
    #[serde(default)]
    pub exit_criteria: Vec<CriterionDefinition>,
    pub content: PlanItemContent,
}

impl ItemDefinition {
    /// The state machine family this item runs under.
    pub fn kind(&self) -> PlanItemKind {
        self.content.kind()
    }

    /// Child item definitions when this item is a stage.
    pub fn children(&self) -> &[ItemDefinition] {
        match &self.content {
            PlanItemContent::Stage(stage) => &stage.items,
            _ => &[],
        }
    }
}

/// What a plan item is: the task kinds are opaque to the engine, stages carry
/// children, milestones and event listeners only await their Occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanItemContent {
    HumanTask {
        #[serde(default)]
        performer: Option<CaseRoleName>,
    },
    ProcessTask,
    CaseTask,
    Stage(StageDefinition),
    Milestone,
    TimerEvent,
    UserEvent {
        /// Roles allowed to make the event occur; empty means anyone.
        #[serde(default)]
        authorized_roles: Vec<CaseRoleName>,
    },
}

impl PlanItemContent {
    pub fn kind(&self) -> PlanItemKind {
        match self {
            PlanItemContent::HumanTask { .. }
            | PlanItemContent::ProcessTask
            | PlanItemContent::CaseTask => PlanItemKind::Task,
            PlanItemContent::Stage(_) => PlanItemKind::Stage,
            PlanItemContent::Milestone => PlanItemKind::Milestone,
            PlanItemContent::TimerEvent | PlanItemContent::UserEvent { .. } => {
                PlanItemKind::EventListener
            }
        }
    }
}

/// Stage content: child items plus the auto-completion switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// When true the stage completes itself as soon as no child blocks it.
    #[serde(default)]
    pub auto_complete: bool,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
}

/// Item control rules; each is an optional boolean expression over case data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ItemControl {
    /// When true at the evaluation moment, a next repetition instance is made.
    #[serde(default)]
    pub repetition: Option<Expression>,
    /// When true, the parent stage cannot complete while this item is pending.
    #[serde(default)]
    pub required: Option<Expression>,
    /// When true the item waits in Enabled for a manual Start.
    #[serde(default)]
    pub manual_activation: Option<Expression>,
}

/// An entry or exit criterion: on-parts plus an optional criterion-level
/// if-part checked once all on-parts are satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub id: DefinitionId,
    #[serde(default)]
    pub on_parts: Vec<OnPartDefinition>,
    #[serde(default)]
    pub if_part: Option<Expression>,
}

/// One dependency of a criterion: a source and the transition to observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum OnPartDefinition {
    PlanItem {
        /// Definition id of the source plan item.
        source: DefinitionId,
        transition: Transition,
    },
    CaseFileItem {
        /// Case file path of the source item.
        source: CaseFilePath,
        transition: CaseFileTransition,
        /// Extra condition on current case data, checked at satisfaction time.
        #[serde(default)]
        condition: Option<Expression>,
    },
}

/// A node of the case file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFileItemDefinition {
    pub name: String,
    #[serde(default)]
    pub children: Vec<CaseFileItemDefinition>,
}

/// A role participants can hold within the case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRoleDefinition {
    pub name: CaseRoleName,
    #[serde(default)]
    pub description: Option<String>,
}

impl CaseDefinition {
    /// All plan item definitions in the plan tree, root first, definition order.
    pub fn all_items(&self) -> Vec<&ItemDefinition> {
        let mut items = Vec::new();
        collect_items(&self.plan, &mut items);
        items
    }

    /// Looks up a plan item definition by id anywhere in the plan tree.
    pub fn item_by_id(&self, id: &DefinitionId) -> Option<&ItemDefinition> {
        self.all_items().into_iter().find(|item| &item.id == id)
    }

    /// Looks up a plan item definition by name anywhere in the plan tree.
    pub fn item_by_name(&self, name: &str) -> Option<&ItemDefinition> {
        self.all_items().into_iter().find(|item| item.name == name)
    }

    /// The migration target for an old item: same id, falling back to name.
    pub fn migration_target(&self, id: &DefinitionId, name: &str) -> Option<&ItemDefinition> {
        self.item_by_id(id).or_else(|| self.item_by_name(name))
    }

    /// Resolves a case file item definition by path.
    pub fn case_file_item(&self, path: &CaseFilePath) -> Option<&CaseFileItemDefinition> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut current = self.case_file.iter().find(|item| item.name == first)?;
        for segment in segments {
            current = current.children.iter().find(|item| item.name == segment)?;
        }
        Some(current)
    }

    /// Resolves a role by name.
    pub fn role(&self, name: &CaseRoleName) -> Option<&CaseRoleDefinition> {
        self.roles.iter().find(|role| &role.name == name)
    }

    /// Short content hash of the definition, for display and directory names.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Serialization of plain data types cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        hasher.update(json.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        hash.get(0..12).unwrap_or(&hash).to_string()
    }

    /// Structural validation: the root is a stage, ids are unique, every
    /// on-part source and referenced role resolves.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut problems = Vec::new();
        if !matches!(self.plan.content, PlanItemContent::Stage(_)) {
            problems.push(format!("root plan item '{}' must be a stage", self.plan.name));
        }
        let items = self.all_items();
        for (idx, item) in items.iter().enumerate() {
            if items
                .iter()
                .skip(idx + 1)
                .any(|other| other.id == item.id)
            {
                problems.push(format!("duplicate plan item id '{}'", item.id));
            }
            for criterion in item.entry_criteria.iter().chain(&item.exit_criteria) {
                for on_part in &criterion.on_parts {
                    match on_part {
                        OnPartDefinition::PlanItem { source, .. } => {
                            if !items.iter().any(|candidate| &candidate.id == source) {
                                problems.push(format!(
                                    "criterion '{}' references unknown plan item '{source}'",
                                    criterion.id
                                ));
                            }
                        }
                        OnPartDefinition::CaseFileItem { source, .. } => {
                            if self.case_file_item(source).is_none() {
                                problems.push(format!(
                                    "criterion '{}' references unknown case file item '{source}'",
                                    criterion.id
                                ));
                            }
                        }
                    }
                }
            }
            if let PlanItemContent::UserEvent { authorized_roles } = &item.content {
                for role in authorized_roles {
                    if self.role(role).is_none() {
                        problems.push(format!(
                            "user event '{}' references unknown role '{role}'",
                            item.name
                        ));
                    }
                }
            }
            if let PlanItemContent::HumanTask {
                performer: Some(role),
            } = &item.content
            {
                if self.role(role).is_none() {
                    problems.push(format!(
                        "human task '{}' references unknown role '{role}'",
                        item.name
                    ));
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

fn collect_items<'a>(item: &'a ItemDefinition, out: &mut Vec<&'a ItemDefinition>) {
    out.push(item);
    for child in item.children() {
        collect_items(child, out);
    }
}

/// Loads and validates a case definition from a YAML file.
pub fn load_case_definition(path: &Path) -> Result<CaseDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file: {}", path.display()))?;
    let definition: CaseDefinition = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse definition file: {}", path.display()))?;
    definition
        .validate()
        .map_err(|problems| anyhow::anyhow!("Invalid definition: {problems}"))?;
    Ok(definition)
}

#[cfg(test)]
#[path = "tests/definition_tests.rs"]
mod tests;
