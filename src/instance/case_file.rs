//! Case file: the business data tree of a running case.
//!
//! Items are kept flattened by path. Each item has a lightweight lifecycle of
//! its own (`Null → Available → Discarded`) driven by case file transitions,
//! which feed the same sentry network as plan item transitions.

use crate::domain::types::CaseFilePath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Lifecycle transition of a case file item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFileTransition {
    Create,
    Update,
    Replace,
    Delete,
}

impl std::fmt::Display for CaseFileTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaseFileTransition::Create => "create",
            CaseFileTransition::Update => "update",
            CaseFileTransition::Replace => "replace",
            CaseFileTransition::Delete => "delete",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle state of a case file item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFileState {
    Null,
    Available,
    Discarded,
}

/// One node of the case file, identified by its path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFileItem {
    pub path: CaseFilePath,
    pub state: CaseFileState,
    pub value: Value,
    /// Last transition published for this item.
    pub last_transition: Option<CaseFileTransition>,
}

/// The case file tree, flattened by item path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CaseFile {
    items: BTreeMap<CaseFilePath, CaseFileItem>,
}

impl CaseFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&self, path: &CaseFilePath) -> Option<&CaseFileItem> {
        self.items.get(path)
    }

    /// Current value of an available item.
    pub fn value(&self, path: &CaseFilePath) -> Option<&Value> {
        self.items
            .get(path)
            .filter(|item| item.state == CaseFileState::Available)
            .map(|item| &item.value)
    }

    pub fn items(&self) -> impl Iterator<Item = &CaseFileItem> {
        self.items.values()
    }

    /// Checks whether `transition` is acceptable for the item at `path`.
    pub fn validate_transition(
        &self,
        path: &CaseFilePath,
        transition: CaseFileTransition,
    ) -> Result<(), String> {
        let state = self
            .items
            .get(path)
            .map(|item| item.state)
            .unwrap_or(CaseFileState::Null);
        let acceptable = match transition {
            CaseFileTransition::Create => state == CaseFileState::Null,
            CaseFileTransition::Update | CaseFileTransition::Replace | CaseFileTransition::Delete => {
                state == CaseFileState::Available
            }
        };
        if acceptable {
            Ok(())
        } else {
            Err(format!(
                "case file item '{path}' does not accept {transition} in state {state:?}"
            ))
        }
    }

    /// Applies an accepted transition to the item at `path`.
    ///
    /// Update merges object properties into the current value; Replace swaps
    /// the whole value; Delete discards the item and all its descendants.
    pub fn apply_transition(
        &mut self,
        path: &CaseFilePath,
        transition: CaseFileTransition,
        value: Value,
    ) {
        match transition {
            CaseFileTransition::Create => {
                self.items.insert(
                    path.clone(),
                    CaseFileItem {
                        path: path.clone(),
                        state: CaseFileState::Available,
                        value,
                        last_transition: Some(transition),
                    },
                );
            }
            CaseFileTransition::Update => {
                if let Some(item) = self.items.get_mut(path) {
                    merge_value(&mut item.value, value);
                    item.last_transition = Some(transition);
                }
            }
            CaseFileTransition::Replace => {
                if let Some(item) = self.items.get_mut(path) {
                    item.value = value;
                    item.last_transition = Some(transition);
                }
            }
            CaseFileTransition::Delete => {
                let prefix = format!("{}/", path.as_str());
                for (item_path, item) in self.items.iter_mut() {
                    if item_path == path || item_path.as_str().starts_with(&prefix) {
                        item.state = CaseFileState::Discarded;
                        item.value = Value::Null;
                        item.last_transition = Some(transition);
                    }
                }
            }
        }
    }

    /// Renders the available items as one nested JSON object, the context for
    /// expression evaluation.
    pub fn as_json(&self) -> Value {
        let mut root = Value::Object(Map::new());
        let mut available: Vec<&CaseFileItem> = self
            .items
            .values()
            .filter(|item| item.state == CaseFileState::Available)
            .collect();
        // Parents first so child items overlay fields of their parent value.
        available.sort_by_key(|item| item.path.segments().count());
        for item in available {
            insert_at(&mut root, &item.path, item.value.clone());
        }
        root
    }
}

fn merge_value(current: &mut Value, update: Value) {
    match (current, update) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (current, update) => *current = update,
    }
}

fn insert_at(root: &mut Value, path: &CaseFilePath, value: Value) {
    let segments: Vec<&str> = path.segments().collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(map) = current.as_object_mut() {
        map.insert((*last).to_string(), value);
    }
}

#[cfg(test)]
#[path = "tests/case_file_tests.rs"]
mod tests;
