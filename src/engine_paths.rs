//! Centralized home-based storage paths for all case-engine persistence.
//!
//! This module provides helpers for unified storage under `~/.case-engine/`:
//! - `cases/<case-id>/events.jsonl` - Event log of one case
//! - `cases/<case-id>/snapshot.json` - Aggregate snapshot of one case
//! - `cases/<case-id>/case_info.json` - Lightweight metadata for listing
//! - `cases/<case-id>/trace.jsonl` - Structured command/outcome trace
//! - `definitions/` - Case definition files (YAML)
//! - `config.yaml` - Engine configuration

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// The name of the case engine directory.
const CASE_ENGINE_DIR: &str = ".case-engine";

/// Returns the home-based case engine directory: `~/.case-engine/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn case_engine_home_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory for case storage")?;
    let engine_dir = home.join(CASE_ENGINE_DIR);
    fs::create_dir_all(&engine_dir).with_context(|| {
        format!(
            "Failed to create case engine directory: {}",
            engine_dir.display()
        )
    })?;
    Ok(engine_dir)
}

/// Returns the cases directory: `~/.case-engine/cases/`
///
/// Creates the directory if it doesn't exist.
pub fn cases_dir() -> Result<PathBuf> {
    let dir = case_engine_home_dir()?.join("cases");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cases directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the directory of one case: `~/.case-engine/cases/<case-id>/`
///
/// Creates the directory if it doesn't exist.
pub fn case_dir(case_id: &str) -> Result<PathBuf> {
    let dir = cases_dir()?.join(case_id);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create case directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the event log of one case: `~/.case-engine/cases/<case-id>/events.jsonl`
pub fn case_event_log_path(case_id: &str) -> Result<PathBuf> {
    Ok(case_dir(case_id)?.join("events.jsonl"))
}

/// Returns the aggregate snapshot of one case: `~/.case-engine/cases/<case-id>/snapshot.json`
pub fn case_snapshot_path(case_id: &str) -> Result<PathBuf> {
    Ok(case_dir(case_id)?.join("snapshot.json"))
}

/// Returns the metadata file of one case: `~/.case-engine/cases/<case-id>/case_info.json`
pub fn case_info_path(case_id: &str) -> Result<PathBuf> {
    Ok(case_dir(case_id)?.join("case_info.json"))
}

/// Returns the definitions directory: `~/.case-engine/definitions/`
///
/// Creates the directory if it doesn't exist.
pub fn definitions_dir() -> Result<PathBuf> {
    let dir = case_engine_home_dir()?.join("definitions");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create definitions directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the structured trace log of one case: `~/.case-engine/cases/<case-id>/trace.jsonl`
pub fn case_trace_path(case_id: &str) -> Result<PathBuf> {
    Ok(case_dir(case_id)?.join("trace.jsonl"))
}

/// Returns the engine configuration file: `~/.case-engine/config.yaml`
pub fn engine_config_path() -> Result<PathBuf> {
    Ok(case_engine_home_dir()?.join("config.yaml"))
}

/// Lightweight case info for fast listing without replaying event logs.
///
/// This struct is stored in `case_info.json` within each case directory
/// and updated as the case progresses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaseInfo {
    /// The case ID, also the aggregate id of its event stream
    pub case_id: String,
    /// Human-readable case name
    pub case_name: String,
    /// Name of the definition the case runs
    pub definition_name: String,
    /// User who started the case
    pub created_by: String,
    /// Case creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
    /// State of the case plan root (e.g. "active", "completed")
    pub state: String,
}

impl CaseInfo {
    /// Creates a new CaseInfo with the current timestamp.
    pub fn new(case_id: &str, case_name: &str, definition_name: &str, created_by: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            case_id: case_id.to_string(),
            case_name: case_name.to_string(),
            definition_name: definition_name.to_string(),
            created_by: created_by.to_string(),
            created_at: now.clone(),
            updated_at: now,
            state: "active".to_string(),
        }
    }

    /// Updates the case info with a new state.
    pub fn update(&mut self, state: &str) {
        self.state = state.to_string();
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Saves the case info to the case_info.json file.
    pub fn save(&self) -> Result<()> {
        let path = case_info_path(&self.case_id)?;
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize case info")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write case info: {}", path.display()))?;
        Ok(())
    }

    /// Loads case info from the case_info.json file.
    pub fn load(case_id: &str) -> Result<Self> {
        let path = case_info_path(case_id)?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read case info: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse case info")
    }
}

/// Lists all known cases.
///
/// Returns a vector of CaseInfo, sorted by creation time descending (most
/// recent first). Directories without a readable case_info.json are skipped.
pub fn list_cases() -> Result<Vec<CaseInfo>> {
    let mut cases = Vec::new();

    let directory = cases_dir()?;
    for entry in fs::read_dir(&directory)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }

        let info_path = path.join("case_info.json");
        let Ok(content) = fs::read_to_string(&info_path) else {
            continue;
        };
        match serde_json::from_str::<CaseInfo>(&content) {
            Ok(info) => cases.push(info),
            Err(e) => {
                tracing::warn!(path = %info_path.display(), error = %e, "skipping unreadable case info");
            }
        }
    }

    cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(cases)
}

/// Finds a case by partial match on case id or name.
///
/// Returns the most recent matching case if multiple matches are found.
pub fn find_case(pattern: &str) -> Result<Option<CaseInfo>> {
    Ok(select_case(list_cases()?, pattern))
}

/// Selects the best match for a pattern from a list of cases.
///
/// Tries exact id, then exact name, then partial match on either. The list
/// is expected most-recent-first, so partial matches prefer recent cases.
fn select_case(cases: Vec<CaseInfo>, pattern: &str) -> Option<CaseInfo> {
    let pattern_lower = pattern.to_lowercase();

    if let Some(case) = cases
        .iter()
        .find(|case| case.case_id.to_lowercase() == pattern_lower)
    {
        return Some(case.clone());
    }

    if let Some(case) = cases
        .iter()
        .find(|case| case.case_name.to_lowercase() == pattern_lower)
    {
        return Some(case.clone());
    }

    cases.into_iter().find(|case| {
        case.case_id.to_lowercase().contains(&pattern_lower)
            || case.case_name.to_lowercase().contains(&pattern_lower)
    })
}

#[cfg(test)]
#[path = "engine_paths_tests.rs"]
mod tests;
