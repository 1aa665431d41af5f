//! Strongly typed domain primitives for the case aggregate.
//!
//! These newtypes provide type safety and semantic clarity for case, plan item,
//! and definition identifiers. They are used throughout the engine; ordered ids
//! double as arena keys so iteration over runtime maps stays deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a case instance.
/// Used as the aggregate_id in the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId(pub Uuid);

impl CaseId {
    /// Creates a new random case ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a case ID from a string.
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of one plan item instance within a case.
///
/// Minted when the item is created and carried in every event touching the
/// item, so replay reconstructs the same identities. Repetition instances get
/// fresh ids; they share a definition id and differ by repetition index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanItemId(pub String);

impl PlanItemId {
    /// Mints a fresh plan item id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlanItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for PlanItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlanItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for PlanItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an element in the definition tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub String);

impl DefinitionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DefinitionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DefinitionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slash-separated path of a case file item, e.g. `order/lines`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseFilePath(pub String);

impl CaseFilePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the path into its item names, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Path of the parent item, or `None` for a root item.
    pub fn parent(&self) -> Option<CaseFilePath> {
        let (parent, _) = self.0.rsplit_once('/')?;
        Some(CaseFilePath(parent.to_string()))
    }
}

impl From<&str> for CaseFilePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CaseFilePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CaseFilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a user issuing commands against a case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a case role as declared in the definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseRoleName(pub String);

impl CaseRoleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaseRoleName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CaseRoleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CaseRoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based index distinguishing instances of a repeating plan item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct RepetitionIndex(pub u32);

impl RepetitionIndex {
    /// The first instance of an item.
    pub fn first() -> Self {
        Self(0)
    }

    /// The index of the next repetition instance.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RepetitionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC timestamp for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the timestamp as an RFC3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for TimestampUtc {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for TimestampUtc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}
