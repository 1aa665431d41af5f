//! Error types for the case domain.

use std::fmt::{Display, Formatter};

/// Errors that can occur during case command handling.
#[derive(Debug, Clone)]
pub enum CaseError {
    /// Command rejected before any event was produced; the case is unchanged.
    Validation { message: String },
    /// A cascade failed mid-flight; the whole command batch is discarded.
    Execution { message: String },
    /// Storage/persistence failure.
    Storage { message: String },
    /// Optimistic lock failure (concurrent modification detected).
    Conflict { message: String },
    /// Command addressed a case that has not been started.
    NotBootstrapped,
}

impl CaseError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

impl Display for CaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { message } => write!(f, "validation failed: {}", message),
            Self::Execution { message } => write!(f, "execution failed: {}", message),
            Self::Storage { message } => write!(f, "storage failure: {}", message),
            Self::Conflict { message } => write!(f, "concurrency conflict: {}", message),
            Self::NotBootstrapped => write!(f, "case not bootstrapped"),
        }
    }
}

impl std::error::Error for CaseError {}
