//! Error taxonomy shared by the domain services.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Input fails a domain constraint; nothing was saved
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    /// The cycle must be reset before more classes can be recorded
    #[error("Cycle already complete for student {student_id} ({total_classes}/{classes_per_cycle} classes)")]
    CycleComplete {
        student_id: String,
        total_classes: u32,
        classes_per_cycle: u32,
    },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound { kind, id: id.into() }
    }

    pub fn is_cycle_complete(&self) -> bool {
        matches!(self, DomainError::CycleComplete { .. })
    }
}
