//! Error types for the projection core.

/// Errors raised before any simulation work starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// A numeric field is non-finite or out of range, or the year window is inverted.
    #[error("invalid config: {field} {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl SimulationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulationError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
