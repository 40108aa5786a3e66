//! Error types for timezone handling

/// Timezone configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimezoneError {
    /// Identifier is not in the IANA database
    #[error("unknown timezone: {0}")]
    Unknown(String),

    /// Capture and read-back zones must differ for the perturbation to mean anything
    #[error("timezone plan is a no-op: create and read zone are both {0}")]
    NoPerturbation(String),
}
