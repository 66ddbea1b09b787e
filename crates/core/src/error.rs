use thiserror::Error;

/// Typed failures raised by lifecycle domain code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// A row carried a status spelling outside the shared vocabulary.
    #[error("unknown {entity} status: {value:?}")]
    UnknownStatus { entity: &'static str, value: String },

    /// An annihilation reason did not start with a known reason code.
    #[error("unknown annihilation reason code: {0:?}")]
    UnknownReasonCode(String),

    /// A configuration value is outside its allowed range.
    #[error("invalid configuration: {field} {problem}")]
    InvalidConfig {
        field: &'static str,
        problem: &'static str,
    },
}
