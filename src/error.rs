use thiserror::Error;

/// Failures detected while assembling a simulation from its configuration.
///
/// Once an [`Engine`](crate::Engine) exists every simulation call is infallible.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("roster must define at least one settlement")]
    EmptyRoster,

    #[error("roster must contain exactly one capital, found {0}")]
    CapitalCount(usize),

    #[error("settlement name '{0}' is defined more than once")]
    DuplicateSettlement(String),

    #[error("settlement '{name}' cannot produce {resource}")]
    InvalidProduction { name: String, resource: String },
}

pub type Result<T> = std::result::Result<T, SimError>;
