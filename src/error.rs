use strum::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    Contract,
    Installment,
}

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("{0} {1} not found")]
    NotFound(Entity, i64),

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CreditError {
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        CreditError::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CreditError>;
