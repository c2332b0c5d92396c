use thiserror::Error;

/// Errors raised while resolving or manipulating date-like values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unknown locale: {0}")]
    UnknownLocale(String),

    #[error("date out of representable range")]
    OutOfRange,

    #[error("invalid time unit: {0}")]
    InvalidUnit(String),

    #[error("invalid format string: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, DateError>;
