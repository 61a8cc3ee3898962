use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::OutageSource;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Time formatting error: {0}")]
    Format(#[from] time::error::Format),

    #[error(transparent)]
    Source(Box<SourceError>),
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        Error::Source(Box::new(err))
    }
}

#[derive(Debug, Error)]
#[error("Error from source {source_id}: {kind:?} - {message}")]
pub struct SourceError {
    kind: SourceErrorKind,
    source_id: String,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Request,
    Parse,
}

impl SourceError {
    pub fn request<T: OutageSource>(message: String) -> Self {
        Self {
            kind: SourceErrorKind::Request,
            source_id: T::IDENTIFIER.to_string(),
            message,
        }
    }

    pub fn parse<T: OutageSource>(message: String) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            source_id: T::IDENTIFIER.to_string(),
            message,
        }
    }

    pub fn kind(&self) -> SourceErrorKind {
        self.kind
    }
}

/// Reason a single outage record was left out of the grid.
///
/// These never abort a run; they are collected next to the grid and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{field}` has unparseable timestamp {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("interval ends at {end} which is not after its start {start}")]
    NonPositiveDuration {
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    },
    #[error("feeder `{0}` is not part of the region")]
    UnknownFeeder(String),
}
