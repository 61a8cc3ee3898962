pub mod core;
pub mod error;

pub use crate::core::ScheduleCore;

pub use error::Error;
pub use error::RecordError;
pub use error::SourceError;
pub use error::SourceErrorKind;
