//! Errors describing malformed input data.

mod invalid_data;

pub use invalid_data::InvalidDataError;
pub(crate) use invalid_data::BlockContext;

/// An error carrying only a message.
///
/// Used as the payload of an [`InvalidDataError`] when there is no more
/// specific error type to report.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MessageError(String);

impl MessageError {
    /// Creates a new error from the given message.
    #[must_use]
    pub fn new<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self(message.into())
    }
}
