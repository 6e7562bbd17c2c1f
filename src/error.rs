use derive_more::Display;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur during parsing a multipart stream and in other operations.
#[derive(Clone, Display)]
pub enum Error {
    /// The request `Content-Type` is missing or is not `multipart/form-data`.
    #[display(fmt = "The Content-Type is not multipart/form-data")]
    InvalidContentType,

    /// No `boundary` parameter found in the `Content-Type` header.
    #[display(fmt = "No boundary value found in the Content-Type header")]
    MissingBoundary,

    /// A part's header block exceeded the configured maximum size.
    #[display(fmt = "A part's header block exceeded the maximum size: {} bytes", limit)]
    HeaderSizeExceeded { limit: usize },

    /// A part's body exceeded the configured maximum size.
    #[display(fmt = "A part's body exceeded the maximum size: {} bytes", limit)]
    FileSizeExceeded { limit: u64 },

    /// The two bytes following a boundary were neither `CRLF` nor `--`.
    #[display(fmt = "Unexpected bytes after a boundary, expected CRLF or `--`")]
    InvalidBoundarySuffix,

    /// The stream ended before the closing boundary was reached.
    #[display(fmt = "Multipart stream is incomplete")]
    IncompleteStream,

    /// A field's data was read after the next field had already been requested.
    #[display(fmt = "The field data was abandoned when the next field was requested")]
    FieldAbandoned,

    /// Reading from the underlying stream failed.
    #[display(fmt = "Stream read failed: {}", _0)]
    StreamReadFailed(Arc<BoxError>),

    /// Failed to lock the multipart shared state.
    #[display(fmt = "Couldn't lock the multipart state: {}", _0)]
    LockFailure(String),

    /// Failed to decode the field data as `JSON` in the [`Field::json`](crate::Field::json) method.
    #[cfg(feature = "json")]
    #[display(fmt = "Failed to decode the field data as JSON: {}", _0)]
    DecodeJson(Arc<BoxError>),
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
