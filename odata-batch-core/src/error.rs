//! Batch writer error kinds and types.
//!
//! This module provides the error types used by the batch protocol:
//! - [`ErrorKind`]: The taxonomy every failure maps onto
//! - [`BatchError`]: Concrete failures raised by the writer
//! - [`InStreamError`]: A terminal error payload written into an operation body

use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::state::BatchWriterState;

/// Classification of batch writer failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A call was issued in a state that does not permit it.
    InvalidSequence,
    /// The batch or changeset size limit was exceeded.
    QuotaExceeded,
    /// A Content-ID was reused within the same changeset.
    DuplicateContentId,
    /// A synchronous call on an asynchronous writer, or vice versa.
    CallingConvention,
    /// An argument (method, URI) was rejected.
    InvalidArgument,
    /// The underlying output failed.
    Io,
    /// An unreachable code path was hit.
    InternalInvariant,
}

impl ErrorKind {
    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSequence => "invalid_sequence",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::DuplicateContentId => "duplicate_content_id",
            ErrorKind::CallingConvention => "calling_convention",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Io => "io",
            ErrorKind::InternalInvariant => "internal_invariant",
        }
    }

    /// Returns whether an error of this kind moves the writer into the
    /// `Error` state.
    ///
    /// Calling-convention errors are rejected before the writer state is
    /// consulted and leave it untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use odata_batch_core::ErrorKind;
    ///
    /// assert!(ErrorKind::QuotaExceeded.poisons_writer());
    /// assert!(!ErrorKind::CallingConvention.poisons_writer());
    /// ```
    pub fn poisons_writer(&self) -> bool {
        !matches!(self, ErrorKind::CallingConvention)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`ErrorKind`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseErrorKindError(());

impl std::fmt::Display for ParseErrorKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown error kind")
    }
}

impl std::error::Error for ParseErrorKindError {}

impl FromStr for ErrorKind {
    type Err = ParseErrorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalid_sequence" => Ok(ErrorKind::InvalidSequence),
            "quota_exceeded" => Ok(ErrorKind::QuotaExceeded),
            "duplicate_content_id" => Ok(ErrorKind::DuplicateContentId),
            "calling_convention" => Ok(ErrorKind::CallingConvention),
            "invalid_argument" => Ok(ErrorKind::InvalidArgument),
            "io" => Ok(ErrorKind::Io),
            "internal_invariant" => Ok(ErrorKind::InternalInvariant),
            _ => Err(ParseErrorKindError(())),
        }
    }
}

/// Batch writer failures.
///
/// Once returned from a public writer call, every variant leaves the writer in
/// the `Error` state except the calling-convention pair and
/// [`BatchError::ContentStreamRequested`]. Those are rejected before the state
/// machine runs, so the writer can continue with a correct call.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A state transition that the transition table does not allow.
    #[error(
        "invalid batch writer transition from '{from}' to '{to}': {}",
        transition_hint(.from)
    )]
    InvalidTransition {
        from: BatchWriterState,
        to: BatchWriterState,
    },

    /// A writer call was made while an operation content stream is open.
    #[error("cannot {action} while an operation content stream is open; dispose the stream first")]
    ContentStreamRequested { action: &'static str },

    /// `write_start_changeset` was called inside an active changeset.
    #[error("cannot start a changeset while another changeset is active")]
    ChangesetAlreadyActive,

    /// `write_end_changeset` was called without an active changeset.
    #[error("cannot complete a changeset without an active changeset")]
    NoActiveChangeset,

    /// `write_end_batch` was called inside an active changeset.
    #[error("cannot complete a batch while a changeset is still active")]
    ChangesetStillActive,

    /// A response operation was requested on a writer producing a request.
    #[error("cannot create a response operation message while writing a request batch")]
    CannotCreateResponseOperationWhenWritingRequest,

    /// A request operation was requested on a writer producing a response.
    #[error("cannot create a request operation message while writing a response batch")]
    CannotCreateRequestOperationWhenWritingResponse,

    /// A synchronous call was made on a writer created for asynchronous output.
    #[error("a synchronous call was made on a batch writer configured for asynchronous output")]
    SyncCallOnAsyncWriter,

    /// An asynchronous call was made on a writer created for synchronous output.
    #[error("an asynchronous call was made on a batch writer configured for synchronous output")]
    AsyncCallOnSyncWriter,

    /// The HTTP method is not one a batch operation may carry.
    #[error("invalid HTTP method '{0}'; only GET, POST, PUT, PATCH, DELETE and MERGE are supported")]
    InvalidHttpMethod(String),

    /// A query method was used inside a changeset.
    #[error("HTTP method '{0}' is not allowed inside a changeset")]
    InvalidHttpMethodForChangeset(String),

    /// The operation request URI was empty.
    #[error("an operation request URI is required")]
    MissingUri,

    /// The operation request URI could not be parsed.
    #[error("invalid operation request URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A relative URI was used and no base URI is configured.
    #[error("relative URI '{0}' was used in a batch operation but no base URI was specified")]
    RelativeUriWithoutBaseUri(String),

    /// A `$`-prefixed relative URI did not match a known Content-ID and no
    /// base URI is configured.
    #[error(
        "relative URI '{0}' starts with '$' but does not reference a Content-ID declared earlier in \
         this changeset, and no base URI was specified"
    )]
    RelativeUriStartingWithDollarWithoutBaseUri(String),

    /// The number of top-level parts exceeded the batch quota.
    #[error("the current batch message contains too many parts; a maximum number of {max} query operations and changesets are allowed in a batch message")]
    MaxBatchSizeExceeded { max: usize },

    /// The number of operations in a changeset exceeded the changeset quota.
    #[error("the current changeset contains too many operations; a maximum number of {max} operations are allowed in a changeset")]
    MaxChangesetSizeExceeded { max: usize },

    /// A Content-ID was empty or not a valid header value.
    #[error("invalid Content-ID {0:?}; a Content-ID must be a non-empty header value")]
    InvalidContentId(String),

    /// A Content-ID was reused inside the same changeset.
    #[error("the Content-ID '{0}' was found more than once in the same changeset; Content-IDs have to be unique across all operations of a changeset")]
    DuplicateContentId(String),

    /// The payload position cannot structurally hold an in-stream error.
    #[error("an in-stream error cannot be written at the current position of the batch payload")]
    CannotWriteInStreamError,

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// The output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Get the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::InvalidTransition { .. }
            | BatchError::ContentStreamRequested { .. }
            | BatchError::ChangesetAlreadyActive
            | BatchError::NoActiveChangeset
            | BatchError::ChangesetStillActive
            | BatchError::CannotCreateResponseOperationWhenWritingRequest
            | BatchError::CannotCreateRequestOperationWhenWritingResponse
            | BatchError::CannotWriteInStreamError => ErrorKind::InvalidSequence,
            BatchError::SyncCallOnAsyncWriter | BatchError::AsyncCallOnSyncWriter => {
                ErrorKind::CallingConvention
            }
            BatchError::InvalidHttpMethod(_)
            | BatchError::InvalidHttpMethodForChangeset(_)
            | BatchError::InvalidContentId(_)
            | BatchError::MissingUri
            | BatchError::InvalidUri { .. }
            | BatchError::RelativeUriWithoutBaseUri(_)
            | BatchError::RelativeUriStartingWithDollarWithoutBaseUri(_) => {
                ErrorKind::InvalidArgument
            }
            BatchError::MaxBatchSizeExceeded { .. } | BatchError::MaxChangesetSizeExceeded { .. } => {
                ErrorKind::QuotaExceeded
            }
            BatchError::DuplicateContentId(_) => ErrorKind::DuplicateContentId,
            BatchError::Internal(_) => ErrorKind::InternalInvariant,
            BatchError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether returning this error from a writer call moves the writer into
    /// `Error`.
    pub fn poisons_writer(&self) -> bool {
        !matches!(self, BatchError::ContentStreamRequested { .. }) && self.kind().poisons_writer()
    }

    /// Create an internal invariant error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        BatchError::Internal(message.into())
    }
}

/// Describe what may legally follow the given state.
fn transition_hint(from: &BatchWriterState) -> &'static str {
    match from {
        BatchWriterState::Start => "only write_start_batch may be called on a new writer",
        BatchWriterState::BatchStarted => {
            "after write_start_batch only a changeset, an operation or write_end_batch may follow"
        }
        BatchWriterState::ChangesetStarted => {
            "after write_start_changeset only an operation or write_end_changeset may follow"
        }
        BatchWriterState::OperationCreated => {
            "after an operation only its content stream, another operation, a changeset boundary or write_end_batch may follow"
        }
        BatchWriterState::OperationStreamRequested => {
            "an operation content stream is open; dispose it before calling any other writer method"
        }
        BatchWriterState::OperationStreamDisposed => {
            "after an operation content stream is disposed only another operation, a changeset boundary or write_end_batch may follow"
        }
        BatchWriterState::ChangesetCompleted => {
            "after write_end_changeset only a changeset, an operation or write_end_batch may follow"
        }
        BatchWriterState::BatchCompleted => "nothing can be written after write_end_batch",
        BatchWriterState::Error => "the writer is in the error state and can no longer be used",
    }
}

/// A terminal error written into the body of the operation being written.
///
/// # Wire Format
///
/// Serialized as the OData JSON error object:
/// ```json
/// {"error": {"code": "500", "message": "serialization failed", "target": "Orders"}}
/// ```
///
/// # Example
///
/// ```
/// use odata_batch_core::InStreamError;
///
/// let error = InStreamError::new("500", "serialization failed").with_target("Orders");
/// let json = serde_json::to_string(&error).unwrap();
/// assert_eq!(
///     json,
///     r#"{"error":{"code":"500","message":"serialization failed","target":"Orders"}}"#
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InStreamError {
    code: String,
    message: String,
    target: Option<String>,
}

impl InStreamError {
    /// Create a new in-stream error with a code and message.
    pub fn new<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            target: None,
        }
    }

    /// Set the target the error refers to.
    pub fn with_target<S: Into<String>>(mut self, target: S) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Get the error code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error target.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Serialize this error to its JSON wire form.
    pub fn to_json(&self) -> Result<Vec<u8>, BatchError> {
        serde_json::to_vec(self)
            .map_err(|e| BatchError::internal(format!("failed to serialize in-stream error: {e}")))
    }
}

/// JSON body structure of the inner error object.
#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
}

impl Serialize for InStreamError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("InStreamError", 1)?;
        s.serialize_field(
            "error",
            &ErrorBody {
                code: &self.code,
                message: &self.message,
                target: self.target.as_deref(),
            },
        )?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::InvalidSequence.as_str(), "invalid_sequence");
        assert_eq!(ErrorKind::QuotaExceeded.as_str(), "quota_exceeded");
        assert_eq!(ErrorKind::InternalInvariant.as_str(), "internal_invariant");
    }

    #[test]
    fn test_error_kind_from_str() {
        assert_eq!("io".parse(), Ok(ErrorKind::Io));
        assert_eq!(
            "duplicate_content_id".parse(),
            Ok(ErrorKind::DuplicateContentId)
        );
        assert_eq!(
            "unknown".parse::<ErrorKind>(),
            Err(ParseErrorKindError(()))
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BatchError::MaxBatchSizeExceeded { max: 3 }.kind(),
            ErrorKind::QuotaExceeded
        );
        assert_eq!(
            BatchError::DuplicateContentId("1".into()).kind(),
            ErrorKind::DuplicateContentId
        );
        assert_eq!(
            BatchError::SyncCallOnAsyncWriter.kind(),
            ErrorKind::CallingConvention
        );
        assert_eq!(
            BatchError::CannotCreateResponseOperationWhenWritingRequest.kind(),
            ErrorKind::InvalidSequence
        );
        assert_eq!(BatchError::MissingUri.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            BatchError::InvalidContentId(String::new()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            BatchError::internal("boom").kind(),
            ErrorKind::InternalInvariant
        );
    }

    #[test]
    fn test_poisons_writer() {
        assert!(BatchError::DuplicateContentId("1".into()).poisons_writer());
        assert!(BatchError::InvalidHttpMethod("TRACE".into()).poisons_writer());
        assert!(!BatchError::AsyncCallOnSyncWriter.poisons_writer());
        assert!(
            !BatchError::ContentStreamRequested {
                action: "flush the batch writer"
            }
            .poisons_writer()
        );
    }

    #[test]
    fn test_invalid_transition_names_states() {
        let err = BatchError::InvalidTransition {
            from: BatchWriterState::BatchCompleted,
            to: BatchWriterState::OperationCreated,
        };
        let message = err.to_string();
        assert!(message.contains("'BatchCompleted'"));
        assert!(message.contains("'OperationCreated'"));
        assert!(message.contains("nothing can be written after write_end_batch"));
    }

    #[test]
    fn test_quota_messages_quote_maximum() {
        let err = BatchError::MaxBatchSizeExceeded { max: 42 };
        assert!(err.to_string().contains("42"));

        let err = BatchError::MaxChangesetSizeExceeded { max: 7 };
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_in_stream_error_serialize_without_target() {
        let error = InStreamError::new("400", "bad entity");
        let json = serde_json::to_string(&error).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["error"]["code"], "400");
        assert_eq!(parsed["error"]["message"], "bad entity");
        assert!(parsed["error"].get("target").is_none());
    }
}
