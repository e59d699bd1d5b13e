//! Format-specific byte production.
//!
//! The [`BatchWriter`](crate::BatchWriter) decides *when* each element of the
//! payload is emitted; a [`BatchFormat`] decides *what* the bytes look like.
//! Implementations append to an in-memory buffer and never block, which is
//! what lets a single writer core serve both the synchronous and the
//! asynchronous entry points.

use bytes::Bytes;
use odata_batch_core::{BatchError, InStreamError};

use crate::message::{OperationMessage, OperationRequestMessage, OperationResponseMessage};

/// Byte producer for one batch payload encoding.
///
/// The writer validates every call against its state machine before invoking
/// the matching method here, so implementations only see well-ordered calls.
/// An error returned from any method moves the writer into `Error`.
pub trait BatchFormat: Send {
    /// The `Content-Type` value of the outer HTTP message carrying the batch.
    fn batch_content_type(&self) -> String;

    /// Emit whatever opens the batch payload.
    fn write_start_batch(&mut self) -> Result<(), BatchError>;

    /// Emit the closing delimiter of the batch payload.
    fn write_end_batch(&mut self) -> Result<(), BatchError>;

    /// Open a changeset part.
    fn write_start_changeset(&mut self) -> Result<(), BatchError>;

    /// Close the active changeset part.
    fn write_end_changeset(&mut self) -> Result<(), BatchError>;

    /// Open a part for a request operation. The message head is written
    /// separately through [`write_message_head`](Self::write_message_head).
    fn create_operation_request_message(
        &mut self,
        message: &OperationRequestMessage,
    ) -> Result<(), BatchError>;

    /// Open a part for a response operation.
    fn create_operation_response_message(
        &mut self,
        message: &OperationResponseMessage,
    ) -> Result<(), BatchError>;

    /// Emit the start line and headers of the open operation.
    fn write_message_head(&mut self, message: &OperationMessage) -> Result<(), BatchError>;

    /// Append body bytes of the open operation.
    fn write_operation_content(&mut self, content: &[u8]) -> Result<(), BatchError>;

    /// Whether the current position can structurally hold an in-stream error.
    fn can_write_in_stream_error(&self) -> bool;

    /// Emit an in-stream error at the current position.
    fn write_in_stream_error(&mut self, error: &InStreamError) -> Result<(), BatchError>;

    /// Whether a changeset is currently open.
    fn is_inside_sub_batch(&self) -> bool;

    /// Take all bytes produced since the last call.
    fn take_output(&mut self) -> Bytes;
}
