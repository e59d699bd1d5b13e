//! The batch writer state machine.
//!
//! [`BatchWriter`] drives a [`BatchFormat`] through an ordered sequence of
//! public calls, validating each call against the transition table before any
//! bytes are produced. It owns the batch and changeset counters, the
//! Content-ID registry and the single open operation.
//!
//! Every public call has a synchronous form and an `_async` form. Which one is
//! allowed is fixed by the [`BatchOutput`] the writer was created with. The
//! format never blocks, so the two forms share one core and differ only in how
//! the output is flushed.
//!
//! Any failure moves the writer into [`BatchWriterState::Error`], which it
//! never leaves. Two kinds of rejection are exempt because they are checked
//! before the state machine runs: a call using the wrong calling convention,
//! and a call made while an operation content stream is open.

use std::io::Write;

use odata_batch_core::{
    BatchError, BatchPayloadUriOption, BatchWriterState, ContentIdRegistry, InStreamError,
    create_operation_request_uri, is_query_method, validate_content_id, validate_http_method,
    validate_transition,
};
use tokio::io::AsyncWrite;

use crate::format::BatchFormat;
use crate::message::{
    ContentStreamState, OpenOperation, OperationContentStream, OperationMessage,
    OperationRequestMessage, OperationResponseMessage,
};
use crate::multipart::MultipartBatchFormat;
use crate::output::BatchOutput;
use crate::settings::BatchWriterSettings;

/// Writes one batch payload.
///
/// # Example
///
/// ```rust
/// use odata_batch::{BatchPayloadUriOption, BatchWriter, BatchWriterSettings, BatchWriterState};
/// use std::io::Write;
/// use url::Url;
///
/// # fn main() -> Result<(), odata_batch::BatchError> {
/// let settings = BatchWriterSettings::new()
///     .base_uri(Url::parse("http://host/service/").unwrap());
/// let mut writer = BatchWriter::new(settings, Vec::new());
///
/// writer.write_start_batch()?;
/// writer.write_start_changeset()?;
/// writer.create_operation_request_message(
///     "POST",
///     "Customers",
///     Some("1"),
///     BatchPayloadUriOption::AbsoluteUri,
/// )?;
/// {
///     let mut body = writer.operation_content_stream()?;
///     body.write_all(br#"{"Name":"Contoso"}"#)?;
/// }
/// writer.create_operation_request_message(
///     "POST",
///     "$1/Orders",
///     Some("2"),
///     BatchPayloadUriOption::AbsoluteUri,
/// )?;
/// writer.write_end_changeset()?;
/// writer.write_end_batch()?;
///
/// assert_eq!(writer.state(), BatchWriterState::BatchCompleted);
/// # Ok(())
/// # }
/// ```
pub struct BatchWriter<F: BatchFormat = MultipartBatchFormat> {
    format: F,
    output: BatchOutput,
    settings: BatchWriterSettings,
    state: BatchWriterState,
    content_ids: ContentIdRegistry,
    current_batch_size: usize,
    current_changeset_size: usize,
    current_operation: Option<OpenOperation>,
    current_operation_content_id: Option<String>,
}

impl BatchWriter<MultipartBatchFormat> {
    /// Create a `multipart/mixed` writer over a blocking output.
    pub fn new<W: Write + Send + 'static>(settings: BatchWriterSettings, writer: W) -> Self {
        let format = MultipartBatchFormat::from_settings(&settings);
        Self::with_format(format, settings, BatchOutput::from_writer(writer))
    }

    /// Create a `multipart/mixed` writer over a non-blocking output.
    pub fn new_async<W: AsyncWrite + Send + 'static>(
        settings: BatchWriterSettings,
        writer: W,
    ) -> Self {
        let format = MultipartBatchFormat::from_settings(&settings);
        Self::with_format(format, settings, BatchOutput::from_async_writer(writer))
    }
}

impl<F: BatchFormat> BatchWriter<F> {
    /// Create a writer with a custom format.
    pub fn with_format(format: F, settings: BatchWriterSettings, output: BatchOutput) -> Self {
        Self {
            format,
            output,
            settings,
            state: BatchWriterState::Start,
            content_ids: ContentIdRegistry::new(),
            current_batch_size: 0,
            current_changeset_size: 0,
            current_operation: None,
            current_operation_content_id: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> BatchWriterState {
        self.state
    }

    /// The writer settings.
    pub fn settings(&self) -> &BatchWriterSettings {
        &self.settings
    }

    /// The `Content-Type` value for the outer HTTP message.
    pub fn batch_content_type(&self) -> String {
        self.format.batch_content_type()
    }

    /// Number of top-level parts (operations and changesets) written so far.
    pub fn current_batch_size(&self) -> usize {
        self.current_batch_size
    }

    /// Number of operations in the active changeset.
    pub fn current_changeset_size(&self) -> usize {
        self.current_changeset_size
    }

    /// Content-IDs that later operations of the active changeset may reference.
    pub fn content_id_registry(&self) -> &ContentIdRegistry {
        &self.content_ids
    }

    /// The Content-ID of the open operation.
    pub fn current_operation_content_id(&self) -> Option<&str> {
        self.current_operation_content_id.as_deref()
    }

    /// The open operation, if any.
    pub fn current_operation(&self) -> Option<&OperationMessage> {
        self.current_operation.as_ref().map(|op| &op.message)
    }

    /// Where the open operation's content stream is in its lifecycle.
    pub fn operation_content_stream_state(&self) -> ContentStreamState {
        self.current_operation
            .as_ref()
            .map(|op| op.stream_state)
            .unwrap_or_default()
    }

    /// The format producing the payload bytes.
    pub fn format(&self) -> &F {
        &self.format
    }

    /// Whether the writer takes the synchronous calls.
    pub fn is_synchronous(&self) -> bool {
        self.output.is_synchronous()
    }

    /// Start the batch.
    pub fn write_start_batch(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("start the batch")?;
        self.intercept(Self::start_batch)
    }

    /// Start the batch.
    pub async fn write_start_batch_async(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("start the batch")?;
        self.intercept(Self::start_batch)
    }

    /// End the batch and flush the output.
    pub fn write_end_batch(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("complete the batch")?;
        self.intercept(Self::end_batch)?;
        self.flush_output()
    }

    /// End the batch and flush the output.
    pub async fn write_end_batch_async(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("complete the batch")?;
        self.intercept(Self::end_batch)?;
        self.flush_output_async().await
    }

    /// Start a changeset.
    pub fn write_start_changeset(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("start a changeset")?;
        self.intercept(Self::start_changeset)
    }

    /// Start a changeset.
    pub async fn write_start_changeset_async(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("start a changeset")?;
        self.intercept(Self::start_changeset)
    }

    /// End the active changeset. Clears the Content-ID registry.
    pub fn write_end_changeset(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("complete a changeset")?;
        self.intercept(Self::end_changeset)
    }

    /// End the active changeset. Clears the Content-ID registry.
    pub async fn write_end_changeset_async(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("complete a changeset")?;
        self.intercept(Self::end_changeset)
    }

    /// Open a request operation.
    ///
    /// `uri` may be absolute, relative to the configured base URI, or a
    /// `$<id>` reference to an earlier operation of the active changeset. A
    /// Content-ID on a `GET` is ignored.
    ///
    /// The returned message's headers may be changed until the content stream
    /// is requested or the next part starts.
    pub fn create_operation_request_message(
        &mut self,
        method: &str,
        uri: &str,
        content_id: Option<&str>,
        uri_option: BatchPayloadUriOption,
    ) -> Result<&mut OperationRequestMessage, BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("create an operation")?;
        self.intercept(|w| w.create_request_operation(method, uri, content_id, uri_option))?;
        self.current_request_message()
    }

    /// Open a request operation.
    pub async fn create_operation_request_message_async(
        &mut self,
        method: &str,
        uri: &str,
        content_id: Option<&str>,
        uri_option: BatchPayloadUriOption,
    ) -> Result<&mut OperationRequestMessage, BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("create an operation")?;
        self.intercept(|w| w.create_request_operation(method, uri, content_id, uri_option))?;
        self.current_request_message()
    }

    /// Open a response operation.
    pub fn create_operation_response_message(
        &mut self,
        content_id: Option<&str>,
    ) -> Result<&mut OperationResponseMessage, BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("create an operation")?;
        self.intercept(|w| w.create_response_operation(content_id))?;
        self.current_response_message()
    }

    /// Open a response operation.
    pub async fn create_operation_response_message_async(
        &mut self,
        content_id: Option<&str>,
    ) -> Result<&mut OperationResponseMessage, BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("create an operation")?;
        self.intercept(|w| w.create_response_operation(content_id))?;
        self.current_response_message()
    }

    /// Hand buffered bytes to the output and flush it.
    pub fn flush(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(true)?;
        self.ensure_stream_not_requested("flush the batch writer")?;
        self.flush_output()
    }

    /// Hand buffered bytes to the output and flush it.
    pub async fn flush_async(&mut self) -> Result<(), BatchError> {
        self.verify_call_allowed(false)?;
        self.ensure_stream_not_requested("flush the batch writer")?;
        self.flush_output_async().await
    }

    /// Open the body stream of the current operation.
    ///
    /// The writer stays borrowed until the stream is dropped or disposed.
    pub fn operation_content_stream(&mut self) -> Result<OperationContentStream<'_, F>, BatchError> {
        self.batch_operation_content_stream_requested()?;
        Ok(OperationContentStream::new(self))
    }

    /// Notification that the content stream of the open operation was
    /// requested. Until the matching disposal every other call fails.
    pub fn batch_operation_content_stream_requested(&mut self) -> Result<(), BatchError> {
        self.intercept(|w| {
            w.validate_transition(BatchWriterState::OperationStreamRequested)?;
            w.write_pending_message_data()?;
            let operation = w
                .current_operation
                .as_mut()
                .ok_or_else(|| BatchError::internal("content stream requested without an operation"))?;
            operation.stream_state = ContentStreamState::Requested;
            w.set_state(BatchWriterState::OperationStreamRequested)
        })
    }

    /// Notification that the content stream of the open operation was
    /// disposed.
    pub fn batch_operation_content_stream_disposed(&mut self) -> Result<(), BatchError> {
        self.intercept(|w| {
            w.validate_transition(BatchWriterState::OperationStreamDisposed)?;
            let operation = w
                .current_operation
                .as_mut()
                .ok_or_else(|| BatchError::internal("content stream disposed without an operation"))?;
            operation.stream_state = ContentStreamState::Disposed;
            w.set_state(BatchWriterState::OperationStreamDisposed)
        })
    }

    /// Write an in-stream error into the body of the open operation.
    ///
    /// Allowed in any state, including `Error`, as long as the format can
    /// place the error at the current position. The writer is in `Error`
    /// afterwards either way. Call [`flush`](Self::flush) to hand the error to
    /// the output.
    pub fn on_in_stream_error(&mut self, error: &InStreamError) -> Result<(), BatchError> {
        self.intercept(|w| {
            w.write_pending_message_data()?;
            if !w.format.can_write_in_stream_error() {
                return Err(BatchError::CannotWriteInStreamError);
            }
            w.format.write_in_stream_error(error)
        })?;

        tracing::debug!(
            target: "odata_batch",
            code = error.code(),
            "in-stream error written"
        );
        self.state = BatchWriterState::Error;
        Ok(())
    }

    pub(crate) fn write_operation_content(&mut self, content: &[u8]) -> Result<(), BatchError> {
        self.intercept(|w| {
            if w.state != BatchWriterState::OperationStreamRequested {
                return Err(BatchError::internal(format!(
                    "operation content written in state '{}'",
                    w.state
                )));
            }
            w.format.write_operation_content(content)
        })
    }

    fn start_batch(&mut self) -> Result<(), BatchError> {
        self.validate_transition(BatchWriterState::BatchStarted)?;
        self.format.write_start_batch()?;
        self.set_state(BatchWriterState::BatchStarted)
    }

    fn end_batch(&mut self) -> Result<(), BatchError> {
        self.validate_transition(BatchWriterState::BatchCompleted)?;
        if self.format.is_inside_sub_batch() {
            return Err(BatchError::ChangesetStillActive);
        }

        self.write_pending_message_data()?;
        self.format.write_end_batch()?;
        self.current_operation = None;
        self.set_state(BatchWriterState::BatchCompleted)
    }

    fn start_changeset(&mut self) -> Result<(), BatchError> {
        self.validate_transition(BatchWriterState::ChangesetStarted)?;
        if self.format.is_inside_sub_batch() {
            return Err(BatchError::ChangesetAlreadyActive);
        }

        self.write_pending_message_data()?;
        self.increase_batch_size()?;
        self.reset_changeset_size();
        self.current_operation = None;
        self.current_operation_content_id = None;
        self.format.write_start_changeset()?;
        self.set_state(BatchWriterState::ChangesetStarted)
    }

    fn end_changeset(&mut self) -> Result<(), BatchError> {
        self.validate_transition(BatchWriterState::ChangesetCompleted)?;
        if !self.format.is_inside_sub_batch() {
            return Err(BatchError::NoActiveChangeset);
        }

        self.write_pending_message_data()?;
        self.format.write_end_changeset()?;
        self.current_operation = None;
        self.reset_changeset_size();
        self.content_ids.reset();
        self.current_operation_content_id = None;
        self.set_state(BatchWriterState::ChangesetCompleted)
    }

    fn create_request_operation(
        &mut self,
        method: &str,
        uri: &str,
        content_id: Option<&str>,
        uri_option: BatchPayloadUriOption,
    ) -> Result<(), BatchError> {
        if self.settings.is_writing_response() {
            return Err(BatchError::CannotCreateRequestOperationWhenWritingResponse);
        }
        self.validate_transition(BatchWriterState::OperationCreated)?;

        let method = validate_http_method(method)?;
        let in_changeset = self.format.is_inside_sub_batch();
        if in_changeset && is_query_method(&method) {
            return Err(BatchError::InvalidHttpMethodForChangeset(method.to_string()));
        }
        if uri.is_empty() {
            return Err(BatchError::MissingUri);
        }
        let content_id = content_id.filter(|_| !is_query_method(&method));
        if let Some(id) = content_id {
            validate_content_id(id)?;
        }

        self.write_pending_message_data()?;

        // The previous operation becomes referenceable once another one follows it.
        if let Some(previous) = self.current_operation_content_id.take()
            && in_changeset
        {
            self.add_content_id(previous)?;
        }

        let content_id = content_id.map(str::to_owned);
        if in_changeset
            && let Some(id) = &content_id
            && self.content_ids.contains_content_id(id)
        {
            return Err(BatchError::DuplicateContentId(id.clone()));
        }

        if in_changeset {
            self.increase_changeset_size()?;
        } else {
            self.increase_batch_size()?;
        }

        let base_uri = self.settings.get_base_uri();
        let request_uri = create_operation_request_uri(uri, base_uri, &self.content_ids)?;
        let target = request_uri.request_target(uri_option, base_uri);
        let message = OperationRequestMessage::new(method, request_uri, target, content_id.clone())?;

        self.format.create_operation_request_message(&message)?;
        self.current_operation = Some(OpenOperation::new(OperationMessage::Request(message)));
        self.current_operation_content_id = content_id;
        self.set_state(BatchWriterState::OperationCreated)
    }

    fn create_response_operation(&mut self, content_id: Option<&str>) -> Result<(), BatchError> {
        if !self.settings.is_writing_response() {
            return Err(BatchError::CannotCreateResponseOperationWhenWritingRequest);
        }
        self.validate_transition(BatchWriterState::OperationCreated)?;
        if let Some(id) = content_id {
            validate_content_id(id)?;
        }

        self.write_pending_message_data()?;
        if self.format.is_inside_sub_batch() {
            self.increase_changeset_size()?;
        } else {
            self.increase_batch_size()?;
        }

        let content_id = content_id.map(str::to_owned);
        let message = OperationResponseMessage::new(content_id.clone());
        self.format.create_operation_response_message(&message)?;
        self.current_operation = Some(OpenOperation::new(OperationMessage::Response(message)));
        self.current_operation_content_id = content_id;
        self.set_state(BatchWriterState::OperationCreated)
    }

    fn current_request_message(&mut self) -> Result<&mut OperationRequestMessage, BatchError> {
        match self.current_operation.as_mut().map(|op| &mut op.message) {
            Some(OperationMessage::Request(message)) => Ok(message),
            _ => Err(BatchError::internal("no open request operation")),
        }
    }

    fn current_response_message(&mut self) -> Result<&mut OperationResponseMessage, BatchError> {
        match self.current_operation.as_mut().map(|op| &mut op.message) {
            Some(OperationMessage::Response(message)) => Ok(message),
            _ => Err(BatchError::internal("no open response operation")),
        }
    }

    /// Write the head of the open operation if it is still pending.
    fn write_pending_message_data(&mut self) -> Result<(), BatchError> {
        if let Some(operation) = self.current_operation.as_mut()
            && !operation.head_written
        {
            self.format.write_message_head(&operation.message)?;
            operation.head_written = true;
        }
        Ok(())
    }

    fn flush_output(&mut self) -> Result<(), BatchError> {
        let bytes = self.format.take_output();
        self.intercept(|w| w.output.write_and_flush(&bytes))?;
        tracing::debug!(target: "odata_batch", bytes = bytes.len(), "flushed batch output");
        Ok(())
    }

    async fn flush_output_async(&mut self) -> Result<(), BatchError> {
        let bytes = self.format.take_output();
        if let Err(e) = self.output.write_and_flush_async(&bytes).await {
            self.enter_error_state(&e);
            return Err(e);
        }
        tracing::debug!(target: "odata_batch", bytes = bytes.len(), "flushed batch output");
        Ok(())
    }

    fn increase_batch_size(&mut self) -> Result<(), BatchError> {
        self.current_batch_size += 1;
        self.settings
            .get_quotas()
            .check_batch_size(self.current_batch_size)
    }

    fn increase_changeset_size(&mut self) -> Result<(), BatchError> {
        self.current_changeset_size += 1;
        self.settings
            .get_quotas()
            .check_changeset_size(self.current_changeset_size)
    }

    fn reset_changeset_size(&mut self) {
        self.current_changeset_size = 0;
    }

    fn add_content_id(&mut self, content_id: String) -> Result<(), BatchError> {
        if self.settings.is_writing_response() {
            return Err(BatchError::internal(
                "Content-IDs are only registered for request operations",
            ));
        }
        if !self.format.is_inside_sub_batch() {
            return Err(BatchError::internal(
                "Content-IDs are only registered inside a changeset",
            ));
        }
        self.content_ids.add_content_id(content_id)
    }

    fn verify_call_allowed(&self, synchronous: bool) -> Result<(), BatchError> {
        match (synchronous, self.output.is_synchronous()) {
            (true, false) => Err(BatchError::SyncCallOnAsyncWriter),
            (false, true) => Err(BatchError::AsyncCallOnSyncWriter),
            _ => Ok(()),
        }
    }

    fn ensure_stream_not_requested(&self, action: &'static str) -> Result<(), BatchError> {
        if self.state == BatchWriterState::OperationStreamRequested {
            return Err(BatchError::ContentStreamRequested { action });
        }
        Ok(())
    }

    fn validate_transition(&self, to: BatchWriterState) -> Result<(), BatchError> {
        validate_transition(self.state, to)
    }

    fn set_state(&mut self, to: BatchWriterState) -> Result<(), BatchError> {
        validate_transition(self.state, to)?;
        tracing::debug!(
            target: "odata_batch",
            from = %self.state,
            to = %to,
            "batch writer transition"
        );
        self.state = to;
        Ok(())
    }

    /// Run `f`, moving the writer into `Error` if it fails.
    fn intercept<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, BatchError>,
    ) -> Result<T, BatchError> {
        let result = f(self);
        if let Err(e) = &result
            && e.poisons_writer()
        {
            self.enter_error_state(e);
        }
        result
    }

    fn enter_error_state(&mut self, error: &BatchError) {
        if !self.state.is_error() {
            tracing::warn!(
                target: "odata_batch",
                state = %self.state,
                kind = %error.kind(),
                error = %error,
                "batch writer entered error state"
            );
        }
        self.state = BatchWriterState::Error;
    }
}

impl<F: BatchFormat> std::fmt::Debug for BatchWriter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("state", &self.state)
            .field("output", &self.output)
            .field("current_batch_size", &self.current_batch_size)
            .field("current_changeset_size", &self.current_changeset_size)
            .field("current_operation_content_id", &self.current_operation_content_id)
            .finish_non_exhaustive()
    }
}
