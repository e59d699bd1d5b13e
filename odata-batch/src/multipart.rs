//! `multipart/mixed` batch format.
//!
//! ```text
//! --batch_<uuid>
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//!
//! GET http://host/service/Customers HTTP/1.1
//!
//!
//! --batch_<uuid>
//! Content-Type: multipart/mixed; boundary=changeset_<uuid>
//!
//! --changeset_<uuid>
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//! Content-ID: 1
//!
//! POST http://host/service/Orders HTTP/1.1
//!
//! {...}
//! --changeset_<uuid>--
//! --batch_<uuid>--
//! ```
//!
//! The first boundary of each multipart body carries no leading CRLF. Every
//! later boundary, and each close delimiter, is preceded by one.

use bytes::{BufMut, Bytes, BytesMut};
use http::HeaderMap;
use odata_batch_core::{BatchError, InStreamError};
use uuid::Uuid;

use crate::format::BatchFormat;
use crate::message::{OperationMessage, OperationRequestMessage, OperationResponseMessage};
use crate::settings::BatchWriterSettings;

const CRLF: &[u8] = b"\r\n";
const HTTP_VERSION: &str = "HTTP/1.1";

/// Where the last written bytes left the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PayloadPosition {
    /// Nothing written yet.
    Start,
    /// A boundary, a close delimiter or a changeset part header was written.
    Delimiter,
    /// An operation part header was written; the message head is pending.
    PartHeaders,
    /// The message head was written; body bytes may follow.
    OperationBody,
    /// The batch close delimiter was written.
    Completed,
}

/// Writes batch payloads as `multipart/mixed` bodies.
#[derive(Debug)]
pub struct MultipartBatchFormat {
    buffer: BytesMut,
    batch_boundary: String,
    changeset_boundary: Option<String>,
    batch_start_boundary_written: bool,
    changeset_start_boundary_written: bool,
    position: PayloadPosition,
    in_stream_error_written: bool,
}

impl MultipartBatchFormat {
    /// Create a format with a generated `batch_<uuid>` boundary.
    pub fn new() -> Self {
        Self::with_batch_boundary(format!("batch_{}", Uuid::new_v4()))
    }

    /// Create a format with a fixed batch boundary.
    pub fn with_batch_boundary<S: Into<String>>(batch_boundary: S) -> Self {
        Self {
            buffer: BytesMut::new(),
            batch_boundary: batch_boundary.into(),
            changeset_boundary: None,
            batch_start_boundary_written: false,
            changeset_start_boundary_written: false,
            position: PayloadPosition::Start,
            in_stream_error_written: false,
        }
    }

    /// Create a format using the boundary configured in `settings`, or a
    /// generated one.
    pub fn from_settings(settings: &BatchWriterSettings) -> Self {
        match settings.get_batch_boundary() {
            Some(boundary) => Self::with_batch_boundary(boundary),
            None => Self::new(),
        }
    }

    /// The batch boundary.
    pub fn batch_boundary(&self) -> &str {
        &self.batch_boundary
    }

    /// The boundary of the active changeset.
    pub fn changeset_boundary(&self) -> Option<&str> {
        self.changeset_boundary.as_deref()
    }

    fn write_batch_boundary(&mut self) {
        let first = !self.batch_start_boundary_written;
        write_boundary(&mut self.buffer, &self.batch_boundary, first);
        self.batch_start_boundary_written = true;
    }

    /// Write the boundary that opens the next operation part.
    fn write_part_boundary(&mut self) {
        match &self.changeset_boundary {
            Some(boundary) => {
                write_boundary(
                    &mut self.buffer,
                    boundary,
                    !self.changeset_start_boundary_written,
                );
                self.changeset_start_boundary_written = true;
            }
            None => self.write_batch_boundary(),
        }
    }

    fn write_part_headers(&mut self, content_id: Option<&str>) {
        self.write_part_boundary();
        self.buffer
            .put_slice(b"Content-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n");
        if let Some(content_id) = content_id {
            self.buffer.put_slice(b"Content-ID: ");
            self.buffer.put_slice(content_id.as_bytes());
            self.buffer.put_slice(CRLF);
        }
        self.buffer.put_slice(CRLF);
        self.position = PayloadPosition::PartHeaders;
    }

    fn write_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.buffer.put_slice(name.as_str().as_bytes());
            self.buffer.put_slice(b": ");
            self.buffer.put_slice(value.as_bytes());
            self.buffer.put_slice(CRLF);
        }
        self.buffer.put_slice(CRLF);
    }
}

impl Default for MultipartBatchFormat {
    fn default() -> Self {
        Self::new()
    }
}

fn write_boundary(buffer: &mut BytesMut, boundary: &str, first: bool) {
    if !first {
        buffer.put_slice(CRLF);
    }
    buffer.put_slice(b"--");
    buffer.put_slice(boundary.as_bytes());
    buffer.put_slice(CRLF);
}

fn write_close_delimiter(buffer: &mut BytesMut, boundary: &str, first: bool) {
    if !first {
        buffer.put_slice(CRLF);
    }
    buffer.put_slice(b"--");
    buffer.put_slice(boundary.as_bytes());
    buffer.put_slice(b"--");
}

impl BatchFormat for MultipartBatchFormat {
    fn batch_content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.batch_boundary)
    }

    fn write_start_batch(&mut self) -> Result<(), BatchError> {
        self.position = PayloadPosition::Delimiter;
        Ok(())
    }

    fn write_end_batch(&mut self) -> Result<(), BatchError> {
        write_close_delimiter(
            &mut self.buffer,
            &self.batch_boundary,
            !self.batch_start_boundary_written,
        );
        self.buffer.put_slice(CRLF);
        self.position = PayloadPosition::Completed;
        Ok(())
    }

    fn write_start_changeset(&mut self) -> Result<(), BatchError> {
        if self.changeset_boundary.is_some() {
            return Err(BatchError::internal(
                "changeset started while another changeset is open",
            ));
        }

        let boundary = format!("changeset_{}", Uuid::new_v4());
        self.write_batch_boundary();
        self.buffer
            .put_slice(b"Content-Type: multipart/mixed; boundary=");
        self.buffer.put_slice(boundary.as_bytes());
        self.buffer.put_slice(b"\r\n\r\n");

        self.changeset_boundary = Some(boundary);
        self.changeset_start_boundary_written = false;
        self.position = PayloadPosition::Delimiter;
        Ok(())
    }

    fn write_end_changeset(&mut self) -> Result<(), BatchError> {
        let boundary = self
            .changeset_boundary
            .take()
            .ok_or_else(|| BatchError::internal("changeset ended without an open changeset"))?;

        write_close_delimiter(
            &mut self.buffer,
            &boundary,
            !self.changeset_start_boundary_written,
        );
        self.changeset_start_boundary_written = false;
        self.position = PayloadPosition::Delimiter;
        Ok(())
    }

    fn create_operation_request_message(
        &mut self,
        message: &OperationRequestMessage,
    ) -> Result<(), BatchError> {
        self.write_part_headers(message.content_id());
        Ok(())
    }

    fn create_operation_response_message(
        &mut self,
        message: &OperationResponseMessage,
    ) -> Result<(), BatchError> {
        self.write_part_headers(message.content_id());
        Ok(())
    }

    fn write_message_head(&mut self, message: &OperationMessage) -> Result<(), BatchError> {
        if self.position != PayloadPosition::PartHeaders {
            return Err(BatchError::internal(
                "message head written outside of an operation part",
            ));
        }

        match message {
            OperationMessage::Request(request) => {
                let line = format!(
                    "{} {} {HTTP_VERSION}\r\n",
                    request.method(),
                    request.request_target()
                );
                self.buffer.put_slice(line.as_bytes());
            }
            OperationMessage::Response(response) => {
                let status = response.status();
                let line = format!(
                    "{HTTP_VERSION} {} {}\r\n",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                );
                self.buffer.put_slice(line.as_bytes());
            }
        }
        self.write_headers(message.headers());
        self.position = PayloadPosition::OperationBody;
        Ok(())
    }

    fn write_operation_content(&mut self, content: &[u8]) -> Result<(), BatchError> {
        if self.position != PayloadPosition::OperationBody {
            return Err(BatchError::internal(
                "operation content written before the message head",
            ));
        }
        self.buffer.put_slice(content);
        Ok(())
    }

    fn can_write_in_stream_error(&self) -> bool {
        self.position == PayloadPosition::OperationBody && !self.in_stream_error_written
    }

    fn write_in_stream_error(&mut self, error: &InStreamError) -> Result<(), BatchError> {
        if !self.can_write_in_stream_error() {
            return Err(BatchError::CannotWriteInStreamError);
        }
        let body = error.to_json()?;
        self.buffer.put_slice(&body);
        self.in_stream_error_written = true;
        Ok(())
    }

    fn is_inside_sub_batch(&self) -> bool {
        self.changeset_boundary.is_some()
    }

    fn take_output(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}
