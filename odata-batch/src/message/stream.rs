//! Body stream of the open operation.
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use odata_batch_core::{BatchError, BatchWriterState, InStreamError};
use tokio::io::AsyncWrite;

use crate::format::BatchFormat;
use crate::multipart::MultipartBatchFormat;
use crate::writer::BatchWriter;

/// Write handle for the body of the open operation.
///
/// Obtained from [`BatchWriter::operation_content_stream`]. The writer is
/// borrowed for the lifetime of the stream, and dropping the stream reports
/// it as disposed, after which the writer accepts calls again.
///
/// Bytes go to the writer's buffer and reach the output on the next flush, so
/// both the [`io::Write`] and the [`AsyncWrite`] implementations complete
/// immediately.
pub struct OperationContentStream<'w, F: BatchFormat = MultipartBatchFormat> {
    writer: &'w mut BatchWriter<F>,
}

impl<'w, F: BatchFormat> OperationContentStream<'w, F> {
    pub(crate) fn new(writer: &'w mut BatchWriter<F>) -> Self {
        Self { writer }
    }

    /// Append body bytes.
    pub fn write_content(&mut self, content: &[u8]) -> Result<(), BatchError> {
        self.writer.write_operation_content(content)
    }

    /// Abort the body with an in-stream error. The writer is left in `Error`.
    pub fn write_in_stream_error(self, error: &InStreamError) -> Result<(), BatchError> {
        self.writer.on_in_stream_error(error)
    }

    /// Dispose the stream and report failures of the notification.
    ///
    /// Dropping the stream has the same effect but discards the error.
    pub fn dispose(self) -> Result<(), BatchError> {
        self.writer.batch_operation_content_stream_disposed()
    }
}

impl<F: BatchFormat> Drop for OperationContentStream<'_, F> {
    fn drop(&mut self) {
        if self.writer.state() == BatchWriterState::OperationStreamRequested
            && let Err(e) = self.writer.batch_operation_content_stream_disposed()
        {
            tracing::debug!(target: "odata_batch", error = %e, "content stream dispose failed");
        }
    }
}

impl<F: BatchFormat> std::fmt::Debug for OperationContentStream<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContentStream")
            .field("state", &self.writer.state())
            .finish()
    }
}

fn into_io_error(error: BatchError) -> io::Error {
    match error {
        BatchError::Io(e) => e,
        other => io::Error::other(other),
    }
}

impl<F: BatchFormat> io::Write for OperationContentStream<'_, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_content(buf).map_err(into_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F: BatchFormat> AsyncWrite for OperationContentStream<'_, F> {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        Poll::Ready(
            this.write_content(buf)
                .map(|()| buf.len())
                .map_err(into_io_error),
        )
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
