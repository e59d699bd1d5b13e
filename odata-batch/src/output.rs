//! Output sink owned by the batch writer.
//!
//! The writer never blocks while producing bytes: format implementations
//! append to an in-memory buffer, and the buffer is handed to the sink only on
//! flush. The kind of sink fixes the calling convention of the writer:
//! a [`std::io::Write`] sink takes the synchronous methods, a
//! [`tokio::io::AsyncWrite`] sink takes the `_async` ones.

use std::io::Write;
use std::pin::Pin;

use odata_batch_core::BatchError;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// The byte sink a batch payload is flushed to.
pub enum BatchOutput {
    /// Blocking sink, used with the synchronous writer methods.
    Sync(Box<dyn Write + Send>),
    /// Non-blocking sink, used with the `_async` writer methods.
    Async(Pin<Box<dyn AsyncWrite + Send>>),
}

impl BatchOutput {
    /// Wrap a blocking writer.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        BatchOutput::Sync(Box::new(writer))
    }

    /// Wrap a non-blocking writer.
    pub fn from_async_writer<W: AsyncWrite + Send + 'static>(writer: W) -> Self {
        BatchOutput::Async(Box::pin(writer))
    }

    /// Whether the sink takes synchronous calls.
    pub fn is_synchronous(&self) -> bool {
        matches!(self, BatchOutput::Sync(_))
    }

    /// Write `bytes` and flush the sink.
    pub(crate) fn write_and_flush(&mut self, bytes: &[u8]) -> Result<(), BatchError> {
        match self {
            BatchOutput::Sync(writer) => {
                writer.write_all(bytes)?;
                writer.flush()?;
                Ok(())
            }
            BatchOutput::Async(_) => Err(BatchError::SyncCallOnAsyncWriter),
        }
    }

    /// Write `bytes` and flush the sink without blocking.
    pub(crate) async fn write_and_flush_async(&mut self, bytes: &[u8]) -> Result<(), BatchError> {
        match self {
            BatchOutput::Async(writer) => {
                writer.write_all(bytes).await?;
                writer.flush().await?;
                Ok(())
            }
            BatchOutput::Sync(_) => Err(BatchError::AsyncCallOnSyncWriter),
        }
    }
}

impl std::fmt::Debug for BatchOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_synchronous() { "sync" } else { "async" };
        f.debug_tuple("BatchOutput").field(&kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_output_debug() {
        let output = BatchOutput::from_writer(Vec::new());
        assert!(output.is_synchronous());
        assert_eq!(format!("{output:?}"), r#"BatchOutput("sync")"#);
    }

    #[tokio::test]
    async fn test_async_write_and_flush() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut output = BatchOutput::from_async_writer(client);
        assert!(!output.is_synchronous());

        output.write_and_flush_async(b"--batch").await.unwrap();
        drop(output);

        let mut received = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut received)
            .await
            .unwrap();
        assert_eq!(received, b"--batch");
    }

    #[tokio::test]
    async fn test_mismatched_calls() {
        let mut output = BatchOutput::from_writer(Vec::new());
        let err = output.write_and_flush_async(b"x").await.unwrap_err();
        assert!(matches!(err, BatchError::AsyncCallOnSyncWriter));

        let mut output = BatchOutput::from_async_writer(Vec::new());
        let err = output.write_and_flush(b"x").unwrap_err();
        assert!(matches!(err, BatchError::SyncCallOnAsyncWriter));
    }
}
