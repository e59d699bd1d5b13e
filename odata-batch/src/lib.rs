//! # OData Batch
//!
//! A writer for OData batch payloads: many independent HTTP request or
//! response operations encoded into one streamed `multipart/mixed` body,
//! optionally grouped into atomic changesets.
//!
//! ## Features
//!
//! - **Strict sequencing:** [`BatchWriter`] validates every call against an
//!   exhaustive transition table and refuses to continue after any failure.
//! - **Quotas:** the number of top-level parts and of operations per changeset
//!   is bounded by [`MessageQuotas`].
//! - **Content-ID references:** operations in a changeset can address the
//!   result of an earlier one with `$<id>` URLs.
//! - **Sync and async:** the same writer drives a [`std::io::Write`] or a
//!   [`tokio::io::AsyncWrite`] output.
//! - **Pluggable format:** byte production sits behind [`BatchFormat`];
//!   [`MultipartBatchFormat`] is the built-in one.
//!
//! ## Getting Started
//!
//! ```rust
//! use odata_batch::prelude::*;
//!
//! # fn main() -> Result<(), BatchError> {
//! let mut writer = BatchWriter::new(BatchWriterSettings::new(), Vec::new());
//! writer.write_start_batch()?;
//! writer.create_operation_request_message(
//!     "GET",
//!     "http://host/service/Customers",
//!     None,
//!     BatchPayloadUriOption::AbsoluteUri,
//! )?;
//! writer.write_end_batch()?;
//! # Ok(())
//! # }
//! ```

pub mod format;
pub mod message;
pub mod multipart;
pub mod output;
pub mod settings;
pub mod writer;

pub use format::BatchFormat;
pub use message::{
    ContentStreamState, OperationContentStream, OperationMessage, OperationRequestMessage,
    OperationResponseMessage,
};
pub use multipart::MultipartBatchFormat;
pub use output::BatchOutput;
pub use settings::BatchWriterSettings;
pub use writer::BatchWriter;

// Re-export core types
pub use odata_batch_core::{
    BatchError, BatchPayloadUriOption, BatchWriterState, ContentIdRegistry, ErrorKind,
    InStreamError, MessageQuotas, OperationUri, validate_transition,
};

// Re-export several crates
pub use http;
pub use url;

pub mod prelude {
    //! A prelude for `odata-batch` providing the most common types.
    pub use crate::format::BatchFormat;
    pub use crate::message::{OperationContentStream, OperationRequestMessage, OperationResponseMessage};
    pub use crate::settings::BatchWriterSettings;
    pub use crate::writer::BatchWriter;
    pub use odata_batch_core::{
        BatchError, BatchPayloadUriOption, BatchWriterState, InStreamError, MessageQuotas,
    };
}
