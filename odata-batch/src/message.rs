//! Operation message types for batch requests and responses.
//!
//! A batch writer keeps at most one operation open at a time. The open
//! operation holds either a request message or a response message, and its
//! content stream moves through `not requested -> requested -> disposed`.

mod request;
mod response;
mod stream;

pub use request::OperationRequestMessage;
pub use response::OperationResponseMessage;
pub use stream::OperationContentStream;

use http::HeaderMap;

/// The message of the currently open operation.
#[derive(Debug, Clone)]
pub enum OperationMessage {
    /// An embedded HTTP request.
    Request(OperationRequestMessage),
    /// An embedded HTTP response.
    Response(OperationResponseMessage),
}

impl OperationMessage {
    /// The Content-ID declared for this operation, if any.
    pub fn content_id(&self) -> Option<&str> {
        match self {
            OperationMessage::Request(message) => message.content_id(),
            OperationMessage::Response(message) => message.content_id(),
        }
    }

    /// The headers of the embedded message.
    pub fn headers(&self) -> &HeaderMap {
        match self {
            OperationMessage::Request(message) => message.headers(),
            OperationMessage::Response(message) => message.headers(),
        }
    }

    /// Whether this is a request message.
    pub fn is_request(&self) -> bool {
        matches!(self, OperationMessage::Request(_))
    }
}

/// Lifecycle of an operation's content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentStreamState {
    /// The stream has not been requested yet.
    #[default]
    NotRequested,
    /// The stream is open; the writer rejects every other call.
    Requested,
    /// The stream was released.
    Disposed,
}

/// The operation currently being written.
#[derive(Debug)]
pub(crate) struct OpenOperation {
    pub(crate) message: OperationMessage,
    /// Whether the start line and headers have been written.
    pub(crate) head_written: bool,
    pub(crate) stream_state: ContentStreamState,
}

impl OpenOperation {
    pub(crate) fn new(message: OperationMessage) -> Self {
        Self {
            message,
            head_written: false,
            stream_state: ContentStreamState::NotRequested,
        }
    }
}
