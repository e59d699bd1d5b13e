//! Embedded response message of a batch operation.
use http::{HeaderMap, StatusCode};

/// An HTTP response embedded in a batch payload.
///
/// The status defaults to `200 OK`.
#[derive(Debug, Clone)]
pub struct OperationResponseMessage {
    status: StatusCode,
    headers: HeaderMap,
    content_id: Option<String>,
}

impl OperationResponseMessage {
    pub(crate) fn new(content_id: Option<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            content_id,
        }
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The Content-ID of the request this response answers.
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_ok() {
        let message = OperationResponseMessage::new(None);
        assert_eq!(message.status(), StatusCode::OK);
        assert!(message.content_id().is_none());
    }

    #[test]
    fn test_set_status() {
        let mut message = OperationResponseMessage::new(Some("1".into()));
        message.set_status(StatusCode::CREATED);
        assert_eq!(message.status(), StatusCode::CREATED);
        assert_eq!(message.content_id(), Some("1"));
    }
}
