//! Embedded request message of a batch operation.
use http::{HeaderMap, HeaderValue, Method, header};
use odata_batch_core::{BatchError, OperationUri, RequestTarget};

/// An HTTP request embedded in a batch payload.
///
/// Returned by [`BatchWriter::create_operation_request_message`]. Headers may
/// be added until the message head is written, which happens when the content
/// stream is requested or when the next part of the batch starts.
///
/// [`BatchWriter::create_operation_request_message`]: crate::BatchWriter::create_operation_request_message
#[derive(Debug, Clone)]
pub struct OperationRequestMessage {
    method: Method,
    uri: OperationUri,
    request_target: String,
    headers: HeaderMap,
    content_id: Option<String>,
}

impl OperationRequestMessage {
    pub(crate) fn new(
        method: Method,
        uri: OperationUri,
        target: RequestTarget,
        content_id: Option<String>,
    ) -> Result<Self, BatchError> {
        let mut headers = HeaderMap::new();
        if let Some(host) = target.host {
            let value = HeaderValue::from_str(&host).map_err(|e| BatchError::InvalidUri {
                uri: uri.to_string(),
                reason: format!("invalid host header value: {e}"),
            })?;
            headers.insert(header::HOST, value);
        }

        Ok(Self {
            method,
            uri,
            request_target: target.target,
            headers,
            content_id,
        })
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The resolved request URL.
    pub fn uri(&self) -> &OperationUri {
        &self.uri
    }

    /// The text written on the request line.
    pub fn request_target(&self) -> &str {
        &self.request_target
    }

    /// The Content-ID of this operation. Always `None` for `GET`.
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_host_header_added() {
        let uri = OperationUri::Absolute(Url::parse("http://host:81/Orders").unwrap());
        let target = RequestTarget {
            target: "/Orders".into(),
            host: Some("host:81".into()),
        };
        let message = OperationRequestMessage::new(Method::POST, uri, target, Some("1".into()))
            .unwrap();

        assert_eq!(*message.method(), Method::POST);
        assert_eq!(message.request_target(), "/Orders");
        assert_eq!(message.headers()[header::HOST], "host:81");
        assert_eq!(message.content_id(), Some("1"));
    }

    #[test]
    fn test_no_host_header_for_absolute_target() {
        let uri = OperationUri::ContentIdReference("$1".into());
        let target = RequestTarget {
            target: "$1".into(),
            host: None,
        };
        let mut message = OperationRequestMessage::new(Method::DELETE, uri, target, None).unwrap();
        assert!(message.headers().is_empty());

        message
            .headers_mut()
            .insert(header::IF_MATCH, HeaderValue::from_static("*"));
        assert_eq!(message.headers().len(), 1);
    }
}
