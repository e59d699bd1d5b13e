//! Writer settings - batch-wide static configuration.
//!
//! Set once when the writer is created and never changed afterwards.

use odata_batch_core::{MessageQuotas, ensure_trailing_slash};
use url::Url;

/// Batch-wide configuration for a [`BatchWriter`](crate::BatchWriter).
///
/// # Example
///
/// ```rust
/// use odata_batch::{BatchWriterSettings, MessageQuotas};
/// use url::Url;
///
/// let settings = BatchWriterSettings::new()
///     .base_uri(Url::parse("http://host/service").unwrap())
///     .quotas(MessageQuotas::new().max_parts_per_batch(10));
///
/// assert_eq!(settings.get_base_uri().unwrap().as_str(), "http://host/service/");
/// assert!(!settings.is_writing_response());
/// ```
#[derive(Clone, Debug, Default)]
pub struct BatchWriterSettings {
    /// Size quotas
    quotas: MessageQuotas,
    /// Base URI relative operation URLs are resolved against
    base_uri: Option<Url>,
    /// Whether the payload is a batch response rather than a request
    writing_response: bool,
    /// Fixed batch boundary instead of a generated one
    batch_boundary: Option<String>,
}

impl BatchWriterSettings {
    /// Create settings for writing a request batch with default quotas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings for writing a response batch with default quotas.
    pub fn for_response() -> Self {
        Self {
            writing_response: true,
            ..Self::default()
        }
    }

    /// Set the size quotas.
    pub fn quotas(mut self, quotas: MessageQuotas) -> Self {
        self.quotas = quotas;
        self
    }

    /// Set the service base URI. A trailing slash is added if missing.
    pub fn base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(ensure_trailing_slash(base_uri));
        self
    }

    /// Use a fixed batch boundary, e.g. the one already announced in the
    /// outer `Content-Type` header.
    pub fn batch_boundary<S: Into<String>>(mut self, boundary: S) -> Self {
        self.batch_boundary = Some(boundary.into());
        self
    }

    /// Returns the size quotas.
    pub fn get_quotas(&self) -> &MessageQuotas {
        &self.quotas
    }

    /// Returns the base URI, if one is set.
    pub fn get_base_uri(&self) -> Option<&Url> {
        self.base_uri.as_ref()
    }

    /// Returns the fixed batch boundary, if one is set.
    pub fn get_batch_boundary(&self) -> Option<&str> {
        self.batch_boundary.as_deref()
    }

    /// Whether a response batch is being written.
    pub fn is_writing_response(&self) -> bool {
        self.writing_response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BatchWriterSettings::default();
        assert_eq!(*settings.get_quotas(), MessageQuotas::default());
        assert!(settings.get_base_uri().is_none());
        assert!(settings.get_batch_boundary().is_none());
        assert!(!settings.is_writing_response());
    }

    #[test]
    fn test_for_response() {
        assert!(BatchWriterSettings::for_response().is_writing_response());
    }

    #[test]
    fn test_base_uri_gets_trailing_slash() {
        let settings = BatchWriterSettings::new().base_uri(Url::parse("http://host/svc").unwrap());
        assert_eq!(settings.get_base_uri().unwrap().as_str(), "http://host/svc/");
    }
}
