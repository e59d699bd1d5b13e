//! Changeset-scoped Content-ID registry.
//!
//! Operations inside a changeset may declare a `Content-ID`. Later operations
//! of the same changeset can then address the resource produced by that
//! operation with a `$<id>` URL, e.g. `$1/Items`. The registry holds the ids
//! that are currently referenceable and is reset at every changeset end.

use std::collections::HashSet;

use http::HeaderValue;

use crate::error::BatchError;

/// Check that a Content-ID can be written as a header value.
///
/// Empty ids and ids containing CR, LF or other control characters are
/// rejected.
///
/// ```
/// use odata_batch_core::validate_content_id;
///
/// assert!(validate_content_id("1").is_ok());
/// assert!(validate_content_id("").is_err());
/// assert!(validate_content_id("1\r\nX-Injected: yes").is_err());
/// ```
pub fn validate_content_id(content_id: &str) -> Result<(), BatchError> {
    if content_id.is_empty() || HeaderValue::from_str(content_id).is_err() {
        return Err(BatchError::InvalidContentId(content_id.to_owned()));
    }
    Ok(())
}

/// Set of Content-IDs declared by completed operations of the current changeset.
///
/// # Example
///
/// ```
/// use odata_batch_core::ContentIdRegistry;
///
/// let mut registry = ContentIdRegistry::new();
/// registry.add_content_id("1").unwrap();
///
/// assert!(registry.contains_content_id("1"));
/// assert_eq!(registry.resolve_reference("$1/Items"), Some("1"));
/// assert!(registry.add_content_id("1").is_err());
///
/// registry.reset();
/// assert!(registry.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ContentIdRegistry {
    ids: HashSet<String>,
}

impl ContentIdRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a Content-ID.
    ///
    /// Fails with [`BatchError::DuplicateContentId`] if the id is already
    /// present.
    pub fn add_content_id<S: Into<String>>(&mut self, content_id: S) -> Result<(), BatchError> {
        let content_id = content_id.into();
        if self.ids.contains(&content_id) {
            return Err(BatchError::DuplicateContentId(content_id));
        }
        self.ids.insert(content_id);
        Ok(())
    }

    /// Whether the Content-ID is registered.
    pub fn contains_content_id(&self, content_id: &str) -> bool {
        self.ids.contains(content_id)
    }

    /// Remove every registered Content-ID.
    pub fn reset(&mut self) {
        self.ids.clear();
    }

    /// Number of registered Content-IDs.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no Content-ID is registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve a `$<id>` or `$<id>/<path>` reference.
    ///
    /// Returns the referenced Content-ID when `uri` is such a reference and the
    /// id is registered, `None` otherwise.
    pub fn resolve_reference<'a>(&self, uri: &'a str) -> Option<&'a str> {
        let rest = uri.strip_prefix('$')?;
        let content_id = match rest.find('/') {
            Some(index) => &rest[..index],
            None => rest,
        };

        if !content_id.is_empty() && self.contains_content_id(content_id) {
            Some(content_id)
        } else {
            None
        }
    }
}
