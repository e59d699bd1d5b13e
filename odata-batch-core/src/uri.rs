//! Operation request URI resolution.
//!
//! Operation URLs in a batch are either absolute, relative to the service base
//! URI, or a `$<id>` reference to an operation declared earlier in the same
//! changeset. [`create_operation_request_uri`] turns the caller's string into
//! an [`OperationUri`], and [`OperationUri::request_target`] renders it for the
//! embedded request line according to a [`BatchPayloadUriOption`].

use serde::{Deserialize, Serialize};
use url::{Position, Url};

use crate::content_id::ContentIdRegistry;
use crate::error::BatchError;

/// How the URL of an embedded request is written on its request line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPayloadUriOption {
    /// `POST http://host/service/Orders HTTP/1.1`
    #[default]
    AbsoluteUri,
    /// `POST /service/Orders HTTP/1.1` followed by a `Host: host:port` header.
    AbsoluteUriUsingHostHeader,
    /// `POST Orders HTTP/1.1`, relative to the configured base URI.
    RelativeUri,
}

/// A resolved operation request URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationUri {
    /// An absolute URL, possibly produced by joining with the base URI.
    Absolute(Url),
    /// A `$<id>` reference to an earlier operation of the same changeset,
    /// emitted verbatim.
    ContentIdReference(String),
}

/// The rendered request line target of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestTarget {
    /// Text written between the method and the HTTP version.
    pub target: String,
    /// Value of the `Host` header to add, if the target omits the authority.
    pub host: Option<String>,
}

impl OperationUri {
    /// Get the URL as a string.
    pub fn as_str(&self) -> &str {
        match self {
            OperationUri::Absolute(url) => url.as_str(),
            OperationUri::ContentIdReference(reference) => reference,
        }
    }

    /// Whether this is a Content-ID reference.
    pub fn is_content_id_reference(&self) -> bool {
        matches!(self, OperationUri::ContentIdReference(_))
    }

    /// Render the request line target for the given option.
    ///
    /// Content-ID references are always written verbatim. A relative target
    /// that cannot be expressed against `base_uri` falls back to the absolute
    /// URL.
    pub fn request_target(
        &self,
        option: BatchPayloadUriOption,
        base_uri: Option<&Url>,
    ) -> RequestTarget {
        let url = match self {
            OperationUri::ContentIdReference(reference) => {
                return RequestTarget {
                    target: reference.clone(),
                    host: None,
                };
            }
            OperationUri::Absolute(url) => url,
        };

        match option {
            BatchPayloadUriOption::AbsoluteUri => RequestTarget {
                target: url.as_str().to_owned(),
                host: None,
            },
            BatchPayloadUriOption::AbsoluteUriUsingHostHeader => {
                let host = url.host_str().map(|host| match url.port_or_known_default() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_owned(),
                });
                RequestTarget {
                    target: url[Position::BeforePath..Position::AfterQuery].to_owned(),
                    host,
                }
            }
            BatchPayloadUriOption::RelativeUri => {
                let relative = base_uri.and_then(|base| url.as_str().strip_prefix(base.as_str()));
                RequestTarget {
                    target: relative.unwrap_or(url.as_str()).to_owned(),
                    host: None,
                }
            }
        }
    }
}

impl std::fmt::Display for OperationUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the URL of an operation request.
///
/// - A `$<id>` reference to a registered Content-ID resolves to itself.
/// - An absolute URL is used as is.
/// - Any other relative URL is joined with `base_uri`, and fails when no base
///   URI is configured.
///
/// # Example
///
/// ```
/// use odata_batch_core::{ContentIdRegistry, OperationUri, create_operation_request_uri};
/// use url::Url;
///
/// let base = Url::parse("http://host/service/").unwrap();
/// let mut registry = ContentIdRegistry::new();
/// registry.add_content_id("1").unwrap();
///
/// let uri = create_operation_request_uri("Orders", Some(&base), &registry).unwrap();
/// assert_eq!(uri.as_str(), "http://host/service/Orders");
///
/// let uri = create_operation_request_uri("$1/Items", Some(&base), &registry).unwrap();
/// assert_eq!(uri, OperationUri::ContentIdReference("$1/Items".into()));
/// ```
pub fn create_operation_request_uri(
    uri: &str,
    base_uri: Option<&Url>,
    registry: &ContentIdRegistry,
) -> Result<OperationUri, BatchError> {
    if uri.is_empty() {
        return Err(BatchError::MissingUri);
    }

    if registry.resolve_reference(uri).is_some() {
        // Written verbatim on the request line.
        if uri.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(BatchError::InvalidUri {
                uri: uri.to_owned(),
                reason: "Content-ID reference contains whitespace or control characters"
                    .to_owned(),
            });
        }
        return Ok(OperationUri::ContentIdReference(uri.to_owned()));
    }

    match Url::parse(uri) {
        Ok(url) => Ok(OperationUri::Absolute(url)),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let Some(base) = base_uri else {
                return Err(if uri.starts_with('$') {
                    BatchError::RelativeUriStartingWithDollarWithoutBaseUri(uri.to_owned())
                } else {
                    BatchError::RelativeUriWithoutBaseUri(uri.to_owned())
                });
            };
            base.join(uri)
                .map(OperationUri::Absolute)
                .map_err(|e| BatchError::InvalidUri {
                    uri: uri.to_owned(),
                    reason: e.to_string(),
                })
        }
        Err(e) => Err(BatchError::InvalidUri {
            uri: uri.to_owned(),
            reason: e.to_string(),
        }),
    }
}

/// Normalize a service base URI so relative operation URLs join beneath it.
///
/// `http://host/service` becomes `http://host/service/`.
pub fn ensure_trailing_slash(mut base_uri: Url) -> Url {
    if !base_uri.path().ends_with('/') {
        let path = format!("{}/", base_uri.path());
        base_uri.set_path(&path);
    }
    base_uri
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://host/service/").unwrap()
    }

    #[test]
    fn test_absolute_uri_kept() {
        let registry = ContentIdRegistry::new();
        let uri =
            create_operation_request_uri("https://other/Orders(1)", Some(&base()), &registry)
                .unwrap();
        assert_eq!(uri.as_str(), "https://other/Orders(1)");
    }

    #[test]
    fn test_relative_uri_joined() {
        let registry = ContentIdRegistry::new();
        let uri = create_operation_request_uri("Orders?$top=1", Some(&base()), &registry).unwrap();
        assert_eq!(uri.as_str(), "http://host/service/Orders?$top=1");

        let uri = create_operation_request_uri("/Orders", Some(&base()), &registry).unwrap();
        assert_eq!(uri.as_str(), "http://host/Orders");
    }

    #[test]
    fn test_empty_uri_rejected() {
        let registry = ContentIdRegistry::new();
        let err = create_operation_request_uri("", Some(&base()), &registry).unwrap_err();
        assert!(matches!(err, BatchError::MissingUri));
    }

    #[test]
    fn test_relative_uri_without_base() {
        let registry = ContentIdRegistry::new();

        let err = create_operation_request_uri("Orders", None, &registry).unwrap_err();
        assert!(matches!(err, BatchError::RelativeUriWithoutBaseUri(_)));

        let err = create_operation_request_uri("$1/Items", None, &registry).unwrap_err();
        assert!(matches!(
            err,
            BatchError::RelativeUriStartingWithDollarWithoutBaseUri(_)
        ));
    }

    #[test]
    fn test_content_id_reference_needs_no_base() {
        let mut registry = ContentIdRegistry::new();
        registry.add_content_id("1").unwrap();

        let uri = create_operation_request_uri("$1/Items", None, &registry).unwrap();
        assert!(uri.is_content_id_reference());
        assert_eq!(uri.to_string(), "$1/Items");
    }

    #[test]
    fn test_content_id_reference_with_line_break_rejected() {
        let mut registry = ContentIdRegistry::new();
        registry.add_content_id("1").unwrap();

        let err = create_operation_request_uri("$1/Orders HTTP/1.1\r\n\r\n--evil", None, &registry)
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidUri { ref uri, .. } if uri.starts_with("$1/")));

        let err = create_operation_request_uri("$1 /Items", None, &registry).unwrap_err();
        assert!(matches!(err, BatchError::InvalidUri { .. }));
    }

    #[test]
    fn test_unknown_reference_joined_with_base() {
        let registry = ContentIdRegistry::new();
        let uri = create_operation_request_uri("$9", Some(&base()), &registry).unwrap();
        assert_eq!(uri.as_str(), "http://host/service/$9");
    }

    #[test]
    fn test_request_target_absolute() {
        let uri = OperationUri::Absolute(Url::parse("http://host/service/Orders").unwrap());
        let target = uri.request_target(BatchPayloadUriOption::AbsoluteUri, Some(&base()));
        assert_eq!(target.target, "http://host/service/Orders");
        assert_eq!(target.host, None);
    }

    #[test]
    fn test_request_target_host_header() {
        let uri = OperationUri::Absolute(Url::parse("http://host:8080/service/Orders?$top=2").unwrap());
        let target =
            uri.request_target(BatchPayloadUriOption::AbsoluteUriUsingHostHeader, None);
        assert_eq!(target.target, "/service/Orders?$top=2");
        assert_eq!(target.host.as_deref(), Some("host:8080"));

        let uri = OperationUri::Absolute(Url::parse("http://host/Orders").unwrap());
        let target =
            uri.request_target(BatchPayloadUriOption::AbsoluteUriUsingHostHeader, None);
        assert_eq!(target.host.as_deref(), Some("host:80"));
    }

    #[test]
    fn test_request_target_relative() {
        let uri = OperationUri::Absolute(Url::parse("http://host/service/Orders(1)").unwrap());
        let target = uri.request_target(BatchPayloadUriOption::RelativeUri, Some(&base()));
        assert_eq!(target.target, "Orders(1)");

        let uri = OperationUri::Absolute(Url::parse("http://elsewhere/Orders").unwrap());
        let target = uri.request_target(BatchPayloadUriOption::RelativeUri, Some(&base()));
        assert_eq!(target.target, "http://elsewhere/Orders");
    }

    #[test]
    fn test_request_target_reference_verbatim() {
        let uri = OperationUri::ContentIdReference("$1/Items".into());
        for option in [
            BatchPayloadUriOption::AbsoluteUri,
            BatchPayloadUriOption::AbsoluteUriUsingHostHeader,
            BatchPayloadUriOption::RelativeUri,
        ] {
            let target = uri.request_target(option, Some(&base()));
            assert_eq!(target.target, "$1/Items");
            assert_eq!(target.host, None);
        }
    }

    #[test]
    fn test_ensure_trailing_slash() {
        let url = ensure_trailing_slash(Url::parse("http://host/service").unwrap());
        assert_eq!(url.as_str(), "http://host/service/");

        let url = ensure_trailing_slash(Url::parse("http://host/service/").unwrap());
        assert_eq!(url.as_str(), "http://host/service/");
    }
}
