//! HTTP methods allowed on embedded batch operations.

use http::Method;

use crate::error::BatchError;

/// Parse and validate the HTTP method of an operation request.
///
/// Accepts `GET`, `POST`, `PUT`, `PATCH`, `DELETE` and `MERGE`, matched
/// case-sensitively.
///
/// # Example
///
/// ```
/// use odata_batch_core::validate_http_method;
///
/// assert_eq!(validate_http_method("POST").unwrap(), http::Method::POST);
/// assert!(validate_http_method("post").is_err());
/// assert!(validate_http_method("OPTIONS").is_err());
/// ```
pub fn validate_http_method(method: &str) -> Result<Method, BatchError> {
    let invalid = || BatchError::InvalidHttpMethod(method.to_owned());

    match method {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "MERGE" => Method::from_bytes(b"MERGE").map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Whether the method is a query (read-only) method.
///
/// Query operations are not allowed inside a changeset, and a Content-ID
/// declared on one is ignored.
pub fn is_query_method(method: &Method) -> bool {
    *method == Method::GET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_methods() {
        for name in ["GET", "POST", "PUT", "PATCH", "DELETE", "MERGE"] {
            let method = validate_http_method(name).unwrap();
            assert_eq!(method.as_str(), name);
        }
    }

    #[test]
    fn test_unsupported_methods() {
        for name in ["", "HEAD", "OPTIONS", "get", "Post"] {
            let err = validate_http_method(name).unwrap_err();
            assert!(matches!(err, BatchError::InvalidHttpMethod(ref m) if m == name));
        }
    }

    #[test]
    fn test_is_query_method() {
        assert!(is_query_method(&Method::GET));
        assert!(!is_query_method(&Method::POST));
        assert!(!is_query_method(&Method::DELETE));
    }
}
