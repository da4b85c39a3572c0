//! Static security response headers.
//!
//! Every configured header is inserted on every response, replacing any
//! value the backend sent under the same name. Order follows the config file.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;

use crate::config::HeaderEntry;

/// Pre-parsed security headers.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    /// Parse configured entries. Validation has already rejected bad names
    /// and values; anything unparseable here is skipped with a warning.
    pub fn new(entries: &[HeaderEntry]) -> Self {
        let headers = entries
            .iter()
            .filter_map(|entry| {
                let parsed = HeaderName::try_from(entry.name.as_str())
                    .ok()
                    .zip(HeaderValue::from_str(&entry.value).ok());
                if parsed.is_none() {
                    tracing::warn!(header = %entry.name, "Skipping invalid security header");
                }
                parsed
            })
            .collect();
        Self { headers }
    }

    pub fn apply_to(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    pub fn apply<B>(&self, mut response: Response<B>) -> Response<B> {
        self.apply_to(response.headers_mut());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_security_headers;

    #[test]
    fn test_adds_every_configured_header() {
        let injector = SecurityHeaders::new(&default_security_headers());
        let response = injector.apply(Response::new(()));

        for entry in default_security_headers() {
            assert_eq!(response.headers()[entry.name.as_str()], entry.value.as_str());
        }
    }

    #[test]
    fn test_overwrites_backend_value() {
        let injector = SecurityHeaders::new(&[HeaderEntry::new("X-Frame-Options", "DENY")]);

        let mut response = Response::new(());
        response
            .headers_mut()
            .append("x-frame-options", HeaderValue::from_static("ALLOWALL"));
        response
            .headers_mut()
            .append("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));

        let response = injector.apply(response);
        let values: Vec<_> = response.headers().get_all("x-frame-options").iter().collect();
        assert_eq!(values, vec!["DENY"]);
    }

    #[test]
    fn test_leaves_other_headers_alone() {
        let injector = SecurityHeaders::new(&[HeaderEntry::new("X-Content-Type-Options", "nosniff")]);

        let mut response = Response::new(());
        response
            .headers_mut()
            .insert("content-type", HeaderValue::from_static("application/json"));

        let response = injector.apply(response);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers().len(), 2);
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let injector = SecurityHeaders::new(&[
            HeaderEntry::new("Bad Name", "x"),
            HeaderEntry::new("X-Ok", "1"),
        ]);
        let mut headers = HeaderMap::new();
        injector.apply_to(&mut headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-ok"], "1");
    }
}
