pub mod response;

use crate::proto::attribute_context::HttpRequest;
use crate::proto::CheckRequest;

/// Requests carrying this header are allowed, whatever its value.
pub const TESTED_HEADER: &str = "tested-header";

/// Header added to allowed requests before they go upstream.
pub const GENERATED_HEADER: &str = "generated-header";
pub const GENERATED_HEADER_VALUE: &str = "hello world";

/// Header attached to the denial response sent back to the client.
pub const RESULT_HEADER: &str = "x-ext-authz-check-result";
pub const RESULT_DENIED: &str = "denied";

pub const DENY_BODY: &str = "denied by ext_authz";
pub const DENY_HTTP_STATUS: u16 = 403;

/// A header the proxy should set, on the upstream request when allowed or on
/// the synthesized response when denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMutation {
    pub key: String,
    pub value: String,
}

impl HeaderMutation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The outcome of a check call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request may go upstream with `headers` merged in.
    Allowed { headers: Vec<HeaderMutation> },
    /// The proxy should answer the client directly.
    Denied {
        http_status: u16,
        body: String,
        headers: Vec<HeaderMutation>,
    },
}

impl Decision {
    pub fn allow() -> Self {
        Decision::Allowed {
            headers: vec![HeaderMutation::new(
                GENERATED_HEADER,
                GENERATED_HEADER_VALUE,
            )],
        }
    }

    pub fn deny() -> Self {
        Decision::Denied {
            http_status: DENY_HTTP_STATUS,
            body: String::from(DENY_BODY),
            headers: vec![HeaderMutation::new(RESULT_HEADER, RESULT_DENIED)],
        }
    }

    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allowed { .. } => "allowed",
            Decision::Denied { .. } => "denied",
        }
    }
}

/// Returns the HTTP attributes of the request, if the proxy sent any.
pub fn http_attributes(req: &CheckRequest) -> Option<&HttpRequest> {
    req.attributes.as_ref()?.request.as_ref()?.http.as_ref()
}

/// Looks up `name` in the request headers. Header names are compared ASCII
/// case-insensitively.
pub fn find_header<'a>(req: &'a CheckRequest, name: &str) -> Option<&'a str> {
    let http = http_attributes(req)?;
    if let Some(value) = http.headers.get(name) {
        return Some(value.as_str());
    }
    http.headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Decides a check request. Only the presence of [`TESTED_HEADER`] matters;
/// anything else, including missing attributes, is denied.
pub fn decide(req: &CheckRequest) -> Decision {
    match find_header(req, TESTED_HEADER) {
        Some(_) => Decision::allow(),
        None => Decision::deny(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::proto::attribute_context::Request;
    use crate::proto::AttributeContext;

    use super::*;

    fn request_with_headers(headers: &[(&str, &str)]) -> CheckRequest {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CheckRequest {
            attributes: Some(AttributeContext {
                request: Some(Request {
                    http: Some(HttpRequest {
                        host: String::from("example.com"),
                        path: String::from("/headers"),
                        method: String::from("GET"),
                        headers,
                        ..Default::default()
                    }),
                }),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_allow_with_header() {
        let req = request_with_headers(&[("tested-header", "x")]);
        let decision = decide(&req);
        assert_eq!(
            decision,
            Decision::Allowed {
                headers: vec![HeaderMutation::new("generated-header", "hello world")],
            }
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_allow_with_empty_value() {
        let req = request_with_headers(&[("tested-header", "")]);
        assert!(decide(&req).is_allowed());
    }

    #[test]
    fn test_allow_header_case() {
        let req = request_with_headers(&[("Tested-Header", "yes"), ("accept", "*/*")]);
        assert!(decide(&req).is_allowed());
        assert_eq!(find_header(&req, TESTED_HEADER), Some("yes"));
    }

    #[test]
    fn test_deny_without_header() {
        let req = request_with_headers(&[]);
        let decision = decide(&req);
        assert_eq!(
            decision,
            Decision::Denied {
                http_status: 403,
                body: String::from("denied by ext_authz"),
                headers: vec![HeaderMutation::new("x-ext-authz-check-result", "denied")],
            }
        );
        assert_eq!(decision.label(), "denied");
    }

    #[test]
    fn test_deny_other_headers() {
        let req = request_with_headers(&[("tested-header-2", "x"), ("tested", "x")]);
        assert!(!decide(&req).is_allowed());
    }

    #[test]
    fn test_deny_missing_attributes() {
        let cases = [
            CheckRequest { attributes: None },
            CheckRequest {
                attributes: Some(AttributeContext::default()),
            },
            CheckRequest {
                attributes: Some(AttributeContext {
                    request: Some(Request { http: None }),
                    ..Default::default()
                }),
            },
        ];
        for req in cases.iter() {
            assert_eq!(http_attributes(req).map(|h| h.host.as_str()), None);
            assert_eq!(decide(req), Decision::deny());
        }
    }

    #[test]
    fn test_decide_idempotent() {
        let allowed = request_with_headers(&[("tested-header", "x")]);
        let denied = request_with_headers(&[("other", "x")]);
        for _ in 0..10 {
            assert_eq!(decide(&allowed), Decision::allow());
            assert_eq!(decide(&denied), Decision::deny());
        }
    }
}
