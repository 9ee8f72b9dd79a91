use tonic::Code;

use crate::proto::check_response::HttpResponse;
use crate::proto::{
    CheckResponse, DeniedHttpResponse, HeaderValue, HeaderValueOption, HttpStatus,
    OkHttpResponse, RpcStatus, StatusCode,
};

use super::{Decision, HeaderMutation};

impl From<&HeaderMutation> for HeaderValueOption {
    fn from(mutation: &HeaderMutation) -> Self {
        HeaderValueOption {
            header: Some(HeaderValue {
                key: mutation.key.clone(),
                value: mutation.value.clone(),
            }),
        }
    }
}

fn header_options(headers: &[HeaderMutation]) -> Vec<HeaderValueOption> {
    headers.iter().map(HeaderValueOption::from).collect()
}

/// Maps an HTTP status onto Envoy's enum, falling back to `Forbidden` for
/// codes we don't carry. Denials never go out with an unset status.
fn status_code(http_status: u16) -> StatusCode {
    StatusCode::try_from(i32::from(http_status)).unwrap_or(StatusCode::Forbidden)
}

impl Decision {
    /// Returns the outer gRPC code paired with this decision.
    pub fn rpc_code(&self) -> Code {
        match self {
            Decision::Allowed { .. } => Code::Ok,
            Decision::Denied { .. } => Code::PermissionDenied,
        }
    }

    /// Lowers the decision onto the wire message. `http_response` is always
    /// set, and the outer status agrees with the chosen arm.
    pub fn into_check_response(self) -> CheckResponse {
        let status = Some(RpcStatus {
            code: self.rpc_code() as i32,
            message: String::new(),
        });
        let http_response = match self {
            Decision::Allowed { headers } => HttpResponse::OkResponse(OkHttpResponse {
                headers: header_options(&headers),
                headers_to_remove: Vec::new(),
            }),
            Decision::Denied {
                http_status,
                body,
                headers,
            } => HttpResponse::DeniedResponse(DeniedHttpResponse {
                status: Some(HttpStatus {
                    code: status_code(http_status) as i32,
                }),
                headers: header_options(&headers),
                body,
            }),
        };

        CheckResponse {
            status,
            http_response: Some(http_response),
        }
    }
}
