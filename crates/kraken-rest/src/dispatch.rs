//! Sending prepared requests and decoding Kraken's response envelope
//!
//! Every Kraken REST response has the shape `{"error": [...], "result": ...}`.
//! Decoding follows a fixed order:
//!
//! 1. A body that is not an envelope is a transport failure
//!    ([`TransportError::Status`] for non-2xx responses, otherwise
//!    [`TransportError::MalformedBody`]).
//! 2. A non-empty `error` array is an [`RestError::Api`], whatever else the
//!    body carries.
//! 3. A non-2xx status with an empty `error` array is a transport failure.
//! 4. The `result` is decoded into the endpoint's output type; a missing or
//!    mismatched result is a [`RestError::Deserialization`].

use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::error::{RestError, RestResult};
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::types::ApiResponse;

/// Longest body excerpt kept in transport errors
const BODY_EXCERPT: usize = 256;

/// Hands requests to a transport and decodes what comes back
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send `request` and decode its result as `T`
    pub async fn dispatch<T: DeserializeOwned>(&self, request: HttpRequest) -> RestResult<T> {
        let response = self.transport.execute(request).await?;
        decode(&response)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Decode a raw response into the endpoint's output type
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> RestResult<T> {
    trace!(status = response.status, len = response.body.len(), "Decoding response");

    let envelope: ApiResponse = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) if response.is_success() => {
            warn!(error = %e, "Response is not a Kraken envelope");
            return Err(TransportError::MalformedBody(e.to_string()).into());
        }
        Err(_) => return Err(status_error(response).into()),
    };

    if !envelope.error.is_empty() {
        warn!(errors = ?envelope.error, "Kraken returned errors");
        return Err(RestError::from_api_errors(envelope.error));
    }

    if !response.is_success() {
        return Err(status_error(response).into());
    }

    let result = envelope
        .result
        .ok_or_else(|| RestError::Deserialization("response has no result".to_string()))?;

    serde_json::from_value(result).map_err(|e| RestError::Deserialization(e.to_string()))
}

fn status_error(response: &HttpResponse) -> TransportError {
    let body = String::from_utf8_lossy(&response.body);
    let excerpt = match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => &body,
    };
    TransportError::Status {
        status: response.status,
        body: excerpt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpMethod, MockTransport};
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Time {
        unixtime: i64,
    }

    #[test]
    fn test_decode_result() {
        let response = HttpResponse::ok(r#"{"error":[],"result":{"unixtime":1688669448}}"#);
        let time: Time = decode(&response).unwrap();
        assert_eq!(time.unixtime, 1688669448);
    }

    #[test]
    fn test_error_array_wins_over_result() {
        let response = HttpResponse::ok(
            r#"{"error":["EGeneral:Invalid arguments","EAPI:Rate limit exceeded"],"result":{"unixtime":1}}"#,
        );
        let err = decode::<Time>(&response).unwrap_err();
        let api = err.api_error().expect("api error");
        assert_eq!(
            api.messages(),
            ["EGeneral:Invalid arguments", "EAPI:Rate limit exceeded"]
        );
    }

    #[test]
    fn test_error_array_on_error_status_is_api_error() {
        let response = HttpResponse::new(500, r#"{"error":["EService:Unavailable"]}"#);
        let err = decode::<Time>(&response).unwrap_err();
        assert!(matches!(err, RestError::Api(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_malformed_body_is_transport_error() {
        let response = HttpResponse::ok("<html>maintenance</html>");
        let err = decode::<Time>(&response).unwrap_err();
        assert!(matches!(
            err,
            RestError::Transport(TransportError::MalformedBody(_))
        ));
        assert!(err.api_error().is_none());
    }

    #[test]
    fn test_bad_status_without_envelope() {
        let response = HttpResponse::new(502, "Bad Gateway");
        let err = decode::<Time>(&response).unwrap_err();
        assert!(matches!(
            err,
            RestError::Transport(TransportError::Status { status: 502, ref body }) if body == "Bad Gateway"
        ));
    }

    #[test]
    fn test_bad_status_with_empty_errors() {
        let response = HttpResponse::new(503, r#"{"error":[]}"#);
        let err = decode::<Time>(&response).unwrap_err();
        assert!(matches!(
            err,
            RestError::Transport(TransportError::Status { status: 503, .. })
        ));
    }

    #[test]
    fn test_missing_or_mismatched_result() {
        let missing = HttpResponse::ok(r#"{"error":[]}"#);
        assert!(matches!(
            decode::<Time>(&missing),
            Err(RestError::Deserialization(_))
        ));

        let mismatched = HttpResponse::ok(r#"{"error":[],"result":["not","an","object"]}"#);
        assert!(matches!(
            decode::<Time>(&mismatched),
            Err(RestError::Deserialization(_))
        ));
    }

    #[test]
    fn test_dictionary_result() {
        let response = HttpResponse::ok(r#"{"error":[],"result":{"ZUSD":"171288.6158","XXBT":"0.0000000000"}}"#);
        let balances: HashMap<String, String> = decode(&response).unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["ZUSD"], "171288.6158");
    }

    #[test]
    fn test_status_excerpt_is_bounded() {
        let response = HttpResponse::new(500, "x".repeat(1000));
        match decode::<Time>(&response) {
            Err(RestError::Transport(TransportError::Status { body, .. })) => {
                assert_eq!(body.len(), BODY_EXCERPT)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_surfaces_transport_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error(TransportError::Timeout);
        let dispatcher = Dispatcher::new(transport);

        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "https://mock.test/0/public/Time".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let result = dispatcher.dispatch::<Time>(request).await;
        assert!(matches!(
            result,
            Err(RestError::Transport(TransportError::Timeout))
        ));
    }
}
