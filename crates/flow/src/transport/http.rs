//! reqwest-based transport speaking the JSON 1.0 envelope

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{instrument, trace};

use super::{SwsTransport, TransportError};
use crate::model::{
    ActivityTaskStatus, PollForActivityTaskRequest, PollForActivityTaskResponse,
    PollForDecisionTaskRequest, PollForDecisionTaskResponse, RecordActivityTaskHeartbeatRequest,
    RespondActivityTaskCanceledRequest, RespondActivityTaskCompletedRequest,
    RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest, Run,
    StartWorkflowExecutionRequest, SwsRequest,
};
use crate::reliability::RetryPolicy;

const CONTENT_TYPE_JSON_10: &str = "application/x-amz-json-1.0";
const TARGET_PREFIX: &str = "SimpleWorkflowService";

/// Client timeout; must outlast the service's 60 s long poll
const REQUEST_TIMEOUT: Duration = Duration::from_secs(70);

/// Signs an outgoing request in place
///
/// Credential discovery and the signature algorithm live outside this crate.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: &mut reqwest::Request) -> Result<(), TransportError>;
}

/// Error body returned by the service
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// JSON envelope transport over HTTPS
///
/// # Example
///
/// ```ignore
/// use sws_flow::transport::HttpTransport;
///
/// let transport = HttpTransport::new("us-east-1")?
///     .with_signer(Arc::new(MySigner::from_env()));
/// ```
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    signer: Option<Arc<dyn RequestSigner>>,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport for the regional endpoint
    pub fn new(region: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("https://swf.{region}.amazonaws.com/"),
            signer: None,
            retry: RetryPolicy::transport(),
        })
    }

    /// Override the endpoint (local emulators, VPC endpoints)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Attach a request signer
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Set the retry policy for transient failures
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a typed request, retrying transient failures
    pub async fn call<R: SwsRequest>(&self, request: &R) -> Result<R::Response, TransportError> {
        self.retry
            .run_when(R::TARGET, TransportError::is_transient, || {
                self.send_once(request)
            })
            .await
    }

    #[instrument(skip(self, request), fields(action = R::TARGET))]
    async fn send_once<R: SwsRequest>(&self, request: &R) -> Result<R::Response, TransportError> {
        let body = serde_json::to_vec(request)?;

        let mut http_request = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{}", R::TARGET))
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_10)
            .body(body)
            .build()?;

        if let Some(signer) = &self.signer {
            signer.sign(&mut http_request)?;
        }

        let response = self.client.execute(http_request).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        trace!(status = status.as_u16(), len = bytes.len(), "response received");

        if !status.is_success() {
            return Err(service_error(status.as_u16(), &bytes));
        }

        decode_body(&bytes)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("signed", &self.signer.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Decode a success body; an empty body reads as `{}`
fn decode_body<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };
    Ok(serde_json::from_slice(body)?)
}

fn service_error(status: u16, bytes: &[u8]) -> TransportError {
    match serde_json::from_slice::<ServiceErrorBody>(bytes) {
        Ok(body) => TransportError::Service {
            status,
            code: body.error_type,
            message: body.message,
        },
        Err(_) => TransportError::Service {
            status,
            code: String::new(),
            message: String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

#[async_trait]
impl SwsTransport for HttpTransport {
    async fn poll_for_decision_task(
        &self,
        request: PollForDecisionTaskRequest,
    ) -> Result<PollForDecisionTaskResponse, TransportError> {
        self.call(&request).await
    }

    async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
    ) -> Result<PollForActivityTaskResponse, TransportError> {
        self.call(&request).await
    }

    async fn respond_decision_task_completed(
        &self,
        request: RespondDecisionTaskCompletedRequest,
    ) -> Result<(), TransportError> {
        self.call(&request).await.map(|_| ())
    }

    async fn respond_activity_task_completed(
        &self,
        request: RespondActivityTaskCompletedRequest,
    ) -> Result<(), TransportError> {
        self.call(&request).await.map(|_| ())
    }

    async fn respond_activity_task_failed(
        &self,
        request: RespondActivityTaskFailedRequest,
    ) -> Result<(), TransportError> {
        self.call(&request).await.map(|_| ())
    }

    async fn respond_activity_task_canceled(
        &self,
        request: RespondActivityTaskCanceledRequest,
    ) -> Result<(), TransportError> {
        self.call(&request).await.map(|_| ())
    }

    async fn record_activity_task_heartbeat(
        &self,
        request: RecordActivityTaskHeartbeatRequest,
    ) -> Result<ActivityTaskStatus, TransportError> {
        self.call(&request).await
    }

    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> Result<Run, TransportError> {
        self.call(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmptyResponse;

    #[test]
    fn test_regional_endpoint() {
        let transport = HttpTransport::new("eu-west-1").unwrap();
        assert_eq!(transport.endpoint(), "https://swf.eu-west-1.amazonaws.com/");

        let transport = transport.with_endpoint("http://localhost:8080/");
        assert_eq!(transport.endpoint(), "http://localhost:8080/");
    }

    #[test]
    fn test_empty_body_decodes() {
        let decoded: EmptyResponse = decode_body(b"").unwrap();
        assert_eq!(decoded, EmptyResponse {});

        let status: ActivityTaskStatus = decode_body(b"  \n").unwrap();
        assert!(!status.cancel_requested);
    }

    #[test]
    fn test_service_error_parsing() {
        let err = service_error(
            400,
            br#"{"__type":"com.amazonaws.swf.base.model#UnknownResourceFault","message":"Unknown domain: prod"}"#,
        );
        assert_eq!(
            err,
            TransportError::Service {
                status: 400,
                code: "com.amazonaws.swf.base.model#UnknownResourceFault".to_string(),
                message: "Unknown domain: prod".to_string(),
            }
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unparseable_error_body() {
        let err = service_error(502, b"<html>Bad Gateway</html>");
        assert!(matches!(err, TransportError::Service { status: 502, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_debug_hides_signer() {
        let transport = HttpTransport::new("us-east-1").unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("signed: false"));
    }
}
