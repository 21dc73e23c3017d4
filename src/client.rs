use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;
use crate::models::ResumeFile;

pub const APPLICATION_PATH: &str = "/api/v1/application/post";
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Application submitted successfully!";

/// Everything that goes over the wire, text fields already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cover_letter: String,
    pub resume: ResumeFile,
    pub job_id: String,
}

impl ApplicationPayload {
    /// First 100 characters of the cover letter, for logs.
    pub fn cover_letter_preview(&self) -> String {
        let head: String = self.cover_letter.chars().take(100).collect();
        format!("{}...", head)
    }
}

/// A response the server actually sent, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ServerReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one application. Implementations report an HTTP error status as a
/// normal reply; `Err` means no response was obtained.
pub trait Transport {
    fn post_application(
        &self,
        payload: &ApplicationPayload,
    ) -> impl Future<Output = Result<ServerReply, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// `token` is the session cookie sent with every request.
    pub fn new(api_base: &str, timeout: Duration, token: Option<&str>) -> Result<Self, TransportError> {
        let endpoint = Url::parse(api_base)
            .and_then(|base| base.join(APPLICATION_PATH))
            .map_err(|e| TransportError::Construction(Box::new(e)))?;

        let jar = Arc::new(Jar::default());
        if let Some(token) = token {
            jar.add_cookie_str(&format!("token={}; Path=/", token), &endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_provider(jar)
            .build()
            .map_err(|e| TransportError::Construction(Box::new(e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn build_form(payload: &ApplicationPayload) -> Result<Form, TransportError> {
        let bytes = tokio::fs::read(&payload.resume.path)
            .await
            .map_err(|e| TransportError::Construction(Box::new(e)))?;

        let resume = Part::bytes(bytes)
            .file_name(payload.resume.file_name.clone())
            .mime_str(&payload.resume.content_type)
            .map_err(classify)?;

        Ok(Form::new()
            .text("name", payload.name.clone())
            .text("email", payload.email.clone())
            .text("phone", payload.phone.clone())
            .text("address", payload.address.clone())
            .text("coverLetter", payload.cover_letter.clone())
            .part("resume", resume)
            .text("jobId", payload.job_id.clone()))
    }
}

impl Transport for HttpTransport {
    async fn post_application(&self, payload: &ApplicationPayload) -> Result<ServerReply, TransportError> {
        let form = Self::build_form(payload).await?;

        debug!(endpoint = %self.endpoint, "posting application");
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::NoResponse(Box::new(e)))?;

        Ok(ServerReply {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body,
        })
    }
}

// Anything that fails while the request is still being put together is a
// construction failure; the rest means the server never answered.
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Construction(Box::new(err))
    } else {
        TransportError::NoResponse(Box::new(err))
    }
}

// --- Response bodies ---

// Bodies that are not JSON are kept as raw text.
fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The server's `message`, or the stock success text.
pub fn success_message(body: &str) -> String {
    let data = parse_body(body);
    data.get("message")
        .filter(|v| is_truthy(v))
        .map(display_value)
        .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string())
}

/// Picks the text to show for an error response: `message`, then `error`,
/// then the whole body, then the bare status.
pub fn rejection_message(status: u16, body: &str) -> String {
    let data = parse_body(body);
    data.get("message")
        .filter(|v| is_truthy(v))
        .or_else(|| data.get("error").filter(|v| is_truthy(v)))
        .or_else(|| Some(&data).filter(|v| is_truthy(v)))
        .map(display_value)
        .unwrap_or_else(|| format!("Server error: {}", status))
}
