use crate::config::ClientConfig;
use crate::error::{DiscoveryError, Result};
use crate::request::HttpRequest;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::time::Duration;
use url::Url;

/// HTTP transport used to fetch discovery documents and run built requests.
///
/// Passed explicitly to every operation that touches the network.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// GETs `url` and yields the response body as a stream.
    fn get(&self, url: &Url) -> Result<Box<dyn Read>>;

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub content_type: String,
}

pub struct HttpClient {
    headers: HeaderMap,
    client: Client,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DiscoveryError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| DiscoveryError::InvalidHeader(format!("{name}: {value}")))?;
            headers.insert(header_name, header_value);
        }

        Ok(Self { headers, client })
    }
}

impl Transport for HttpClient {
    fn get(&self, url: &Url) -> Result<Box<dyn Read>> {
        let resp = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(error_from_body(&text).unwrap_or(DiscoveryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }
        Ok(Box::new(resp))
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut req = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(self.headers.clone());
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send()?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect::<Vec<_>>();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let text = resp.text()?;
        Ok(HttpResponse {
            status,
            headers,
            body: parse_body(&text, &content_type),
            content_type,
        })
    }
}

pub(crate) fn parse_body(text: &str, content_type: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    if content_type.contains("json") {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    } else {
        Value::String(text.to_string())
    }
}

/// JSON-C error object: `{"error": {"code": 404, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl From<ErrorObject> for DiscoveryError {
    fn from(err: ErrorObject) -> Self {
        DiscoveryError::Api {
            code: err.code,
            message: err.message,
        }
    }
}

fn error_from_body(text: &str) -> Option<DiscoveryError> {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorObject,
    }
    serde_json::from_str::<Envelope>(text)
        .ok()
        .map(|envelope| envelope.error.into())
}
