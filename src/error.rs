use thiserror::Error;

/// Errors raised while loading discovery documents or building requests from them.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("http {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("discovery service error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("invalid method identifier {0:?}, expected resourceName.methodName")]
    InvalidMethodIdentifier(String),

    #[error("unknown method {0}")]
    MethodNotFound(String),

    #[error("discovery document for {0} has no service definition")]
    NoServiceDefinition(String),

    #[error("invalid http method {0:?}")]
    InvalidHttpMethod(String),

    #[error("parameters must be a JSON object, got {0}")]
    InvalidParameters(String),

    #[error("missing required parameter {name} for {method}")]
    MissingParameter { method: String, name: String },
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
