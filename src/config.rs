/// Discovery service endpoint for the 0.1 describe API.
pub const DEFAULT_DISCOVERY_URL: &str = "http://www.googleapis.com/discovery/0.1/describe";

pub const DEFAULT_USER_AGENT: &str = "discovery-cli";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub discovery_url: String,
    pub user_agent: String,
    pub timeout_secs: Option<u64>,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            discovery_url: DEFAULT_DISCOVERY_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
