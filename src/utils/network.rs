use crate::error::{HydraError, Result};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("hydra-bootstrap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| HydraError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport error against the cluster into a user-facing error
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> HydraError {
    if error.is_timeout() {
        return HydraError::connection_timeout(format!(
            "Request to '{}' timed out. The cluster might be unreachable.",
            url
        ));
    }

    if error.is_connect() {
        if error
            .to_string()
            .to_lowercase()
            .contains("connection refused")
        {
            return HydraError::network(format!(
                "Connection to '{}' was refused. Is the cluster running?",
                url
            ));
        }

        return HydraError::network(format!(
            "Failed to connect to '{}'. Please check the cluster URL and your network connection.",
            url
        ));
    }

    HydraError::network(format!("Network error when calling '{}': {}", url, error))
}
