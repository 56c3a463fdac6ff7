use thiserror::Error;

/// Main error type for hydra bootstrap operations
#[derive(Debug, Error)]
pub enum HydraError {
    #[error("Invalid cluster URL '{url}': {details}")]
    InvalidClusterUrl { url: String, details: String },

    #[error("Could not authenticate: {0}")]
    AuthenticationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Could not fetch configuration path: {0}")]
    ConfigPathError(String),

    #[error("Secret generation failed: {0}")]
    SecretError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timed out: {0}")]
    ConnectionTimeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Operation timeout")]
    Timeout,
}

impl HydraError {
    pub fn invalid_cluster_url<S: Into<String>, D: std::fmt::Display>(url: S, details: D) -> Self {
        Self::InvalidClusterUrl {
            url: url.into(),
            details: details.to_string(),
        }
    }

    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn config_path<S: Into<String>>(msg: S) -> Self {
        Self::ConfigPathError(msg.into())
    }

    pub fn secret<S: Into<String>>(msg: S) -> Self {
        Self::SecretError(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }
}

/// Result type alias for hydra bootstrap operations
pub type Result<T> = std::result::Result<T, HydraError>;
