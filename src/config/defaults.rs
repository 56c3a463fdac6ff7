//! Fallback values for unset settings

use std::time::Duration;

/// Port used when the configured bind port is zero
pub const DEFAULT_PORT: u16 = 4444;

/// Issuer used when none is configured
pub const DEFAULT_ISSUER: &str = "hydra";

/// Lifespan of issued access tokens
pub const ACCESS_TOKEN_LIFESPAN: Duration = Duration::from_secs(60 * 60);

/// Minimum accepted length of the system secret, in bytes
pub const MIN_SECRET_LEN: usize = 8;

/// Length of a freshly generated system secret
pub const GENERATED_SECRET_LEN: usize = 32;

/// Scopes requested by the client-credentials grant
pub const DEFAULT_SCOPES: &[&str] = &["core", "hydra"];

/// Path segments of the token endpoint, relative to the cluster URL
pub const TOKEN_ENDPOINT: &[&str] = &["oauth2", "token"];

/// File name of the persisted settings document
pub const SETTINGS_FILE_NAME: &str = ".hydra.yml";

/// File name of the persisted generated secret, next to the settings file
pub const SECRET_FILE_NAME: &str = ".hydra.secret";

pub fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}
