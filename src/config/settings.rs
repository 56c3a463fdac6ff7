//! Configuration settings management
//!
//! This module holds the configuration aggregate, its lazily derived state
//! (parsed cluster URL, authenticated client, generated secret), loading
//! from file and environment, and persistence.

use crate::auth::{ClientCredentials, OAuth2Client};
use crate::config::context::Context;
use crate::config::defaults::*;
use crate::config::home::{absolute_clean, config_path, PlatformHome};
use crate::config::secret::{generate_secret, FileSecretStore, SecretStore};
use crate::error::{HydraError, Result};
use crate::utils::join::join_url;
use crate::utils::network::{create_http_client, NetworkConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;
use zeroize::Zeroizing;

/// The subset of settings written to the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    #[serde(default)]
    pub cluster_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

/// Service configuration and its lazily derived runtime state
pub struct Config {
    pub bind_port: u16,
    pub bind_host: String,
    pub issuer: String,
    pub system_secret: Zeroizing<Vec<u8>>,
    pub consent_url: String,
    pub cluster_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Scopes requested by the client-credentials grant; not persisted
    pub scopes: Vec<String>,
    pub network: NetworkConfig,
    path: Option<PathBuf>,
    secret_store: Option<Arc<dyn SecretStore>>,
    cluster: Mutex<Option<Url>>,
    oauth2_client: OnceCell<Arc<OAuth2Client>>,
    generated_secret: OnceCell<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_port", &self.bind_port)
            .field("bind_host", &self.bind_host)
            .field("issuer", &self.issuer)
            .field("system_secret", &"<redacted>")
            .field("consent_url", &self.consent_url)
            .field("cluster_url", &self.cluster_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_port: 0,
            bind_host: String::new(),
            issuer: String::new(),
            system_secret: Zeroizing::new(Vec::new()),
            consent_url: String::new(),
            cluster_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes: default_scopes(),
            network: NetworkConfig::default(),
            path: None,
            secret_store: None,
            cluster: Mutex::new(None),
            oauth2_client: OnceCell::new(),
            generated_secret: OnceCell::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration bound to an explicit settings file
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Use `store` for generated system secrets instead of the secret file
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    /// Load from the settings file in the home directory and the environment
    pub async fn load() -> Result<Self> {
        let path = config_path(&PlatformHome::from_env())?;
        Self::load_from_path(path).await
    }

    /// Load from `path` (if it exists), then apply environment overrides
    pub async fn load_from_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Self::load_from_path_with(path, |key| std::env::var(key).ok()).await
    }

    /// Like [`Config::load_from_path`], reading overrides through `lookup`
    pub async fn load_from_path_with<P, F>(path: P, lookup: F) -> Result<Self>
    where
        P: Into<PathBuf>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::with_path(path);
        let path = config.settings_path()?;

        if path.exists() {
            let contents = tokio::fs::read_to_string(&path).await?;
            let persisted: PersistedSettings = serde_yaml::from_str(&contents)?;
            config.apply_persisted(persisted);
            debug!("Loaded settings from: {}", path.display());
        } else {
            debug!("No settings file at {}, using defaults", path.display());
        }

        config.apply_env(lookup);

        if config.system_secret.len() < MIN_SECRET_LEN {
            if let Some(secret) = config.secret_store()?.load().await? {
                if secret.len() >= MIN_SECRET_LEN {
                    config.system_secret = secret;
                }
            }
        }

        Ok(config)
    }

    pub fn apply_persisted(&mut self, persisted: PersistedSettings) {
        self.cluster_url = persisted.cluster_url;
        self.client_id = persisted.client_id;
        self.client_secret = persisted.client_secret;
    }

    /// Override settings from environment variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PORT") {
            match value.parse::<u16>() {
                Ok(port) => self.bind_port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {}", value),
            }
        }

        if let Some(value) = lookup("HOST") {
            self.bind_host = value;
        }

        if let Some(value) = lookup("ISSUER") {
            self.issuer = value;
        }

        if let Some(value) = lookup("SYSTEM_SECRET") {
            self.system_secret = Zeroizing::new(value.into_bytes());
        }

        if let Some(value) = lookup("CONSENT_URL") {
            self.consent_url = value;
        }

        if let Some(value) = lookup("CLUSTER_URL") {
            self.cluster_url = value;
        }

        if let Some(value) = lookup("CLIENT_ID") {
            self.client_id = value;
        }

        if let Some(value) = lookup("CLIENT_SECRET") {
            self.client_secret = value;
        }
    }

    /// Collaborator capabilities for downstream components
    pub fn context(&self) -> Context {
        Context::default()
    }

    /// Cluster URL, optionally joined with path `segments`.
    ///
    /// The raw URL is parsed on first use and cached for the lifetime of the
    /// configuration; later changes to `cluster_url` are not observed.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
        let base = {
            let mut cached = self.cluster.lock().unwrap_or_else(PoisonError::into_inner);
            match cached.as_ref() {
                Some(url) => url.clone(),
                None => {
                    let parsed = Url::parse(&self.cluster_url)
                        .map_err(|e| HydraError::invalid_cluster_url(&self.cluster_url, e))?;
                    if parsed.cannot_be_a_base() {
                        return Err(HydraError::invalid_cluster_url(
                            &self.cluster_url,
                            "URL cannot be used as a base",
                        ));
                    }
                    debug!("Resolved cluster URL: {}", parsed);
                    *cached = Some(parsed.clone());
                    parsed
                }
            }
        };

        if segments.is_empty() {
            return Ok(base);
        }
        Ok(join_url(&base, segments))
    }

    /// Client authenticated with the configured client credentials.
    ///
    /// The grant runs once; concurrent first callers wait for the same
    /// attempt and every caller receives the same client. A failed grant is
    /// not cached.
    pub async fn oauth2_client(&self) -> Result<Arc<OAuth2Client>> {
        let client = self
            .oauth2_client
            .get_or_try_init(|| async {
                let credentials = ClientCredentials {
                    client_id: self.client_id.clone(),
                    client_secret: Zeroizing::new(self.client_secret.clone()),
                    token_url: self.resolve(TOKEN_ENDPOINT)?,
                    scopes: self.scopes.clone(),
                };
                let http = create_http_client(&self.network)?;
                OAuth2Client::connect(http, credentials).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(client))
    }

    /// Like [`Config::oauth2_client`], giving up after `timeout`
    pub async fn oauth2_client_with_timeout(&self, timeout: Duration) -> Result<Arc<OAuth2Client>> {
        tokio::time::timeout(timeout, self.oauth2_client())
            .await
            .map_err(|_| HydraError::Timeout)?
    }

    /// Configured system secret, or a generated one if it is too short.
    ///
    /// A generated secret is persisted through the secret store and returned
    /// by every later call.
    pub async fn get_system_secret(&self) -> Result<Zeroizing<Vec<u8>>> {
        if self.system_secret.len() >= MIN_SECRET_LEN {
            return Ok(self.system_secret.clone());
        }

        let secret = self
            .generated_secret
            .get_or_try_init(|| async {
                warn!("No global secret was set, generating a random one");
                let secret = generate_secret(GENERATED_SECRET_LEN);
                self.secret_store()?.store(&secret).await?;
                info!("Generated and saved a new global secret");
                Ok::<_, HydraError>(secret)
            })
            .await?;
        Ok(secret.clone())
    }

    /// `host:port`, with the default port when none is set
    pub fn get_address(&self) -> String {
        let port = if self.bind_port == 0 {
            DEFAULT_PORT
        } else {
            self.bind_port
        };
        format!("{}:{}", self.bind_host, port)
    }

    pub fn get_issuer(&self) -> &str {
        if self.issuer.is_empty() {
            DEFAULT_ISSUER
        } else {
            &self.issuer
        }
    }

    pub fn get_access_token_lifespan(&self) -> Duration {
        ACCESS_TOKEN_LIFESPAN
    }

    pub fn persisted(&self) -> PersistedSettings {
        PersistedSettings {
            cluster_url: self.cluster_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    /// Settings file path: the explicit one, or the one in the home directory
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => absolute_clean(path),
            None => config_path(&PlatformHome::from_env()),
        }
    }

    fn secret_store(&self) -> Result<Arc<dyn SecretStore>> {
        if let Some(store) = &self.secret_store {
            return Ok(Arc::clone(store));
        }
        let path = self.settings_path()?.with_file_name(SECRET_FILE_NAME);
        Ok(Arc::new(FileSecretStore::new(path)))
    }

    /// Write the persisted settings to the settings file, owner-only
    pub async fn save(&self) -> Result<()> {
        let path = self.settings_path()?;
        let contents = serde_yaml::to_string(&self.persisted())?;
        write_private(&path, contents.as_bytes()).await?;
        info!("Saved settings to: {}", path.display());
        Ok(())
    }
}

/// Write `contents` to `path` readable and writable by the owner only
pub(crate) async fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.flush().await?;

    // An existing file keeps its old mode on open
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret::MockSecretStore;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config_with_url(url: &str) -> Config {
        Config {
            cluster_url: url.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_get_address_defaults_port() {
        let mut config = Config {
            bind_host: "0.0.0.0".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_address(), "0.0.0.0:4444");

        config.bind_port = 8080;
        assert_eq!(config.get_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_get_address_empty_host() {
        assert_eq!(Config::default().get_address(), ":4444");
    }

    #[test]
    fn test_get_issuer() {
        let mut config = Config::default();
        assert_eq!(config.get_issuer(), "hydra");

        config.issuer = "foo".to_string();
        assert_eq!(config.get_issuer(), "foo");
    }

    #[test]
    fn test_access_token_lifespan_is_one_hour() {
        assert_eq!(
            Config::default().get_access_token_lifespan(),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_context_bundles_capabilities() {
        let context = Config::default().context();
        context.connection.put("client:app", b"{}".to_vec());
        assert_eq!(context.connection.get("client:app"), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_default_scopes() {
        assert_eq!(Config::default().scopes, vec!["core", "hydra"]);
    }

    #[test]
    fn test_resolve_base_and_segments() {
        let config = config_with_url("https://cluster.local:4444/api/");

        let base = config.resolve::<&str>(&[]).unwrap();
        assert_eq!(base.as_str(), "https://cluster.local:4444/api/");

        let joined = config.resolve(&["oauth2", "/token"]).unwrap();
        assert_eq!(joined.as_str(), "https://cluster.local:4444/api/oauth2/token");
    }

    #[test]
    fn test_resolve_is_sticky() {
        let mut config = config_with_url("https://first.local");
        let first = config.resolve::<&str>(&[]).unwrap();

        config.cluster_url = "https://second.local".to_string();
        assert_eq!(config.resolve::<&str>(&[]).unwrap(), first);
        assert_eq!(
            config.resolve(&["clients"]).unwrap().as_str(),
            "https://first.local/clients"
        );
    }

    #[test]
    fn test_resolve_invalid_url_is_an_error() {
        for raw in ["", "not a url", "mailto:admin@example.com"] {
            let err = config_with_url(raw).resolve::<&str>(&[]).unwrap_err();
            assert!(
                matches!(err, HydraError::InvalidClusterUrl { .. }),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_resolve_failure_is_not_cached() {
        let mut config = config_with_url("::bad");
        assert!(config.resolve::<&str>(&[]).is_err());

        config.cluster_url = "https://fixed.local".to_string();
        assert_eq!(
            config.resolve::<&str>(&[]).unwrap().as_str(),
            "https://fixed.local/"
        );
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
            ("ISSUER", "https://issuer"),
            ("SYSTEM_SECRET", "a-long-enough-secret"),
            ("CLUSTER_URL", "https://cluster"),
            ("CLIENT_ID", "app"),
            ("CLIENT_SECRET", "pw"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.get_address(), "127.0.0.1:9000");
        assert_eq!(config.get_issuer(), "https://issuer");
        assert_eq!(config.system_secret.as_slice(), b"a-long-enough-secret");
        assert_eq!(config.cluster_url, "https://cluster");
        assert_eq!(config.client_id, "app");
        assert_eq!(config.client_secret, "pw");
        assert!(config.consent_url.is_empty());
    }

    #[test]
    fn test_apply_env_ignores_invalid_port() {
        let mut config = Config {
            bind_port: 1234,
            ..Config::default()
        };
        config.apply_env(|key| (key == "PORT").then(|| "http".to_string()));
        assert_eq!(config.bind_port, 1234);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            client_secret: "client-pw".to_string(),
            system_secret: Zeroizing::new(b"system-pw-123".to_vec()),
            ..Config::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("client-pw"));
        assert!(!rendered.contains("system-pw-123"));
    }

    #[tokio::test]
    async fn test_system_secret_long_enough_is_returned() {
        let mut store = MockSecretStore::new();
        store.expect_store().never();

        let config = Config {
            system_secret: Zeroizing::new(b"exactly8".to_vec()),
            ..Config::default()
        }
        .with_secret_store(Arc::new(store));

        assert_eq!(config.get_system_secret().await.unwrap().as_slice(), b"exactly8");
    }

    #[tokio::test]
    async fn test_short_system_secret_is_replaced_and_persisted() {
        let mut store = MockSecretStore::new();
        store
            .expect_store()
            .withf(|secret| secret.len() == GENERATED_SECRET_LEN)
            .times(1)
            .returning(|_| Ok(()));

        let config = Config {
            system_secret: Zeroizing::new(b"abcd".to_vec()),
            ..Config::default()
        }
        .with_secret_store(Arc::new(store));

        let first = config.get_system_secret().await.unwrap();
        assert!(first.len() >= MIN_SECRET_LEN);
        assert_ne!(first.as_slice(), b"abcd");

        let second = config.get_system_secret().await.unwrap();
        assert_eq!(first.as_slice(), second.as_slice());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_generates_secret_once() {
        let mut store = MockSecretStore::new();
        store
            .expect_store()
            .withf(|secret| secret.len() == GENERATED_SECRET_LEN)
            .times(1)
            .returning(|_| {
                // hold the first caller inside the store so the others pile up
                std::thread::sleep(Duration::from_millis(100));
                Ok(())
            });

        let config = Arc::new(Config::default().with_secret_store(Arc::new(store)));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let config = Arc::clone(&config);
                tokio::spawn(async move { config.get_system_secret().await })
            })
            .collect();

        let mut secrets = Vec::new();
        for task in tasks {
            secrets.push(task.await.unwrap().unwrap());
        }

        let first = secrets[0].as_slice();
        assert_eq!(first.len(), GENERATED_SECRET_LEN);
        assert!(secrets.iter().all(|secret| secret.as_slice() == first));
    }

    #[tokio::test]
    async fn test_load_from_path_with_applies_only_the_given_lookup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".hydra.yml");
        std::fs::write(
            &path,
            "cluster_url: https://file\nclient_id: file-id\nclient_secret: file-pw\n",
        )
        .unwrap();

        let env: HashMap<&str, &str> = [("CLIENT_ID", "override"), ("PORT", "9000")]
            .into_iter()
            .collect();
        let config = Config::load_from_path_with(&path, |key| env.get(key).map(|v| v.to_string()))
            .await
            .unwrap();

        assert_eq!(config.cluster_url, "https://file");
        assert_eq!(config.client_id, "override");
        assert_eq!(config.client_secret, "file-pw");
        assert_eq!(config.bind_port, 9000);
    }

    #[tokio::test]
    async fn test_system_secret_store_failure_is_returned() {
        let mut store = MockSecretStore::new();
        store
            .expect_store()
            .returning(|_| Err(HydraError::secret("disk full")));

        let config = Config::default().with_secret_store(Arc::new(store));
        let err = config.get_system_secret().await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_save_writes_only_persisted_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".hydra.yml");
        let config = Config {
            bind_port: 8080,
            bind_host: "0.0.0.0".to_string(),
            issuer: "foo".to_string(),
            system_secret: Zeroizing::new(b"some-system-secret".to_vec()),
            consent_url: "https://consent".to_string(),
            cluster_url: "https://cluster".to_string(),
            client_id: "app".to_string(),
            client_secret: "pw".to_string(),
            ..Config::with_path(&path)
        };

        config.save().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let document: serde_yaml::Mapping = serde_yaml::from_str(&contents).unwrap();
        let mut keys: Vec<&str> = document.keys().filter_map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["client_id", "client_secret", "cluster_url"]);
        assert!(!contents.contains("some-system-secret"));
        assert!(!contents.contains("consent"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".hydra.yml");
        std::fs::write(&path, "cluster_url: old\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        Config::with_path(&path).save().await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_creates_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(".hydra.yml");
        Config::with_path(&path).save().await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_settings_path_is_cleaned() {
        let dir = TempDir::new().unwrap();
        let config = Config::with_path(dir.path().join("a").join("..").join(".hydra.yml"));
        assert_eq!(config.settings_path().unwrap(), dir.path().join(".hydra.yml"));
    }
}
