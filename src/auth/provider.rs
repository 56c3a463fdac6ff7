//! Client-credentials token source and the authenticated client
//!
//! [`OAuth2Client`] wraps a `reqwest::Client` together with a token source
//! that performs the client-credentials grant against the cluster's token
//! endpoint. Tokens are refreshed transparently shortly before they expire.

use crate::error::{HydraError, Result};
use crate::utils::network::classify_network_error;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use zeroize::Zeroizing;

/// Tokens this close to expiry are refreshed before use
const EXPIRY_DELTA_SECS: i64 = 10;

/// Client id, secret, endpoint and scopes for the grant
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub token_url: Url,
    pub scopes: Vec<String>,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Bearer token obtained from the token endpoint
#[derive(Clone)]
pub struct AccessToken {
    secret: Zeroizing<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the token is still usable at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_DELTA_SECS) < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Perform a single client-credentials grant
pub async fn request_token(http: &Client, credentials: &ClientCredentials) -> Result<AccessToken> {
    let url = credentials.token_url.as_str();
    debug!(
        "Requesting client-credentials token from {} for client {}",
        url, credentials.client_id
    );

    let scope = credentials.scopes.join(" ");
    let mut form = vec![("grant_type", "client_credentials")];
    if !scope.is_empty() {
        form.push(("scope", scope.as_str()));
    }

    let response = http
        .post(credentials.token_url.clone())
        .basic_auth(
            &credentials.client_id,
            Some(credentials.client_secret.as_str()),
        )
        .form(&form)
        .send()
        .await
        .map_err(|e| {
            let err = classify_network_error(&e, url);
            warn!("Token request to {} failed: {}", url, err);
            HydraError::authentication(err.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => body,
        };
        warn!("Token endpoint {} rejected the grant: HTTP {}", url, status);
        return Err(HydraError::authentication(format!(
            "token endpoint returned HTTP {}: {}",
            status, reason
        )));
    }

    let body: TokenResponse = response.json().await.map_err(|e| {
        warn!("Token endpoint {} sent a malformed response: {}", url, e);
        HydraError::authentication(format!("malformed token response: {}", e))
    })?;

    if body.access_token.is_empty() {
        warn!("Token endpoint {} sent an empty access_token", url);
        return Err(HydraError::authentication(
            "malformed token response: empty access_token",
        ));
    }

    Ok(AccessToken {
        secret: Zeroizing::new(body.access_token),
        token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
        expires_at: body
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime)),
        scope: body.scope,
    })
}

/// HTTP client that authenticates every request with a fresh bearer token
pub struct OAuth2Client {
    http: Client,
    credentials: ClientCredentials,
    token: Mutex<AccessToken>,
}

impl fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Client")
            .field("http", &"<Client>")
            .field("credentials", &self.credentials)
            .field("token", &"<Mutex<AccessToken>>")
            .finish()
    }
}

impl OAuth2Client {
    /// Authenticate once and build the client around the obtained token
    pub async fn connect(http: Client, credentials: ClientCredentials) -> Result<Self> {
        let token = request_token(&http, &credentials).await?;
        info!(
            "Authenticated client {} against {}",
            credentials.client_id, credentials.token_url
        );

        Ok(Self {
            http,
            credentials,
            token: Mutex::new(token),
        })
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Underlying transport, without authentication
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Current token, refreshed through a new grant when it is about to expire
    pub async fn token(&self) -> Result<AccessToken> {
        let mut token = self.token.lock().await;
        if !token.is_fresh_at(Utc::now()) {
            debug!("Access token expired, refreshing");
            *token = request_token(&self.http, &self.credentials).await?;
        }
        Ok(token.clone())
    }

    /// Request builder carrying the bearer token
    pub async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.token().await?;
        Ok(self.http.request(method, url).bearer_auth(token.secret()))
    }

    pub async fn get(&self, url: Url) -> Result<RequestBuilder> {
        self.request(Method::GET, url).await
    }

    pub async fn post(&self, url: Url) -> Result<RequestBuilder> {
        self.request(Method::POST, url).await
    }
}
