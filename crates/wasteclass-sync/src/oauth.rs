//! OAuth 2.0 credentials for the drive API.
//!
//! Credentials are cached on disk as JSON. A cached access token is reused
//! until shortly before it expires, then refreshed with the stored refresh
//! token and written back. The interactive consent step is reduced to
//! printing a URL and exchanging the pasted authorization code.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SyncError;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const LOOPBACK_REDIRECT: &str = "http://localhost";

/// Tokens are treated as expired this long before their stated expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth client registration, as downloaded from the provider's console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// The secret file nests the registration under `installed` or `web`.
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

/// Cached credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecret {
    pub async fn from_file(path: &Path) -> Result<Self, SyncError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SyncError::io(path, e))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SyncError> {
        let file: ClientSecretFile = serde_json::from_slice(bytes)?;
        file.installed.or(file.web).ok_or_else(|| {
            SyncError::Config("client secret has neither 'installed' nor 'web' section".into())
        })
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(LOOPBACK_REDIRECT)
    }
}

impl StoredToken {
    /// Whether the access token can still be used at `now`.
    ///
    /// Tokens without an expiry are assumed valid.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry
                .checked_sub_signed(Duration::seconds(EXPIRY_SKEW_SECS))
                .is_some_and(|deadline| deadline > now),
            None => true,
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub async fn load(path: &Path) -> Result<Option<Self>, SyncError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::io(path, e)),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| SyncError::io(path, e))
    }
}

/// Token source backed by a client registration and an on-disk cache.
pub struct OAuthClient {
    client: reqwest::Client,
    secret: ClientSecret,
    cache_path: PathBuf,
    scope: String,
}

impl OAuthClient {
    pub fn new(secret: ClientSecret, cache_path: PathBuf, scope: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret,
            cache_path,
            scope,
        }
    }

    /// Return a usable access token, refreshing and re-caching it if needed.
    pub async fn access_token(&self) -> Result<String, SyncError> {
        let cached = StoredToken::load(&self.cache_path).await?.ok_or_else(|| {
            SyncError::Auth(format!(
                "no cached credentials at {}; run `wasteclass authorize` first",
                self.cache_path.display()
            ))
        })?;

        if !cached.scopes.is_empty() && !cached.has_scope(&self.scope) {
            return Err(SyncError::Auth(format!(
                "cached credentials do not grant scope {}",
                self.scope
            )));
        }

        if cached.is_fresh(Utc::now()) {
            debug!(cache = %self.cache_path.display(), "using cached access token");
            return Ok(cached.access_token);
        }

        let refresh_token = cached.refresh_token.clone().ok_or_else(|| {
            SyncError::Auth("access token expired and no refresh token is cached".into())
        })?;

        info!(token_uri = %self.secret.token_uri, "refreshing access token");
        let refreshed = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;

        let token = StoredToken {
            access_token: refreshed.access_token,
            // Providers usually omit the refresh token on refresh; keep ours.
            refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
            expiry: expiry_from(refreshed.expires_in),
            scopes: if cached.scopes.is_empty() {
                vec![self.scope.clone()]
            } else {
                cached.scopes
            },
        };
        token.save(&self.cache_path).await?;
        Ok(token.access_token)
    }

    /// URL the user visits to grant access.
    pub fn authorization_url(&self) -> Result<reqwest::Url, SyncError> {
        reqwest::Url::parse_with_params(
            &self.secret.auth_uri,
            &[
                ("client_id", self.secret.client_id.as_str()),
                ("redirect_uri", self.secret.redirect_uri()),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| SyncError::Config(format!("auth_uri {}: {e}", self.secret.auth_uri)))
    }

    /// Exchange an authorization code for tokens and write the cache.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, SyncError> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code.trim()),
                ("redirect_uri", self.secret.redirect_uri()),
            ])
            .await?;

        let token = StoredToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expiry: expiry_from(response.expires_in),
            scopes: vec![self.scope.clone()],
        };
        token.save(&self.cache_path).await?;
        info!(cache = %self.cache_path.display(), "stored new credentials");
        Ok(token)
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, SyncError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let resp = self
            .client
            .post(&self.secret.token_uri)
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(resp.json().await?)
    }
}

/// Absolute expiry for a relative `expires_in`. Values outside chrono's
/// range are dropped, leaving the token without an expiry.
fn expiry_from(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    let secs = expires_in?;
    let expiry = Duration::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d));
    if expiry.is_none() {
        warn!(expires_in = secs, "token expiry out of range; ignoring it");
    }
    expiry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testserver::{self, ACCESS_TOKEN, REFRESH_TOKEN};
    use std::collections::HashMap;

    const SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

    fn secret(token_uri: &str) -> ClientSecret {
        ClientSecret {
            client_id: "client-123".into(),
            client_secret: "shh".into(),
            auth_uri: DEFAULT_AUTH_URI.into(),
            token_uri: token_uri.into(),
            redirect_uris: vec![],
        }
    }

    fn expired_token() -> StoredToken {
        StoredToken {
            access_token: "stale".into(),
            refresh_token: Some(REFRESH_TOKEN.into()),
            expiry: Some(Utc::now() - Duration::hours(1)),
            scopes: vec![SCOPE.into()],
        }
    }

    #[test]
    fn parses_installed_secret_layout() {
        let json = br#"{"installed": {
            "client_id": "abc.apps.example.com",
            "client_secret": "xyz",
            "token_uri": "https://oauth2.example.com/token",
            "redirect_uris": ["http://localhost"]
        }}"#;
        let secret = ClientSecret::from_slice(json).unwrap();
        assert_eq!(secret.client_id, "abc.apps.example.com");
        assert_eq!(secret.token_uri, "https://oauth2.example.com/token");
        assert_eq!(secret.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn parses_web_secret_layout() {
        let json = br#"{"web": {"client_id": "a", "client_secret": "b"}}"#;
        let secret = ClientSecret::from_slice(json).unwrap();
        assert_eq!(secret.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn rejects_secret_without_section() {
        let err = ClientSecret::from_slice(br#"{"other": {}}"#).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn freshness_honours_skew() {
        let now = Utc::now();
        let mut token = expired_token();
        token.expiry = Some(now + Duration::seconds(30));
        assert!(!token.is_fresh(now), "inside skew window counts as expired");
        token.expiry = Some(now + Duration::minutes(10));
        assert!(token.is_fresh(now));
        token.expiry = None;
        assert!(token.is_fresh(now));
    }

    #[test]
    fn out_of_range_expires_in_yields_no_expiry() {
        assert!(expiry_from(Some(i64::MAX)).is_none());
        assert!(expiry_from(Some(i64::MIN)).is_none());
        assert!(expiry_from(None).is_none());

        let expiry = expiry_from(Some(3600)).unwrap();
        assert!(expiry > Utc::now() + Duration::minutes(59));
    }

    #[test]
    fn earliest_representable_expiry_is_stale() {
        let mut token = expired_token();
        token.expiry = Some(DateTime::<Utc>::MIN_UTC);
        assert!(!token.is_fresh(Utc::now()));
    }

    #[test]
    fn authorization_url_carries_offline_consent() {
        let client = OAuthClient::new(secret(DEFAULT_TOKEN_URI), "t.json".into(), SCOPE.into());
        let url = client.authorization_url().unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["scope"], SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["redirect_uri"], LOOPBACK_REDIRECT);
    }

    #[tokio::test]
    async fn fresh_cached_token_skips_refresh() {
        let server = testserver::spawn(HashMap::new(), false).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        let mut token = expired_token();
        token.access_token = "still-good".into();
        token.expiry = Some(Utc::now() + Duration::hours(1));
        token.save(&cache).await.unwrap();

        let client = OAuthClient::new(secret(&server.token_uri()), cache, SCOPE.into());
        assert_eq!(client.access_token().await.unwrap(), "still-good");
        assert_eq!(server.counters.token_requests(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_cached() {
        let server = testserver::spawn(HashMap::new(), false).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        expired_token().save(&cache).await.unwrap();

        let client = OAuthClient::new(secret(&server.token_uri()), cache.clone(), SCOPE.into());
        assert_eq!(client.access_token().await.unwrap(), ACCESS_TOKEN);
        assert_eq!(server.counters.token_requests(), 1);

        let rewritten = StoredToken::load(&cache).await.unwrap().unwrap();
        assert_eq!(rewritten.access_token, ACCESS_TOKEN);
        assert_eq!(rewritten.refresh_token.as_deref(), Some(REFRESH_TOKEN));
        assert!(rewritten.is_fresh(Utc::now()));

        // Second call uses the rewritten cache.
        client.access_token().await.unwrap();
        assert_eq!(server.counters.token_requests(), 1);
    }

    #[tokio::test]
    async fn rejected_refresh_is_auth_error() {
        let server = testserver::spawn(HashMap::new(), true).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        expired_token().save(&cache).await.unwrap();

        let client = OAuthClient::new(secret(&server.token_uri()), cache, SCOPE.into());
        let err = client.access_token().await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn missing_cache_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = OAuthClient::new(
            secret(DEFAULT_TOKEN_URI),
            dir.path().join("absent.json"),
            SCOPE.into(),
        );
        let err = client.access_token().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        let mut token = expired_token();
        token.refresh_token = None;
        token.save(&cache).await.unwrap();

        let client = OAuthClient::new(secret(DEFAULT_TOKEN_URI), cache, SCOPE.into());
        assert!(client.access_token().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn cached_token_for_other_scope_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        let mut token = expired_token();
        token.scopes = vec!["https://www.googleapis.com/auth/calendar".into()];
        token.save(&cache).await.unwrap();

        let client = OAuthClient::new(secret(DEFAULT_TOKEN_URI), cache, SCOPE.into());
        assert!(client.access_token().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn exchange_code_writes_cache() {
        let server = testserver::spawn(HashMap::new(), false).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("nested").join("token.json");

        let client = OAuthClient::new(secret(&server.token_uri()), cache.clone(), SCOPE.into());
        let token = client.exchange_code(" 4/abc \n").await.unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some(REFRESH_TOKEN));

        let stored = StoredToken::load(&cache).await.unwrap().unwrap();
        assert_eq!(stored, token);
        assert!(stored.has_scope(SCOPE));
    }
}
