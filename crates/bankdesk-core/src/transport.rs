//! HTTP transport shared by the auth and API clients.
//!
//! One `reqwest::Client` with a cookie jar backs both clients, so the
//! refresh cookie set at login is presented automatically on refresh.
//! The jar can be persisted between runs; nothing above this layer
//! reads the cookie.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cookie jar file name in cache directory
const COOKIE_FILE: &str = "cookies.json";

/// Path the auth service scopes its refresh cookie to.
const AUTH_COOKIE_PATH: &str = "/api/auth";

/// Endpoint whose cookies are worth keeping across runs.
const REFRESH_URL_PATH: &str = "/api/auth/refresh";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCookies {
    /// `name=value` pairs as presented to the refresh endpoint.
    cookies: Vec<String>,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl Transport {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(request_timeout)
            .cookie_provider(jar.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn refresh_url(&self) -> Result<Url> {
        self.base_url
            .join(REFRESH_URL_PATH)
            .context("Failed to build refresh URL")
    }

    /// Load cookies saved by a previous run. Returns false if there were none.
    pub fn restore_cookies(&self, cache_dir: &Path) -> Result<bool> {
        let path = cache_dir.join(COOKIE_FILE);
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read cookie file")?;
        let persisted: PersistedCookies =
            serde_json::from_str(&contents).context("Failed to parse cookie file")?;

        let url = self.refresh_url()?;
        for pair in &persisted.cookies {
            self.jar
                .add_cookie_str(&format!("{}; Path={}", pair, AUTH_COOKIE_PATH), &url);
        }
        debug!(count = persisted.cookies.len(), "Restored session cookies");
        Ok(!persisted.cookies.is_empty())
    }

    /// Save the cookies the refresh endpoint would receive.
    pub fn persist_cookies(&self, cache_dir: &Path) -> Result<()> {
        let url = self.refresh_url()?;
        let cookies = self
            .jar
            .cookies(&url)
            .and_then(|header| header.to_str().ok().map(split_cookie_header))
            .unwrap_or_default();

        std::fs::create_dir_all(cache_dir)?;
        let contents = serde_json::to_string_pretty(&PersistedCookies { cookies })?;
        std::fs::write(cache_dir.join(COOKIE_FILE), contents)
            .context("Failed to write cookie file")?;
        Ok(())
    }

    /// Remove persisted cookies, ending the long-lived session on this machine.
    pub fn forget_cookies(cache_dir: &Path) -> Result<()> {
        let path = cache_dir.join(COOKIE_FILE);
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove cookie file")?;
        }
        Ok(())
    }
}

fn split_cookie_header(header: &str) -> Vec<String> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_cookie_header() {
        assert_eq!(
            split_cookie_header("refreshToken=abc; other=1"),
            vec!["refreshToken=abc".to_string(), "other=1".to_string()]
        );
        assert!(split_cookie_header("").is_empty());
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(Transport::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_cookies_round_trip_through_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let first = Transport::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        let url = first.refresh_url().unwrap();
        first
            .jar
            .add_cookie_str("refreshToken=r-123; Path=/api/auth; HttpOnly", &url);
        first.persist_cookies(dir.path()).unwrap();

        let second = Transport::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        assert!(second.restore_cookies(dir.path()).unwrap());
        let header = second.jar.cookies(&url).unwrap();
        assert_eq!(header.to_str().unwrap(), "refreshToken=r-123");

        Transport::forget_cookies(dir.path()).unwrap();
        let third = Transport::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        assert!(!third.restore_cookies(dir.path()).unwrap());
    }
}
