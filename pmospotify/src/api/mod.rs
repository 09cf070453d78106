//! Couche d'accès à l'API Web Spotify
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec l'API
//! Spotify. L'authentification (flux OAuth) n'est pas gérée ici : le client
//! reçoit un token Bearer déjà obtenu.

pub mod playlists;

use crate::error::{Result, SpotifyError};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// URL de base de l'API Spotify
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Nombre maximal d'éléments par page ou par mutation accepté par Spotify
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

/// Corps d'erreur renvoyé par l'API (`{"error": {"status": .., "message": ..}}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client API bas-niveau pour communiquer avec Spotify
pub struct SpotifyApi {
    /// Client HTTP
    client: Client,
    /// URL de base (sans slash final)
    base_url: String,
    /// Token Bearer
    access_token: String,
    /// Taille des pages de lecture
    page_size: usize,
}

impl SpotifyApi {
    /// Crée une nouvelle instance de l'API sur l'URL officielle
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(API_BASE_URL, access_token)
    }

    /// Crée une instance pointant sur une autre URL (proxy, serveur de test)
    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SpotifyError::Configuration(format!(
                "Invalid API URL: {}",
                base_url
            )));
        }

        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(SpotifyError::Configuration(
                "Empty access token".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pmospotify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            access_token,
            page_size: MAX_ITEMS_PER_REQUEST,
        })
    }

    /// Définit la taille des pages (bornée à 1..=100)
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.clamp(1, MAX_ITEMS_PER_REQUEST);
    }

    /// Retourne la taille des pages
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Retourne l'URL de base
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Remplace le token (après un rafraîchissement côté appelant)
    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
    }

    /// Construit l'URL complète d'un endpoint
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Effectue une requête GET sur une URL complète
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .authorized(Method::GET, url)
            .query(params)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Effectue une requête avec un corps JSON (POST, DELETE...)
    pub(crate) async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!("{} {}", method, url);

        let response = self.authorized(method, url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());

            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(error_text);

            warn!("API error ({}): {}", status_code, message);

            return Err(match SpotifyError::from_status_code(status_code, message) {
                SpotifyError::RateLimitExceeded { .. } => {
                    SpotifyError::RateLimitExceeded { retry_after }
                }
                other => other,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            SpotifyError::JsonParse(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_creation() {
        let api = SpotifyApi::new("token").unwrap();
        assert_eq!(api.base_url(), API_BASE_URL);
        assert_eq!(api.page_size(), MAX_ITEMS_PER_REQUEST);
    }

    #[test]
    fn test_base_url_is_normalised() {
        let api = SpotifyApi::with_base_url("http://localhost:1234/", "token").unwrap();
        assert_eq!(api.endpoint("/playlists"), "http://localhost:1234/playlists");
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        assert!(SpotifyApi::with_base_url("ftp://nope", "token").is_err());
        assert!(SpotifyApi::new("  ").is_err());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let mut api = SpotifyApi::new("token").unwrap();
        api.set_page_size(500);
        assert_eq!(api.page_size(), 100);
        api.set_page_size(0);
        assert_eq!(api.page_size(), 1);
    }
}
