//! Extension pour intégrer la configuration Spotify dans pmoconfig
//!
//! Ce module fournit le trait `SpotifyConfigExt` qui ajoute à
//! `pmoconfig::Config` les paramètres du fournisseur Spotify.

use crate::api::{API_BASE_URL, MAX_ITEMS_PER_REQUEST};
use anyhow::{Result, anyhow};
use pmoconfig::Config;
use serde_yaml::Value;

/// Variable d'environnement lue quand aucun token n'est configuré
pub const ENV_ACCESS_TOKEN: &str = "SPOTIFY_ACCESS_TOKEN";

/// Trait d'extension pour gérer la configuration Spotify dans pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmospotify::SpotifyConfigExt;
///
/// let config = get_config();
/// let token = config.get_spotify_access_token()?;
/// ```
pub trait SpotifyConfigExt {
    /// URL de base de l'API (`spotify.api_url`)
    fn get_spotify_api_url(&self) -> Result<String>;

    /// Token Bearer (`spotify.access_token`, sinon `SPOTIFY_ACCESS_TOKEN`)
    ///
    /// # Errors
    ///
    /// Retourne une erreur si aucun token n'est disponible
    fn get_spotify_access_token(&self) -> Result<String>;

    /// Définit le token Bearer dans la configuration
    fn set_spotify_access_token(&self, token: &str) -> Result<()>;

    /// Taille des pages de lecture (`spotify.page_size`, 100 par défaut)
    fn get_spotify_page_size(&self) -> Result<usize>;

    /// Playlist cible par défaut (`spotify.playlist_id`)
    fn get_spotify_playlist_id(&self) -> Result<Option<String>>;
}

impl SpotifyConfigExt for Config {
    fn get_spotify_api_url(&self) -> Result<String> {
        Ok(self
            .get_string(&["spotify", "api_url"])?
            .unwrap_or_else(|| API_BASE_URL.to_string()))
    }

    fn get_spotify_access_token(&self) -> Result<String> {
        if let Some(token) = self.get_string(&["spotify", "access_token"])? {
            return Ok(token);
        }

        match std::env::var(ENV_ACCESS_TOKEN) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(anyhow!(
                "Spotify access token not configured (spotify.access_token or {})",
                ENV_ACCESS_TOKEN
            )),
        }
    }

    fn set_spotify_access_token(&self, token: &str) -> Result<()> {
        self.set_value(
            &["spotify", "access_token"],
            Value::String(token.to_string()),
        )
    }

    fn get_spotify_page_size(&self) -> Result<usize> {
        self.get_usize(&["spotify", "page_size"], MAX_ITEMS_PER_REQUEST)
    }

    fn get_spotify_playlist_id(&self) -> Result<Option<String>> {
        self.get_string(&["spotify", "playlist_id"])
    }
}
