//! Client principal pour les playlists Spotify
//!
//! `SpotifyClient` enveloppe l'API bas-niveau et implémente
//! [`RemotePlaylist`], ce qui permet de le confier à un
//! [`CappedPlaylist`](pmocapacity::CappedPlaylist).

use crate::api::SpotifyApi;
use crate::config_ext::SpotifyConfigExt;
use crate::error::{PROVIDER, Result};
use crate::models::track_uris;
use async_trait::async_trait;
use pmocapacity::{AppendReceipt, RemoteError, RemotePlaylist, TrackId, TrackPage};
use pmoconfig::Config;
use tracing::info;

/// Client Spotify haut-niveau
pub struct SpotifyClient {
    /// API bas-niveau
    api: SpotifyApi,
}

impl SpotifyClient {
    /// Crée un client sur l'API officielle avec un token déjà obtenu
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use pmospotify::SpotifyClient;
    ///
    /// let client = SpotifyClient::new("BQ...")?;
    /// # Ok::<(), pmospotify::SpotifyError>(())
    /// ```
    pub fn new(access_token: &str) -> Result<Self> {
        Ok(Self {
            api: SpotifyApi::new(access_token)?,
        })
    }

    /// Crée un client sur une URL d'API personnalisée
    pub fn with_base_url(base_url: &str, access_token: &str) -> Result<Self> {
        Ok(Self {
            api: SpotifyApi::with_base_url(base_url, access_token)?,
        })
    }

    /// Crée un client en utilisant la configuration de pmoconfig
    pub fn from_config() -> Result<Self> {
        let config = pmoconfig::get_config();
        Self::from_config_obj(config.as_ref())
    }

    /// Crée un client depuis un objet Config spécifique
    pub fn from_config_obj(config: &Config) -> Result<Self> {
        let api_url = config.get_spotify_api_url()?;
        let token = config.get_spotify_access_token()?;

        info!("Creating Spotify client for {}", api_url);

        let mut client = Self::with_base_url(&api_url, &token)?;
        client.set_page_size(config.get_spotify_page_size()?);
        Ok(client)
    }

    /// Définit la taille des pages de lecture
    pub fn set_page_size(&mut self, page_size: usize) {
        self.api.set_page_size(page_size);
    }

    /// Remplace le token Bearer
    pub fn set_access_token(&mut self, access_token: &str) {
        self.api.set_access_token(access_token);
    }

    /// Retourne l'API bas-niveau
    pub fn api(&self) -> &SpotifyApi {
        &self.api
    }
}

#[async_trait]
impl RemotePlaylist for SpotifyClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> std::result::Result<TrackPage, RemoteError> {
        Ok(self.api.get_playlist_page(playlist_id, page_token).await?)
    }

    async fn append_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> std::result::Result<AppendReceipt, RemoteError> {
        let uris = track_uris(track_ids);
        let snapshot_id = self.api.add_tracks(playlist_id, &uris).await?;
        Ok(AppendReceipt { snapshot_id })
    }

    async fn remove_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> std::result::Result<(), RemoteError> {
        let uris = track_uris(track_ids);
        self.api.remove_tracks(playlist_id, &uris).await?;
        Ok(())
    }
}
