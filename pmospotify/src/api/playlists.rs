//! Module d'accès aux titres des playlists

use super::{MAX_ITEMS_PER_REQUEST, SpotifyApi};
use crate::error::{Result, SpotifyError};
use pmocapacity::TrackPage;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Champs demandés à l'API : l'URI de chaque titre et le lien de page suivante
const ITEM_FIELDS: &str = "items(track(uri,is_local)),next";

/// Réponse de l'endpoint /playlists/{id}/tracks
#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    track: Option<TrackRef>,
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    is_local: bool,
}

/// Réponse des mutations de playlist
#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot_id: String,
}

#[derive(Debug, Serialize)]
struct AddTracksBody<'a> {
    uris: &'a [String],
}

#[derive(Debug, Serialize)]
struct RemoveTracksBody<'a> {
    tracks: Vec<UriRef<'a>>,
}

#[derive(Debug, Serialize)]
struct UriRef<'a> {
    uri: &'a str,
}

impl PlaylistItem {
    /// URI supprimable du titre, absente pour les fichiers locaux et les titres retirés
    fn removable_uri(self) -> Option<String> {
        self.track
            .filter(|track| !track.is_local)
            .and_then(|track| track.uri)
    }
}

impl SpotifyApi {
    /// Récupère une page des titres d'une playlist
    ///
    /// `page_url` est `None` pour la première page, puis le lien `next`
    /// renvoyé par la page précédente. Les entrées sans URI supprimable
    /// (fichiers locaux, titres indisponibles) comptent dans `len` mais
    /// n'apparaissent pas dans `items`.
    pub async fn get_playlist_page(
        &self,
        playlist_id: &str,
        page_url: Option<&str>,
    ) -> Result<TrackPage> {
        let response: PlaylistItemsResponse = match page_url {
            None => {
                let url = self.endpoint(&format!("/playlists/{}/tracks", playlist_id));
                let limit = self.page_size().to_string();
                let params = [
                    ("fields", ITEM_FIELDS),
                    ("limit", limit.as_str()),
                    ("offset", "0"),
                ];
                self.get(&url, &params).await?
            }
            Some(url) => {
                // le token ne part que vers l'API configurée
                if !self.is_api_url(url) {
                    return Err(SpotifyError::Configuration(format!(
                        "Refusing to follow page link outside of {}: {}",
                        self.base_url(),
                        url
                    )));
                }
                if url.contains("fields=") {
                    self.get(url, &[]).await?
                } else {
                    self.get(url, &[("fields", ITEM_FIELDS)]).await?
                }
            }
        };

        let len = response.items.len();
        let items: Vec<String> = response
            .items
            .into_iter()
            .filter_map(PlaylistItem::removable_uri)
            .collect();

        debug!(
            "Playlist {} page: {} entries, {} removable, more: {}",
            playlist_id,
            len,
            items.len(),
            response.next.is_some()
        );

        Ok(TrackPage {
            items,
            len,
            next: response.next,
        })
    }

    /// Vérifie qu'une URL désigne l'API configurée (même origine et préfixe de chemin)
    fn is_api_url(&self, url: &str) -> bool {
        let base = self.base_url();
        url.strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    /// Ajoute des titres à la fin d'une playlist, par lots de 100
    ///
    /// L'ordre est conservé. Retourne le dernier `snapshot_id` reçu.
    /// Les lots ne sont pas transactionnels : si un lot échoue après
    /// d'autres, les précédents restent appliqués et l'erreur est
    /// [`SpotifyError::PartialAppend`] avec le nombre de titres ajoutés.
    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<Option<String>> {
        let url = self.endpoint(&format!("/playlists/{}/tracks", playlist_id));
        let mut snapshot = None;
        let mut applied = 0;

        for chunk in uris.chunks(MAX_ITEMS_PER_REQUEST) {
            debug!("Adding {} tracks to playlist {}", chunk.len(), playlist_id);
            let response: SnapshotResponse = match self
                .send_json(Method::POST, &url, &AddTracksBody { uris: chunk })
                .await
            {
                Ok(response) => response,
                Err(e) if applied > 0 => {
                    warn!(
                        "Append to playlist {} stopped after {} tracks",
                        playlist_id, applied
                    );
                    return Err(SpotifyError::PartialAppend {
                        applied,
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            };
            applied += chunk.len();
            snapshot = Some(response.snapshot_id);
        }

        Ok(snapshot)
    }

    /// Retire toutes les occurrences des titres donnés, par lots de 100
    pub async fn remove_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<Option<String>> {
        let url = self.endpoint(&format!("/playlists/{}/tracks", playlist_id));
        let mut snapshot = None;

        for chunk in uris.chunks(MAX_ITEMS_PER_REQUEST) {
            debug!("Removing {} tracks from playlist {}", chunk.len(), playlist_id);
            let body = RemoveTracksBody {
                tracks: chunk.iter().map(|uri| UriRef { uri: uri.as_str() }).collect(),
            };
            let response: SnapshotResponse = self.send_json(Method::DELETE, &url, &body).await?;
            snapshot = Some(response.snapshot_id);
        }

        Ok(snapshot)
    }
}
