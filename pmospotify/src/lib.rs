//! # pmospotify - Fournisseur Spotify pour pmocapacity
//!
//! Cette crate branche l'API Web Spotify sur le contrôleur d'ajout borné de
//! `pmocapacity`. Spotify limite une playlist à 10 000 titres : combinés, les
//! deux permettent d'alimenter une playlist en continu en retirant les titres
//! les plus anciens.
//!
//! ## Architecture
//!
//! - `SpotifyClient` : client haut-niveau, implémente `pmocapacity::RemotePlaylist`
//! - `api` : couche d'accès à l'API REST (pagination, ajout, retrait par lots de 100)
//! - `models` : normalisation des identifiants en URIs `spotify:track:`
//! - `config_ext` : paramètres Spotify dans `pmoconfig`
//! - `error` : erreurs typées, converties en `RemoteError` pour le contrôleur
//!
//! L'authentification OAuth n'est pas gérée : le client reçoit un token
//! Bearer déjà obtenu (scope `playlist-modify-public` ou
//! `playlist-modify-private`).
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pmocapacity::CappedPlaylist;
//! use pmospotify::SpotifyClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SpotifyClient::from_config()?;
//!     let playlist = CappedPlaylist::new(client);
//!
//!     let report = playlist
//!         .add(
//!             "37i9dQZF1DXcBWIGoYBM5M",
//!             &["spotify:track:15kQGEy89K8deJcZVFEn0N".to_string()],
//!         )
//!         .await?;
//!     println!("{} titre(s) retiré(s)", report.evicted.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;

pub use client::SpotifyClient;
pub use config_ext::SpotifyConfigExt;
pub use error::{Result, SpotifyError};
