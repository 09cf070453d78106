//! Exemple : ajout borné dans une playlist Spotify
//!
//! Configuration requise (fichier `.pmomusic/config.yaml` ou variables
//! d'environnement) :
//!
//! ```yaml
//! spotify:
//!   access_token: "BQ..."
//!   playlist_id: "37i9dQZF1DXcBWIGoYBM5M"
//! ```
//!
//! Le token peut aussi venir de `SPOTIFY_ACCESS_TOKEN`.
//!
//! Lancer avec `RUST_LOG=debug cargo run -p pmospotify --example append_tracks`

use anyhow::Context;
use pmocapacity::CappedPlaylist;
use pmospotify::{SpotifyClient, SpotifyConfigExt};
use tracing_subscriber::EnvFilter;

const SAMPLE_TRACKS: [&str; 2] = [
    "spotify:track:15kQGEy89K8deJcZVFEn0N",
    "spotify:track:2ARqIya5NAuvFVHSN3bL0m",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = pmoconfig::get_config();
    let playlist_id = config
        .get_spotify_playlist_id()?
        .context("spotify.playlist_id n'est pas configuré")?;

    let client = SpotifyClient::from_config_obj(&config)?;
    let playlist = CappedPlaylist::from_config(client, &config)?;

    println!(
        "Ajout de {} titres dans {} (capacité {})",
        SAMPLE_TRACKS.len(),
        playlist_id,
        playlist.capacity()
    );

    let tracks: Vec<String> = SAMPLE_TRACKS.iter().map(|t| t.to_string()).collect();
    let report = playlist.add(&playlist_id, &tracks).await?;

    println!("  ajoutés  : {}", report.appended);
    println!("  retirés  : {:?}", report.evicted);
    if let Some(size) = report.size {
        println!("  taille   : {}", size);
    }
    if let Some(snapshot) = report.snapshot_id {
        println!("  snapshot : {}", snapshot);
    }

    Ok(())
}
