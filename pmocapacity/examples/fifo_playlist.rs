//! Exemple : playlist bornée en mémoire
//!
//! Cet exemple montre comment :
//! - Créer un contrôleur avec une petite capacité
//! - Ajouter des lots de titres jusqu'à déclencher l'éviction
//! - Observer la taille suivie et les titres retirés
//!
//! Lancer avec `RUST_LOG=debug cargo run -p pmocapacity --example fifo_playlist`

use pmocapacity::{CappedPlaylist, MemoryPlaylist};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== pmocapacity - Playlist bornée ===\n");

    let remote = Arc::new(MemoryPlaylist::with_page_size(5));
    remote.insert_playlist("radio", (1..=7).map(|i| format!("track-{i:02}")).collect());

    let playlist = CappedPlaylist::new(remote.clone()).with_capacity(10);

    for batch in 0..3 {
        let tracks: Vec<String> = (0..3).map(|i| format!("batch{batch}-{i}")).collect();
        let report = playlist.add("radio", &tracks).await?;

        println!(
            "Lot {} : {} ajouté(s), {} retiré(s) {:?}, taille {}",
            batch,
            report.appended,
            report.evicted.len(),
            report.evicted,
            report.size.unwrap_or_default()
        );
    }

    println!("\nContenu final :");
    for (i, track) in remote.tracks("radio").unwrap_or_default().iter().enumerate() {
        println!("  {:2}. {}", i + 1, track);
    }

    let too_big: Vec<String> = (0..11).map(|i| format!("huge-{i}")).collect();
    if let Err(e) = playlist.add("radio", &too_big).await {
        println!("\nRefusé : {}", e);
    }

    Ok(())
}
