//! # pmocapacity - Ajout borné pour playlists distantes
//!
//! Music services cap playlist sizes (Spotify stops at 10 000 tracks). This
//! crate appends tracks to a remote playlist while guaranteeing the playlist
//! it tracks never goes past that cap, evicting the oldest tracks to make
//! room.
//!
//! # Architecture
//!
//! - **RemotePlaylist** : capability trait implemented by each provider
//!   (`pmospotify::SpotifyClient`, [`MemoryPlaylist`])
//! - **PlaylistSizeTracker** : process-local cache of playlist sizes, filled by
//!   a single paginated walk per playlist and then kept up to date by the
//!   controller's own arithmetic
//! - **CappedPlaylist** : the append controller (size lookup, oldest-first
//!   eviction, append, bookkeeping) with a per-playlist lock
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pmocapacity::{CappedPlaylist, CapacityError, MemoryPlaylist};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let playlist = CappedPlaylist::new(MemoryPlaylist::new());
//!
//! match playlist.add("my-playlist", &["spotify:track:15kQGEy89K8deJcZVFEn0N".into()]).await {
//!     Ok(report) => println!("{} added, {} evicted", report.appended, report.evicted.len()),
//!     Err(CapacityError::CapacityExceeded { requested, capacity, .. }) => {
//!         println!("{requested} tracks never fit in {capacity}")
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//!
//! Sizes are never re-read once known. A playlist edited by someone else
//! while this process runs keeps its stale size until the process restarts.
//! Eviction asks the remote to remove every occurrence of the oldest
//! identifiers, so a track present several times may be removed more often
//! than the tracked size accounts for.

mod controller;
mod error;
mod memory;
mod remote;
mod tracker;

#[cfg(feature = "pmoconfig")]
mod config_ext;

// Réexports publics
pub use controller::{oldest_tracks, AppendReport, CappedPlaylist, DEFAULT_CAPACITY};
pub use error::{CapacityError, Result};
pub use memory::MemoryPlaylist;
pub use remote::{AppendReceipt, PlaylistId, RemoteError, RemotePlaylist, TrackId, TrackPage};
pub use tracker::PlaylistSizeTracker;

#[cfg(feature = "pmoconfig")]
pub use config_ext::CapacityConfigExt;

/// Ré-exporte le jeton d'annulation accepté par [`CappedPlaylist::add_with_cancel`]
pub use tokio_util::sync::CancellationToken;
