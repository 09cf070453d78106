//! CappedPlaylist : ajout borné par la capacité de la playlist distante
//!
//! [`CappedPlaylist::add`] appends a batch of tracks to a remote playlist
//! without ever letting the tracked size go over the capacity. When the
//! batch does not fit, the oldest tracks are evicted first:
//!
//! ```text
//! START ─► SIZE_KNOWN ─┬─► NO_EVICTION_NEEDED ─┬─► APPENDED ─► DONE
//!                      └─► EVICTED ────────────┘
//!            │                 │                     │
//!            └────────► FAILED ◄─────────────────────┘
//! ```
//!
//! Calls on the same playlist are serialized by a per-playlist lock held
//! from the size lookup to the final bookkeeping. The lock belongs to the
//! [`PlaylistSizeTracker`], so controllers sharing a tracker share it too.
//! Calls on different playlists run concurrently.

use crate::error::{CapacityError, Result};
use crate::remote::{RemotePlaylist, TrackId};
use crate::tracker::PlaylistSizeTracker;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Maximum playlist size accepted by Spotify
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Outcome of a successful [`CappedPlaylist::add`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReport {
    pub playlist_id: String,
    /// Number of tracks appended
    pub appended: usize,
    /// Identifiers sent to the remote for eviction, oldest first
    pub evicted: Vec<TrackId>,
    /// Tracked size after the operation
    ///
    /// `None` only for an empty batch on a playlist that was never counted.
    pub size: Option<usize>,
    /// Playlist version returned by the append call
    pub snapshot_id: Option<String>,
}

/// How an in-flight `add` can be interrupted
#[derive(Default)]
struct Abort<'a> {
    token: Option<&'a CancellationToken>,
    deadline: Option<Instant>,
}

impl Abort<'_> {
    /// Runs `fut` unless the token fires or the deadline passes first
    async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        let cancelled = async {
            match self.token {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => None,
            _ = expired => None,
            out = fut => Some(out),
        }
    }
}

/// Capacity-bounded append controller for one remote provider
///
/// # Example
///
/// ```
/// use pmocapacity::{CappedPlaylist, MemoryPlaylist};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> pmocapacity::Result<()> {
/// let remote = Arc::new(MemoryPlaylist::new());
/// remote.insert_playlist("pl", vec!["a".into(), "b".into(), "c".into()]);
///
/// let playlist = CappedPlaylist::new(remote.clone()).with_capacity(4);
/// let report = playlist.add("pl", &["d".into(), "e".into()]).await?;
///
/// assert_eq!(report.evicted, vec!["a".to_string()]);
/// assert_eq!(report.size, Some(4));
/// assert_eq!(remote.tracks("pl").unwrap(), vec!["b", "c", "d", "e"]);
/// # Ok(())
/// # }
/// ```
pub struct CappedPlaylist<R> {
    remote: R,
    tracker: Arc<PlaylistSizeTracker>,
    capacity: usize,
}

impl<R: RemotePlaylist> CappedPlaylist<R> {
    /// Creates a controller with [`DEFAULT_CAPACITY`] and a fresh tracker
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            tracker: Arc::new(PlaylistSizeTracker::new()),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Creates a controller using the capacity from pmoconfig
    #[cfg(feature = "pmoconfig")]
    pub fn from_config(remote: R, config: &pmoconfig::Config) -> anyhow::Result<Self> {
        use crate::config_ext::CapacityConfigExt;

        Ok(Self::new(remote).with_capacity(config.get_playlist_capacity()?))
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Shares an existing tracker (several controllers, one cache)
    ///
    /// Controllers sharing a tracker also share its per-playlist locks.
    pub fn with_tracker(mut self, tracker: Arc<PlaylistSizeTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tracker(&self) -> Arc<PlaylistSizeTracker> {
        self.tracker.clone()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Tracked size of `playlist_id`, counted on the remote the first time
    pub async fn size(&self, playlist_id: &str) -> Result<usize> {
        self.tracker.count(&self.remote, playlist_id).await
    }

    /// Appends `track_ids` to `playlist_id`, evicting the oldest tracks
    /// when the playlist would otherwise reach past its capacity
    ///
    /// # Errors
    ///
    /// - [`CapacityError::CapacityExceeded`] when the batch is larger than the
    ///   capacity itself; nothing is sent to the remote.
    /// - [`CapacityError::RemoteFetchFailed`] / [`CapacityError::EvictionShortfall`]
    ///   before any mutation; the tracked size is unchanged.
    /// - [`CapacityError::RemoteRemovalFailed`]; the tracked size is unchanged.
    /// - [`CapacityError::RemoteAppendFailed`]; the eviction, if any, and the
    ///   tracks the remote reports as applied are kept in the tracked size.
    pub async fn add(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<AppendReport> {
        self.run(playlist_id, track_ids, Abort::default()).await
    }

    /// Same as [`CappedPlaylist::add`], aborting with
    /// [`CapacityError::Cancelled`] as soon as `token` is cancelled
    ///
    /// Cancellation during the eviction call leaves the tracked size as it
    /// was. Cancellation during the append call keeps the eviction in the
    /// tracked size, as an append failure would.
    pub async fn add_with_cancel(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
        token: &CancellationToken,
    ) -> Result<AppendReport> {
        let abort = Abort {
            token: Some(token),
            deadline: None,
        };
        self.run(playlist_id, track_ids, abort).await
    }

    /// Same as [`CappedPlaylist::add`], giving up after `timeout`
    pub async fn add_with_timeout(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
        timeout: Duration,
    ) -> Result<AppendReport> {
        let abort = Abort {
            token: None,
            deadline: Some(Instant::now() + timeout),
        };
        self.run(playlist_id, track_ids, abort).await
    }

    async fn run(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
        abort: Abort<'_>,
    ) -> Result<AppendReport> {
        let cancelled = || CapacityError::Cancelled {
            playlist_id: playlist_id.to_string(),
        };

        let n = track_ids.len();
        if n == 0 {
            debug!(playlist_id, "Empty batch, nothing to append");
            return Ok(AppendReport {
                playlist_id: playlist_id.to_string(),
                appended: 0,
                evicted: Vec::new(),
                size: self.tracker.peek(playlist_id).await,
                snapshot_id: None,
            });
        }

        let lock = self.tracker.playlist_lock(playlist_id);
        let _guard = abort.guard(lock.lock()).await.ok_or_else(cancelled)?;

        // SIZE_KNOWN
        let current = abort
            .guard(self.tracker.count(&self.remote, playlist_id))
            .await
            .ok_or_else(cancelled)??;

        let total = current + n;
        let excess = total.saturating_sub(self.capacity);
        debug!(
            provider = self.remote.name(),
            playlist_id,
            current,
            requested = n,
            capacity = self.capacity,
            excess,
            "Planning append"
        );

        if excess > current {
            warn!(
                playlist_id,
                requested = n,
                capacity = self.capacity,
                "Batch larger than playlist capacity"
            );
            return Err(CapacityError::CapacityExceeded {
                playlist_id: playlist_id.to_string(),
                requested: n,
                current,
                capacity: self.capacity,
            });
        }

        // EVICTED
        let evicted = if excess > 0 {
            let victims = abort
                .guard(oldest_tracks(&self.remote, playlist_id, excess))
                .await
                .ok_or_else(cancelled)??;

            if victims.len() < excess {
                warn!(
                    playlist_id,
                    needed = excess,
                    found = victims.len(),
                    "Not enough removable tracks to make room"
                );
                return Err(CapacityError::EvictionShortfall {
                    playlist_id: playlist_id.to_string(),
                    needed: excess,
                    found: victims.len(),
                });
            }

            abort
                .guard(self.remote.remove_tracks(playlist_id, &victims))
                .await
                .ok_or_else(cancelled)?
                .map_err(|source| {
                    warn!(playlist_id, error = %source, "Eviction failed");
                    CapacityError::RemoteRemovalFailed {
                        playlist_id: playlist_id.to_string(),
                        source,
                    }
                })?;

            info!(
                provider = self.remote.name(),
                playlist_id,
                evicted = victims.len(),
                "Evicted oldest tracks"
            );
            victims
        } else {
            Vec::new()
        };

        // APPENDED
        let appended = match abort
            .guard(self.remote.append_tracks(playlist_id, track_ids))
            .await
        {
            Some(Ok(receipt)) => receipt,
            Some(Err(source)) => {
                warn!(
                    playlist_id,
                    applied = source.applied,
                    error = %source,
                    "Append failed"
                );
                self.record_failed_append(playlist_id, source.applied.min(n), excess)
                    .await;
                return Err(CapacityError::RemoteAppendFailed {
                    playlist_id: playlist_id.to_string(),
                    message: source.message.clone(),
                    source,
                });
            }
            None => {
                self.record_failed_append(playlist_id, 0, excess).await;
                return Err(cancelled());
            }
        };

        // DONE
        let delta = n as isize - excess as isize;
        let size = self.tracker.adjust(playlist_id, delta).await?;

        info!(
            provider = self.remote.name(),
            playlist_id,
            appended = n,
            evicted = excess,
            size,
            "Appended tracks"
        );

        Ok(AppendReport {
            playlist_id: playlist_id.to_string(),
            appended: n,
            evicted,
            size: Some(size),
            snapshot_id: appended.snapshot_id,
        })
    }

    /// Records an eviction whose append did not complete
    ///
    /// `applied` tracks of the batch reached the playlist before the failure.
    async fn record_failed_append(&self, playlist_id: &str, applied: usize, excess: usize) {
        let delta = applied as isize - excess as isize;
        if delta == 0 {
            return;
        }
        if let Err(e) = self.tracker.adjust(playlist_id, delta).await {
            error!(playlist_id, error = %e, "Failed to record partial append");
        }
    }
}

/// Collects the first `count` identifiers of a playlist, oldest first
///
/// Pagination stops as soon as enough identifiers are collected. Fewer than
/// `count` are returned when the playlist runs out first.
pub async fn oldest_tracks<R>(remote: &R, playlist_id: &str, count: usize) -> Result<Vec<TrackId>>
where
    R: RemotePlaylist + ?Sized,
{
    let mut victims = Vec::with_capacity(count);
    let mut token: Option<String> = None;

    while victims.len() < count {
        let page = remote
            .fetch_page(playlist_id, token.as_deref())
            .await
            .map_err(|source| CapacityError::RemoteFetchFailed {
                playlist_id: playlist_id.to_string(),
                source,
            })?;

        let missing = count - victims.len();
        victims.extend(page.items.into_iter().take(missing));

        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!(playlist_id, wanted = count, found = victims.len(), "Prefix scan done");
    Ok(victims)
}
