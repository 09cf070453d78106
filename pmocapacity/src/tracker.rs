//! PlaylistSizeTracker : cache des tailles de playlists distantes
//!
//! The tracker remembers how many tracks each remote playlist holds. The
//! first lookup of a playlist walks it page by page through the provider;
//! afterwards the count only moves through [`PlaylistSizeTracker::adjust`],
//! driven by the controller's own bookkeeping. Entries never expire: the
//! tracker assumes this process is the only writer of the playlists it
//! tracks.
//!
//! The tracker also owns the per-playlist locks, so every controller sharing
//! a tracker is serialized on the same playlist.

use crate::error::{CapacityError, Result};
use crate::remote::RemotePlaylist;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Process-local cache of playlist sizes
#[derive(Debug, Default)]
pub struct PlaylistSizeTracker {
    counts: RwLock<HashMap<String, usize>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PlaylistSizeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached count without touching the remote
    pub async fn peek(&self, playlist_id: &str) -> Option<usize> {
        self.counts.read().await.get(playlist_id).copied()
    }

    /// Records a known count for a playlist that is not tracked yet
    ///
    /// An existing entry is kept as is. Returns the count now tracked.
    pub async fn seed(&self, playlist_id: &str, count: usize) -> usize {
        let mut counts = self.counts.write().await;
        *counts.entry(playlist_id.to_string()).or_insert(count)
    }

    /// Lock guarding read-modify-write sequences on `playlist_id`
    ///
    /// The same lock is returned to every caller of this tracker.
    pub fn playlist_lock(&self, playlist_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(playlist_id.to_string()).or_default().clone()
    }

    /// Number of playlists currently tracked
    pub async fn tracked(&self) -> usize {
        self.counts.read().await.len()
    }

    /// Returns the size of `playlist_id`, walking the remote playlist the
    /// first time it is asked for
    ///
    /// The walk sums [`TrackPage::len`](crate::TrackPage::len) until the
    /// provider stops returning a continuation token. A failed walk leaves
    /// the playlist untracked.
    pub async fn count<R>(&self, remote: &R, playlist_id: &str) -> Result<usize>
    where
        R: RemotePlaylist + ?Sized,
    {
        if let Some(count) = self.peek(playlist_id).await {
            return Ok(count);
        }

        let total = walk_size(remote, playlist_id).await?;
        info!(
            provider = remote.name(),
            playlist_id, total, "Playlist size established"
        );

        // un autre appelant a pu compter entre-temps : on garde la première valeur
        Ok(self.seed(playlist_id, total).await)
    }

    /// Adds `delta` to the tracked count of `playlist_id`
    ///
    /// Fails with [`CapacityError::InternalConsistency`] when the playlist
    /// has no baseline yet or when the result would leave the `usize` range.
    pub async fn adjust(&self, playlist_id: &str, delta: isize) -> Result<usize> {
        let mut counts = self.counts.write().await;

        let Some(count) = counts.get_mut(playlist_id) else {
            return Err(CapacityError::InternalConsistency(format!(
                "adjust({}) called on untracked playlist {}",
                delta, playlist_id
            )));
        };

        let updated = count.checked_add_signed(delta).ok_or_else(|| {
            CapacityError::InternalConsistency(format!(
                "adjusting playlist {} by {} from {} is out of range",
                playlist_id, delta, count
            ))
        })?;

        debug!(playlist_id, delta, from = *count, to = updated, "Adjusted playlist size");
        *count = updated;
        Ok(updated)
    }
}

/// Walks every page of a playlist and sums the page sizes
async fn walk_size<R>(remote: &R, playlist_id: &str) -> Result<usize>
where
    R: RemotePlaylist + ?Sized,
{
    let mut total = 0usize;
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = remote
            .fetch_page(playlist_id, token.as_deref())
            .await
            .map_err(|source| CapacityError::RemoteFetchFailed {
                playlist_id: playlist_id.to_string(),
                source,
            })?;

        pages += 1;
        total += page.len;
        debug!(playlist_id, page = pages, len = page.len, total, "Counted playlist page");

        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPlaylist;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("t{i}")).collect()
    }

    #[tokio::test]
    async fn test_count_walks_once() {
        let remote = MemoryPlaylist::with_page_size(3);
        remote.insert_playlist("pl", ids(8));
        let tracker = PlaylistSizeTracker::new();

        assert_eq!(tracker.count(&remote, "pl").await.unwrap(), 8);
        // 3 + 3 + 2
        assert_eq!(remote.fetch_calls(), 3);

        remote.insert_playlist("pl", ids(2));
        assert_eq!(tracker.count(&remote, "pl").await.unwrap(), 8);
        assert_eq!(remote.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn test_count_empty_playlist() {
        let remote = MemoryPlaylist::new();
        remote.insert_playlist("empty", Vec::new());
        let tracker = PlaylistSizeTracker::new();

        assert_eq!(tracker.count(&remote, "empty").await.unwrap(), 0);
        assert_eq!(tracker.peek("empty").await, Some(0));
    }

    #[tokio::test]
    async fn test_failed_walk_leaves_playlist_untracked() {
        let remote = MemoryPlaylist::new();
        remote.insert_playlist("pl", ids(4));
        remote.fail_next_fetch("timeout");
        let tracker = PlaylistSizeTracker::new();

        let err = tracker.count(&remote, "pl").await.unwrap_err();
        assert!(matches!(err, CapacityError::RemoteFetchFailed { .. }));
        assert_eq!(tracker.peek("pl").await, None);

        assert_eq!(tracker.count(&remote, "pl").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_adjust_requires_baseline() {
        let tracker = PlaylistSizeTracker::new();
        let err = tracker.adjust("unknown", 2).await.unwrap_err();
        assert!(matches!(err, CapacityError::InternalConsistency(_)));
    }

    #[tokio::test]
    async fn test_adjust_moves_count() {
        let tracker = PlaylistSizeTracker::new();
        tracker.seed("pl", 5).await;

        assert_eq!(tracker.adjust("pl", 3).await.unwrap(), 8);
        assert_eq!(tracker.adjust("pl", -6).await.unwrap(), 2);
        assert_eq!(tracker.peek("pl").await, Some(2));
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_rejected() {
        let tracker = PlaylistSizeTracker::new();
        tracker.seed("pl", 1).await;

        assert!(tracker.adjust("pl", -2).await.is_err());
        assert_eq!(tracker.peek("pl").await, Some(1));
    }

    #[test]
    fn test_playlist_lock_is_shared() {
        let tracker = PlaylistSizeTracker::new();
        let a = tracker.playlist_lock("pl");
        let b = tracker.playlist_lock("pl");
        let other = tracker.playlist_lock("other");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_entry() {
        let tracker = PlaylistSizeTracker::new();
        assert_eq!(tracker.seed("pl", 4).await, 4);
        assert_eq!(tracker.seed("pl", 9).await, 4);
        assert_eq!(tracker.tracked().await, 1);
    }
}
