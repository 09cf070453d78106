//! In-memory provider
//!
//! [`MemoryPlaylist`] implements [`RemotePlaylist`] over a map of vectors.
//! It paginates like a real service, removes every occurrence of an
//! identifier like Spotify does, counts the calls it receives and can be told
//! to fail the next call of a given kind. Tests and demos use it in place of
//! a network client.

use crate::remote::{AppendReceipt, RemoteError, RemotePlaylist, TrackId, TrackPage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "memory";
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Default)]
struct CallCounters {
    fetch: usize,
    append: usize,
    removal: usize,
}

#[derive(Debug, Default)]
struct PendingFailures {
    fetch: Option<String>,
    /// Message and number of tracks applied before failing
    append: Option<(String, usize)>,
    removal: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    playlists: HashMap<String, Vec<TrackId>>,
    calls: CallCounters,
    failures: PendingFailures,
    removals: Vec<Vec<TrackId>>,
    snapshot: u64,
}

/// A [`RemotePlaylist`] living in process memory
#[derive(Debug)]
pub struct MemoryPlaylist {
    page_size: usize,
    latency: Option<Duration>,
    state: Mutex<MemoryState>,
}

impl Default for MemoryPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlaylist {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates a provider serving pages of `page_size` entries (at least 1)
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            latency: None,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Delays every call by `latency`, to exercise timeouts and cancellation
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Creates or replaces a playlist
    pub fn insert_playlist(&self, playlist_id: &str, tracks: Vec<TrackId>) {
        self.state()
            .playlists
            .insert(playlist_id.to_string(), tracks);
    }

    /// Current contents of a playlist, oldest first
    pub fn tracks(&self, playlist_id: &str) -> Option<Vec<TrackId>> {
        self.state().playlists.get(playlist_id).cloned()
    }

    /// Current number of tracks of a playlist (0 if unknown)
    pub fn len(&self, playlist_id: &str) -> usize {
        self.state()
            .playlists
            .get(playlist_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Makes the next `fetch_page` call fail with `message`
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        self.state().failures.fetch = Some(message.into());
    }

    /// Makes the next `append_tracks` call fail with `message`
    pub fn fail_next_append(&self, message: impl Into<String>) {
        self.fail_next_append_after(0, message);
    }

    /// Makes the next `append_tracks` call apply its first `applied` tracks
    /// and then fail with `message`, like a multi-request append failing
    /// part-way
    pub fn fail_next_append_after(&self, applied: usize, message: impl Into<String>) {
        self.state().failures.append = Some((message.into(), applied));
    }

    /// Makes the next `remove_tracks` call fail with `message`
    pub fn fail_next_removal(&self, message: impl Into<String>) {
        self.state().failures.removal = Some(message.into());
    }

    pub fn fetch_calls(&self) -> usize {
        self.state().calls.fetch
    }

    pub fn append_calls(&self) -> usize {
        self.state().calls.append
    }

    pub fn removal_calls(&self) -> usize {
        self.state().calls.removal
    }

    /// Identifier batches received by `remove_tracks`, in call order
    pub fn removals(&self) -> Vec<Vec<TrackId>> {
        self.state().removals.clone()
    }

    fn not_found(playlist_id: &str) -> RemoteError {
        RemoteError::new(PROVIDER, format!("Playlist {} not found", playlist_id)).with_status(404)
    }
}

#[async_trait]
impl RemotePlaylist for MemoryPlaylist {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, RemoteError> {
        self.wait().await;

        let mut state = self.state();
        state.calls.fetch += 1;

        if let Some(message) = state.failures.fetch.take() {
            return Err(RemoteError::new(PROVIDER, message).with_status(500));
        }

        let offset = match page_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                RemoteError::new(PROVIDER, format!("Invalid page token: {}", token))
                    .with_status(400)
            })?,
        };

        let tracks = state
            .playlists
            .get(playlist_id)
            .ok_or_else(|| Self::not_found(playlist_id))?;

        let end = (offset + self.page_size).min(tracks.len());
        let items = tracks.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next = (end < tracks.len()).then(|| end.to_string());

        debug!(playlist_id, offset, count = items.len(), "Serving memory page");
        Ok(TrackPage::new(items, next))
    }

    async fn append_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> Result<AppendReceipt, RemoteError> {
        self.wait().await;

        let mut state = self.state();
        state.calls.append += 1;

        let failure = state.failures.append.take();

        let tracks = state
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| Self::not_found(playlist_id))?;

        if let Some((message, applied)) = failure {
            let applied = applied.min(track_ids.len());
            tracks.extend(track_ids[..applied].iter().cloned());
            return Err(RemoteError::new(PROVIDER, message)
                .with_status(400)
                .with_applied(applied));
        }

        tracks.extend(track_ids.iter().cloned());

        state.snapshot += 1;
        Ok(AppendReceipt {
            snapshot_id: Some(format!("snapshot-{}", state.snapshot)),
        })
    }

    async fn remove_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> Result<(), RemoteError> {
        self.wait().await;

        let mut state = self.state();
        state.calls.removal += 1;

        if let Some(message) = state.failures.removal.take() {
            return Err(RemoteError::new(PROVIDER, message).with_status(500));
        }

        let tracks = state
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| Self::not_found(playlist_id))?;
        tracks.retain(|track| !track_ids.contains(track));

        state.removals.push(track_ids.to_vec());
        state.snapshot += 1;
        Ok(())
    }
}
