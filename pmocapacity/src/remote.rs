//! Remote playlist capability
//!
//! The controller never talks to a music service directly. Everything it
//! needs from the remote side goes through [`RemotePlaylist`]: read one page
//! of a playlist, append identifiers, remove identifiers. Each provider
//! (Spotify, the in-memory [`MemoryPlaylist`](crate::MemoryPlaylist), ...)
//! implements this trait and receives its credentials from the caller.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a remote playlist
pub type PlaylistId = String;

/// Opaque identifier of a track, as understood by the provider
pub type TrackId = String;

/// One page of a playlist, in playlist order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackPage {
    /// Removable identifiers found on this page, oldest first
    pub items: Vec<TrackId>,
    /// Number of entries on this page
    ///
    /// Usually `items.len()`. A provider may return entries that cannot be
    /// addressed by identifier (local files on Spotify); they count toward
    /// the playlist size but never show up in `items`.
    pub len: usize,
    /// Continuation token for the next page, `None` on the last page
    pub next: Option<String>,
}

impl TrackPage {
    /// Builds a page where every entry carries an identifier
    pub fn new(items: Vec<TrackId>, next: Option<String>) -> Self {
        let len = items.len();
        Self { items, len, next }
    }

    /// Whether pagination stops after this page
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// What the remote answered to an append
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Playlist version returned by the service, when it has one
    pub snapshot_id: Option<String>,
}

/// Transport-level failure reported by a provider
///
/// Providers convert their own error type into this one so the controller
/// stays provider-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Provider that produced the error
    pub provider: String,
    /// HTTP-like status code, when the provider has one
    pub status: Option<u16>,
    /// Human readable message
    pub message: String,
    /// Tracks an append applied before failing
    ///
    /// Providers that split an append into several requests report how many
    /// tracks made it to the playlist before the failing request. Always 0
    /// for fetch and removal errors.
    pub applied: usize,
}

impl RemoteError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status: None,
            message: message.into(),
            applied: 0,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Records that `applied` tracks of a failed append reached the playlist
    pub fn with_applied(mut self, applied: usize) -> Self {
        self.applied = applied;
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} (status {}): {}", self.provider, code, self.message)?,
            None => write!(f, "{}: {}", self.provider, self.message)?,
        }
        if self.applied > 0 {
            write!(f, " ({} tracks applied)", self.applied)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

/// Capabilities the append controller requires from a music service
///
/// Implementations must be `Send + Sync`: a single client is usually shared
/// behind an `Arc` by several controllers.
#[async_trait]
pub trait RemotePlaylist: Send + Sync {
    /// Provider name, used in logs and errors
    fn name(&self) -> &str;

    /// Fetches one page of `playlist_id`
    ///
    /// `page_token` is `None` for the first page, then whatever
    /// [`TrackPage::next`] returned.
    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, RemoteError>;

    /// Appends `track_ids` at the end of the playlist, keeping their order
    ///
    /// When the append fails after part of the batch reached the playlist,
    /// the error carries that count in [`RemoteError::applied`]; the applied
    /// tracks are always a prefix of `track_ids`.
    async fn append_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> Result<AppendReceipt, RemoteError>;

    /// Removes every occurrence of each identifier in `track_ids`
    async fn remove_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: RemotePlaylist + ?Sized> RemotePlaylist for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, RemoteError> {
        (**self).fetch_page(playlist_id, page_token).await
    }

    async fn append_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> Result<AppendReceipt, RemoteError> {
        (**self).append_tracks(playlist_id, track_ids).await
    }

    async fn remove_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[TrackId],
    ) -> Result<(), RemoteError> {
        (**self).remove_tracks(playlist_id, track_ids).await
    }
}
