//! Error types for pmocapacity

use crate::remote::RemoteError;

/// Errors returned by the size tracker and the append controller
#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    /// The batch cannot fit even after evicting every existing track
    #[error(
        "Cannot add {requested} tracks to playlist {playlist_id}: \
         {current} tracks present, capacity is {capacity}"
    )]
    CapacityExceeded {
        playlist_id: String,
        requested: usize,
        current: usize,
        capacity: usize,
    },

    /// The prefix scan found fewer removable tracks than eviction requires
    ///
    /// Happens when the tracked size is stale or when the oldest entries
    /// cannot be addressed by identifier. Nothing was mutated.
    #[error(
        "Playlist {playlist_id}: {needed} tracks must be evicted \
         but only {found} removable tracks were found"
    )]
    EvictionShortfall {
        playlist_id: String,
        needed: usize,
        found: usize,
    },

    /// Reading the playlist (size walk or prefix scan) failed
    #[error("Failed to read playlist {playlist_id}: {source}")]
    RemoteFetchFailed {
        playlist_id: String,
        #[source]
        source: RemoteError,
    },

    /// The eviction call failed, nothing is known to have been removed
    #[error("Failed to evict tracks from playlist {playlist_id}: {source}")]
    RemoteRemovalFailed {
        playlist_id: String,
        #[source]
        source: RemoteError,
    },

    /// The append call failed (eviction, if any, already happened)
    #[error("Failed to append tracks to playlist {playlist_id}: {message}")]
    RemoteAppendFailed {
        playlist_id: String,
        message: String,
        #[source]
        source: RemoteError,
    },

    /// The operation was cancelled or timed out before completion
    #[error("Operation on playlist {playlist_id} was cancelled")]
    Cancelled { playlist_id: String },

    /// Bookkeeping defect: should be unreachable from the controller
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),
}

impl CapacityError {
    /// Whether the caller asked for more than the playlist can ever hold
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, CapacityError::CapacityExceeded { .. })
    }

    /// Whether the failure came from the remote service
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CapacityError::RemoteFetchFailed { .. }
                | CapacityError::RemoteRemovalFailed { .. }
                | CapacityError::RemoteAppendFailed { .. }
        )
    }

    /// The underlying remote error, if any
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            CapacityError::RemoteFetchFailed { source, .. }
            | CapacityError::RemoteRemovalFailed { source, .. }
            | CapacityError::RemoteAppendFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for pmocapacity
pub type Result<T> = std::result::Result<T, CapacityError>;
