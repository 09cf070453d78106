//! Extension de pmoconfig pour la capacité des playlists

use crate::controller::DEFAULT_CAPACITY;
use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::Value;

/// Trait d'extension pour pmoconfig::Config
pub trait CapacityConfigExt {
    /// Maximum number of tracks a playlist may hold (`playlists.capacity`)
    fn get_playlist_capacity(&self) -> Result<usize>;

    /// Sets `playlists.capacity`
    fn set_playlist_capacity(&self, capacity: usize) -> Result<()>;
}

impl CapacityConfigExt for Config {
    fn get_playlist_capacity(&self) -> Result<usize> {
        self.get_usize(&["playlists", "capacity"], DEFAULT_CAPACITY)
    }

    fn set_playlist_capacity(&self, capacity: usize) -> Result<()> {
        self.set_value(&["playlists", "capacity"], Value::from(capacity as u64))
    }
}
