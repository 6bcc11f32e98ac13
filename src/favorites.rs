use tracing::warn;

use crate::error::StoreError;
use crate::store::KeyValueStore;

pub const FAVORITES_KEY: &str = "favoriteMovieIds";

/// Persisted set of favorite movie ids, kept in insertion order.
pub struct Favorites<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Favorites<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unreadable or malformed contents read as no favorites.
    pub fn ids(&self) -> Vec<i64> {
        let raw = match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites: {}", e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring malformed favorites: {}", e);
            Vec::new()
        })
    }

    pub fn is_favorite(&self, id: i64) -> bool {
        self.ids().contains(&id)
    }

    /// Adds `id` if absent, removes it otherwise, and returns the new list.
    pub fn toggle(&self, id: i64) -> Result<Vec<i64>, StoreError> {
        let mut ids = self.ids();
        if ids.contains(&id) {
            ids.retain(|&x| x != id);
        } else {
            ids.push(id);
        }
        self.store.set(FAVORITES_KEY, serde_json::to_string(&ids)?)?;
        Ok(ids)
    }
}
