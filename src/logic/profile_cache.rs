use crate::db::ProfileStore;
use crate::error::Result;
use crate::models::PlantProfile;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Read-mostly plant profile cache, filled lazily from the store.
#[derive(Default)]
pub struct ProfileCache {
    profiles: RwLock<HashMap<String, Arc<PlantProfile>>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<S: ProfileStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
    ) -> Result<Option<Arc<PlantProfile>>> {
        if let Some(profile) = self
            .profiles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
        {
            return Ok(Some(Arc::clone(profile)));
        }

        let Some(profile) = store.get_profile(id)? else {
            return Ok(None);
        };
        let profile = Arc::new(profile);
        self.profiles
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), Arc::clone(&profile));
        tracing::debug!(profile = %id, "Cached plant profile");
        Ok(Some(profile))
    }

    /// Drop everything; the next lookup reloads from the store.
    pub fn invalidate(&self) {
        let mut profiles = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        let dropped = profiles.len();
        profiles.clear();
        tracing::debug!(dropped, "Plant profile cache cleared");
    }
}
