//! JSON-file backed profile store

use super::{
    profile::{Profiles, ProviderProfile},
    Error, Result,
};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Durable mapping from profile id to [`ProviderProfile`]
///
/// All mutations run under the write lock: the new map is built, written to
/// disk, and only then swapped in, so memory and file never diverge and a
/// failed write leaves the store unchanged.
pub struct ConfigStore {
    path: PathBuf,
    profiles: RwLock<Profiles>,
}

impl ConfigStore {
    /// Open the store at `path`.
    ///
    /// A missing, unreadable or malformed file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profiles = load(&path);
        info!("Loaded {} profile(s) from {}", profiles.len(), path.display());
        ConfigStore {
            path,
            profiles: RwLock::new(profiles),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert `profile` under a fresh id and persist it
    pub fn create(&self, mut profile: ProviderProfile) -> Result<String> {
        profile.validate()?;
        let mut profiles = self.write();

        let id = loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !profiles.contains_key(&candidate) {
                break candidate;
            }
        };
        profile.id = id.clone();
        let name = profile.name.clone();

        let mut next = profiles.clone();
        next.insert(id.clone(), profile);
        self.commit(&mut profiles, next)?;

        info!("Created profile - id: {}, name: {}", id, name);
        Ok(id)
    }

    /// Replace the profile at `id`
    pub fn update(&self, id: &str, mut profile: ProviderProfile) -> Result<()> {
        let mut profiles = self.write();
        if !profiles.contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        profile.validate()?;
        profile.id = id.to_string();
        let name = profile.name.clone();

        let mut next = profiles.clone();
        next.insert(id.to_string(), profile);
        self.commit(&mut profiles, next)?;

        info!("Updated profile - id: {}, name: {}", id, name);
        Ok(())
    }

    /// Remove the profile at `id` and return it
    pub fn delete(&self, id: &str) -> Result<ProviderProfile> {
        let mut profiles = self.write();
        let mut next = profiles.clone();
        let removed = next
            .shift_remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.commit(&mut profiles, next)?;

        info!("Deleted profile - id: {}, name: {}", id, removed.name);
        Ok(removed)
    }

    /// Get one profile
    pub fn get(&self, id: &str) -> Option<ProviderProfile> {
        self.read().get(id).cloned()
    }

    /// Point-in-time copy of every profile
    pub fn list_all(&self) -> Profiles {
        self.read().clone()
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no profile
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn commit(&self, current: &mut Profiles, next: Profiles) -> Result<()> {
        if let Err(e) = persist(&self.path, &next) {
            warn!("Failed to save profiles to {}: {}", self.path.display(), e);
            return Err(e);
        }
        *current = next;
        Ok(())
    }

    // The map is only ever replaced wholesale after a successful write, so a
    // poisoned lock still guards a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, Profiles> {
        self.profiles.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Profiles> {
        self.profiles.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn load(path: &Path) -> Profiles {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Profile file {} not found, starting empty", path.display());
            return Profiles::new();
        }
        Err(e) => {
            warn!("Failed to read profile file {}: {}", path.display(), e);
            return Profiles::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(profiles) => profiles,
        Err(e) => {
            warn!(
                "Profile file {} is malformed, starting empty: {}",
                path.display(),
                e
            );
            Profiles::new()
        }
    }
}

/// Write `profiles` to a sibling temp file, then rename it over `path`
fn persist(path: &Path, profiles: &Profiles) -> Result<()> {
    let json = serde_json::to_string_pretty(profiles)
        .map_err(|e| Error::Persistence(format!("failed to encode profiles: {}", e)))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json.as_bytes())
        .map_err(|e| Error::Persistence(format!("failed to write {}: {}", tmp.display(), e)))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Error::Persistence(format!("failed to replace {}: {}", path.display(), e))
    })
}
