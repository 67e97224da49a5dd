//! Mod Registry
//!
//! Ordered list of discovered mods plus the persisted reference list they
//! were discovered from. List order is load priority and doubles as the
//! dependency-initialization order.
//!
//! Every mutation persists immediately. The core mod cannot be removed,
//! disabled or moved. References that were not discovered this session keep
//! their stored position across saves.

use super::source::ModSources;
use super::storage::{load_references, save_references, ModReference, Storage};
use super::LoadedMod;
use crate::config::LoaderConfig;
use crate::error::{PmlError, PmlResult};
use std::collections::HashSet;

pub struct ModRegistry {
    mods: Vec<LoadedMod>,
    references: Vec<ModReference>,
    /// Base URLs of every mod registered this session, removed ones included.
    discovered: HashSet<String>,
    storage: Box<dyn Storage>,
    storage_key: String,
    core_mod_id: String,
    host_version: String,
}

impl ModRegistry {
    /// Open the registry and read the persisted reference list.
    ///
    /// Empty storage is seeded with the core mod reference and written back.
    pub fn open(config: &LoaderConfig, storage: Box<dyn Storage>) -> PmlResult<Self> {
        let mut registry = Self {
            mods: Vec::new(),
            references: Vec::new(),
            discovered: HashSet::new(),
            storage,
            storage_key: config.storage_key.clone(),
            core_mod_id: config.core_mod_id.clone(),
            host_version: config.host_version.clone(),
        };
        registry.references = match load_references(registry.storage.as_ref(), &registry.storage_key)? {
            Some(references) => references,
            None => {
                log::info!("No stored mods, seeding core mod {}", config.core_mod.base);
                let seeded = vec![config.core_mod.clone()];
                save_references(registry.storage.as_mut(), &registry.storage_key, &seeded)?;
                seeded
            }
        };
        Ok(registry)
    }

    /// The persisted reference list.
    pub fn list(&self) -> &[ModReference] {
        &self.references
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    pub fn is_core(&self, id: &str) -> bool {
        id == self.core_mod_id
    }

    pub fn mods(&self) -> &[LoadedMod] {
        &self.mods
    }

    pub fn get(&self, id: &str) -> Option<&LoadedMod> {
        self.mods.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut LoadedMod> {
        self.mods.iter_mut().find(|m| m.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.mods.iter().position(|m| m.id == id)
    }

    pub(crate) fn mods_mut(&mut self) -> &mut [LoadedMod] {
        &mut self.mods
    }

    /// Append a discovered mod without persisting.
    pub(crate) fn push(&mut self, loaded: LoadedMod) -> PmlResult<()> {
        if self.get(&loaded.id).is_some() {
            return Err(PmlError::DuplicateMod(loaded.name));
        }
        self.discovered.insert(loaded.base_url.clone());
        self.mods.push(loaded);
        Ok(())
    }

    /// The persisted form of a mod.
    pub fn serialize(&self, id: &str) -> Option<ModReference> {
        self.get(id).map(LoadedMod::to_reference)
    }

    /// Write the current mod list to storage.
    ///
    /// Stored slots of discovered mods are refilled with the mod list in
    /// order; undiscovered references stay where they were and mods beyond
    /// the stored slots are appended.
    pub fn save(&mut self) -> PmlResult<()> {
        let mut current = self.mods.iter().map(LoadedMod::to_reference);
        let mut merged = Vec::with_capacity(self.references.len().max(self.mods.len()));
        for stored in &self.references {
            if !self.discovered.contains(&stored.base) {
                merged.push(stored.clone());
            } else if let Some(next) = current.next() {
                merged.push(next);
            }
        }
        merged.extend(current);
        self.references = merged;
        save_references(self.storage.as_mut(), &self.storage_key, &self.references)
    }

    /// Fetch, validate and append a new mod with the lowest priority.
    ///
    /// A `"latest"` version is resolved first; it stays pinned to "latest"
    /// only when `auto_update` is set. The new mod starts unloaded.
    pub async fn add(
        &mut self,
        sources: &ModSources,
        reference: ModReference,
        auto_update: bool,
    ) -> PmlResult<&LoadedMod> {
        let mut version = reference.version.clone();
        let mut saved_latest = false;
        if reference.is_latest() {
            version = sources
                .resolve_latest(&reference.base, &self.host_version)
                .await?;
            saved_latest = auto_update;
        }

        let version_url = format!("{}/{}", reference.base, version);
        let manifest = sources.fetch_manifest(&version_url).await?;
        let info = &manifest.polymod;
        if self.get(&info.id).is_some() {
            return Err(PmlError::DuplicateMod(info.id.clone()));
        }
        if !manifest.targets_host(&self.host_version) {
            return Err(PmlError::IncompatibleTarget {
                name: info.name.clone(),
                version: version.clone(),
                targets: info.targets.join(", "),
                host: self.host_version.clone(),
            });
        }

        let plugin = sources.import(&version_url, &manifest).await?;
        let mut loaded = LoadedMod::new(plugin);
        loaded.apply_manifest(&manifest);
        loaded.bind_source(&reference.base, &version, saved_latest);
        loaded.loaded = false;
        log::info!("Added mod {} {} from {}", loaded.name, loaded.version, loaded.base_url);

        self.discovered.insert(loaded.base_url.clone());
        self.mods.push(loaded);
        self.save()?;
        let index = self.mods.len() - 1;
        Ok(&self.mods[index])
    }

    /// Remove a mod. No-op for the core mod.
    pub fn remove(&mut self, id: &str) -> PmlResult<()> {
        if self.is_core(id) {
            return Ok(());
        }
        let index = self
            .position(id)
            .ok_or_else(|| PmlError::ModNotFound(id.to_string()))?;
        let removed = self.mods.remove(index);
        log::info!("Removed mod {}", removed.name);
        self.save()
    }

    /// Set whether a mod should be activated. No-op for the core mod.
    pub fn set_loaded(&mut self, id: &str, state: bool) -> PmlResult<()> {
        if self.is_core(id) {
            return Ok(());
        }
        let loaded = self
            .get_mut(id)
            .ok_or_else(|| PmlError::ModNotFound(id.to_string()))?;
        loaded.loaded = state;
        self.save()
    }

    /// Move a mod by `delta` places. Negative moves raise priority.
    ///
    /// Refuses to move the core mod, the entry right behind it, anything
    /// towards lower priority, or anything onto the core mod's slot. A zero
    /// delta changes nothing.
    ///
    /// # Returns
    /// `true` if the list changed.
    pub fn reorder(&mut self, id: &str, delta: isize) -> PmlResult<bool> {
        if self.is_core(id) {
            return Ok(false);
        }
        let index = self
            .position(id)
            .ok_or_else(|| PmlError::ModNotFound(id.to_string()))?;
        if index <= 1 || delta >= 0 {
            return Ok(false);
        }
        let target = index as isize + delta;
        if target < 1 {
            return Ok(false);
        }
        self.mods.swap(index, target as usize);
        self.save()?;
        Ok(true)
    }
}

impl std::fmt::Debug for ModRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModRegistry")
            .field("mods", &self.mods)
            .field("references", &self.references)
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}
