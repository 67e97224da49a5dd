//! Mod Lifecycle Controller
//!
//! Drives discovery, dependency-ordered initialization and the post-init and
//! sim-init phases.
//!
//! # Overview
//!
//! ```text
//! stored references ──► import_mods ──► registry ──► init_mods ──► finalize
//!                        (sequential)                (FIFO queue)    extensions
//!                                                                       │
//!                                  post_init_mods ◄─────────────────────┘
//!                                  sim_init_mods
//! ```
//!
//! # Initialization
//!
//! The queue is seeded with every loaded mod in registry order. For the mod
//! at the front, dependencies are checked in declaration order:
//!
//! | dependency state                         | outcome                     |
//! |------------------------------------------|-----------------------------|
//! | the mod itself                           | dropped, alert              |
//! | not in the registry                      | dropped, alert              |
//! | present but not loaded                   | dropped, alert              |
//! | version differs (exact string compare)   | dropped, alert              |
//! | left the queue without initializing      | dropped, alert              |
//! | still queued                             | moved to the back           |
//! | initialized                              | next dependency             |
//!
//! A mod whose dependencies are all initialized runs its init callback. A
//! failing callback unloads the mod (persisted). If the queue goes a full
//! pass without any mod initializing or dropping, every remaining mod is
//! part of a dependency cycle and is dropped.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn run() -> pml_core::PmlResult<()> {
//! use pml_core::mods::api::*;
//!
//! let config = LoaderConfig::load()?;
//! let storage = FileStorage::open(&config.storage_path)?;
//! let mut loader = ModLoader::new(config, Box::new(storage), ModSources::http(), Box::new(LogNotifier))?;
//!
//! loader.import_mods().await;
//! loader.init_mods();
//! loader.post_init_mods();
//! loader.sim_init_mods()?;
//! # Ok(())
//! # }
//! ```

use super::alert::{Alert, Notifier};
use super::context::ModContext;
use super::registry::ModRegistry;
use super::source::ModSources;
use super::storage::{ModReference, Storage};
use super::LoadedMod;
use crate::config::LoaderConfig;
use crate::error::{PmlError, PmlResult};
use crate::mixin::{PatchOutput, Surface};
use std::collections::{HashSet, VecDeque};

/// Outcome of one initialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// IDs that initialized, in initialization order.
    pub initialized: Vec<String>,
    /// IDs dropped for this session, in drop order.
    pub dropped: Vec<String>,
}

enum DependencyCheck {
    Ready,
    Defer,
    Drop(Alert),
}

/// The lifecycle controller.
pub struct ModLoader {
    config: LoaderConfig,
    registry: ModRegistry,
    sources: ModSources,
    notifier: Box<dyn Notifier>,
    context: ModContext,
    /// Set by the first `init_mods` call.
    init_done: bool,
}

impl ModLoader {
    /// Create a loader, reading the stored reference list.
    ///
    /// # Arguments
    /// * `config` - Loader settings; its host profile is loaded here
    /// * `storage` - Durable storage for the reference list
    /// * `sources` - Fetcher and importer for discovery
    /// * `notifier` - Channel for user alerts
    pub fn new(
        config: LoaderConfig,
        storage: Box<dyn Storage>,
        sources: ModSources,
        notifier: Box<dyn Notifier>,
    ) -> PmlResult<Self> {
        let profile = config.load_host_profile()?;
        let registry = ModRegistry::open(&config, storage)?;
        Ok(Self {
            context: ModContext::new(profile),
            config,
            registry,
            sources,
            notifier,
            init_done: false,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ModContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ModContext {
        &mut self.context
    }

    pub fn get_mod(&self, id: &str) -> Option<&LoadedMod> {
        self.registry.get(id)
    }

    pub fn all_mods(&self) -> &[LoadedMod] {
        self.registry.mods()
    }

    /// Whether leaderboard submission is disabled for this session.
    pub fn leaderboard_invalid(&self) -> bool {
        self.context.leaderboard_invalid()
    }

    fn raise(&self, alert: Alert) {
        log::warn!("{}", alert);
        self.notifier.alert(&alert);
    }

    // ---- discovery ----

    /// Fetch and import every stored reference, strictly one at a time.
    ///
    /// Failures alert and skip the reference for this session.
    ///
    /// # Returns
    /// Number of mods added to the registry.
    pub async fn import_mods(&mut self) -> usize {
        let references: Vec<ModReference> = self.registry.list().to_vec();
        let total = references.len();
        let mut imported = 0;

        for (index, reference) in references.into_iter().enumerate() {
            log::info!(
                "({}/{}) Importing mod from URL: {} @ version {}",
                index + 1,
                total,
                reference.base,
                reference.version
            );
            if self.import_one(reference).await {
                imported += 1;
            }
        }

        log::info!("Imported {}/{} mod(s)", imported, total);
        imported
    }

    async fn import_one(&mut self, reference: ModReference) -> bool {
        let host_version = self.config.host_version.clone();
        let total_parts = if reference.is_latest() { 3 } else { 2 };
        let mut part = 0;
        let mut version = reference.version.clone();
        let mut latest = false;

        if reference.is_latest() {
            part += 1;
            log::info!(
                "[{}/{}] Fetching latest mod version from {}/latest.json",
                part,
                total_parts,
                reference.base
            );
            match self.sources.resolve_latest(&reference.base, &host_version).await {
                Ok(resolved) => {
                    log::info!("[{}/{}] Fetched latest mod version: v{}", part, total_parts, resolved);
                    version = resolved;
                    latest = true;
                }
                Err(e) => {
                    log::error!("Error in fetching latest version json: {}", e);
                    self.raise(Alert::LatestLookupFailed {
                        base: reference.base.clone(),
                    });
                }
            }
        }

        let version_url = format!("{}/{}", reference.base, version);
        part += 1;
        log::info!(
            "[{}/{}] Fetching mod manifest from {}/manifest.json",
            part,
            total_parts,
            version_url
        );
        let manifest = match self.sources.fetch_manifest(&version_url).await {
            Ok(manifest) => manifest,
            Err(e) => {
                log::error!("Error in loading mod URL: {}", e);
                self.raise(Alert::ManifestUnavailable { url: version_url });
                return false;
            }
        };

        part += 1;
        log::info!(
            "[{}/{}] Fetching mod module from {}/{}",
            part,
            total_parts,
            version_url,
            manifest.polymod.main
        );
        let plugin = match self.sources.import(&version_url, &manifest).await {
            Ok(plugin) => plugin,
            Err(e) => {
                log::error!("Error in loading mod: {}", e);
                self.raise(Alert::ImportFailed {
                    name: manifest.polymod.name.clone(),
                });
                return false;
            }
        };

        if self.registry.get(&manifest.polymod.id).is_some() {
            self.raise(Alert::DuplicateMod {
                name: manifest.polymod.name.clone(),
            });
            return false;
        }

        let mut loaded = LoadedMod::new(plugin);
        loaded.apply_manifest(&manifest);
        loaded.bind_source(&reference.base, &version, latest);
        if reference.loaded {
            loaded.loaded = true;
            if loaded.touches_physics() {
                log::info!("Mod {} touches physics", loaded.name);
                self.context.invalidate_leaderboard();
            }
        }

        match self.registry.push(loaded) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{}", e);
                false
            }
        }
    }

    // ---- registry operations ----

    /// Add a mod by reference. Failures alert and return `None`.
    pub async fn add_mod(&mut self, reference: ModReference, auto_update: bool) -> Option<&LoadedMod> {
        let base = reference.base.clone();
        let result = self.registry.add(&self.sources, reference, auto_update).await;
        let alert = match result {
            Ok(_) => None,
            Err(PmlError::LatestLookup { base, .. }) => Some(Alert::LatestLookupFailed { base }),
            Err(PmlError::ManifestFetch { url, .. }) => Some(Alert::ManifestUnavailable { url }),
            Err(PmlError::DuplicateMod(id)) => Some(Alert::AlreadyPresent { id }),
            Err(PmlError::IncompatibleTarget {
                name,
                version,
                targets,
                host,
            }) => Some(Alert::IncompatibleTarget {
                name,
                version,
                targets,
                host,
            }),
            Err(PmlError::ModuleImport { name, .. }) => Some(Alert::ImportFailed { name }),
            Err(e) => {
                log::error!("Error in adding mod from {}: {}", base, e);
                Some(Alert::ManifestUnavailable { url: base })
            }
        };
        match alert {
            Some(alert) => {
                self.raise(alert);
                None
            }
            None => self.registry.mods().last(),
        }
    }

    pub fn remove_mod(&mut self, id: &str) -> PmlResult<()> {
        self.registry.remove(id)
    }

    pub fn set_mod_loaded(&mut self, id: &str, state: bool) -> PmlResult<()> {
        self.registry.set_loaded(id, state)
    }

    pub fn reorder_mod(&mut self, id: &str, delta: isize) -> PmlResult<bool> {
        self.registry.reorder(id, delta)
    }

    // ---- lifecycle ----

    fn check_dependencies(
        &self,
        current: &LoadedMod,
        queue: &VecDeque<String>,
        dropped: &HashSet<String>,
    ) -> DependencyCheck {
        for dependency in &current.dependencies {
            if dependency.id == current.id {
                return DependencyCheck::Drop(Alert::CircularDependency {
                    name: current.name.clone(),
                });
            }
            let Some(found) = self.registry.get(&dependency.id) else {
                return DependencyCheck::Drop(Alert::MissingDependency {
                    name: current.name.clone(),
                    dependency: dependency.id.clone(),
                    version: dependency.version.clone(),
                });
            };
            if !found.loaded {
                return DependencyCheck::Drop(Alert::DependencyNotLoaded {
                    name: current.name.clone(),
                    dependency: dependency.id.clone(),
                    version: dependency.version.clone(),
                });
            }
            if found.version != dependency.version {
                return DependencyCheck::Drop(Alert::DependencyVersionMismatch {
                    name: current.name.clone(),
                    dependency: found.name.clone(),
                    needed: dependency.version.clone(),
                    present: found.version.clone(),
                });
            }
            if !found.initialized {
                if dropped.contains(&found.id) || !queue.contains(&found.id) {
                    return DependencyCheck::Drop(Alert::DependencyFailed {
                        name: current.name.clone(),
                        dependency: dependency.id.clone(),
                    });
                }
                return DependencyCheck::Defer;
            }
        }
        DependencyCheck::Ready
    }

    /// Initialize every loaded mod in dependency order, then finalize the
    /// extensions they registered.
    ///
    /// Runs once per loader; later calls return an empty report.
    pub fn init_mods(&mut self) -> InitReport {
        if self.init_done {
            log::warn!("Mods are already initialized, ignoring repeated init");
            return InitReport::default();
        }
        self.init_done = true;
        self.context.register_popup_capture();
        let mut report = InitReport::default();
        let mut queue: VecDeque<String> = self
            .registry
            .mods()
            .iter()
            .filter(|m| m.loaded)
            .map(|m| m.id.clone())
            .collect();
        if queue.is_empty() {
            log::info!("No mods to initialize");
            return report;
        }

        let mut dropped = HashSet::new();
        let mut stalled = 0;

        while let Some(id) = queue.pop_front() {
            let Some(current) = self.registry.get(&id) else {
                log::warn!("Discarding unknown mod {} from init queue", id);
                stalled = 0;
                continue;
            };
            log::debug!("Checking {}", id);

            match self.check_dependencies(current, &queue, &dropped) {
                DependencyCheck::Drop(alert) => {
                    self.raise(alert);
                    dropped.insert(id.clone());
                    report.dropped.push(id);
                    stalled = 0;
                }
                DependencyCheck::Defer => {
                    queue.push_back(id);
                    stalled += 1;
                    if stalled >= queue.len() {
                        for id in queue.drain(..) {
                            let name = self
                                .registry
                                .get(&id)
                                .map(|m| m.name.clone())
                                .unwrap_or_else(|| id.clone());
                            self.raise(Alert::CircularDependency { name });
                            dropped.insert(id.clone());
                            report.dropped.push(id);
                        }
                    }
                }
                DependencyCheck::Ready => {
                    stalled = 0;
                    if self.run_init(&id) {
                        report.initialized.push(id);
                    } else {
                        dropped.insert(id.clone());
                        report.dropped.push(id);
                    }
                }
            }
        }

        self.context.finalize_extensions();
        log::info!(
            "Initialized {} mod(s), dropped {}",
            report.initialized.len(),
            report.dropped.len()
        );
        report
    }

    fn run_init(&mut self, id: &str) -> bool {
        let Some(current) = self.registry.get_mut(id) else {
            return false;
        };
        let name = current.name.clone();
        match current.plugin_mut().init(&mut self.context) {
            Ok(()) => {
                current.initialized = true;
                log::info!("Initialized mod {}", name);
                true
            }
            Err(e) => {
                log::error!("Error in initializing mod: {:#}", e);
                self.raise(Alert::InitFailed { name });
                if let Err(e) = self.registry.set_loaded(id, false) {
                    log::error!("Failed to persist unloaded mod {}: {}", id, e);
                }
                false
            }
        }
    }

    /// Call every loaded mod's post-init callback, unloading those that fail.
    pub fn post_init_mods(&mut self) {
        let mut failed = Vec::new();
        for current in self.registry.mods_mut().iter_mut().filter(|m| m.loaded) {
            if let Err(e) = current.plugin_mut().post_init(&mut self.context) {
                log::error!("Error in post initializing mod: {:#}", e);
                failed.push((current.id.clone(), current.name.clone()));
            }
        }
        for (id, name) in failed {
            self.raise(Alert::PostInitFailed { name });
            if let Err(e) = self.registry.set_loaded(&id, false) {
                log::error!("Failed to persist unloaded mod {}: {}", id, e);
            }
        }
    }

    /// Call every loaded mod's sim-init callback. The first failure aborts
    /// the phase.
    pub fn sim_init_mods(&mut self) -> PmlResult<()> {
        for current in self.registry.mods_mut().iter_mut().filter(|m| m.loaded) {
            current
                .plugin_mut()
                .sim_init(&mut self.context)
                .map_err(|source| PmlError::Lifecycle {
                    name: current.name.clone(),
                    phase: "sim-init",
                    source,
                })?;
        }
        Ok(())
    }

    /// Apply every registered mixin for `surface` to `source`.
    pub fn patch(&self, surface: Surface, source: &str) -> PatchOutput {
        self.context.patch(surface, source)
    }
}

impl std::fmt::Debug for ModLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModLoader")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
