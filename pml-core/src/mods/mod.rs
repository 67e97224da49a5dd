//! Mod System
//!
//! Mods are independently authored plugins that change how the host behaves
//! by registering mixins and extension points.
//!
//! # Overview
//!
//! A mod goes through these steps:
//! 1. **Discovery** - its manifest and module are fetched from the base URL
//!    stored in the persisted reference list ([`storage`], [`source`])
//! 2. **Registration** - the module becomes a [`LoadedMod`] in the
//!    [`ModRegistry`](registry::ModRegistry), identity bound from the manifest
//! 3. **Initialization** - the [`ModLoader`](loader::ModLoader) calls
//!    [`PolyMod::init`] in dependency order; the mod registers mixins,
//!    settings, keybinds and editor extensions through its [`ModContext`]
//! 4. **Finalization** - accumulated extension fragments become mixins
//! 5. **Post-init and sim-init** - the remaining lifecycle callbacks
//!
//! # Mod Structure
//!
//! A published mod is a directory per version:
//!
//! ```text
//! <base>/
//! ├── latest.json            # host version -> newest mod version
//! └── 1.0.0/
//!     ├── manifest.json      # identity, targets, dependencies
//!     ├── main.mod.js        # module entry (name set by `polymod.main`)
//!     └── icon.png
//! ```
//!
//! ## Manifest
//!
//! ```json
//! {
//!   "polymod": {
//!     "name": "Example Mod",
//!     "author": "someone",
//!     "version": "1.0.0",
//!     "id": "example",
//!     "targets": ["0.5.0"],
//!     "main": "main.mod.js"
//!   },
//!   "dependencies": [{ "id": "pmlcore", "version": "1.0.0" }]
//! }
//! ```
//!
//! # Implementing a Mod
//!
//! ```rust
//! use pml_core::mods::api::*;
//!
//! struct NoLeaderboard;
//!
//! impl PolyMod for NoLeaderboard {
//!     fn init(&mut self, ctx: &mut ModContext) -> anyhow::Result<()> {
//!         ctx.register_class_mixin(
//!             "HB.prototype",
//!             "submitLeaderboard",
//!             MixinType::Head,
//!             Accessors::none(),
//!             "return;",
//!             None,
//!         );
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Compiled-in mods are handed to the loader through a
//! [`StaticImporter`](source::StaticImporter); declarative JSON mixin packs
//! are loaded by the [`PackImporter`](source::PackImporter).
//!
//! # Dependencies
//!
//! Dependencies name an exact version. A mod only initializes after every
//! dependency has initialized; a missing, disabled, mismatched, failed or
//! circular dependency drops the mod for the session and raises an
//! [`Alert`](alert::Alert).

pub mod alert;
pub mod api;
pub mod context;
pub mod loader;
pub mod pack;
pub mod registry;
pub mod source;
pub mod storage;

use crate::manifest::{Dependency, Manifest};
use context::ModContext;
use storage::{ModReference, LATEST};

/// Folder under a mod's version directory that holds its assets.
pub const ASSET_FOLDER: &str = "assets";

/// Trait that all mods implement.
///
/// Every callback defaults to doing nothing.
pub trait PolyMod: Send + Sync {
    /// Called once, after every dependency has initialized.
    ///
    /// # Arguments
    /// * `ctx` - Registration surface for mixins and extensions
    ///
    /// # Returns
    /// An error unloads the mod (persisted) and alerts the user.
    fn init(&mut self, _ctx: &mut ModContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after every mod has initialized. An error unloads the mod.
    fn post_init(&mut self, _ctx: &mut ModContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called while the simulation worker boots. Errors are not recovered.
    fn sim_init(&mut self, _ctx: &mut ModContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the mod changes physics. Such mods disable leaderboard
    /// submission for the whole session.
    fn touches_physics(&self) -> bool {
        false
    }
}

/// A discovered mod: manifest identity, provenance, state and the plugin.
pub struct LoadedMod {
    pub id: String,
    pub name: String,
    pub author: String,
    /// Resolved version the module was fetched at.
    pub version: String,
    pub targets: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub asset_folder: String,
    pub base_url: String,
    pub icon_src: String,
    /// The persisted reference said "latest" and should keep saying so.
    pub saved_latest: bool,
    /// User intent to activate the mod.
    pub loaded: bool,
    pub initialized: bool,
    manifest_applied: bool,
    plugin: Box<dyn PolyMod>,
}

impl LoadedMod {
    /// Wrap a plugin that has not been bound to a manifest yet.
    pub fn new(plugin: Box<dyn PolyMod>) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            author: String::new(),
            version: String::new(),
            targets: Vec::new(),
            dependencies: Vec::new(),
            asset_folder: ASSET_FOLDER.to_string(),
            base_url: String::new(),
            icon_src: String::new(),
            saved_latest: false,
            loaded: false,
            initialized: false,
            manifest_applied: false,
            plugin,
        }
    }

    /// Bind identity from `manifest`. Only the first call has an effect.
    ///
    /// # Returns
    /// `true` if the manifest was applied.
    pub fn apply_manifest(&mut self, manifest: &Manifest) -> bool {
        if self.manifest_applied {
            log::warn!("Can't apply manifest after initialization!");
            return false;
        }
        let info = &manifest.polymod;
        self.id = info.id.clone();
        self.name = info.name.clone();
        self.author = info.author.clone();
        self.version = info.version.clone();
        self.targets = info.targets.clone();
        self.asset_folder = ASSET_FOLDER.to_string();
        self.dependencies = manifest.dependencies.clone();
        self.manifest_applied = true;
        true
    }

    /// Record where the mod came from.
    pub fn bind_source(&mut self, base: &str, version: &str, saved_latest: bool) {
        self.base_url = base.to_string();
        self.version = version.to_string();
        self.icon_src = format!("{}/{}/icon.png", base, version);
        self.saved_latest = saved_latest;
    }

    /// Base URL of the fetched version directory.
    pub fn version_url(&self) -> String {
        format!("{}/{}", self.base_url, self.version)
    }

    pub fn touches_physics(&self) -> bool {
        self.plugin.touches_physics()
    }

    pub fn plugin(&self) -> &dyn PolyMod {
        self.plugin.as_ref()
    }

    pub fn plugin_mut(&mut self) -> &mut dyn PolyMod {
        self.plugin.as_mut()
    }

    /// The persisted form of this mod.
    pub fn to_reference(&self) -> ModReference {
        ModReference {
            base: self.base_url.clone(),
            version: if self.saved_latest {
                LATEST.to_string()
            } else {
                self.version.clone()
            },
            loaded: self.loaded,
        }
    }
}

impl std::fmt::Debug for LoadedMod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMod")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("base_url", &self.base_url)
            .field("loaded", &self.loaded)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
