//! Public Modding API
//!
//! Re-exports everything a mod or an embedding application needs:
//!
//! ```rust,no_run
//! use pml_core::mods::api::*;
//! ```
//!
//! # Quick Start
//!
//! 1. Implement [`PolyMod`] for your mod
//! 2. Register mixins and extensions from [`PolyMod::init`] through the [`ModContext`]
//! 3. Publish a `manifest.json` next to the module, or register the mod with a
//!    [`StaticImporter`] when it is compiled in
//!
//! See the parent module documentation for the full lifecycle.

pub use crate::config::{HostProfile, LoaderConfig};
pub use crate::error::{PmlError, PmlResult};
pub use crate::extensions::editor::{BlockSpec, CollisionShape};
pub use crate::extensions::keybinds::{KeyEvent, KeybindCallback};
pub use crate::extensions::settings::{SettingOption, SettingType};
pub use crate::extensions::ExtensionKind;
pub use crate::manifest::{Dependency, Manifest};
pub use crate::mixin::{Accessors, MixinDescriptor, MixinType, PatchReport, PatchStatus, Surface};
pub use crate::mods::alert::{Alert, AlertLog, LogNotifier, Notifier};
pub use crate::mods::context::ModContext;
pub use crate::mods::loader::{InitReport, ModLoader};
pub use crate::mods::pack::{MixinPack, PackMod};
pub use crate::mods::source::{HttpFetcher, ModFetcher, ModImporter, ModSources, PackImporter, StaticImporter};
pub use crate::mods::storage::{FileStorage, MemoryStorage, ModReference, Storage};
pub use crate::mods::{LoadedMod, PolyMod};
