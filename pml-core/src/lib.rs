//! PolyModLoader Core
//!
//! Mixin patching engine and mod lifecycle controller for PolyTrack.
//!
//! # Overview
//!
//! Mods change the host game without access to its source: they register
//! mixins, which locate a named function, method or class inside the
//! host's bundled script and splice code into it. This crate provides:
//! - [`mixin`] - descriptor store, anchor location and the patch applier
//! - [`extensions`] - ID allocation and code generation for host enums
//!   (editor categories, blocks, settings, keybindings)
//! - [`mods`] - plugin trait, persisted registry, discovery and the
//!   dependency-ordered lifecycle controller
//! - [`config`] - loader settings and the host profile that names every
//!   host-version-specific symbol
//!
//! # Patch Pipeline
//!
//! ```text
//! ModLoader::import_mods   fetch manifests and modules, in priority order
//! ModLoader::init_mods     run init callbacks; mods register mixins
//!                          finalize settings/keybinds/editor into mixins
//! ModLoader::patch         rewrite main and simulation bundles
//! ```

pub mod config;
pub mod error;
pub mod extensions;
pub mod manifest;
pub mod mixin;
pub mod mods;

pub use error::{PmlError, PmlResult};
