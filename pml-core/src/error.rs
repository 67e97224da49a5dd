//! Error Handling
//!
//! Error types for the loader using `thiserror`.
//!
//! # Error Categories
//! - **Discovery errors**: version lookup, manifest fetch, module import
//! - **Registry errors**: duplicate mods, incompatible targets, unknown IDs
//! - **Structural errors**: invalid block volumes, unknown extension references
//! - **Lifecycle errors**: sim-init callback failures
//!
//! Dependency failures never surface as errors. The lifecycle controller
//! drops the mod for the session and raises an
//! [`Alert`](crate::mods::alert::Alert).
//!
//! Patch application never produces an error: a missing anchor is recorded in
//! the [`PatchReport`](crate::mixin::PatchReport) and logged instead.

use thiserror::Error;

/// Loader error types.
#[derive(Error, Debug)]
pub enum PmlError {
    /// The version lookup document could not be fetched or has no entry for
    /// the running host version.
    #[error("Couldn't find latest version for {base}: {message}")]
    LatestLookup { base: String, message: String },

    /// The manifest at `<base>/<version>/manifest.json` could not be fetched
    /// or parsed.
    #[error("Couldn't load mod manifest from {url}: {message}")]
    ManifestFetch { url: String, message: String },

    /// The module entry point could not be fetched or turned into a plugin.
    #[error("Mod {name} failed to load from {url}: {message}")]
    ModuleImport {
        name: String,
        url: String,
        message: String,
    },

    /// A mod with the same ID is already in the registry.
    #[error("Duplicate mod detected: {0}")]
    DuplicateMod(String),

    /// The manifest does not list the running host version as a target.
    #[error("Mod {name} version {version} targets host versions {targets}, but current host version is {host}")]
    IncompatibleTarget {
        name: String,
        version: String,
        targets: String,
        host: String,
    },

    /// No mod with this ID is registered.
    #[error("Mod '{0}' not found")]
    ModNotFound(String),

    /// Two ranges of a block volume cover the same cell.
    #[error("Duplicate tile in track part at ({x}, {y}, {z})")]
    OverlappingVolume { x: i32, y: i32, z: i32 },

    /// A block references a category or setting that was never registered.
    #[error("Unknown extension '{0}'")]
    UnknownExtension(String),

    /// A plugin callback failed in a phase with no recovery path.
    #[error("Mod {name} failed during {phase}: {source}")]
    Lifecycle {
        name: String,
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A fetch over the network failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for loader operations.
pub type PmlResult<T> = Result<T, PmlError>;
