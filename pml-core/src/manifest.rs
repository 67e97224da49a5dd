//! Mod manifest and version lookup documents.
//!
//! A mod is published under a base URL as:
//!
//! ```text
//! <base>/latest.json              { "<host version>": "<mod version>", ... }
//! <base>/<version>/manifest.json  { "polymod": { ... }, "dependencies": [ ... ] }
//! <base>/<version>/<main>         module entry point
//! <base>/<version>/icon.png
//! ```

use crate::error::PmlResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entry file used when the manifest does not name one.
pub const DEFAULT_MAIN: &str = "main.mod.js";

fn default_main() -> String {
    DEFAULT_MAIN.to_string()
}

/// A required mod and the exact version it must be at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub version: String,
}

/// Identity block of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub name: String,
    #[serde(default)]
    pub author: String,
    pub version: String,
    pub id: String,
    /// Host versions this mod runs on.
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default = "default_main")]
    pub main: String,
}

/// `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub polymod: ManifestInfo,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn from_json(text: &str) -> PmlResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Whether the manifest lists `host_version` as a target.
    pub fn targets_host(&self, host_version: &str) -> bool {
        self.polymod.targets.iter().any(|t| t == host_version)
    }
}

/// `latest.json`: host version to newest mod version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LatestLookup(pub HashMap<String, String>);

impl LatestLookup {
    pub fn from_json(text: &str) -> PmlResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn resolve(&self, host_version: &str) -> Option<&str> {
        self.0.get(host_version).map(String::as_str)
    }
}
