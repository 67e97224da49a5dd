//! Mod Sources
//!
//! Fetching and importing mods. Two seams keep the loader independent of
//! where mods come from:
//! - [`ModFetcher`] turns a URL into text (HTTP, or local files)
//! - [`ModImporter`] turns a module URL plus its manifest into a plugin
//!
//! [`ModSources`] bundles one of each and implements the fetch steps the
//! registry and discovery share: latest-version lookup, manifest fetch and
//! module import.

use crate::error::{PmlError, PmlResult};
use crate::manifest::{LatestLookup, Manifest};
use crate::mods::pack::{MixinPack, PackMod};
use crate::mods::PolyMod;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// Fetches text documents by URL.
#[async_trait]
pub trait ModFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> PmlResult<String>;
}

/// Fetches `http(s)://` URLs over the network and everything else from the
/// local filesystem (`file://` prefix optional).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn local_path(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

#[async_trait]
impl ModFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> PmlResult<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            log::debug!("GET {}", url);
            let response = self.client.get(url).send().await?.error_for_status()?;
            Ok(response.text().await?)
        } else {
            let path = Self::local_path(url);
            log::debug!("Reading {:?}", path);
            Ok(tokio::fs::read_to_string(&path).await?)
        }
    }
}

/// Turns a fetched module into a plugin instance.
#[async_trait]
pub trait ModImporter: Send + Sync {
    /// # Arguments
    /// * `fetcher` - Fetcher to read the module with, if the importer needs it
    /// * `url` - Full URL of the module entry point
    /// * `manifest` - Manifest the module was announced by
    async fn import(
        &self,
        fetcher: &dyn ModFetcher,
        url: &str,
        manifest: &Manifest,
    ) -> anyhow::Result<Box<dyn PolyMod>>;
}

type PluginFactory = Box<dyn Fn() -> Box<dyn PolyMod> + Send + Sync>;

/// Importer for mods compiled into the embedding binary.
///
/// Factories are keyed by module URL; a factory registered under the mod ID
/// matches any URL for that mod.
#[derive(Default)]
pub struct StaticImporter {
    factories: HashMap<String, PluginFactory>,
}

impl StaticImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn PolyMod> + Send + Sync + 'static,
    {
        self.factories.insert(key.to_string(), Box::new(factory));
        self
    }

    pub fn with<F>(mut self, key: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PolyMod> + Send + Sync + 'static,
    {
        self.register(key, factory);
        self
    }
}

#[async_trait]
impl ModImporter for StaticImporter {
    async fn import(
        &self,
        _fetcher: &dyn ModFetcher,
        url: &str,
        manifest: &Manifest,
    ) -> anyhow::Result<Box<dyn PolyMod>> {
        let factory = self
            .factories
            .get(url)
            .or_else(|| self.factories.get(&manifest.polymod.id))
            .ok_or_else(|| anyhow::anyhow!("No compiled-in module for {}", url))?;
        Ok(factory())
    }
}

/// Importer for declarative JSON mixin packs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackImporter;

#[async_trait]
impl ModImporter for PackImporter {
    async fn import(
        &self,
        fetcher: &dyn ModFetcher,
        url: &str,
        _manifest: &Manifest,
    ) -> anyhow::Result<Box<dyn PolyMod>> {
        let text = fetcher.fetch_text(url).await?;
        let pack = MixinPack::from_json(&text)?;
        Ok(Box::new(PackMod::new(pack)))
    }
}

/// A fetcher and an importer, plus the fetch steps built on them.
pub struct ModSources {
    fetcher: Box<dyn ModFetcher>,
    importer: Box<dyn ModImporter>,
}

impl ModSources {
    pub fn new(fetcher: Box<dyn ModFetcher>, importer: Box<dyn ModImporter>) -> Self {
        Self { fetcher, importer }
    }

    /// Network fetcher with the JSON mixin pack importer.
    pub fn http() -> Self {
        Self::new(Box::new(HttpFetcher::new()), Box::new(PackImporter))
    }

    /// Look up the newest version of the mod at `base` for `host_version`.
    pub async fn resolve_latest(&self, base: &str, host_version: &str) -> PmlResult<String> {
        let url = format!("{}/latest.json", base);
        let lookup_error = |message: String| PmlError::LatestLookup {
            base: base.to_string(),
            message,
        };
        let text = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| lookup_error(e.to_string()))?;
        let lookup = LatestLookup::from_json(&text).map_err(|e| lookup_error(e.to_string()))?;
        lookup
            .resolve(host_version)
            .map(str::to_string)
            .ok_or_else(|| lookup_error(format!("no entry for host version {}", host_version)))
    }

    /// Fetch `<version_url>/manifest.json`.
    pub async fn fetch_manifest(&self, version_url: &str) -> PmlResult<Manifest> {
        let url = format!("{}/manifest.json", version_url);
        let text = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| PmlError::ManifestFetch {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Manifest::from_json(&text).map_err(|e| PmlError::ManifestFetch {
            url,
            message: e.to_string(),
        })
    }

    /// Import the module named by `manifest` from `version_url`.
    pub async fn import(&self, version_url: &str, manifest: &Manifest) -> PmlResult<Box<dyn PolyMod>> {
        let url = format!("{}/{}", version_url, manifest.polymod.main);
        self.importer
            .import(self.fetcher.as_ref(), &url, manifest)
            .await
            .map_err(|e| PmlError::ModuleImport {
                name: manifest.polymod.name.clone(),
                url,
                message: format!("{:#}", e),
            })
    }
}

impl std::fmt::Debug for ModSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModSources").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_strips_file_scheme() {
        assert_eq!(
            HttpFetcher::local_path("file:///tmp/mods/x/latest.json"),
            PathBuf::from("/tmp/mods/x/latest.json")
        );
        assert_eq!(HttpFetcher::local_path("mods/x"), PathBuf::from("mods/x"));
    }
}
