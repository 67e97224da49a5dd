//! Shared fixtures: an in-memory mod host and a configurable test mod.

#![allow(dead_code)]

use async_trait::async_trait;
use pml_core::config::{LoaderConfig, DEFAULT_HOST_VERSION};
use pml_core::mods::api::*;
use pml_core::mods::storage::save_references;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const HOST: &str = DEFAULT_HOST_VERSION;

/// Serves documents from a map, as if they were hosted at their URLs.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, text: impl Into<String>) -> &mut Self {
        self.documents.insert(url.to_string(), text.into());
        self
    }
}

#[async_trait]
impl ModFetcher for MemoryFetcher {
    async fn fetch_text(&self, url: &str) -> PmlResult<String> {
        self.documents.get(url).cloned().ok_or_else(|| {
            PmlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no document at {}", url),
            ))
        })
    }
}

pub fn base_url(id: &str) -> String {
    format!("mem://mods/{}", id)
}

pub fn manifest_json(id: &str, version: &str, dependencies: &[(&str, &str)]) -> String {
    let dependencies: Vec<serde_json::Value> = dependencies
        .iter()
        .map(|(id, version)| serde_json::json!({ "id": id, "version": version }))
        .collect();
    serde_json::json!({
        "polymod": {
            "name": format!("{} mod", id),
            "author": "tests",
            "version": version,
            "id": id,
            "targets": [HOST],
        },
        "dependencies": dependencies,
    })
    .to_string()
}

pub type InitHook = fn(&mut ModContext) -> anyhow::Result<()>;

/// Mod whose behavior is picked per test. Every callback records itself.
#[derive(Clone)]
pub struct TestMod {
    pub id: String,
    pub events: Arc<Mutex<Vec<String>>>,
    pub fail_init: bool,
    pub fail_post_init: bool,
    pub physics: bool,
    pub on_init: Option<InitHook>,
}

impl TestMod {
    pub fn new(id: &str, events: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            id: id.to_string(),
            events: Arc::clone(events),
            fail_init: false,
            fail_post_init: false,
            physics: false,
            on_init: None,
        }
    }

    fn record(&self, phase: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", phase, self.id));
    }
}

impl PolyMod for TestMod {
    fn init(&mut self, ctx: &mut ModContext) -> anyhow::Result<()> {
        self.record("init");
        if self.fail_init {
            anyhow::bail!("{} refuses to start", self.id);
        }
        match self.on_init {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }

    fn post_init(&mut self, _ctx: &mut ModContext) -> anyhow::Result<()> {
        self.record("post");
        if self.fail_post_init {
            anyhow::bail!("{} refuses to finish", self.id);
        }
        Ok(())
    }

    fn sim_init(&mut self, _ctx: &mut ModContext) -> anyhow::Result<()> {
        self.record("sim");
        Ok(())
    }

    fn touches_physics(&self) -> bool {
        self.physics
    }
}

/// A hosted mod plus the reference the user stored for it.
pub struct HostedMod {
    pub plugin: TestMod,
    pub version: String,
    pub dependencies: Vec<(String, String)>,
    pub loaded: bool,
    pub stored_version: String,
    /// Whether the user's storage references this mod.
    pub stored: bool,
}

/// Builds a loader backed by in-memory hosting and storage.
pub struct Harness {
    pub events: Arc<Mutex<Vec<String>>>,
    pub alerts: Arc<AlertLog>,
    pub fetcher: MemoryFetcher,
    mods: Vec<HostedMod>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            alerts: Arc::new(AlertLog::new()),
            fetcher: MemoryFetcher::new(),
            mods: Vec::new(),
        }
    }

    /// Host `id` at `version` and store a pinned, loaded reference to it.
    pub fn add(&mut self, id: &str, version: &str, dependencies: &[(&str, &str)]) -> &mut HostedMod {
        self.mods.push(HostedMod {
            plugin: TestMod::new(id, &self.events),
            version: version.to_string(),
            dependencies: dependencies
                .iter()
                .map(|(id, v)| (id.to_string(), v.to_string()))
                .collect(),
            loaded: true,
            stored_version: version.to_string(),
            stored: true,
        });
        let index = self.mods.len() - 1;
        &mut self.mods[index]
    }

    /// Host `id` at `version` without referencing it from storage.
    pub fn host_only(&mut self, id: &str, version: &str) -> &mut HostedMod {
        let hosted = self.add(id, version, &[]);
        hosted.stored = false;
        hosted
    }

    pub fn config() -> LoaderConfig {
        LoaderConfig {
            core_mod_id: "core".to_string(),
            core_mod: ModReference::new(&base_url("core"), "1.0.0", true),
            ..LoaderConfig::default()
        }
    }

    fn sources(&self) -> ModSources {
        let mut fetcher = self.fetcher.clone();
        let mut importer = StaticImporter::new();
        for hosted in &self.mods {
            let base = base_url(&hosted.plugin.id);
            let deps: Vec<(&str, &str)> = hosted
                .dependencies
                .iter()
                .map(|(id, v)| (id.as_str(), v.as_str()))
                .collect();
            fetcher.insert(
                &format!("{}/{}/manifest.json", base, hosted.version),
                manifest_json(&hosted.plugin.id, &hosted.version, &deps),
            );
            fetcher.insert(
                &format!("{}/latest.json", base),
                serde_json::json!({ HOST: hosted.version }).to_string(),
            );
            let plugin = hosted.plugin.clone();
            importer.register(&hosted.plugin.id, move || Box::new(plugin.clone()) as Box<dyn PolyMod>);
        }
        ModSources::new(Box::new(fetcher), Box::new(importer))
    }

    /// References the user has stored, in the order mods were added.
    pub fn references(&self) -> Vec<ModReference> {
        self.mods
            .iter()
            .filter(|m| m.stored)
            .map(|m| ModReference::new(&base_url(&m.plugin.id), &m.stored_version, m.loaded))
            .collect()
    }

    /// Write the stored references into `storage`.
    pub fn seed(&self, storage: &mut dyn Storage) {
        save_references(storage, &Self::config().storage_key, &self.references()).unwrap();
    }

    pub fn storage(&self) -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        self.seed(&mut storage);
        storage
    }

    pub fn loader(&self) -> ModLoader {
        self.loader_with(Box::new(self.storage()))
    }

    pub fn loader_with(&self, storage: Box<dyn Storage>) -> ModLoader {
        ModLoader::new(
            Self::config(),
            storage,
            self.sources(),
            Box::new(Arc::clone(&self.alerts)),
        )
        .unwrap()
    }

    /// Loader with every stored mod imported.
    pub async fn imported(&self) -> ModLoader {
        let mut loader = self.loader();
        loader.import_mods().await;
        loader
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.alerts()
    }
}
