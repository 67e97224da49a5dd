// CLI command handlers
use anyhow::{Context, Result};
use pml_core::mods::api::*;
use std::fs;
use std::path::Path;

pub fn load_config(path: Option<&Path>) -> Result<LoaderConfig> {
    let config = match path {
        Some(path) => LoaderConfig::load_from(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?,
        None => LoaderConfig::load().context("Failed to read the default config")?,
    };
    log::debug!("Host version {}, storage {:?}", config.host_version, config.storage_path);
    Ok(config)
}

fn open_loader(config: LoaderConfig) -> Result<ModLoader> {
    let storage = FileStorage::open(&config.storage_path)
        .with_context(|| format!("Failed to open storage: {}", config.storage_path.display()))?;
    ModLoader::new(config, Box::new(storage), ModSources::http(), Box::new(LogNotifier))
        .context("Failed to start the mod loader")
}

/// Open the loader and import every stored mod.
pub async fn discover(config: LoaderConfig) -> Result<ModLoader> {
    let mut loader = open_loader(config)?;
    loader.import_mods().await;
    Ok(loader)
}

pub fn list_mods(config: &LoaderConfig) -> Result<()> {
    let loader = open_loader(config.clone())?;
    let references = loader.registry().list();
    println!("{} stored mod(s):", references.len());
    for (index, reference) in references.iter().enumerate() {
        println!(
            "  {:>2}. [{}] {} @ {}",
            index,
            if reference.loaded { "x" } else { " " },
            reference.base,
            reference.version
        );
    }
    Ok(())
}

pub fn print_mods(loader: &ModLoader) {
    let mods = loader.all_mods();
    println!("{} mod(s) discovered:", mods.len());
    for m in mods {
        println!(
            "  [{}] {} ({}) v{} by {}{}",
            if m.loaded { "x" } else { " " },
            m.name,
            m.id,
            m.version,
            m.author,
            if m.saved_latest { ", auto-update" } else { "" }
        );
        for dependency in &m.dependencies {
            println!("        needs {} {}", dependency.id, dependency.version);
        }
    }
    if loader.leaderboard_invalid() {
        println!("Physics mods are active: leaderboard submission is disabled");
    }
}

pub async fn add_mod(config: LoaderConfig, base: &str, version: &str, auto_update: bool) -> Result<()> {
    let mut loader = discover(config).await?;
    let reference = ModReference::new(base, version, false);
    match loader.add_mod(reference, auto_update).await {
        Some(added) => {
            println!("Added {} ({}) v{}", added.name, added.id, added.version);
            println!("Enable it with: pml enable {}", added.id);
            Ok(())
        }
        None => anyhow::bail!("Could not add mod from {}", base),
    }
}

pub fn remove_mod(loader: &mut ModLoader, id: &str) -> Result<()> {
    if loader.registry().is_core(id) {
        println!("{} is the core mod and cannot be removed", id);
        return Ok(());
    }
    loader
        .remove_mod(id)
        .with_context(|| format!("Failed to remove mod {}", id))?;
    println!("Removed {}", id);
    Ok(())
}

pub fn set_loaded(loader: &mut ModLoader, id: &str, state: bool) -> Result<()> {
    if loader.registry().is_core(id) {
        println!("{} is the core mod and is always active", id);
        return Ok(());
    }
    loader
        .set_mod_loaded(id, state)
        .with_context(|| format!("Failed to update mod {}", id))?;
    println!("{} {}", if state { "Enabled" } else { "Disabled" }, id);
    Ok(())
}

pub fn reorder_mod(loader: &mut ModLoader, id: &str, delta: isize) -> Result<()> {
    let moved = loader
        .reorder_mod(id, delta)
        .with_context(|| format!("Failed to reorder mod {}", id))?;
    if moved {
        let position = loader.registry().position(id).unwrap_or_default();
        println!("Moved {} to position {}", id, position);
    } else {
        println!("{} cannot be moved by {}", id, delta);
    }
    Ok(())
}

fn write_bundle(loader: &ModLoader, surface: Surface, input: &Path, output_dir: &Path) -> Result<()> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("Failed to read bundle: {}", input.display()))?;
    let output = loader.patch(surface, &source);

    let file_name = input
        .file_name()
        .context("Bundle path has no file name")?;
    let target = output_dir.join(file_name);
    fs::write(&target, &output.text)
        .with_context(|| format!("Failed to write bundle: {}", target.display()))?;

    println!(
        "{:?}: applied {}/{} mixin(s) -> {}",
        surface,
        output.report.applied_count(),
        output.report.outcomes.len(),
        target.display()
    );
    for miss in output.report.misses() {
        println!("  missed #{} {:?} at {}: {:?}", miss.index, miss.mixin_type, miss.anchor, miss.status);
    }
    Ok(())
}

/// Run init, post-init and sim-init, then patch the bundles.
pub fn patch_bundles(
    mut loader: ModLoader,
    main: &Path,
    sim: Option<&Path>,
    output_dir: &Path,
    table: bool,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let report = loader.init_mods();
    println!(
        "Initialized {} mod(s), dropped {}",
        report.initialized.len(),
        report.dropped.len()
    );
    for id in &report.dropped {
        println!("  dropped {}", id);
    }
    loader.post_init_mods();
    loader.sim_init_mods().context("Simulation init failed")?;

    write_bundle(&loader, Surface::Main, main, output_dir)?;
    if let Some(sim) = sim {
        write_bundle(&loader, Surface::Simulation, sim, output_dir)?;
    }

    if table {
        let path = output_dir.join("extensions.json");
        let json = serde_json::to_string_pretty(loader.context().extension_table())?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote extension table to {}", path.display());
    }
    if loader.leaderboard_invalid() {
        println!("Physics mods are active: leaderboard submission is disabled");
    }
    Ok(())
}
