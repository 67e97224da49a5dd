//! Loader Configuration
//!
//! Two documents configure the loader:
//! - [`LoaderConfig`] - where state lives and which host version is running
//! - [`HostProfile`] - every host-version-specific symbol, anchor and code
//!   template the engine emits or patches against
//!
//! Both deserialize from JSON or TOML (picked by file extension) and default
//! every field, so a partial file only overrides what it names. The defaults
//! describe host version `0.5.0`.

use crate::error::PmlResult;
use crate::mods::storage::ModReference;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Host version the built-in profile was written against.
pub const DEFAULT_HOST_VERSION: &str = "0.5.0";
/// Reserved ID of the core mod. Registry mutations ignore it.
pub const CORE_MOD_ID: &str = "pmlcore";
/// Storage key the reference list is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "polyMods";
/// Base URL of the core mod.
pub const CORE_MOD_BASE: &str = "https://pml.crjakob.com/polytrackmods/PolyModLoader/0.5.0/pmlcore";

fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("pml");
    path
}

fn data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("pml");
    path
}

fn read_document<T: for<'de> Deserialize<'de>>(path: &Path) -> PmlResult<T> {
    let content = std::fs::read_to_string(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        Ok(toml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Host version string used for target checks and latest lookups.
    pub host_version: String,
    /// File backing the durable per-user storage.
    pub storage_path: PathBuf,
    /// Key the reference list is stored under.
    pub storage_key: String,
    /// Mod ID that cannot be removed, disabled or reordered.
    pub core_mod_id: String,
    /// Reference seeded into empty storage.
    pub core_mod: ModReference,
    /// Optional host profile overriding the built-in one.
    pub host_profile: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            host_version: DEFAULT_HOST_VERSION.to_string(),
            storage_path: data_dir().join("storage.json"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            core_mod_id: CORE_MOD_ID.to_string(),
            core_mod: ModReference::new(CORE_MOD_BASE, "latest", true),
            host_profile: None,
        }
    }
}

impl LoaderConfig {
    /// Default config file location.
    pub fn config_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Load the config from its default location, or defaults if absent.
    pub fn load() -> PmlResult<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load the config from a JSON or TOML file.
    pub fn load_from(path: &Path) -> PmlResult<Self> {
        log::debug!("Loading loader config from {:?}", path);
        read_document(path)
    }

    pub fn save(&self) -> PmlResult<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// The host profile named by this config, or the built-in one.
    pub fn load_host_profile(&self) -> PmlResult<HostProfile> {
        match &self.host_profile {
            Some(path) => HostProfile::load_from(path),
            None => Ok(HostProfile::default()),
        }
    }
}

/// A value that differs between the main and simulation bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSurface<T> {
    pub main: T,
    pub simulation: T,
}

impl<T> PerSurface<T> {
    pub fn new(main: T, simulation: T) -> Self {
        Self { main, simulation }
    }

    pub fn get(&self, surface: crate::mixin::Surface) -> &T {
        match surface {
            crate::mixin::Surface::Main => &self.main,
            crate::mixin::Surface::Simulation => &self.simulation,
        }
    }
}

/// A patch site: the region plus the token code is inserted after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub path: String,
    #[serde(default)]
    pub token: String,
}

impl AnchorSite {
    pub fn method(scope: &str, path: &str, token: &str) -> Self {
        Self {
            scope: Some(scope.to_string()),
            path: path.to_string(),
            token: token.to_string(),
        }
    }

    pub fn function(path: &str, token: &str) -> Self {
        Self {
            scope: None,
            path: path.to_string(),
            token: token.to_string(),
        }
    }

    pub fn whole(token: &str) -> Self {
        Self::function(crate::mixin::WHOLE_SURFACE, token)
    }
}

/// Class-wide span replaced at every occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpan {
    pub class: String,
    pub start: String,
    pub end: String,
}

/// Last built-in value of each host enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdSeeds {
    pub category: u32,
    pub block: u32,
    pub setting: u32,
    pub keybind: u32,
}

impl Default for IdSeeds {
    fn default() -> Self {
        Self {
            category: 8,
            block: 155,
            setting: 18,
            keybind: 30,
        }
    }
}

/// Minified host symbols used in emitted fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSymbols {
    pub category_enum: PerSurface<String>,
    pub block_enum: PerSurface<String>,
    pub collision_enum: PerSurface<String>,
    pub part_registry: PerSurface<String>,
    pub part_class: PerSurface<String>,
    pub part_model_set: PerSurface<String>,
    /// Map keyed by part ID that mirrors the main registry.
    pub part_map: String,
    pub setting_enum: String,
    pub keybind_enum: String,
}

impl Default for HostSymbols {
    fn default() -> Self {
        let pair = |m: &str, s: &str| PerSurface::new(m.to_string(), s.to_string());
        Self {
            category_enum: pair("KA", "F_"),
            block_enum: pair("eA", "mu"),
            collision_enum: pair("XA", "Jh"),
            part_registry: pair("ab", "j_"),
            part_class: pair("rb", "X_"),
            part_model_set: pair("nb", "G_"),
            part_map: "sb".to_string(),
            setting_enum: "$o".to_string(),
            keybind_enum: "Ix".to_string(),
        }
    }
}

/// Where each generated fragment is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSites {
    pub category_enum: PerSurface<AnchorSite>,
    pub block_enum: PerSurface<AnchorSite>,
    pub part_registry: PerSurface<AnchorSite>,
    pub category_mesh: AnchorSite,
    pub model_list: AnchorSite,
    pub export_filter: AnchorSite,
    pub part_volume: ClassSpan,
    pub editor_capture: AnchorSite,
    pub popup_capture: AnchorSite,
    pub leaderboard: AnchorSite,
    pub sound_load: AnchorSite,
    pub setting_class: AnchorSite,
    pub setting_defaults: AnchorSite,
    pub settings_menu: AnchorSite,
    pub keybind_class: AnchorSite,
    pub keybind_defaults: AnchorSite,
    pub keybind_menu: AnchorSite,
}

impl Default for HostSites {
    fn default() -> Self {
        Self {
            category_enum: PerSurface::new(
                AnchorSite::whole("(KA || (KA = {}))"),
                AnchorSite::whole("(F_ || (F_ = {}))"),
            ),
            block_enum: PerSurface::new(
                AnchorSite::whole("(eA || (eA = {}))"),
                AnchorSite::whole("(mu || (mu = {}))"),
            ),
            part_registry: PerSurface::new(
                AnchorSite::whole("const sb = new Map;"),
                AnchorSite::whole("const j_ = [];"),
            ),
            category_mesh: AnchorSite::method("GN.prototype", "getCategoryMesh", "break;"),
            model_list: AnchorSite::method("GN.prototype", "init", &model_list_literal(&builtin_models())),
            export_filter: AnchorSite::function("xb", "for (const [r,a] of Eb(this, Ab, \"f\")) {"),
            part_volume: ClassSpan {
                class: "rb".to_string(),
                start: "const l = [];".to_string(),
                end: "l.push([n, i, r])".to_string(),
            },
            editor_capture: AnchorSite::method(
                "PM.prototype",
                "update",
                "_M(this, YS, CM(this, BE, \"m\", kM).call(this), \"f\"),",
            ),
            popup_capture: AnchorSite::function("polyInitFunction", ", D = 0;"),
            leaderboard: AnchorSite::method("HB.prototype", "submitLeaderboard", ""),
            sound_load: AnchorSite::method("ul.prototype", "load", "dl(this, tl, \"f\").addResource(),"),
            setting_class: AnchorSite::method("ZB.prototype", "defaultSettings", "defaultSettings() {"),
            setting_defaults: AnchorSite::method(
                "ZB.prototype",
                "defaultSettings",
                "[$o.CheckpointVolume, \"1\"]",
            ),
            settings_menu: AnchorSite::function("mI", "), $o.CheckpointVolume),"),
            keybind_class: AnchorSite::method(
                "ZB.prototype",
                "defaultKeyBindings",
                "defaultKeyBindings() {",
            ),
            keybind_defaults: AnchorSite::method(
                "ZB.prototype",
                "defaultKeyBindings",
                "[Ix.SpectatorSpeedModifier, [\"ShiftLeft\", \"ShiftRight\"]]",
            ),
            keybind_menu: AnchorSite::function("mI", "), Ix.ToggleSpectatorCamera)"),
        }
    }
}

/// Code templates. Placeholders are written `{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostTemplates {
    pub setting_category: String,
    pub setting_bool: String,
    pub setting_slider: String,
    pub setting_custom: String,
    pub setting_constructor: String,
    pub setting_default: String,
    pub bind_category: String,
    pub keybind: String,
    pub keybind_constructor: String,
    pub keybind_default: String,
    pub setting_class_capture: String,
    pub sound_manager_capture: String,
    pub sound_override: String,
    pub editor_capture: String,
    pub popup_capture: String,
    pub leaderboard_override: String,
    pub export_filter: String,
    pub part_volume: String,
}

impl Default for HostTemplates {
    fn default() -> Self {
        Self {
            setting_category: r#"xI(this, eI, "m", gI).call(this, xI(this, nI, "f").get("{name}")),"#.to_string(),
            setting_bool: r#"xI(this, eI, "m", wI).call(this, xI(this, nI, "f").get("{name}"), [{title: xI(this, nI, "f").get("Off"), value: "false"}, {title: xI(this, nI, "f").get("On"), value: "true"}], $o.{id}),"#.to_string(),
            setting_slider: r#"xI(this, eI, "m", yI).call(this, xI(this, nI, "f").get("{name}"), $o.{id}),"#.to_string(),
            setting_custom: r#"xI(this, eI, "m", wI).call(this, xI(this, nI, "f").get("{name}"), {options}, $o.{id}),"#.to_string(),
            setting_constructor: r#"$o[$o.{id} = {n}] = "{id}";"#.to_string(),
            setting_default: r#", [$o.{id}, "{value}"]"#.to_string(),
            bind_category: r#",xI(this, eI, "m", vI).call(this, xI(this, nI, "f").get("{name}"))"#.to_string(),
            keybind: r#",xI(this, eI, "m", AI).call(this, xI(this, nI, "f").get("{name}"), Ix.{id})"#.to_string(),
            keybind_constructor: r#"Ix[Ix.{id} = {n}] = "{id}";"#.to_string(),
            keybind_default: r#", [Ix.{id}, [{first}, {second}]]"#.to_string(),
            setting_class_capture: "{global}.settingClass = this;".to_string(),
            sound_manager_capture: "{global}.soundManager = new SoundManager(this);".to_string(),
            sound_override: "\nnull;\nif(e === \"{id}\") {\n t = [\"{url}\"];\n}".to_string(),
            editor_capture: "{global}.editorExtras.construct(this),".to_string(),
            popup_capture: "{global}.popUpClass = S;".to_string(),
            leaderboard_override: "(e, t, n, i, r, a) => {}".to_string(),
            export_filter: "if ({ids}.includes(r)) {continue;};".to_string(),
            part_volume: PART_VOLUME_RASTERIZER.to_string(),
        }
    }
}

const PART_VOLUME_RASTERIZER: &str = r#"const l = [];
for (const [start, end] of a) {
    const [x0, y0, z0] = start;
    const [x1, y1, z1] = end;

    const minX = Math.min(x0, x1), maxX = Math.max(x0, x1);
    const minY = Math.min(y0, y1), maxY = Math.max(y0, y1);
    const minZ = Math.min(z0, z1), maxZ = Math.max(z0, z1);

    for (let x = minX; x <= maxX; x++)
        for (let y = minY; y <= maxY; y++)
            for (let z = minZ; z <= maxZ; z++) {
                if (l.find(([a, b, c]) => a === x && b === y && c === z)) {
                    throw new Error("Duplicate tile in track part");
                }
                l.push([x, y, z]);
            }"#;

/// Models the host loads before any mod adds its own.
pub fn builtin_models() -> Vec<String> {
    [
        "models/blocks.glb",
        "models/pillar.glb",
        "models/planes.glb",
        "models/road.glb",
        "models/road_wide.glb",
        "models/signs.glb",
        "models/wall_track.glb",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Render a model list the way the host writes it: `["a", "b"]`.
pub fn model_list_literal(models: &[String]) -> String {
    format!("[\"{}\"]", models.join("\", \""))
}

/// Everything the engine knows about one host version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostProfile {
    /// Name of the loader object the host-side glue reaches through.
    pub loader_global: String,
    pub seeds: IdSeeds,
    pub symbols: HostSymbols,
    pub sites: HostSites,
    pub templates: HostTemplates,
    pub builtin_models: Vec<String>,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            loader_global: "ActivePolyModLoader".to_string(),
            seeds: IdSeeds::default(),
            symbols: HostSymbols::default(),
            sites: HostSites::default(),
            templates: HostTemplates::default(),
            builtin_models: builtin_models(),
        }
    }
}

impl HostProfile {
    pub fn load_from(path: &Path) -> PmlResult<Self> {
        log::info!("Loading host profile from {:?}", path);
        read_document(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let profile: HostProfile = toml::from_str(
            r#"
            loader_global = "PML"
            [seeds]
            block = 200
            "#,
        )
        .unwrap();
        assert_eq!(profile.loader_global, "PML");
        assert_eq!(profile.seeds.block, 200);
        assert_eq!(profile.seeds.category, 8);
        assert_eq!(profile.symbols.setting_enum, "$o");
    }

    #[test]
    fn test_model_list_site_matches_builtin_literal() {
        let profile = HostProfile::default();
        assert_eq!(
            profile.sites.model_list.token,
            r#"["models/blocks.glb", "models/pillar.glb", "models/planes.glb", "models/road.glb", "models/road_wide.glb", "models/signs.glb", "models/wall_track.glb"]"#
        );
    }

    #[test]
    fn test_loader_config_defaults() {
        let config: LoaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.host_version, "0.5.0");
        assert_eq!(config.storage_key, "polyMods");
        assert_eq!(config.core_mod.version, "latest");
        assert!(config.core_mod.loaded);
    }
}
