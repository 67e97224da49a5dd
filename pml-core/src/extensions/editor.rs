//! Track editor extensions: models, block categories and blocks.
//!
//! Every block is registered on both surfaces. Blocks flagged
//! `ignore_on_export` are additionally listed in the export filter so the
//! editor skips them when writing a track, while the simulation still knows
//! how to build them.

use super::template::{js_number_array, render};
use super::volume::{self, VolumeRange};
use crate::config::{model_list_literal, HostProfile};
use crate::error::PmlResult;
use crate::mixin::{MixinStore, MixinType, Surface};
use serde::{Deserialize, Serialize};

/// Special collision shape attached to a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionShape {
    /// Member of the host's collision shape enum.
    #[serde(rename = "type")]
    pub shape_type: String,
    pub center: [f64; 3],
    pub size: [f64; 3],
}

/// Everything needed to construct a track part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    pub id: String,
    pub category: String,
    pub checksum: String,
    pub scene: String,
    pub model: String,
    /// Occupied space as inclusive corner pairs.
    pub volume: Vec<VolumeRange>,
    #[serde(default)]
    pub ignore_on_export: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<CollisionShape>,
}

#[derive(Debug, Clone)]
struct CategoryEntry {
    id: String,
    value: u32,
    default_block: String,
}

#[derive(Debug, Clone)]
pub struct EditorExtras {
    models: Vec<String>,
    categories: Vec<CategoryEntry>,
    blocks: Vec<(BlockSpec, u32)>,
    ignored: Vec<u32>,
}

impl EditorExtras {
    pub fn new(profile: &HostProfile) -> Self {
        Self {
            models: profile.builtin_models.clone(),
            categories: Vec::new(),
            blocks: Vec::new(),
            ignored: Vec::new(),
        }
    }

    pub fn register_model(&mut self, url: &str) {
        self.models.push(url.to_string());
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Block values excluded from track export.
    pub fn ignored_blocks(&self) -> &[u32] {
        &self.ignored
    }

    pub fn push_category(&mut self, value: u32, id: &str, default_block: &str) {
        self.categories.push(CategoryEntry {
            id: id.to_string(),
            value,
            default_block: default_block.to_string(),
        });
    }

    /// Record a block with enum value `value`.
    ///
    /// The collision volume is validated here, so an overlapping block is
    /// rejected before it reaches either surface.
    pub fn push_block(&mut self, value: u32, spec: BlockSpec) -> PmlResult<()> {
        volume::rasterize(&spec.volume)?;
        if spec.ignore_on_export {
            self.ignored.push(value);
        }
        self.blocks.push((spec, value));
        Ok(())
    }

    fn part_fragment(&self, profile: &HostProfile, surface: Surface, spec: &BlockSpec) -> String {
        let symbols = &profile.symbols;
        let volume = serde_json::to_string(&spec.volume).unwrap_or_else(|_| "[]".to_string());
        let special = spec
            .special
            .as_ref()
            .map(|shape| {
                format!(
                    ", {{ type: {}.{}, center: {}, size: {}}}",
                    symbols.collision_enum.get(surface),
                    shape.shape_type,
                    js_number_array(&shape.center),
                    js_number_array(&shape.size)
                )
            })
            .unwrap_or_default();
        format!(
            "{}.push(new {}(\"{}\",{}.{},{}.{},[[\"{}\", \"{}\"]],{},{}{}));",
            symbols.part_registry.get(surface),
            symbols.part_class.get(surface),
            spec.checksum,
            symbols.category_enum.get(surface),
            spec.category,
            symbols.block_enum.get(surface),
            spec.id,
            spec.scene,
            spec.model,
            symbols.part_model_set.get(surface),
            volume,
            special
        )
    }

    fn register_site(
        store: &mut MixinStore,
        surface: Surface,
        site: &crate::config::AnchorSite,
        code: String,
    ) {
        store.register_mixin(
            surface,
            site.scope.as_deref(),
            &site.path,
            MixinType::Insert,
            site.token.as_str(),
            code,
            None,
        );
    }

    /// Register the editor mixins on both surfaces.
    pub fn finalize(&self, profile: &HostProfile, store: &mut MixinStore) {
        let symbols = &profile.symbols;
        let sites = &profile.sites;

        for surface in Surface::ALL {
            if !self.categories.is_empty() {
                let name = symbols.category_enum.get(surface);
                let code: String = self
                    .categories
                    .iter()
                    .map(|c| format!(", {name}[{name}.{} = {}]  =  \"{}\"", c.id, c.value, c.id))
                    .collect();
                Self::register_site(store, surface, sites.category_enum.get(surface), code);
            }

            if !self.blocks.is_empty() {
                let name = symbols.block_enum.get(surface);
                let code: String = self
                    .blocks
                    .iter()
                    .map(|(b, n)| format!(", {name}[{name}.{} = {}]  =  \"{}\"", b.id, n, b.id))
                    .collect();
                Self::register_site(store, surface, sites.block_enum.get(surface), code);

                let mut parts: String = self
                    .blocks
                    .iter()
                    .map(|(b, _)| self.part_fragment(profile, surface, b))
                    .collect();
                if surface == Surface::Main {
                    let registry = symbols.part_registry.get(surface);
                    let map = &symbols.part_map;
                    parts.push_str(&format!(
                        "for (const e of {registry}) {{if (!{map}.has(e.id)){{ {map}.set(e.id, e);}}; }}"
                    ));
                }
                Self::register_site(store, surface, sites.part_registry.get(surface), parts);
            }
        }

        if !self.categories.is_empty() {
            let category = &symbols.category_enum.main;
            let block = &symbols.block_enum.main;
            let cases: String = self
                .categories
                .iter()
                .map(|c| {
                    format!(
                        "case {category}.{}:n = this.getPart({block}.{});break;",
                        c.id, c.default_block
                    )
                })
                .collect();
            Self::register_site(store, Surface::Main, &sites.category_mesh, cases);
        }

        let models = &sites.model_list;
        store.register_mixin(
            Surface::Main,
            models.scope.as_deref(),
            &models.path,
            MixinType::ReplaceBetween,
            models.token.as_str(),
            model_list_literal(&self.models),
            Some(models.token.as_str()),
        );

        if !self.ignored.is_empty() {
            let ids = serde_json::to_string(&self.ignored).unwrap_or_else(|_| "[]".to_string());
            Self::register_site(
                store,
                Surface::Main,
                &sites.export_filter,
                render(&profile.templates.export_filter, &[("ids", ids.as_str())]),
            );
        }

        let span = &sites.part_volume;
        store.register_mixin(
            Surface::Main,
            None,
            &span.class,
            MixinType::ClassReplace,
            span.start.as_str(),
            profile.templates.part_volume.clone(),
            Some(span.end.as_str()),
        );

        Self::register_site(
            store,
            Surface::Main,
            &sites.editor_capture,
            render(
                &profile.templates.editor_capture,
                &[("global", profile.loader_global.as_str())],
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, ignore: bool) -> BlockSpec {
        BlockSpec {
            id: id.to_string(),
            category: "Custom".to_string(),
            checksum: "abc".to_string(),
            scene: "Scene".to_string(),
            model: "Ramp".to_string(),
            volume: vec![[[0, 0, 0], [0, 0, 1]]],
            ignore_on_export: ignore,
            special: None,
        }
    }

    #[test]
    fn test_main_part_fragment() {
        let profile = HostProfile::default();
        let extras = EditorExtras::new(&profile);
        let mut spec = block("Ramp", false);
        spec.special = Some(CollisionShape {
            shape_type: "Box".to_string(),
            center: [0.0, 0.5, 0.0],
            size: [1.0, 1.0, 2.0],
        });
        assert_eq!(
            extras.part_fragment(&profile, Surface::Main, &spec),
            r#"ab.push(new rb("abc",KA.Custom,eA.Ramp,[["Scene", "Ramp"]],nb,[[[0,0,0],[0,0,1]]], { type: XA.Box, center: [0,0.5,0], size: [1,1,2]}));"#
        );
    }

    #[test]
    fn test_ignored_block_stays_on_simulation() {
        let profile = HostProfile::default();
        let mut extras = EditorExtras::new(&profile);
        extras.push_block(156, block("Hidden", true)).unwrap();
        assert_eq!(extras.ignored_blocks(), &[156]);

        let mut store = MixinStore::new();
        extras.finalize(&profile, &mut store);
        let sim = store.mixins(Surface::Simulation);
        assert!(sim.iter().any(|d| d.code.contains("mu[mu.Hidden = 156]")));
        assert!(sim.iter().any(|d| d.code.contains("j_.push(new X_(")));
        assert!(store
            .mixins(Surface::Main)
            .iter()
            .any(|d| d.code == "if ([156].includes(r)) {continue;};"));
    }

    #[test]
    fn test_overlapping_block_is_rejected() {
        let profile = HostProfile::default();
        let mut extras = EditorExtras::new(&profile);
        let mut spec = block("Bad", false);
        spec.volume = vec![[[0, 0, 0], [1, 0, 0]], [[1, 0, 0], [1, 1, 0]]];
        assert!(extras.push_block(156, spec).is_err());
        assert!(extras.blocks.is_empty());
    }
}
