//! Declarative mixin packs.
//!
//! A pack is a mod whose module is a JSON document instead of code:
//!
//! ```json
//! {
//!   "touchesPhysics": false,
//!   "mixins": {
//!     "main": [
//!       { "scope": "HB.prototype", "path": "submitLeaderboard",
//!         "mixinType": "HEAD", "accessors": [], "code": "return;" }
//!     ],
//!     "simulation": []
//!   },
//!   "settings": [{ "name": "Fast mode", "id": "FastMode", "type": "boolean", "default": "false" }],
//!   "models": [],
//!   "categories": [],
//!   "blocks": []
//! }
//! ```
//!
//! On init the pack registers everything it declares, in document order.

use super::context::ModContext;
use super::PolyMod;
use crate::error::PmlResult;
use crate::extensions::editor::BlockSpec;
use crate::extensions::settings::{SettingOption, SettingType};
use crate::mixin::{MixinDescriptor, Surface};
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackMixins {
    #[serde(default)]
    pub main: Vec<MixinDescriptor>,
    #[serde(default)]
    pub simulation: Vec<MixinDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSetting {
    pub name: String,
    pub id: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub options: Option<Vec<SettingOption>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackCategory {
    pub id: String,
    pub default_block: String,
}

/// Parsed pack document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixinPack {
    #[serde(default)]
    pub touches_physics: bool,
    #[serde(default)]
    pub mixins: PackMixins,
    #[serde(default)]
    pub settings: Vec<PackSetting>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub categories: Vec<PackCategory>,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
}

impl MixinPack {
    pub fn from_json(text: &str) -> PmlResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A mod backed by a [`MixinPack`].
#[derive(Debug, Clone)]
pub struct PackMod {
    pack: MixinPack,
}

impl PackMod {
    pub fn new(pack: MixinPack) -> Self {
        Self { pack }
    }
}

impl PolyMod for PackMod {
    fn init(&mut self, ctx: &mut ModContext) -> anyhow::Result<()> {
        for descriptor in &self.pack.mixins.main {
            ctx.push_mixin(Surface::Main, descriptor.clone());
        }
        for descriptor in &self.pack.mixins.simulation {
            ctx.push_mixin(Surface::Simulation, descriptor.clone());
        }
        for setting in &self.pack.settings {
            ctx.register_setting(
                &setting.name,
                &setting.id,
                setting.setting_type,
                &setting.default,
                setting.options.as_deref(),
            );
        }
        for url in &self.pack.models {
            ctx.register_model(url);
        }
        for category in &self.pack.categories {
            ctx.register_category(&category.id, &category.default_block);
        }
        for block in &self.pack.blocks {
            ctx.register_block(block.clone())
                .with_context(|| format!("Invalid block {}", block.id))?;
        }
        Ok(())
    }

    fn touches_physics(&self) -> bool {
        self.pack.touches_physics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostProfile;
    use crate::mixin::MixinType;

    #[test]
    fn test_pack_registers_both_surfaces() {
        let pack = MixinPack::from_json(
            r#"{
                "mixins": {
                    "main": [{"path": "f", "mixinType": "HEAD", "code": "a;"}],
                    "simulation": [{"scope": "S.prototype", "path": "step", "mixinType": "INSERT", "accessors": "x = 1;", "code": "y;"}]
                }
            }"#,
        )
        .unwrap();
        let mut ctx = ModContext::new(HostProfile::default());
        PackMod::new(pack).init(&mut ctx).unwrap();

        let sim = ctx.sim_worker_mixins();
        assert_eq!(sim.len(), 1);
        assert_eq!(sim[0].start_token(), Some("x = 1;"));
        let main = ctx.main_mixins();
        assert_eq!(main[0].mixin_type, MixinType::Head);
        assert!(main.iter().any(|d| d.path == "submitLeaderboard"));
    }

    #[test]
    fn test_pack_block_with_overlap_fails_init() {
        let pack = MixinPack::from_json(
            r#"{"blocks": [{"id": "B", "category": "C", "checksum": "0", "scene": "s", "model": "m",
                "volume": [[[0,0,0],[0,0,0]], [[0,0,0],[0,0,0]]]}]}"#,
        )
        .unwrap();
        let mut ctx = ModContext::new(HostProfile::default());
        assert!(PackMod::new(pack).init(&mut ctx).is_err());
    }
}
