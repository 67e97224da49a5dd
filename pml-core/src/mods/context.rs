//! Mod Context
//!
//! The registration surface handed to every lifecycle callback. It owns the
//! process-wide mutable state mods write into:
//! - the [`MixinStore`] for both surfaces
//! - the [`IdAllocator`] and [`ExtensionTable`]
//! - settings, keybinding and editor accumulators
//! - the leaderboard invalidation flag
//!
//! There is exactly one context per loader. Mods receive it by mutable
//! reference, so only the currently running callback can write to it.

use crate::config::HostProfile;
use crate::error::{PmlError, PmlResult};
use crate::extensions::editor::{BlockSpec, EditorExtras};
use crate::extensions::keybinds::{KeyEvent, KeybindCallback, KeybindExtension};
use crate::extensions::settings::{SettingOption, SettingType, SettingsExtension};
use crate::extensions::template::render;
use crate::extensions::{ExtensionEntry, ExtensionKind, ExtensionTable, IdAllocator};
use crate::mixin::{
    Accessors, MixinDescriptor, MixinStore, MixinType, PatchApplier, PatchOutput, Surface,
};
use serde_json::json;

#[derive(Debug)]
pub struct ModContext {
    profile: HostProfile,
    mixins: MixinStore,
    ids: IdAllocator,
    table: ExtensionTable,
    settings: SettingsExtension,
    keybinds: KeybindExtension,
    editor: EditorExtras,
    leaderboard_invalid: bool,
    leaderboard_patched: bool,
}

impl ModContext {
    pub fn new(profile: HostProfile) -> Self {
        Self {
            mixins: MixinStore::new(),
            ids: IdAllocator::new(&profile.seeds),
            table: ExtensionTable::new(),
            settings: SettingsExtension::new(),
            keybinds: KeybindExtension::new(),
            editor: EditorExtras::new(&profile),
            leaderboard_invalid: false,
            leaderboard_patched: false,
            profile,
        }
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn mixins(&self) -> &MixinStore {
        &self.mixins
    }

    pub fn extension_table(&self) -> &ExtensionTable {
        &self.table
    }

    pub fn editor(&self) -> &EditorExtras {
        &self.editor
    }

    // ---- mixins ----

    /// Register a mixin on a method of a class in the main bundle.
    pub fn register_class_mixin(
        &mut self,
        scope: &str,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        func: &str,
        extra: Option<&str>,
    ) {
        let d = MixinDescriptor::from_registration(Some(scope), path, mixin_type, accessors, func, extra);
        self.mixins.push(Surface::Main, d);
    }

    /// Register a mixin on a free function in the main bundle.
    pub fn register_func_mixin(
        &mut self,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        func: &str,
        extra: Option<&str>,
    ) {
        let d = MixinDescriptor::from_registration(None, path, mixin_type, accessors, func, extra);
        self.mixins.push(Surface::Main, d);
    }

    /// Register a mixin that applies at every occurrence inside class `class`.
    ///
    /// For two-token types `func_or_second_token` is the end token and
    /// `func` the replacement; for CLASSINSERT it is the inserted code.
    pub fn register_class_wide_mixin(
        &mut self,
        class: &str,
        mixin_type: MixinType,
        first_token: &str,
        func_or_second_token: &str,
        func: Option<&str>,
    ) {
        let d = MixinDescriptor::from_registration(
            None,
            class,
            mixin_type,
            first_token,
            func_or_second_token,
            func,
        );
        self.mixins.push(Surface::Main, d);
    }

    /// Register a mixin on a class method in the simulation worker bundle.
    ///
    /// Any simulation change can affect race results, so this also disables
    /// leaderboard submission.
    pub fn register_sim_worker_class_mixin(
        &mut self,
        scope: &str,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        func: &str,
        extra: Option<&str>,
    ) {
        self.patch_leaderboard();
        let d = MixinDescriptor::from_registration(Some(scope), path, mixin_type, accessors, func, extra);
        self.mixins.push(Surface::Simulation, d);
    }

    /// Register a mixin on a free function in the simulation worker bundle.
    pub fn register_sim_worker_func_mixin(
        &mut self,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        func: &str,
        extra: Option<&str>,
    ) {
        self.patch_leaderboard();
        let d = MixinDescriptor::from_registration(None, path, mixin_type, accessors, func, extra);
        self.mixins.push(Surface::Simulation, d);
    }

    /// Append a descriptor as-is.
    pub fn push_mixin(&mut self, surface: Surface, descriptor: MixinDescriptor) {
        if surface == Surface::Simulation {
            self.patch_leaderboard();
        }
        self.mixins.push(surface, descriptor);
    }

    pub fn sim_worker_mixins(&self) -> Vec<MixinDescriptor> {
        self.mixins.snapshot(Surface::Simulation)
    }

    pub fn main_mixins(&self) -> Vec<MixinDescriptor> {
        self.mixins.snapshot(Surface::Main)
    }

    // ---- physics ----

    /// Mark the session as unfit for leaderboard submission.
    pub fn invalidate_leaderboard(&mut self) {
        self.leaderboard_invalid = true;
        self.patch_leaderboard();
    }

    pub fn leaderboard_invalid(&self) -> bool {
        self.leaderboard_invalid
    }

    fn patch_leaderboard(&mut self) {
        if self.leaderboard_patched {
            return;
        }
        self.leaderboard_patched = true;
        let site = &self.profile.sites.leaderboard;
        let d = MixinDescriptor::new(
            site.scope.as_deref(),
            &site.path,
            MixinType::Override,
            Accessors::none(),
            self.profile.templates.leaderboard_override.clone(),
            None,
        );
        log::info!("Leaderboard submission disabled for this session");
        self.mixins.push(Surface::Main, d);
    }

    // ---- settings ----

    pub fn register_setting_category(&mut self, name: &str) {
        self.settings.push_category(&self.profile, name);
    }

    /// Add a setting and return its enum value.
    pub fn register_setting(
        &mut self,
        name: &str,
        id: &str,
        setting_type: SettingType,
        default: &str,
        options: Option<&[SettingOption]>,
    ) -> u32 {
        let n = self.ids.allocate(ExtensionKind::Setting);
        self.settings
            .push_setting(&self.profile, n, name, id, setting_type, default, options);
        self.table.push(ExtensionEntry {
            kind: ExtensionKind::Setting,
            id: id.to_string(),
            label: name.to_string(),
            value: n,
            data: json!({ "type": setting_type, "default": default, "options": options }),
        });
        n
    }

    /// Enum value of a registered setting.
    pub fn setting_id(&self, id: &str) -> PmlResult<u32> {
        self.table
            .value_of(ExtensionKind::Setting, id)
            .ok_or_else(|| PmlError::UnknownExtension(id.to_string()))
    }

    // ---- keybinds ----

    pub fn register_bind_category(&mut self, name: &str) {
        self.keybinds.push_category(&self.profile, name);
    }

    /// Add a keybinding and return its enum value.
    pub fn register_keybind(
        &mut self,
        name: &str,
        id: &str,
        event: &str,
        default_bind: &str,
        second_bind: Option<&str>,
        callback: KeybindCallback,
    ) -> u32 {
        let n = self.ids.allocate(ExtensionKind::Keybind);
        self.keybinds.push_keybind(
            &self.profile,
            n,
            name,
            id,
            event,
            default_bind,
            second_bind,
            callback,
        );
        self.table.push(ExtensionEntry {
            kind: ExtensionKind::Keybind,
            id: id.to_string(),
            label: name.to_string(),
            value: n,
            data: json!({ "event": event, "binds": [default_bind, second_bind] }),
        });
        n
    }

    /// Forward a host input event to matching keybind callbacks.
    pub fn dispatch_keybind(&self, event: &KeyEvent, matches: impl Fn(u32) -> bool) -> usize {
        self.keybinds.dispatch(event, matches)
    }

    // ---- sounds ----

    /// Replace the resource the host loads for sound `id` with `url`.
    pub fn register_sound_override(&mut self, id: &str, url: &str) {
        let site = &self.profile.sites.sound_load;
        let code = render(&self.profile.templates.sound_override, &[("id", id), ("url", url)]);
        let d = MixinDescriptor::new(
            site.scope.as_deref(),
            &site.path,
            MixinType::Insert,
            site.token.as_str(),
            code,
            None,
        );
        self.mixins.push(Surface::Main, d);
    }

    // ---- editor ----

    pub fn register_model(&mut self, url: &str) {
        self.editor.register_model(url);
    }

    /// Add an editor category and return its enum value.
    pub fn register_category(&mut self, id: &str, default_block: &str) -> u32 {
        let n = self.ids.allocate(ExtensionKind::Category);
        self.editor.push_category(n, id, default_block);
        self.table.push(ExtensionEntry {
            kind: ExtensionKind::Category,
            id: id.to_string(),
            label: id.to_string(),
            value: n,
            data: json!({ "defaultBlock": default_block }),
        });
        n
    }

    /// Add a track block and return its enum value.
    ///
    /// Fails without allocating an ID if the collision volume overlaps
    /// itself.
    pub fn register_block(&mut self, spec: BlockSpec) -> PmlResult<u32> {
        crate::extensions::volume::rasterize(&spec.volume)?;
        let n = self.ids.allocate(ExtensionKind::Block);
        let data = serde_json::to_value(&spec)?;
        let id = spec.id.clone();
        self.editor.push_block(n, spec)?;
        self.table.push(ExtensionEntry {
            kind: ExtensionKind::Block,
            label: id.clone(),
            id,
            value: n,
            data,
        });
        Ok(n)
    }

    /// Enum value of a registered block.
    pub fn block_number(&self, id: &str) -> PmlResult<u32> {
        self.table
            .value_of(ExtensionKind::Block, id)
            .ok_or_else(|| PmlError::UnknownExtension(id.to_string()))
    }

    // ---- lifecycle hooks ----

    pub(crate) fn register_popup_capture(&mut self) {
        let site = &self.profile.sites.popup_capture;
        let code = render(
            &self.profile.templates.popup_capture,
            &[("global", self.profile.loader_global.as_str())],
        );
        let d = MixinDescriptor::new(
            site.scope.as_deref(),
            &site.path,
            MixinType::Insert,
            site.token.as_str(),
            code,
            None,
        );
        self.mixins.push(Surface::Main, d);
    }

    /// Turn accumulated settings, keybinds and editor extensions into mixins.
    pub(crate) fn finalize_extensions(&mut self) {
        log::info!(
            "Finalizing {} extension(s) into mixins",
            self.table.len()
        );
        self.settings.finalize(&self.profile, &mut self.mixins);
        self.keybinds.finalize(&self.profile, &mut self.mixins);
        self.editor.finalize(&self.profile, &mut self.mixins);
        log::debug!("{} mixin(s) registered after finalization", self.mixins.len());
    }

    // ---- patching ----

    /// Apply every mixin registered for `surface` to `source`.
    pub fn patch(&self, surface: Surface, source: &str) -> PatchOutput {
        PatchApplier::new().apply(&self.mixins, surface, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_worker_mixins_patch_leaderboard_once() {
        let mut ctx = ModContext::new(HostProfile::default());
        ctx.register_sim_worker_func_mixin("a", MixinType::Head, Accessors::none(), "x;", None);
        ctx.register_sim_worker_class_mixin("B.prototype", "c", MixinType::Tail, Accessors::none(), "y;", None);

        assert_eq!(ctx.sim_worker_mixins().len(), 2);
        let overrides: Vec<_> = ctx
            .main_mixins()
            .into_iter()
            .filter(|d| d.path == "submitLeaderboard")
            .collect();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].mixin_type, MixinType::Override);
        assert!(!ctx.leaderboard_invalid());
    }

    #[test]
    fn test_setting_and_block_lookup() {
        let mut ctx = ModContext::new(HostProfile::default());
        let n = ctx.register_setting("Fast", "FastMode", SettingType::Slider, "5", None);
        assert_eq!(n, 19);
        assert_eq!(ctx.setting_id("FastMode").unwrap(), 19);
        assert!(matches!(ctx.block_number("Nope"), Err(PmlError::UnknownExtension(_))));
    }

    #[test]
    fn test_class_wide_registration_targets_class() {
        let mut ctx = ModContext::new(HostProfile::default());
        ctx.register_class_wide_mixin("rb", MixinType::ClassReplace, "const l = [];", "l.push(x)", Some("NEW"));
        let d = &ctx.main_mixins()[0];
        assert_eq!(d.scope, None);
        assert_eq!(d.start_token(), Some("const l = [];"));
        assert_eq!(d.end_token(), Some("l.push(x)"));
        assert_eq!(d.code, "NEW");
    }
}
