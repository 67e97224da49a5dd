//! Settings menu extensions.
//!
//! Settings accumulate three fragment lists while mods initialize: enum
//! constructors, default values and menu entries. [`SettingsExtension::finalize`]
//! turns them into INSERT mixins on the settings class and the menu builder.

use super::template::render;
use crate::config::HostProfile;
use crate::mixin::{MixinStore, MixinType, Surface};
use serde::{Deserialize, Serialize};

/// Widget a setting is shown with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingType {
    #[serde(rename = "boolean")]
    Bool,
    #[serde(rename = "slider")]
    Slider,
    #[serde(rename = "custom")]
    Custom,
}

/// One choice of a custom setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingOption {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsExtension {
    menu: Vec<String>,
    constructors: Vec<String>,
    defaults: Vec<String>,
}

impl SettingsExtension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category header to the settings menu.
    pub fn push_category(&mut self, profile: &HostProfile, name: &str) {
        self.menu
            .push(render(&profile.templates.setting_category, &[("name", name)]));
    }

    /// Add a setting with enum value `n`.
    ///
    /// Boolean defaults render as `"true"` only when `default` is `"true"`.
    /// A custom setting without options gets an empty option list.
    #[allow(clippy::too_many_arguments)]
    pub fn push_setting(
        &mut self,
        profile: &HostProfile,
        n: u32,
        name: &str,
        id: &str,
        setting_type: SettingType,
        default: &str,
        options: Option<&[SettingOption]>,
    ) {
        let templates = &profile.templates;
        let n = n.to_string();
        self.constructors.push(render(
            &templates.setting_constructor,
            &[("id", id), ("n", n.as_str())],
        ));

        let default = match setting_type {
            SettingType::Bool if default == "true" => "true",
            SettingType::Bool => "false",
            _ => default,
        };
        self.defaults.push(render(
            &templates.setting_default,
            &[("id", id), ("value", default)],
        ));

        let entry = match setting_type {
            SettingType::Bool => render(&templates.setting_bool, &[("name", name), ("id", id)]),
            SettingType::Slider => render(&templates.setting_slider, &[("name", name), ("id", id)]),
            SettingType::Custom => {
                let options = serde_json::to_string(options.unwrap_or_default())
                    .unwrap_or_else(|_| "[]".to_string());
                render(
                    &templates.setting_custom,
                    &[("name", name), ("id", id), ("options", options.as_str())],
                )
            }
        };
        self.menu.push(entry);
    }

    /// Register the settings mixins on the main surface.
    ///
    /// The sound manager and settings class are always captured so the
    /// host-side glue can reach them, even when no mod added a setting.
    pub fn finalize(&self, profile: &HostProfile, store: &mut MixinStore) {
        let sites = &profile.sites;
        let global = [("global", profile.loader_global.as_str())];

        let sound = &sites.sound_load;
        store.register_mixin(
            Surface::Main,
            sound.scope.as_deref(),
            &sound.path,
            MixinType::Insert,
            sound.token.as_str(),
            render(&profile.templates.sound_manager_capture, &global),
            None,
        );

        let class = &sites.setting_class;
        let capture = render(&profile.templates.setting_class_capture, &global);
        store.register_mixin(
            Surface::Main,
            class.scope.as_deref(),
            &class.path,
            MixinType::Insert,
            class.token.as_str(),
            format!("{}{}", capture, self.constructors.concat()),
            None,
        );

        if !self.defaults.is_empty() {
            let site = &sites.setting_defaults;
            store.register_mixin(
                Surface::Main,
                site.scope.as_deref(),
                &site.path,
                MixinType::Insert,
                site.token.as_str(),
                self.defaults.concat(),
                None,
            );
        }

        if !self.menu.is_empty() {
            let site = &sites.settings_menu;
            store.register_mixin(
                Surface::Main,
                site.scope.as_deref(),
                &site.path,
                MixinType::Insert,
                site.token.as_str(),
                self.menu.concat(),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_setting_fragments() {
        let profile = HostProfile::default();
        let mut settings = SettingsExtension::new();
        settings.push_setting(&profile, 19, "Fast", "FastMode", SettingType::Bool, "true", None);

        assert_eq!(settings.constructors, vec![r#"$o[$o.FastMode = 19] = "FastMode";"#]);
        assert_eq!(settings.defaults, vec![r#", [$o.FastMode, "true"]"#]);
        assert!(settings.menu[0].ends_with("$o.FastMode),"));
    }

    #[test]
    fn test_custom_setting_serializes_options() {
        let profile = HostProfile::default();
        let mut settings = SettingsExtension::new();
        let options = vec![SettingOption {
            title: "Low".into(),
            value: "0".into(),
        }];
        settings.push_setting(&profile, 19, "Q", "Quality", SettingType::Custom, "0", Some(&options));
        assert!(settings.menu[0].contains(r#"[{"title":"Low","value":"0"}], $o.Quality"#));
    }

    #[test]
    fn test_finalize_always_captures_setting_class() {
        let profile = HostProfile::default();
        let mut store = MixinStore::new();
        SettingsExtension::new().finalize(&profile, &mut store);
        let codes: Vec<_> = store.mixins(Surface::Main).iter().map(|d| d.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "ActivePolyModLoader.soundManager = new SoundManager(this);",
                "ActivePolyModLoader.settingClass = this;",
            ]
        );
    }
}
