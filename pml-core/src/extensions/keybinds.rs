//! Keybinding extensions and callback dispatch.

use super::template::render;
use crate::config::HostProfile;
use crate::mixin::{MixinStore, MixinType, Surface};

/// A host input event forwarded by the host-side glue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// DOM event name, e.g. `keydown`.
    pub event: String,
    /// Physical key code, e.g. `KeyR`.
    pub code: String,
}

impl KeyEvent {
    pub fn new(event: &str, code: &str) -> Self {
        Self {
            event: event.to_string(),
            code: code.to_string(),
        }
    }
}

pub type KeybindCallback = Box<dyn Fn(&KeyEvent) + Send + Sync>;

struct KeybindHandler {
    event: String,
    value: u32,
    callback: KeybindCallback,
}

#[derive(Default)]
pub struct KeybindExtension {
    menu: Vec<String>,
    constructors: Vec<String>,
    defaults: Vec<String>,
    handlers: Vec<KeybindHandler>,
}

impl std::fmt::Debug for KeybindExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeybindExtension")
            .field("menu", &self.menu)
            .field("constructors", &self.constructors)
            .field("defaults", &self.defaults)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl KeybindExtension {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_category(&mut self, profile: &HostProfile, name: &str) {
        self.menu
            .push(render(&profile.templates.bind_category, &[("name", name)]));
    }

    /// Add a keybinding with enum value `n` and its callback.
    #[allow(clippy::too_many_arguments)]
    pub fn push_keybind(
        &mut self,
        profile: &HostProfile,
        n: u32,
        name: &str,
        id: &str,
        event: &str,
        default_bind: &str,
        second_bind: Option<&str>,
        callback: KeybindCallback,
    ) {
        let templates = &profile.templates;
        let n_text = n.to_string();
        self.menu
            .push(render(&templates.keybind, &[("name", name), ("id", id)]));
        self.constructors.push(render(
            &templates.keybind_constructor,
            &[("id", id), ("n", n_text.as_str())],
        ));

        let first = format!("\"{}\"", default_bind);
        let second = second_bind
            .map(|b| format!("\"{}\"", b))
            .unwrap_or_else(|| "null".to_string());
        self.defaults.push(render(
            &templates.keybind_default,
            &[("id", id), ("first", first.as_str()), ("second", second.as_str())],
        ));

        self.handlers.push(KeybindHandler {
            event: event.to_string(),
            value: n,
            callback,
        });
    }

    /// Run every callback registered for `event` whose binding `matches`.
    ///
    /// `matches` receives the binding's enum value and answers whether the
    /// event triggers it. Returns the number of callbacks invoked.
    pub fn dispatch(&self, event: &KeyEvent, matches: impl Fn(u32) -> bool) -> usize {
        let mut fired = 0;
        for handler in self.handlers.iter().filter(|h| h.event == event.event) {
            if matches(handler.value) {
                (handler.callback)(event);
                fired += 1;
            }
        }
        fired
    }

    /// Register the keybinding mixins on the main surface.
    pub fn finalize(&self, profile: &HostProfile, store: &mut MixinStore) {
        let sites = &profile.sites;

        let class = &sites.keybind_class;
        store.register_mixin(
            Surface::Main,
            class.scope.as_deref(),
            &class.path,
            MixinType::Insert,
            class.token.as_str(),
            format!("{};", self.constructors.concat()),
            None,
        );

        if !self.defaults.is_empty() {
            let site = &sites.keybind_defaults;
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
            let site = &sites.keybind_menu;
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
