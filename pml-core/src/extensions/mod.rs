//! Extension Registrar
//!
//! Lets mods add values to host enumerations they do not own: editor
//! categories, track blocks, settings and keybindings.
//!
//! # Overview
//!
//! Every registration goes through three steps:
//! 1. [`IdAllocator`] hands out the next numeric value for the enumeration.
//! 2. The registration is recorded in the [`ExtensionTable`], an ordered,
//!    serializable list of `{kind, id, label, value, data}` entries that
//!    host-side glue can consume without evaluating any generated code.
//! 3. The matching accumulator ([`settings::SettingsExtension`],
//!    [`keybinds::KeybindExtension`], [`editor::EditorExtras`]) stores the
//!    data needed to build code fragments.
//!
//! Fragments only become mixins when the lifecycle controller finalizes the
//! accumulators after every mod has initialized. Until then nothing is
//! written to the [`MixinStore`](crate::mixin::MixinStore).
//!
//! # ID Allocation
//!
//! Counters start at the last built-in value of each enumeration (see
//! [`IdSeeds`]) and pre-increment, so the first registration of a kind
//! receives `seed + 1`. IDs are never reused within a process.

pub mod editor;
pub mod keybinds;
pub mod settings;
pub mod template;
pub mod volume;

use crate::config::IdSeeds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host enumeration an extension value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Category,
    Block,
    Setting,
    Keybind,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Category => "category",
            Self::Block => "block",
            Self::Setting => "setting",
            Self::Keybind => "keybind",
        };
        f.write_str(name)
    }
}

/// Per-kind monotonically increasing counters.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    category: u32,
    block: u32,
    setting: u32,
    keybind: u32,
}

impl IdAllocator {
    pub fn new(seeds: &IdSeeds) -> Self {
        Self {
            category: seeds.category,
            block: seeds.block,
            setting: seeds.setting,
            keybind: seeds.keybind,
        }
    }

    /// Allocate the next value of `kind`.
    pub fn allocate(&mut self, kind: ExtensionKind) -> u32 {
        let counter = self.counter_mut(kind);
        *counter += 1;
        *counter
    }

    /// Most recently allocated value, or the seed if none was allocated.
    pub fn latest(&self, kind: ExtensionKind) -> u32 {
        match kind {
            ExtensionKind::Category => self.category,
            ExtensionKind::Block => self.block,
            ExtensionKind::Setting => self.setting,
            ExtensionKind::Keybind => self.keybind,
        }
    }

    fn counter_mut(&mut self, kind: ExtensionKind) -> &mut u32 {
        match kind {
            ExtensionKind::Category => &mut self.category,
            ExtensionKind::Block => &mut self.block,
            ExtensionKind::Setting => &mut self.setting,
            ExtensionKind::Keybind => &mut self.keybind,
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(&IdSeeds::default())
    }
}

/// One registered enumeration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    pub kind: ExtensionKind,
    /// Enum member name, e.g. `MyBlock`.
    pub id: String,
    /// Display name; equals `id` when the registration has none.
    pub label: String,
    pub value: u32,
    /// Kind-specific constructor data.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Ordered record of every extension registered this process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionTable {
    entries: Vec<ExtensionEntry>,
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ExtensionEntry) {
        log::debug!("Registered {} {} = {}", entry.kind, entry.id, entry.value);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ExtensionEntry] {
        &self.entries
    }

    pub fn of_kind(&self, kind: ExtensionKind) -> impl Iterator<Item = &ExtensionEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Value registered for `id` under `kind`.
    pub fn value_of(&self, kind: ExtensionKind, id: &str) -> Option<u32> {
        self.of_kind(kind).find(|e| e.id == id).map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
