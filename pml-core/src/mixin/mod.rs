//! Mixin Descriptor Store
//!
//! Mixins are registered instructions to insert, replace or remove code at a
//! named anchor inside the host bundle. They are collected here, grouped by
//! the surface they target, and later consumed by the [`PatchApplier`].
//!
//! # Surfaces
//!
//! The host runs two independent execution contexts:
//! - [`Surface::Main`] - the main thread bundle
//! - [`Surface::Simulation`] - the simulation worker bundle
//!
//! # Addressing
//!
//! A descriptor addresses its patch site with an optional `scope` and a
//! `path`:
//!
//! | scope            | path      | region                                    |
//! |------------------|-----------|-------------------------------------------|
//! | `Some("GN.prototype")` | `init` | method `init` of class `GN`          |
//! | `None`           | `xb`      | free function `xb`                        |
//! | `None`           | `rb`      | class `rb` (class-wide mixin types only)  |
//! | any              | `*`       | the whole surface text                    |
//!
//! Descriptors are append-only. Registration order is application order, so
//! a later descriptor on the same anchor sees the text produced by earlier
//! ones.

pub mod anchor;
pub mod applier;

pub use applier::{PatchApplier, PatchOutcome, PatchOutput, PatchReport, PatchStatus};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path that addresses the whole surface instead of a named region.
pub const WHOLE_SURFACE: &str = "*";

/// Where injected code lands relative to the anchor.
///
/// Discriminants match the numeric values plugins have always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixinType {
    /// Inject at the start of the target function.
    #[serde(rename = "HEAD")]
    Head = 0,
    /// Inject at the end of the target function.
    #[serde(rename = "TAIL")]
    Tail = 1,
    /// Replace the body of the target function.
    #[serde(rename = "OVERRIDE")]
    Override = 2,
    /// Insert code after a given token.
    #[serde(rename = "INSERT")]
    Insert = 3,
    /// Remove code between two tokens at every site in a class. Inclusive.
    #[serde(rename = "CLASSREMOVE")]
    ClassRemove = 4,
    /// Replace code between two tokens. Inclusive.
    #[serde(rename = "REPLACEBETWEEN")]
    ReplaceBetween = 5,
    /// Remove code between two tokens. Inclusive.
    #[serde(rename = "REMOVEBETWEEN")]
    RemoveBetween = 6,
    /// Replace code between two tokens at every site in a class. Inclusive.
    #[serde(rename = "CLASSREPLACE")]
    ClassReplace = 7,
    /// Insert code after a given token at every site in a class.
    #[serde(rename = "CLASSINSERT")]
    ClassInsert = 8,
}

impl MixinType {
    /// Look up a mixin type by its numeric value.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Head,
            1 => Self::Tail,
            2 => Self::Override,
            3 => Self::Insert,
            4 => Self::ClassRemove,
            5 => Self::ReplaceBetween,
            6 => Self::RemoveBetween,
            7 => Self::ClassReplace,
            8 => Self::ClassInsert,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the action repeats at every qualifying occurrence.
    pub fn is_class_wide(self) -> bool {
        matches!(
            self,
            Self::ClassInsert | Self::ClassReplace | Self::ClassRemove
        )
    }

    /// Whether the patch site is delimited by a start and an end token.
    pub fn is_two_token(self) -> bool {
        matches!(
            self,
            Self::ReplaceBetween | Self::RemoveBetween | Self::ClassReplace | Self::ClassRemove
        )
    }

    /// Whether the patch site is a function body rather than a token.
    pub fn targets_body(self) -> bool {
        matches!(self, Self::Head | Self::Tail | Self::Override)
    }

    /// Whether the matched span is deleted rather than replaced.
    pub fn removes(self) -> bool {
        matches!(self, Self::RemoveBetween | Self::ClassRemove)
    }
}

impl fmt::Display for MixinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Head => "HEAD",
            Self::Tail => "TAIL",
            Self::Override => "OVERRIDE",
            Self::Insert => "INSERT",
            Self::ClassRemove => "CLASSREMOVE",
            Self::ReplaceBetween => "REPLACEBETWEEN",
            Self::RemoveBetween => "REMOVEBETWEEN",
            Self::ClassReplace => "CLASSREPLACE",
            Self::ClassInsert => "CLASSINSERT",
        };
        f.write_str(name)
    }
}

/// Host execution context a mixin targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// `main.bundle.js`
    Main,
    /// `simulation_worker.bundle.js`
    Simulation,
}

impl Surface {
    pub const ALL: [Surface; 2] = [Surface::Main, Surface::Simulation];
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Simulation => f.write_str("simulation"),
        }
    }
}

/// Private-field access expressions, or the single literal token used by
/// token-based mixin types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Accessors {
    Token(String),
    List(Vec<String>),
}

impl Accessors {
    pub fn none() -> Self {
        Self::List(Vec::new())
    }

    /// The anchor token, taken from the first list entry when a list was given.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token),
            Self::List(list) => list.first().map(String::as_str),
        }
    }

    /// Expressions handed to injected code.
    pub fn expressions(&self) -> &[String] {
        match self {
            Self::Token(token) => std::slice::from_ref(token),
            Self::List(list) => list,
        }
    }
}

impl Default for Accessors {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&str> for Accessors {
    fn from(token: &str) -> Self {
        Self::Token(token.to_string())
    }
}

impl From<String> for Accessors {
    fn from(token: String) -> Self {
        Self::Token(token)
    }
}

impl From<Vec<String>> for Accessors {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<&[&str]> for Accessors {
    fn from(list: &[&str]) -> Self {
        Self::List(list.iter().map(|s| s.to_string()).collect())
    }
}

/// A single registered patch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixinDescriptor {
    /// Class path (`GN.prototype`), absent for free functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Function, method or class name of the anchor region.
    pub path: String,
    pub mixin_type: MixinType,
    #[serde(default)]
    pub accessors: Accessors,
    /// Injected text. For two-token types this is the replacement.
    #[serde(default)]
    pub code: String,
    /// End token for two-token types, absent when the span is the start token alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code2: Option<String>,
}

impl MixinDescriptor {
    pub fn new(
        scope: Option<&str>,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        code: impl Into<String>,
        code2: Option<&str>,
    ) -> Self {
        Self {
            scope: scope.map(str::to_string),
            path: path.to_string(),
            mixin_type,
            accessors: accessors.into(),
            code: code.into(),
            code2: code2.map(str::to_string),
        }
    }

    /// Build a descriptor from the argument order plugins register with.
    ///
    /// For two-token types `func` is the end token and `extra` the
    /// replacement; without `extra`, a replace uses `func` as replacement of
    /// the start token alone while a remove treats `func` as the end token.
    pub fn from_registration(
        scope: Option<&str>,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        func: &str,
        extra: Option<&str>,
    ) -> Self {
        let (code, code2) = match (mixin_type.is_two_token(), extra) {
            (true, Some(extra)) => (extra.to_string(), Some(func.to_string())),
            (true, None) if mixin_type.removes() => (String::new(), Some(func.to_string())),
            (_, extra) => (func.to_string(), extra.map(str::to_string)),
        };
        Self {
            scope: scope.map(str::to_string),
            path: path.to_string(),
            mixin_type,
            accessors: accessors.into(),
            code,
            code2,
        }
    }

    /// Start token for token-based types.
    pub fn start_token(&self) -> Option<&str> {
        self.accessors.token()
    }

    /// End token for two-token types; the start token when none was given.
    pub fn end_token(&self) -> Option<&str> {
        self.code2.as_deref().or_else(|| self.start_token())
    }

    /// Human-readable anchor name for logs.
    pub fn anchor_name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}.{}", scope, self.path),
            None => self.path.clone(),
        }
    }
}

/// Per-surface, append-only list of registered mixins.
#[derive(Debug, Clone, Default)]
pub struct MixinStore {
    main: Vec<MixinDescriptor>,
    simulation: Vec<MixinDescriptor>,
}

impl MixinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor and return its position on the surface.
    pub fn push(&mut self, surface: Surface, descriptor: MixinDescriptor) -> usize {
        log::debug!(
            "Registered {} mixin on {} at {}",
            descriptor.mixin_type,
            surface,
            descriptor.anchor_name()
        );
        let list = self.list_mut(surface);
        list.push(descriptor);
        list.len() - 1
    }

    /// Register a mixin using the data model's field order.
    #[allow(clippy::too_many_arguments)]
    pub fn register_mixin(
        &mut self,
        surface: Surface,
        scope: Option<&str>,
        path: &str,
        mixin_type: MixinType,
        accessors: impl Into<Accessors>,
        code: impl Into<String>,
        code2: Option<&str>,
    ) -> usize {
        let descriptor = MixinDescriptor::new(scope, path, mixin_type, accessors, code, code2);
        self.push(surface, descriptor)
    }

    /// Descriptors for a surface, in registration order.
    pub fn mixins(&self, surface: Surface) -> &[MixinDescriptor] {
        match surface {
            Surface::Main => &self.main,
            Surface::Simulation => &self.simulation,
        }
    }

    /// Copy of the descriptors for a surface.
    pub fn snapshot(&self, surface: Surface) -> Vec<MixinDescriptor> {
        self.mixins(surface).to_vec()
    }

    pub fn len(&self) -> usize {
        self.main.len() + self.simulation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.simulation.is_empty()
    }

    fn list_mut(&mut self, surface: Surface) -> &mut Vec<MixinDescriptor> {
        match surface {
            Surface::Main => &mut self.main,
            Surface::Simulation => &mut self.simulation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixin_type_codes_round_trip() {
        for code in 0..=8u8 {
            let ty = MixinType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert!(MixinType::from_code(9).is_none());
    }

    #[test]
    fn test_registration_normalises_two_token_replace() {
        let d = MixinDescriptor::from_registration(
            Some("GN.prototype"),
            "init",
            MixinType::ReplaceBetween,
            "[\"a\"]",
            "[\"a\"]",
            Some("[\"a\", \"b\"]"),
        );
        assert_eq!(d.start_token(), Some("[\"a\"]"));
        assert_eq!(d.end_token(), Some("[\"a\"]"));
        assert_eq!(d.code, "[\"a\", \"b\"]");
    }

    #[test]
    fn test_registration_normalises_remove_without_extra() {
        let d = MixinDescriptor::from_registration(
            None,
            "f",
            MixinType::RemoveBetween,
            "/*a*/",
            "/*b*/",
            None,
        );
        assert_eq!(d.start_token(), Some("/*a*/"));
        assert_eq!(d.end_token(), Some("/*b*/"));
        assert!(d.code.is_empty());
    }

    #[test]
    fn test_store_keeps_surfaces_apart_and_in_order() {
        let mut store = MixinStore::new();
        store.register_mixin(Surface::Main, None, "a", MixinType::Head, Accessors::none(), "1", None);
        store.register_mixin(Surface::Simulation, None, "a", MixinType::Head, Accessors::none(), "2", None);
        store.register_mixin(Surface::Main, None, "a", MixinType::Tail, Accessors::none(), "3", None);

        let main: Vec<_> = store.mixins(Surface::Main).iter().map(|d| d.code.as_str()).collect();
        assert_eq!(main, vec!["1", "3"]);
        assert_eq!(store.mixins(Surface::Simulation).len(), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = r#"{"scope":"HB.prototype","path":"submitLeaderboard","mixinType":"OVERRIDE","accessors":[],"code":"return;"}"#;
        let d: MixinDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.mixin_type, MixinType::Override);
        assert_eq!(d.accessors, Accessors::List(vec![]));
        assert!(d.code2.is_none());
    }
}
