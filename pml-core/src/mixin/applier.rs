//! Patch Applier
//!
//! Rewrites a surface's source text with every descriptor registered for it.
//!
//! # Semantics
//!
//! | Type             | Action                                                      |
//! |------------------|-------------------------------------------------------------|
//! | `HEAD`           | insert `code` right after the body's opening brace          |
//! | `TAIL`           | insert `code` right before the body's closing brace         |
//! | `OVERRIDE`       | replace everything between the body braces with `code`      |
//! | `INSERT`         | insert `code` after the first occurrence of the token       |
//! | `REPLACEBETWEEN` | replace the inclusive span from start to end token          |
//! | `REMOVEBETWEEN`  | delete the inclusive span from start to end token           |
//! | `CLASS*`         | as above, at every occurrence inside the region             |
//!
//! Token search is a case-sensitive substring match, leftmost first.
//! Descriptors apply in registration order, each one against the text the
//! previous ones produced. Nothing is deduplicated: registering the same
//! descriptor twice injects its code twice.
//!
//! # Misses
//!
//! A missing anchor or token is not an error. The descriptor is skipped, the
//! miss is logged and recorded in the [`PatchReport`]. The same holds when the
//! text stops parsing: every later anchor lookup reports
//! [`PatchStatus::Unparsable`].

use super::anchor::{self, Region};
use super::{MixinDescriptor, MixinStore, MixinType, Surface};

/// Result of applying one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStatus {
    /// Code was spliced in at `sites` places.
    Applied { sites: usize },
    /// The function, method or class named by the descriptor was not found.
    AnchorNotFound,
    /// The region exists but the token does not occur in it.
    TokenNotFound(String),
    /// A body-targeting type was aimed at a region without a body.
    NoBody,
    /// The text no longer parses, typically because an earlier descriptor
    /// spliced in invalid code.
    Unparsable(String),
}

impl PatchStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Per-descriptor record of a patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Position of the descriptor in its surface's registration order.
    pub index: usize,
    pub anchor: String,
    pub mixin_type: MixinType,
    pub status: PatchStatus,
}

/// Outcomes of a patch run, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub outcomes: Vec<PatchOutcome>,
}

impl PatchReport {
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_applied()).count()
    }

    pub fn misses(&self) -> impl Iterator<Item = &PatchOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_applied())
    }
}

/// Mutated text for one surface plus the report that produced it.
#[derive(Debug, Clone)]
pub struct PatchOutput {
    pub surface: Surface,
    pub text: String,
    pub report: PatchReport,
}

/// Applies mixin descriptors to host source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchApplier;

impl PatchApplier {
    pub fn new() -> Self {
        Self
    }

    /// Apply every descriptor registered for `surface` to `source`.
    pub fn apply(&self, store: &MixinStore, surface: Surface, source: &str) -> PatchOutput {
        let mut text = source.to_string();
        let mut report = PatchReport::default();

        for (index, descriptor) in store.mixins(surface).iter().enumerate() {
            let status = self.apply_descriptor(&mut text, descriptor);
            match &status {
                PatchStatus::Applied { sites } => log::debug!(
                    "[{}] {} {} applied at {} site(s)",
                    surface,
                    descriptor.mixin_type,
                    descriptor.anchor_name(),
                    sites
                ),
                miss => log::warn!(
                    "[{}] {} {} not applied: {:?}",
                    surface,
                    descriptor.mixin_type,
                    descriptor.anchor_name(),
                    miss
                ),
            }
            report.outcomes.push(PatchOutcome {
                index,
                anchor: descriptor.anchor_name(),
                mixin_type: descriptor.mixin_type,
                status,
            });
        }

        PatchOutput {
            surface,
            text,
            report,
        }
    }

    /// Apply a single descriptor to `text` in place.
    pub fn apply_descriptor(&self, text: &mut String, descriptor: &MixinDescriptor) -> PatchStatus {
        let region = match anchor::locate(text, descriptor) {
            Ok(Some(region)) => region,
            Ok(None) => return PatchStatus::AnchorNotFound,
            Err(failure) => return PatchStatus::Unparsable(failure.0),
        };

        match descriptor.mixin_type {
            MixinType::Head | MixinType::Tail | MixinType::Override => {
                apply_to_body(text, region, descriptor)
            }
            MixinType::Insert | MixinType::ClassInsert => apply_insert(text, region, descriptor),
            MixinType::ReplaceBetween
            | MixinType::RemoveBetween
            | MixinType::ClassReplace
            | MixinType::ClassRemove => apply_between(text, region, descriptor),
        }
    }
}

/// Text injected by a body-targeting descriptor.
///
/// With declared accessors the code is a callable that receives them;
/// otherwise it is spliced as written.
pub fn render_body_code(descriptor: &MixinDescriptor) -> String {
    let accessors = descriptor.accessors.expressions();
    if accessors.is_empty() {
        descriptor.code.clone()
    } else {
        format!("({}).call(this, {});", descriptor.code, accessors.join(", "))
    }
}

fn apply_to_body(text: &mut String, region: Region, descriptor: &MixinDescriptor) -> PatchStatus {
    let Some((open, close)) = region.body else {
        return PatchStatus::NoBody;
    };
    let code = render_body_code(descriptor);
    match descriptor.mixin_type {
        MixinType::Head => text.insert_str(open + 1, &code),
        MixinType::Tail => text.insert_str(close, &code),
        _ => text.replace_range(open + 1..close, &code),
    }
    PatchStatus::Applied { sites: 1 }
}

fn apply_insert(text: &mut String, region: Region, descriptor: &MixinDescriptor) -> PatchStatus {
    let Some(token) = descriptor.start_token().filter(|t| !t.is_empty()) else {
        return PatchStatus::TokenNotFound(String::new());
    };
    let repeat = descriptor.mixin_type.is_class_wide();
    let mut cursor = region.start;
    let mut end = region.end;
    let mut sites = 0;

    while let Some(found) = text[cursor..end].find(token) {
        let at = cursor + found + token.len();
        text.insert_str(at, &descriptor.code);
        sites += 1;
        cursor = at + descriptor.code.len();
        end += descriptor.code.len();
        if !repeat {
            break;
        }
    }

    if sites == 0 {
        PatchStatus::TokenNotFound(token.to_string())
    } else {
        PatchStatus::Applied { sites }
    }
}

fn apply_between(text: &mut String, region: Region, descriptor: &MixinDescriptor) -> PatchStatus {
    let (Some(start_token), Some(end_token)) = (descriptor.start_token(), descriptor.end_token())
    else {
        return PatchStatus::TokenNotFound(String::new());
    };
    if start_token.is_empty() || end_token.is_empty() {
        return PatchStatus::TokenNotFound(String::new());
    }
    let replacement = if descriptor.mixin_type.removes() {
        ""
    } else {
        descriptor.code.as_str()
    };
    let repeat = descriptor.mixin_type.is_class_wide();
    let mut cursor = region.start;
    let mut end = region.end;
    let mut sites = 0;

    while let Some(found) = text[cursor..end].find(start_token) {
        let span_start = cursor + found;
        let search_from = if end_token == start_token {
            span_start
        } else {
            span_start + start_token.len()
        };
        let Some(found_end) = text[search_from..end].find(end_token) else {
            if sites == 0 {
                return PatchStatus::TokenNotFound(end_token.to_string());
            }
            break;
        };
        let span_end = search_from + found_end + end_token.len();
        text.replace_range(span_start..span_end, replacement);
        sites += 1;
        cursor = span_start + replacement.len();
        end = end + replacement.len() - (span_end - span_start);
        if !repeat {
            break;
        }
    }

    if sites == 0 {
        PatchStatus::TokenNotFound(start_token.to_string())
    } else {
        PatchStatus::Applied { sites }
    }
}
