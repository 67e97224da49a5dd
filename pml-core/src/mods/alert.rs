//! User-facing alerts.
//!
//! Every failure the user should know about is raised as an [`Alert`]. The
//! loader logs it and hands it to a [`Notifier`], which is whatever the
//! embedding application uses to block and show a message.

use std::fmt;
use std::sync::Mutex;

/// A user-visible failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    LatestLookupFailed { base: String },
    ManifestUnavailable { url: String },
    ImportFailed { name: String },
    DuplicateMod { name: String },
    AlreadyPresent { id: String },
    IncompatibleTarget { name: String, version: String, targets: String, host: String },
    MissingDependency { name: String, dependency: String, version: String },
    DependencyNotLoaded { name: String, dependency: String, version: String },
    DependencyVersionMismatch { name: String, dependency: String, needed: String, present: String },
    DependencyFailed { name: String, dependency: String },
    CircularDependency { name: String },
    InitFailed { name: String },
    PostInitFailed { name: String },
}

impl Alert {
    /// Whether the alert is about an unsatisfied dependency.
    pub fn is_dependency(&self) -> bool {
        matches!(
            self,
            Self::MissingDependency { .. }
                | Self::DependencyNotLoaded { .. }
                | Self::DependencyVersionMismatch { .. }
                | Self::DependencyFailed { .. }
                | Self::CircularDependency { .. }
        )
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestLookupFailed { base } => {
                write!(f, "Couldn't find latest version for {}", base)
            }
            Self::ManifestUnavailable { url } => write!(f, "Couldn't load mod with URL {}.", url),
            Self::ImportFailed { name } => write!(f, "Mod {} failed to load.", name),
            Self::DuplicateMod { name } => write!(f, "Duplicate mod detected: {}", name),
            Self::AlreadyPresent { id } => write!(f, "Mod {} is already present!", id),
            Self::IncompatibleTarget { name, version, targets, host } => write!(
                f,
                "Mod target version does not match polytrack version! Note: {} version {} targets polytrack versions {}, but current polytrack version is {}.",
                name, version, targets, host
            ),
            Self::MissingDependency { name, dependency, version } => write!(
                f,
                "Mod {} is missing mod {} {} and will not be initialized.",
                name, dependency, version
            ),
            Self::DependencyNotLoaded { name, dependency, version } => write!(
                f,
                "Mod {} depends on mod {} {} but the dependency isn't loaded. Mod will not be initialized.",
                name, dependency, version
            ),
            Self::DependencyVersionMismatch { name, dependency, needed, present } => write!(
                f,
                "Mod {} needs version {} of {} but {} is present.",
                name, needed, dependency, present
            ),
            Self::DependencyFailed { name, dependency } => write!(
                f,
                "Mod {} depends on mod {} which failed to initialize. Mod will not be initialized.",
                name, dependency
            ),
            Self::CircularDependency { name } => write!(
                f,
                "Mod {} is part of a circular dependency and will not be initialized.",
                name
            ),
            Self::InitFailed { name } => {
                write!(f, "Mod {} failed to initialize and will be unloaded.", name)
            }
            Self::PostInitFailed { name } => {
                write!(f, "Mod {} failed to post initialize and will be unloaded.", name)
            }
        }
    }
}

/// Shows alerts to the user.
pub trait Notifier: Send + Sync {
    fn alert(&self, alert: &Alert);
}

/// Notifier for headless use: the log entry is the only channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, _alert: &Alert) {}
}

/// Notifier that keeps every alert for later inspection.
#[derive(Debug, Default)]
pub struct AlertLog {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Notifier for AlertLog {
    fn alert(&self, alert: &Alert) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert.clone());
        }
    }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn alert(&self, alert: &Alert) {
        (**self).alert(alert)
    }
}
