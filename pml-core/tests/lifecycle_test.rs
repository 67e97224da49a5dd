//! Integration tests for discovery and dependency-ordered initialization

mod common;

use common::{base_url, Harness};
use pml_core::extensions::ExtensionKind;
use pml_core::mods::api::*;

fn register_categories(ctx: &mut ModContext) -> anyhow::Result<()> {
    ctx.register_category("Desert", "Start");
    ctx.register_category("Canyon", "Start");
    Ok(())
}

fn register_more_categories(ctx: &mut ModContext) -> anyhow::Result<()> {
    ctx.register_category("Arctic", "Start");
    Ok(())
}

#[tokio::test]
async fn test_dependency_initializes_first() {
    let mut h = Harness::new();
    h.add("b", "1.0.0", &[("a", "1.0.0")]);
    h.add("a", "1.0.0", &[]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert_eq!(report.initialized, vec!["a", "b"]);
    assert!(report.dropped.is_empty());
    assert_eq!(h.events(), vec!["init:a", "init:b"]);
    assert!(loader.get_mod("b").unwrap().initialized);
    assert!(h.alerts().is_empty());
}

#[tokio::test]
async fn test_missing_and_unloaded_dependencies_alert_differently() {
    let mut h = Harness::new();
    h.add("off", "1.0.0", &[]).loaded = false;
    h.add("needs_ghost", "1.0.0", &[("ghost", "1.0.0")]);
    h.add("needs_off", "1.0.0", &[("off", "1.0.0")]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert!(report.initialized.is_empty());
    assert_eq!(report.dropped, vec!["needs_ghost", "needs_off"]);
    let alerts = h.alerts();
    assert!(matches!(
        &alerts[0],
        Alert::MissingDependency { dependency, .. } if dependency == "ghost"
    ));
    assert!(matches!(
        &alerts[1],
        Alert::DependencyNotLoaded { dependency, .. } if dependency == "off"
    ));
    assert_ne!(alerts[0].to_string(), alerts[1].to_string());
}

#[tokio::test]
async fn test_version_mismatch_drops_dependent() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]);
    h.add("b", "1.0.0", &[("a", "2.0.0")]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert_eq!(report.initialized, vec!["a"]);
    assert_eq!(report.dropped, vec!["b"]);
    assert_eq!(
        h.alerts(),
        vec![Alert::DependencyVersionMismatch {
            name: "b mod".to_string(),
            dependency: "a mod".to_string(),
            needed: "2.0.0".to_string(),
            present: "1.0.0".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_dependency_chain_defers_until_ready() {
    let mut h = Harness::new();
    h.add("c", "1.0.0", &[("b", "1.0.0")]);
    h.add("b", "1.0.0", &[("a", "1.0.0")]);
    h.add("a", "1.0.0", &[]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert_eq!(report.initialized, vec!["a", "b", "c"]);
    assert!(h.alerts().is_empty());
}

#[tokio::test]
async fn test_circular_dependency_terminates() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[("b", "1.0.0")]);
    h.add("b", "1.0.0", &[("a", "1.0.0")]);
    h.add("c", "1.0.0", &[]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert_eq!(report.initialized, vec!["c"]);
    assert_eq!(report.dropped, vec!["a", "b"]);
    let alerts = h.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts
        .iter()
        .all(|a| matches!(a, Alert::CircularDependency { .. })));
    assert_eq!(h.events(), vec!["init:c"]);
}

#[tokio::test]
async fn test_self_dependency_terminates() {
    let mut h = Harness::new();
    h.add("narcissus", "1.0.0", &[("narcissus", "1.0.0")]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert_eq!(report.dropped, vec!["narcissus"]);
    assert!(matches!(h.alerts()[0], Alert::CircularDependency { .. }));
}

#[tokio::test]
async fn test_failed_init_unloads_and_persists() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]).plugin.fail_init = true;
    h.add("b", "1.0.0", &[("a", "1.0.0")]);

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert!(report.initialized.is_empty());
    assert_eq!(report.dropped, vec!["a", "b"]);
    assert!(matches!(h.alerts()[0], Alert::InitFailed { .. }));
    assert!(h.alerts()[1].is_dependency());

    let a = loader.get_mod("a").unwrap();
    assert!(!a.loaded);
    assert!(!a.initialized);
    let stored = &loader.registry().list()[0];
    assert_eq!(stored.base, base_url("a"));
    assert!(!stored.loaded);
}

#[tokio::test]
async fn test_post_init_failure_unloads() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]).plugin.fail_post_init = true;
    h.add("b", "1.0.0", &[]);

    let mut loader = h.imported().await;
    loader.init_mods();
    loader.post_init_mods();
    loader.sim_init_mods().unwrap();

    assert_eq!(
        h.events(),
        vec!["init:a", "init:b", "post:a", "post:b", "sim:b"]
    );
    assert_eq!(h.alerts(), vec![Alert::PostInitFailed { name: "a mod".to_string() }]);
    assert!(!loader.registry().list()[0].loaded);
}

#[tokio::test]
async fn test_second_init_is_ignored() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]).plugin.on_init = Some(register_more_categories);

    let mut loader = h.imported().await;
    loader.init_mods();
    let registered = loader.context().main_mixins().len();

    assert_eq!(loader.init_mods(), InitReport::default());
    assert_eq!(h.events(), vec!["init:a"]);
    assert_eq!(loader.context().main_mixins().len(), registered);
    assert_eq!(loader.context().extension_table().len(), 1);
}

#[tokio::test]
async fn test_nothing_loaded_skips_init() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]).loaded = false;

    let mut loader = h.imported().await;
    let report = loader.init_mods();

    assert_eq!(report, InitReport::default());
    assert!(h.events().is_empty());
    assert_eq!(loader.all_mods().len(), 1);
}

#[tokio::test]
async fn test_physics_mod_invalidates_leaderboard() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]);
    let plain = h.imported().await;
    assert!(!plain.leaderboard_invalid());

    let mut h = Harness::new();
    h.add("gravity", "1.0.0", &[]).plugin.physics = true;
    let loader = h.imported().await;
    assert!(loader.leaderboard_invalid());
}

#[tokio::test]
async fn test_unloaded_physics_mod_keeps_leaderboard() {
    let mut h = Harness::new();
    let gravity = h.add("gravity", "1.0.0", &[]);
    gravity.plugin.physics = true;
    gravity.loaded = false;

    let loader = h.imported().await;
    assert!(!loader.leaderboard_invalid());
}

#[tokio::test]
async fn test_category_ids_increase_across_mods() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]).plugin.on_init = Some(register_categories);
    h.add("b", "1.0.0", &[]).plugin.on_init = Some(register_more_categories);

    let mut loader = h.imported().await;
    loader.init_mods();

    let table = loader.context().extension_table();
    assert_eq!(table.value_of(ExtensionKind::Category, "Desert"), Some(9));
    assert_eq!(table.value_of(ExtensionKind::Category, "Canyon"), Some(10));
    assert_eq!(table.value_of(ExtensionKind::Category, "Arctic"), Some(11));
}

#[tokio::test]
async fn test_latest_reference_resolves_and_stays_latest() {
    let mut h = Harness::new();
    h.add("a", "1.4.2", &[]).stored_version = "latest".to_string();

    let mut loader = h.imported().await;
    let a = loader.get_mod("a").unwrap();
    assert_eq!(a.version, "1.4.2");
    assert!(a.saved_latest);
    assert_eq!(a.version_url(), format!("{}/1.4.2", base_url("a")));

    loader.set_mod_loaded("a", false).unwrap();
    assert_eq!(loader.registry().list()[0].version, "latest");
}

#[tokio::test]
async fn test_unreachable_manifest_is_skipped() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]).version = "9.9.9".to_string();
    h.add("b", "1.0.0", &[]);

    let loader = h.imported().await;

    assert!(loader.get_mod("a").is_none());
    assert!(loader.get_mod("b").is_some());
    assert!(matches!(h.alerts()[0], Alert::ManifestUnavailable { .. }));
}

#[tokio::test]
async fn test_duplicate_reference_is_skipped() {
    let mut h = Harness::new();
    h.add("a", "1.0.0", &[]);
    h.add("a", "1.0.0", &[]);

    let loader = h.imported().await;

    assert_eq!(loader.all_mods().len(), 1);
    assert_eq!(
        h.alerts(),
        vec![Alert::DuplicateMod { name: "a mod".to_string() }]
    );
}
