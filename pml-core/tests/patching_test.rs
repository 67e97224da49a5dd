//! Integration tests for mixin registration, extension finalization and patching

mod common;

use common::Harness;
use pml_core::config::HostProfile;
use pml_core::extensions::volume::rasterize;
use pml_core::mods::api::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MAIN_BUNDLE: &str = r#"var KA;!function(e){e[e.Summer = 0] = "Summer"}(KA || (KA = {}));
class HB{submitLeaderboard(e){post(e)}}
function foo(){a()}"#;

fn context() -> ModContext {
    ModContext::new(HostProfile::default())
}

fn block(id: &str, volume: Vec<[[i32; 3]; 2]>) -> BlockSpec {
    BlockSpec {
        id: id.to_string(),
        category: "Desert".to_string(),
        checksum: "0".repeat(64),
        scene: "scene".to_string(),
        model: "https://example.com/models/desert.glb".to_string(),
        volume,
        ignore_on_export: false,
        special: None,
    }
}

fn add_desert(ctx: &mut ModContext) -> anyhow::Result<()> {
    ctx.register_category("Desert", "Start");
    Ok(())
}

#[test]
fn test_head_inserts_once_per_registration() {
    let mut ctx = context();
    ctx.register_func_mixin("foo", MixinType::Head, Accessors::none(), "X", None);
    let out = ctx.patch(Surface::Main, "function foo(){a()}");
    assert_eq!(out.text, "function foo(){Xa()}");
    assert_eq!(out.report.applied_count(), 1);

    ctx.register_func_mixin("foo", MixinType::Head, Accessors::none(), "X", None);
    let out = ctx.patch(Surface::Main, "function foo(){a()}");
    assert_eq!(out.text, "function foo(){XXa()}");
}

#[test]
fn test_mixins_for_other_surface_are_ignored() {
    let mut ctx = context();
    ctx.register_sim_worker_func_mixin("foo", MixinType::Tail, Accessors::none(), "Y;", None);

    let sim = ctx.patch(Surface::Simulation, "function foo(){a()}");
    assert_eq!(sim.text, "function foo(){a()Y;}");

    let main = ctx.patch(Surface::Main, "function foo(){a()}");
    assert_eq!(main.text, "function foo(){a()}");
}

#[test]
fn test_sim_mixins_disable_leaderboard_once() {
    let mut ctx = context();
    ctx.register_sim_worker_func_mixin("foo", MixinType::Head, Accessors::none(), "A", None);
    ctx.register_sim_worker_class_mixin("GN.prototype", "tick", MixinType::Head, Accessors::none(), "B", None);

    assert_eq!(ctx.main_mixins().len(), 1);
    assert_eq!(ctx.sim_worker_mixins().len(), 2);

    let out = ctx.patch(Surface::Main, MAIN_BUNDLE);
    assert!(out.text.contains("class HB{submitLeaderboard(e){(e, t, n, i, r, a) => {}}}"));
    assert!(!out.text.contains("post(e)"));
}

#[test]
fn test_missed_anchor_is_reported_not_fatal() {
    let mut ctx = context();
    ctx.register_func_mixin("missing", MixinType::Head, Accessors::none(), "X", None);
    ctx.register_func_mixin("foo", MixinType::Tail, Accessors::none(), "Z", None);

    let out = ctx.patch(Surface::Main, MAIN_BUNDLE);

    assert!(out.text.contains("function foo(){a()Z}"));
    let misses: Vec<_> = out.report.misses().collect();
    assert_eq!(misses.len(), 1);
    assert_eq!(misses[0].status, PatchStatus::AnchorNotFound);
}

#[test]
fn test_regex_literals_do_not_move_anchors() {
    let mut ctx = context();
    ctx.register_func_mixin("foo", MixinType::Tail, Accessors::none(), ";Z();", None);

    let out = ctx.patch(
        Surface::Main,
        "function foo(){if(x)return/[{]/.test(s);return 1}function bar(){b()}",
    );
    assert_eq!(
        out.text,
        "function foo(){if(x)return/[{]/.test(s);return 1;Z();}function bar(){b()}"
    );
    assert_eq!(out.report.applied_count(), 1);

    let out = ctx.patch(Surface::Main, "function foo(){return/}/.test(s)}");
    assert_eq!(out.text, "function foo(){return/}/.test(s);Z();}");
}

#[test]
fn test_overlapping_block_volume_is_rejected() {
    let mut ctx = context();
    let err = ctx
        .register_block(block("Bad", vec![[[0, 0, 0], [1, 0, 0]], [[1, 0, 0], [2, 0, 0]]]))
        .unwrap_err();
    assert!(matches!(err, PmlError::OverlappingVolume { x: 1, y: 0, z: 0 }));

    let n = ctx
        .register_block(block("Good", vec![[[0, 0, 0], [1, 1, 1]], [[2, 0, 0], [2, 0, 0]]]))
        .unwrap();
    assert_eq!(n, 156);
    assert_eq!(ctx.block_number("Good").unwrap(), 156);
    assert!(ctx.block_number("Bad").is_err());
}

#[test]
fn test_disjoint_volume_cell_count() {
    let cells = rasterize(&[[[0, 0, 0], [1, 1, 1]], [[2, 0, 0], [2, 0, 0]]]).unwrap();
    assert_eq!(cells.len(), 9);
    assert_eq!(cells[8], [2, 0, 0]);
}

#[test]
fn test_setting_and_keybind_ids() {
    let mut ctx = context();
    ctx.register_setting_category("Tools");
    let first = ctx.register_setting("Show grid", "ShowGrid", SettingType::Bool, "true", None);
    let second = ctx.register_setting("Grid size", "GridSize", SettingType::Slider, "0.5", None);
    assert_eq!((first, second), (19, 20));
    assert_eq!(ctx.setting_id("GridSize").unwrap(), 20);
    assert!(matches!(ctx.setting_id("Nope"), Err(PmlError::UnknownExtension(_))));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    ctx.register_bind_category("Tools");
    let bind = ctx.register_keybind(
        "Reset grid",
        "ResetGrid",
        "keydown",
        "KeyG",
        None,
        Box::new(move |_: &KeyEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert_eq!(bind, 31);

    let press = KeyEvent {
        event: "keydown".to_string(),
        code: "KeyG".to_string(),
    };
    assert_eq!(ctx.dispatch_keybind(&press, |id| id == bind), 1);
    assert_eq!(ctx.dispatch_keybind(&press, |_| false), 0);
    let release = KeyEvent {
        event: "keyup".to_string(),
        code: "KeyG".to_string(),
    };
    assert_eq!(ctx.dispatch_keybind(&release, |_| true), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_finalized_category_patches_bundle() {
    let mut h = Harness::new();
    h.add("desert", "1.0.0", &[]).plugin.on_init = Some(add_desert);

    let mut loader = h.imported().await;
    let report = loader.init_mods();
    assert_eq!(report.initialized, vec!["desert"]);

    let out = loader.patch(Surface::Main, MAIN_BUNDLE);
    assert!(out
        .text
        .contains("(KA || (KA = {})), KA[KA.Desert = 9]  =  \"Desert\";"));
    assert!(out.text.contains("function foo(){a()}"));
    assert!(!out.report.outcomes.is_empty());
}

#[tokio::test]
async fn test_mods_register_after_init_only() {
    let mut h = Harness::new();
    h.add("desert", "1.0.0", &[]).plugin.on_init = Some(add_desert);

    let loader = h.imported().await;
    let out = loader.patch(Surface::Main, MAIN_BUNDLE);

    assert_eq!(out.text, MAIN_BUNDLE);
    assert!(loader.context().extension_table().is_empty());
}
