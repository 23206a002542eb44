//! End-to-end behaviour of engine, orchestrator and generators together.

use backdrop_backgrounds::snapshot::write_png;
use backdrop_backgrounds::{Applied, Studio};
use backdrop_core::{
    BackendKind, BackgroundKind, ConfigChange, FixedProbe, Generator, ManualScheduler, Part,
    RenderConfig, RenderEngine, SurfaceHandle,
};
use backdrop_gradient::GradientGenerator;
use backdrop_neural::{NeuralGenerator, TransitionPhase};
use serde_json::json;

const SOFTWARE_ONLY: FixedProbe = FixedProbe {
    accelerated: false,
    software: true,
};

fn studio(width: u32, height: u32) -> Studio {
    Studio::with_probe(
        RenderConfig::default(),
        SurfaceHandle::offscreen(width, height),
        SOFTWARE_ONLY,
    )
    .unwrap()
}

#[test]
fn missing_accelerated_support_falls_back_to_software() {
    let config = RenderConfig {
        preferred_backend: Some(BackendKind::Accelerated),
        ..RenderConfig::default()
    };
    let mut engine = RenderEngine::with_probe(config, ManualScheduler::new(), SOFTWARE_ONLY).unwrap();
    engine.initialize(SurfaceHandle::offscreen(320, 180)).unwrap();
    assert_eq!(engine.mode(), Some(BackendKind::Software2d));
}

#[test]
fn no_usable_backend_is_an_error() {
    let probe = FixedProbe {
        accelerated: false,
        software: false,
    };
    let mut engine = RenderEngine::with_probe(RenderConfig::default(), ManualScheduler::new(), probe).unwrap();
    assert!(engine.initialize(SurfaceHandle::offscreen(320, 180)).is_err());
    assert_eq!(engine.mode(), None);
}

#[test]
fn gradient_color_list_change_keeps_primitive() {
    let mut g = GradientGenerator::from_json(&json!({
        "colors": ["#ff0000", "#00ff00", "#0000ff"],
        "angle": 135.0,
        "animated": false,
    }))
    .unwrap();
    let p = g.create();
    let change = g
        .update_config(&json!({"colors": ["#ff0000", "#00ff00", "#0000ff", "#ffffff"]}))
        .unwrap();
    assert_eq!(change, ConfigChange::InPlace);
    assert!(g.primitive().unwrap().ptr_eq(&p));
    assert!(g.drain_scene_events().is_empty());
}

#[test]
fn neural_node_count_change_through_the_frame_loop() {
    let mut s = studio(160, 90);
    s.apply(BackgroundKind::Neural, &json!({"nodeCount": 25}), true).unwrap();
    s.run_for(200.0, 8.0);
    let before = s.snapshot().unwrap();

    let applied = s
        .apply(BackgroundKind::Neural, &json!({"nodeCount": 35}), true)
        .unwrap();
    assert_eq!(applied, Applied::Reconfigured(ConfigChange::Structural));
    // Fade out, swap and fade in all fit inside two transition windows.
    s.run_for(1400.0, 8.0);
    let after = s.snapshot().unwrap();
    assert_eq!(s.active_kind(), Some(BackgroundKind::Neural));
    assert_ne!(before.data(), after.data());

    let mut direct = NeuralGenerator::from_json(&json!({"nodeCount": 25})).unwrap();
    let original = direct.create();
    let original_len = original.borrow().buffer_len();
    direct.update_config(&json!({"nodeCount": 35})).unwrap();
    while direct.transition() == TransitionPhase::FadingOut {
        let network = direct.network();
        assert_eq!(network.nodes.len(), 25);
        let before: Vec<f32> = network.nodes.iter().map(|n| n.opacity).collect();
        direct.update(16.0);
        if direct.transition() == TransitionPhase::FadingOut {
            let after = direct.network().nodes.iter().map(|n| n.opacity);
            assert!(after.zip(&before).all(|(a, b)| a <= *b));
        }
    }
    // Every node, packet and connection of the old network ended at zero.
    for part in &original.borrow().parts {
        match part {
            Part::Points(points) => assert!(points.colors.iter().all(|c| c.a == 0.0)),
            Part::Lines(lines) => assert!(lines.colors.iter().all(|c| c.a == 0.0)),
            Part::Quad(_) => {}
        }
    }
    direct.drain_scene_events();
    for _ in 0..100 {
        direct.update(16.0);
    }
    assert_eq!(direct.transition(), TransitionPhase::Idle);
    assert_eq!(direct.network().nodes.len(), 35);
    assert_ne!(direct.primitive().unwrap().borrow().buffer_len(), original_len);
}

#[test]
fn resize_twice_is_idempotent() {
    let mut s = studio(320, 180);
    s.apply(BackgroundKind::Image, &json!({}), true).unwrap();
    s.resize(640, 480);
    let backend = s.engine().backend().unwrap();
    let (surface, camera) = (backend.surface(), backend.camera());
    s.resize(640, 480);
    let backend = s.engine().backend().unwrap();
    assert_eq!(backend.surface(), surface);
    assert_eq!(backend.camera(), camera);
    assert_eq!(surface.map(|s| (s.width(), s.height())), Some((640, 480)));
}

#[test]
fn swapping_kinds_leaves_one_primitive() {
    let mut s = studio(64, 36);
    for kind in BackgroundKind::all() {
        s.apply(*kind, &json!({}), true).unwrap();
        s.run_for(50.0, 16.0);
    }
    assert_eq!(s.active_kind(), Some(BackgroundKind::Image));
    assert_eq!(s.stats().draw_calls, 1);
}

#[test]
fn hidden_background_draws_only_clear_color() {
    let mut s = studio(32, 18);
    s.apply(BackgroundKind::Solid, &json!({"color": "#ff0000"}), false).unwrap();
    s.run_for(100.0, 16.0);
    let frame = s.snapshot().unwrap();
    assert_ne!(frame.pixel(5, 5), Some([255, 0, 0, 255]));
    s.apply(BackgroundKind::Solid, &serde_json::Value::Null, true).unwrap();
    s.run_for(100.0, 16.0);
    assert_eq!(s.snapshot().unwrap().pixel(5, 5), Some([255, 0, 0, 255]));
}

#[test]
fn snapshot_writes_png() {
    let mut s = studio(48, 27);
    s.apply(BackgroundKind::Waves, &json!({}), true).unwrap();
    s.run_for(500.0, 16.0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waves.png");
    write_png(&s.snapshot().unwrap(), &path).unwrap();
    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (48, 27));
}

#[test]
fn dispose_is_safe_to_repeat_and_follow() {
    let mut s = studio(64, 36);
    s.apply(BackgroundKind::Gradient, &json!({}), true).unwrap();
    s.run_for(100.0, 16.0);
    s.dispose();
    s.dispose();
    s.resize(100, 100);
    s.run_for(100.0, 16.0);
    assert_eq!(s.mode(), None);
}
