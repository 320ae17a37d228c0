//! Configuration files and route-to-view wiring

use pose_overlay::{
    config::{Config, EXAMPLE_CONFIG},
    inference::ModelSelector,
    loop_driver::Pacing,
    overlay::OverlayKind,
    render::RendererKind,
    routes::Route,
    view::SourceKind,
    Error,
};
use std::time::Duration;

#[test]
fn test_config_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("pose_overlay_config_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.yaml");

    let mut config = Config::default();
    config.overlay.eyewear_padding = 32.0;
    config.display.poll_interval_ms = 250;
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.overlay.eyewear_padding, 32.0);
    assert_eq!(loaded.display.poll_interval_ms, 250);
    loaded.validate().unwrap();

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_config_file() {
    assert!(matches!(Config::from_file("does/not/exist.yaml"), Err(Error::IoError(_))));
}

#[test]
fn test_config_values_reach_views() {
    let mut config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
    config.overlay.confidence_threshold = 0.6;
    config.overlay.eyewear_padding = 20.0;
    config.display.poll_interval_ms = 40;

    let dress = Route::Dress.view_spec(&config).unwrap();
    assert_eq!(dress.pacing, Pacing::Interval(Duration::from_millis(40)));
    assert!(dress
        .overlays
        .iter()
        .any(|kind| matches!(kind, OverlayKind::Garment { threshold, .. } if *threshold == 0.6)));

    let eyewear = Route::Eyewear.view_spec(&config).unwrap();
    assert!(matches!(
        eyewear.overlays.as_slice(),
        [OverlayKind::Eyewear2d { padding, .. }] if *padding == 20.0
    ));
}

#[test]
fn test_every_camera_route_has_a_model() {
    let config = Config::default();
    for route in Route::ALL {
        let Some(spec) = route.view_spec(&config) else {
            assert_eq!(route, Route::Welcome);
            continue;
        };
        match spec.source {
            SourceKind::Camera => assert!(spec.model.is_some(), "{route}"),
            SourceKind::Blank { .. } => assert!(spec.model.is_none(), "{route}"),
        }
        assert!(!spec.overlays.is_empty(), "{route}");
    }
}

#[test]
fn test_three_d_routes_use_scene_renderer() {
    let config = Config::default();
    for route in [Route::Load, Route::Posenet, Route::BodyDetection] {
        let spec = route.view_spec(&config).unwrap();
        assert!(matches!(spec.renderer, RendererKind::Scene { .. }), "{route}");
    }
    let posenet = Route::Posenet.view_spec(&config).unwrap();
    assert_eq!(posenet.model, Some(ModelSelector::MoveNetLightning));
    assert_eq!(posenet.pacing, Pacing::Refresh { fps: 60 });
}

#[test]
fn test_pose_detection_markers_use_marker_threshold() {
    let spec = Route::PoseDetection.view_spec(&Config::default()).unwrap();
    assert_eq!(spec.overlays, vec![OverlayKind::KeypointMarkers { threshold: 0.3 }]);
}
