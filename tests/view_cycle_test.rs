//! Detection view cycle behaviour with scripted sources, models and renderers


use opencv::{core::Vec3b, prelude::*};
use pose_overlay::{
    asset::AssetStore,
    camera::{FrameSource, VideoSource},
    config::Config,
    inference::{Detection, InferenceAdapter},
    keypoint::Pose,
    loop_driver::{LoopControl, LoopDriver, Pacing},
    overlay::{Overlay, OverlayKind},
    render::CanvasRenderer,
    routes::Route,
    view::{CycleOutcome, DetectionView},
};
use std::time::Duration;
use test_helpers::{create_test_image, standing_pose, Read, RecordingRenderer, ScriptedModel, ScriptedSource};

const MARKERS: OverlayKind = OverlayKind::KeypointMarkers { threshold: 0.3 };

fn view_with(
    source: Option<ScriptedSource>,
    model: Option<ScriptedModel>,
    renderer: RecordingRenderer,
) -> DetectionView {
    DetectionView::new(
        "test",
        source.map(|s| Box::new(s) as Box<dyn FrameSource>),
        model.map(|m| Box::new(m) as Box<dyn InferenceAdapter>),
        vec![MARKERS],
        Box::new(renderer),
        AssetStore::default(),
        Pacing::Refresh { fps: 1000 },
    )
}

#[test]
fn test_idle_without_source() {
    let renderer = RecordingRenderer::default();
    let calls = renderer.calls.clone();
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.9)]));
    let model_calls = model.calls.clone();
    let mut view = view_with(None, Some(model), renderer);

    assert!(matches!(view.cycle(), CycleOutcome::Idle));
    assert!(matches!(view.cycle(), CycleOutcome::Idle));
    assert_eq!(*model_calls.borrow(), 0);
    assert!(calls.borrow().is_empty());
    assert_eq!(view.stats().idle, 2);
}

#[test]
fn test_not_ready_frame_is_skipped_without_inference() {
    let source = ScriptedSource::new(vec![Read::NotReady], false);
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.9)]));
    let model_calls = model.calls.clone();
    let mut view = view_with(Some(source), Some(model), RecordingRenderer::default());

    assert!(matches!(view.cycle(), CycleOutcome::NotReady));
    assert_eq!(*model_calls.borrow(), 0);
    assert!(matches!(view.cycle(), CycleOutcome::Rendered { .. }));
    assert_eq!(*model_calls.borrow(), 1);
}

#[test]
fn test_inference_failure_skips_the_cycle() {
    let model = ScriptedModel::new(
        vec![Err("backend lost".to_string())],
        Detection::Poses(vec![standing_pose(0.9)]),
    );
    let renderer = RecordingRenderer::default();
    let calls = renderer.calls.clone();
    let mut view = view_with(Some(ScriptedSource::endless()), Some(model), renderer);

    assert!(matches!(view.cycle(), CycleOutcome::Skipped));
    assert!(calls.borrow().is_empty());

    // The next frame is processed normally
    assert!(matches!(view.cycle(), CycleOutcome::Rendered { overlays: 17, .. }));
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(view.stats().skipped, 1);
    assert_eq!(view.stats().rendered, 1);
}

#[test]
fn test_capture_failure_skips_the_cycle() {
    let source = ScriptedSource::new(vec![Read::Fail], false);
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.9)]));
    let model_calls = model.calls.clone();
    let mut view = view_with(Some(source), Some(model), RecordingRenderer::default());

    assert!(matches!(view.cycle(), CycleOutcome::Skipped));
    assert_eq!(*model_calls.borrow(), 0);
}

#[test]
fn test_render_failure_skips_the_cycle() {
    let renderer = RecordingRenderer {
        fail: true,
        ..RecordingRenderer::default()
    };
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.9)]));
    let mut view = view_with(Some(ScriptedSource::endless()), Some(model), renderer);

    assert!(matches!(view.cycle(), CycleOutcome::Skipped));
    assert_eq!(view.stats().rendered, 0);
}

#[test]
fn test_canvas_is_fresh_every_cycle() {
    // The recording renderer paints the canvas white; each new cycle must
    // start from the black source frame again
    let renderer = RecordingRenderer::default();
    let calls = renderer.calls.clone();
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.9)]));
    let mut view = view_with(Some(ScriptedSource::endless()), Some(model), renderer);

    for _ in 0..3 {
        let CycleOutcome::Rendered { canvas, .. } = view.cycle() else {
            panic!("expected a rendered frame");
        };
        let sum: f64 = opencv::core::sum_elems(&canvas).unwrap().0.iter().sum();
        assert!(sum > 0.0);
    }
    assert!(calls.borrow().iter().all(|call| call.canvas_sum == 0.0));
}

#[test]
fn test_low_scores_produce_no_draw_calls() {
    let renderer = RecordingRenderer::default();
    let calls = renderer.calls.clone();
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.3)]));
    let mut view = view_with(Some(ScriptedSource::endless()), Some(model), renderer);

    assert!(matches!(view.cycle(), CycleOutcome::Rendered { overlays: 0, .. }));
    assert!(calls.borrow()[0].overlays.is_empty());
}

#[test]
fn test_markers_follow_detection() {
    let renderer = RecordingRenderer::default();
    let calls = renderer.calls.clone();
    let mut pose = standing_pose(0.9);
    pose.keypoints[0].score = 0.1;
    let model = ScriptedModel::new(vec![Ok(Detection::Poses(vec![pose]))], Detection::Poses(Vec::new()));
    let mut view = view_with(Some(ScriptedSource::endless()), Some(model), renderer);

    view.cycle();
    view.cycle();

    let calls = calls.borrow();
    assert_eq!(calls[0].overlays.len(), 16);
    assert!(calls[0]
        .overlays
        .iter()
        .all(|overlay| matches!(overlay, Overlay::Marker { radius: 5, .. })));
    // No pose in the second detection: nothing from the first survives
    assert!(calls[1].overlays.is_empty());
}

#[test]
fn test_view_without_model_renders_plain_frames() {
    let renderer = RecordingRenderer::default();
    let calls = renderer.calls.clone();
    let mut view = view_with(Some(ScriptedSource::endless()), None, renderer);

    assert!(matches!(view.cycle(), CycleOutcome::Rendered { overlays: 0, .. }));
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_finite_source_ends() {
    let frame = create_test_image(48, 64, 10.0).unwrap();
    let source = ScriptedSource::new(vec![Read::Frame(frame)], true);
    let mut view = view_with(Some(source), None, RecordingRenderer::default());

    assert!(matches!(view.cycle(), CycleOutcome::Rendered { .. }));
    assert!(matches!(view.cycle(), CycleOutcome::EndOfStream));
}

#[test]
fn test_drop_cancels_token() {
    let view = view_with(None, None, RecordingRenderer::default());
    let token = view.token();
    assert!(!token.is_cancelled());
    drop(view);
    assert!(token.is_cancelled());
}

#[test]
fn test_loop_stops_when_view_is_torn_down() {
    let model = ScriptedModel::always(Detection::Poses(vec![Pose::default()]));
    let mut view = Some(view_with(Some(ScriptedSource::endless()), Some(model), RecordingRenderer::default()));
    let token = view.as_ref().map(DetectionView::token).unwrap();

    let mut cycles = 0;
    let summary = LoopDriver::new(Pacing::Interval(Duration::from_millis(1))).run(&token, || {
        cycles += 1;
        if let Some(v) = view.as_mut() {
            v.cycle();
        }
        if cycles == 3 {
            view = None;
        }
        Ok(LoopControl::Continue)
    });

    assert_eq!(summary.cycles, 3);
}

#[test]
fn test_unavailable_camera_and_model_leave_view_idle() {
    let mut config = Config::default();
    config.models.movenet_lightning = "missing/movenet.onnx".into();
    let spec = Route::PoseDetection.view_spec(&config).unwrap();

    let mut view = DetectionView::from_spec(&spec, &config, &VideoSource::File("missing/clip.mp4".to_string()));
    assert!(!view.has_source());
    assert!(!view.has_model());
    assert!(matches!(view.cycle(), CycleOutcome::Idle));
}

#[test]
fn test_canvas_renderer_through_view() {
    let model = ScriptedModel::always(Detection::Poses(vec![standing_pose(0.9)]));
    let source = ScriptedSource::new(vec![Read::Frame(create_test_image(480, 640, 0.0).unwrap())], true);
    let mut view = DetectionView::new(
        "markers",
        Some(Box::new(source)),
        Some(Box::new(model)),
        vec![MARKERS],
        Box::new(CanvasRenderer::new()),
        AssetStore::default(),
        Pacing::Refresh { fps: 60 },
    );

    let CycleOutcome::Rendered { canvas, overlays } = view.cycle() else {
        panic!("expected a rendered frame");
    };
    assert_eq!(overlays, 17);
    // Nose marker at (320, 120)
    assert_eq!(canvas.at_2d::<Vec3b>(120, 320).unwrap().0, [0, 0, 255]);
}
