//! Benchmarks for overlay placement and compositing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array4;
use opencv::core::{Mat, Scalar, CV_8UC3, CV_8UC4};
use pose_overlay::{
    asset::{AssetStore, ImageAsset, OverlayAsset, EYEWEAR_IMAGE},
    body_segmentation::decode_part_segmentation,
    constants::NUM_BODY_PARTS,
    keypoint::{Keypoint, KeypointName, Pose},
    overlay::{eyewear_rect, eyewear_transform, Overlay, OverlayRect},
    render::{CanvasRenderer, Renderer},
};

fn random_pose() -> Pose {
    Pose::new(
        KeypointName::ALL
            .iter()
            .map(|&name| {
                Keypoint::new(
                    name,
                    rand::random::<f32>() * 640.0,
                    rand::random::<f32>() * 480.0,
                    0.5 + rand::random::<f32>() * 0.5,
                )
            })
            .collect(),
    )
}

fn benchmark_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    let poses: Vec<Pose> = (0..100).map(|_| random_pose()).collect();

    group.bench_function("eyewear_rect", |b| {
        b.iter(|| {
            for pose in &poses {
                let left = &pose.keypoints[KeypointName::LeftEye.index()];
                let right = &pose.keypoints[KeypointName::RightEye.index()];
                black_box(eyewear_rect(left, right, (400.0, 150.0), 0.5, 50.0));
            }
        });
    });

    group.bench_function("eyewear_transform", |b| {
        b.iter(|| {
            for pose in &poses {
                black_box(eyewear_transform(pose, (640.0, 480.0), 2.0, 0.5, 200.0, -1.0));
            }
        });
    });

    group.finish();
}

fn benchmark_compositing(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositing");

    let mut assets = AssetStore::new();
    let glasses = Mat::new_rows_cols_with_default(150, 400, CV_8UC4, Scalar::new(20.0, 20.0, 20.0, 200.0)).unwrap();
    assets.insert(EYEWEAR_IMAGE, OverlayAsset::Image(ImageAsset::from_mat(&glasses).unwrap()));
    let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(90.0)).unwrap();

    for width in [50.0f32, 150.0, 400.0] {
        let overlay = Overlay::Image {
            asset: EYEWEAR_IMAGE.to_string(),
            rect: OverlayRect::centered(320.0, 240.0, width, width * 150.0 / 400.0),
        };
        let mut renderer = CanvasRenderer::new();
        group.bench_with_input(BenchmarkId::new("image_overlay", width as u32), &overlay, |b, overlay| {
            b.iter(|| {
                let mut canvas = frame.clone();
                renderer
                    .render(&mut canvas, std::slice::from_ref(overlay), &assets)
                    .unwrap();
                black_box(canvas);
            });
        });
    }

    group.finish();
}

fn benchmark_segmentation(c: &mut Criterion) {
    let segments = Array4::from_shape_fn((1, 33, 33, 1), |_| rand::random::<f32>() * 10.0 - 5.0);
    let heatmaps = Array4::from_shape_fn((1, 33, 33, NUM_BODY_PARTS), |_| rand::random::<f32>());

    c.bench_function("decode_part_segmentation_640x480", |b| {
        b.iter(|| {
            black_box(decode_part_segmentation(segments.view(), heatmaps.view(), 0.7, 640, 480).unwrap());
        });
    });
}

criterion_group!(benches, benchmark_placement, benchmark_compositing, benchmark_segmentation);
criterion_main!(benches);
