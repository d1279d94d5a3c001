use detout::lowlevel::{nms_fast, NmsParams};
use detout::{
    AttributeMode, DetectionInputs, DetectionOutput, DetectionOutputConfig, NmsConfig,
    NormalizedBBox, Swish, TensorView,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Deterministic pseudo-random values in `[0, 1)`.
fn make_values(len: usize, seed: usize) -> Vec<f32> {
    (0..len)
        .map(|i| ((i.wrapping_mul(2654435761).wrapping_add(seed * 40503) >> 7) & 0x3FF) as f32 / 1024.0)
        .collect()
}

/// Dense grid of overlapping priors followed by their variances.
fn make_priors(side: usize) -> Vec<f32> {
    let step = 1.0 / side as f32;
    let mut data = Vec::with_capacity(side * side * 8);
    for y in 0..side {
        for x in 0..side {
            let (cx, cy) = ((x as f32 + 0.5) * step, (y as f32 + 0.5) * step);
            data.extend_from_slice(&[cx - step, cy - step, cx + step, cy + step]);
        }
    }
    for _ in 0..side * side {
        data.extend_from_slice(&[0.1, 0.1, 0.2, 0.2]);
    }
    data
}

fn bench_detection_output(c: &mut Criterion) {
    let (num, side, num_classes) = (4, 38, 21);
    let num_priors = side * side;
    let loc = make_values(num * num_priors * 4, 1)
        .into_iter()
        .map(|v| v - 0.5)
        .collect::<Vec<_>>();
    let conf = make_values(num * num_priors * num_classes, 2);
    let prior = make_priors(side);

    let cfg = DetectionOutputConfig {
        confidence_threshold: 0.9,
        keep_top_k: Some(200),
        nms: NmsConfig {
            nms_threshold: 0.45,
            top_k: Some(400),
            ..NmsConfig::default()
        },
        ..DetectionOutputConfig::new(num_classes)
    };
    let layer = DetectionOutput::new(cfg.clone()).unwrap();
    let inputs = DetectionInputs::new(
        TensorView::from_dims(&loc, [num, num_priors * 4, 1, 1]).unwrap(),
        TensorView::from_dims(&conf, [num, num_priors * num_classes, 1, 1]).unwrap(),
        TensorView::from_dims(&prior, [1, 2, num_priors * 4, 1]).unwrap(),
    );

    c.bench_function("detection_output_voc_4x1444", |b| {
        b.iter(|| black_box(layer.forward(&inputs).unwrap()));
    });

    #[cfg(feature = "rayon")]
    {
        let parallel = DetectionOutput::new(DetectionOutputConfig {
            parallel: true,
            ..cfg.clone()
        })
        .unwrap();
        c.bench_function("detection_output_voc_4x1444_parallel", |b| {
            b.iter(|| black_box(parallel.forward(&inputs).unwrap()));
        });
    }

    let face_layer = DetectionOutput::new(DetectionOutputConfig {
        attributes: AttributeMode::face(),
        ..DetectionOutputConfig {
            num_classes: Some(2),
            ..cfg
        }
    })
    .unwrap();
    let face_conf = make_values(num * num_priors * 2, 3);
    let blur = make_values(num * num_priors * 3, 4);
    let occlusion = make_values(num * num_priors * 3, 5);
    let face_inputs = DetectionInputs::new(
        TensorView::from_dims(&loc, [num, num_priors * 4, 1, 1]).unwrap(),
        TensorView::from_dims(&face_conf, [num, num_priors * 2, 1, 1]).unwrap(),
        TensorView::from_dims(&prior, [1, 2, num_priors * 4, 1]).unwrap(),
    )
    .with_attributes(vec![
        TensorView::from_dims(&blur, [num, num_priors * 3, 1, 1]).unwrap(),
        TensorView::from_dims(&occlusion, [num, num_priors * 3, 1, 1]).unwrap(),
    ]);

    c.bench_function("detection_output_face_4x1444", |b| {
        b.iter(|| black_box(face_layer.forward(&face_inputs).unwrap()));
    });
}

fn bench_nms(c: &mut Criterion) {
    let prior = make_priors(32);
    let bboxes: Vec<NormalizedBBox> = prior[..32 * 32 * 4]
        .chunks_exact(4)
        .map(|b| NormalizedBBox::new(b[0], b[1], b[2], b[3]))
        .collect();
    let scores = make_values(bboxes.len(), 9);
    let params = NmsParams {
        confidence_threshold: 0.01,
        nms_threshold: 0.45,
        eta: 1.0,
        top_k: None,
    };
    c.bench_function("nms_fast_1024", |b| {
        b.iter(|| black_box(nms_fast(&bboxes, &scores, &params).unwrap()));
    });

    let adaptive = NmsParams { eta: 0.9, ..params };
    c.bench_function("nms_fast_1024_adaptive", |b| {
        b.iter(|| black_box(nms_fast(&bboxes, &scores, &adaptive).unwrap()));
    });
}

fn bench_swish(c: &mut Criterion) {
    let input = make_values(1 << 16, 11);
    let mut output = vec![0.0f32; input.len()];
    let layer = Swish::default();
    c.bench_function("swish_forward_64k", |b| {
        b.iter(|| {
            layer.forward(black_box(&input), &mut output).unwrap();
            black_box(output[0])
        });
    });
}

criterion_group!(benches, bench_detection_output, bench_nms, bench_swish);
criterion_main!(benches);
