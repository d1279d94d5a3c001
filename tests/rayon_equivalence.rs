#![cfg(feature = "rayon")]

use detout::{
    AttributeMode, DetectionInputs, DetectionOutput, DetectionOutputConfig, NmsConfig, TensorView,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Blobs {
    loc: Vec<f32>,
    conf: Vec<f32>,
    prior: Vec<f32>,
    blur: Vec<f32>,
    occlusion: Vec<f32>,
}

fn random_blobs(rng: &mut StdRng, num: usize, num_priors: usize, num_classes: usize) -> Blobs {
    let mut prior = Vec::with_capacity(num_priors * 8);
    for _ in 0..num_priors {
        let x = rng.random_range(0.0..0.8f32);
        let y = rng.random_range(0.0..0.8f32);
        let w = rng.random_range(0.05..0.2f32);
        let h = rng.random_range(0.05..0.2f32);
        prior.extend_from_slice(&[x, y, x + w, y + h]);
    }
    for _ in 0..num_priors {
        prior.extend_from_slice(&[0.1, 0.1, 0.2, 0.2]);
    }
    let mut uniform = |len: usize, lo: f32, hi: f32| -> Vec<f32> {
        (0..len).map(|_| rng.random_range(lo..hi)).collect()
    };
    Blobs {
        loc: uniform(num * num_priors * 4, -0.5, 0.5),
        conf: uniform(num * num_priors * num_classes, 0.0, 1.0),
        prior,
        blur: uniform(num * num_priors * 3, 0.0, 1.0),
        occlusion: uniform(num * num_priors * 3, 0.0, 1.0),
    }
}

#[test]
fn parallel_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let (num, num_priors, num_classes) = (6, 64, 4);
    let blobs = random_blobs(&mut rng, num, num_priors, num_classes);

    let base = DetectionOutputConfig {
        attributes: AttributeMode::face(),
        confidence_threshold: 0.3,
        keep_top_k: Some(20),
        nms: NmsConfig {
            nms_threshold: 0.45,
            eta: 0.9,
            top_k: Some(40),
        },
        ..DetectionOutputConfig::new(num_classes)
    };
    let sequential = DetectionOutput::new(base.clone()).unwrap();
    let parallel = DetectionOutput::new(DetectionOutputConfig {
        parallel: true,
        ..base
    })
    .unwrap();

    let inputs = DetectionInputs::new(
        TensorView::from_dims(&blobs.loc, [num, num_priors * 4, 1, 1]).unwrap(),
        TensorView::from_dims(&blobs.conf, [num, num_priors * num_classes, 1, 1]).unwrap(),
        TensorView::from_dims(&blobs.prior, [1, 2, num_priors * 4, 1]).unwrap(),
    )
    .with_attributes(vec![
        TensorView::from_dims(&blobs.blur, [num, num_priors * 3, 1, 1]).unwrap(),
        TensorView::from_dims(&blobs.occlusion, [num, num_priors * 3, 1, 1]).unwrap(),
    ]);

    let expected = sequential.forward(&inputs).unwrap();
    let actual = parallel.forward(&inputs).unwrap();
    assert!(expected.num_rows() > num);
    assert_eq!(expected, actual);

    let image_ids: Vec<f32> = actual.rows().map(|row| row[0]).collect();
    assert!(image_ids.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn parallel_empty_batch_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(7);
    let (num, num_priors, num_classes) = (3, 16, 2);
    let blobs = random_blobs(&mut rng, num, num_priors, num_classes);
    let cfg = DetectionOutputConfig {
        confidence_threshold: 1.0,
        parallel: true,
        ..DetectionOutputConfig::new(num_classes)
    };
    let layer = DetectionOutput::new(cfg).unwrap();
    let inputs = DetectionInputs::new(
        TensorView::from_dims(&blobs.loc, [num, num_priors * 4, 1, 1]).unwrap(),
        TensorView::from_dims(&blobs.conf, [num, num_priors * num_classes, 1, 1]).unwrap(),
        TensorView::from_dims(&blobs.prior, [1, 2, num_priors * 4, 1]).unwrap(),
    );
    let table = layer.forward(&inputs).unwrap();
    assert!(table.is_empty_result());
    assert_eq!(table.num_rows(), num);
}
