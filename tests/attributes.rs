use detout::lowlevel::{argmax_category, confidence_scores_item, resolve_attributes};
use detout::{AttributeMode, DetectionInputs, DetectionOutput, DetectionOutputConfig, TensorView};

const PRIORS: [f32; 16] = [
    0.0, 0.0, 0.4, 0.4, // prior 0
    0.5, 0.5, 0.9, 0.9, // prior 1
    0.1, 0.1, 0.2, 0.2, // variance 0
    0.1, 0.1, 0.2, 0.2, // variance 1
];

#[test]
fn face_rows_carry_blur_and_occlusion() {
    let cfg = DetectionOutputConfig {
        attributes: AttributeMode::face(),
        confidence_threshold: 0.5,
        ..DetectionOutputConfig::new(2)
    };
    let layer = DetectionOutput::new(cfg).unwrap();
    assert_eq!(layer.row_width(), 9);

    let loc = [0.0f32; 8];
    let conf = [0.0, 0.9, 0.0, 0.8];
    // [prior][category]
    let blur = [0.1, 0.7, 0.2, 0.3, 0.3, 0.6];
    let occlusion = [0.9, 0.05, 0.05, 0.2, 0.5, 0.3];
    let inputs = DetectionInputs::new(
        TensorView::from_dims(&loc, [1, 8, 1, 1]).unwrap(),
        TensorView::from_dims(&conf, [1, 4, 1, 1]).unwrap(),
        TensorView::from_dims(&PRIORS, [1, 2, 8, 1]).unwrap(),
    )
    .with_attributes(vec![
        TensorView::from_dims(&blur, [1, 6, 1, 1]).unwrap(),
        TensorView::from_dims(&occlusion, [1, 6, 1, 1]).unwrap(),
    ]);

    let table = layer.forward(&inputs).unwrap();
    assert_eq!(table.shape(), [1, 1, 2, 9]);
    let rows: Vec<&[f32]> = table.rows().collect();
    assert_eq!(rows[0][2], 0.9);
    assert_eq!(rows[0][7..], [1.0, 0.0]);
    assert_eq!(rows[1][2], 0.8);
    assert_eq!(rows[1][7..], [2.0, 1.0]);

    let detections = layer.detect(&inputs).unwrap();
    assert_eq!(detections[0][1].attributes, vec![2, 1]);
}

#[test]
fn plate_rows_carry_seven_characters() {
    let (chinese_width, english_width, letter_width) = (4, 3, 5);
    let cfg = DetectionOutputConfig {
        attributes: AttributeMode::LicensePlate {
            chinese_width,
            english_width,
            letter_width,
        },
        ..DetectionOutputConfig::new(2)
    };
    let layer = DetectionOutput::new(cfg).unwrap();
    assert_eq!(layer.row_width(), 14);

    let loc = [0.0f32; 4];
    let conf = [0.1, 0.9];
    let priors = [0.2, 0.3, 0.6, 0.5, 0.1, 0.1, 0.2, 0.2];

    let one_hot = |width: usize, hot: usize| -> Vec<f32> {
        (0..width).map(|c| if c == hot { 0.8 } else { 0.05 }).collect()
    };
    let heads = vec![
        one_hot(chinese_width, 3),
        one_hot(english_width, 1),
        one_hot(letter_width, 0),
        one_hot(letter_width, 4),
        one_hot(letter_width, 2),
        one_hot(letter_width, 2),
        one_hot(letter_width, 1),
    ];
    let inputs = DetectionInputs::new(
        TensorView::from_dims(&loc, [1, 4, 1, 1]).unwrap(),
        TensorView::from_dims(&conf, [1, 2, 1, 1]).unwrap(),
        TensorView::from_dims(&priors, [1, 2, 4, 1]).unwrap(),
    )
    .with_attributes(
        heads
            .iter()
            .map(|h| TensorView::from_dims(h, [1, h.len(), 1, 1]).unwrap())
            .collect(),
    );

    let table = layer.forward(&inputs).unwrap();
    assert_eq!(table.num_rows(), 1);
    let row = table.row(0).unwrap();
    assert_eq!(row[..3], [0.0, 1.0, 0.9]);
    assert_eq!(row[7..], [3.0, 1.0, 0.0, 4.0, 2.0, 2.0, 1.0]);
}

#[test]
fn sentinel_rows_use_full_attribute_width() {
    let cfg = DetectionOutputConfig {
        attributes: AttributeMode::face(),
        confidence_threshold: 0.95,
        ..DetectionOutputConfig::new(2)
    };
    let layer = DetectionOutput::new(cfg).unwrap();
    let loc = [0.0f32; 8];
    let conf = [0.0, 0.9, 0.0, 0.8];
    let head = [0.0f32; 6];
    let inputs = DetectionInputs::new(
        TensorView::from_dims(&loc, [1, 8, 1, 1]).unwrap(),
        TensorView::from_dims(&conf, [1, 4, 1, 1]).unwrap(),
        TensorView::from_dims(&PRIORS, [1, 2, 8, 1]).unwrap(),
    )
    .with_attributes(vec![
        TensorView::from_dims(&head, [1, 6, 1, 1]).unwrap(),
        TensorView::from_dims(&head, [1, 6, 1, 1]).unwrap(),
    ]);
    let table = layer.forward(&inputs).unwrap();
    assert_eq!(table.shape(), [1, 1, 1, 9]);
    assert_eq!(table.row(0).unwrap(), &[0.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0]);
}

#[test]
fn ties_resolve_to_lowest_category() {
    let data = [0.4, 0.4, 0.2];
    let scores = confidence_scores_item(&data, 1, 3).unwrap();
    assert_eq!(argmax_category(&scores, 3, 0).unwrap(), 0);

    let data = [0.1, 0.45, 0.45];
    let scores = confidence_scores_item(&data, 1, 3).unwrap();
    assert_eq!(argmax_category(&scores, 3, 0).unwrap(), 1);
}

#[test]
fn non_positive_scores_resolve_to_zero() {
    let data = [-0.5, -0.1, 0.0];
    let scores = confidence_scores_item(&data, 1, 3).unwrap();
    assert_eq!(argmax_category(&scores, 3, 0).unwrap(), 0);
}

#[test]
fn resolve_reads_each_head_at_the_same_prior() {
    let mode = AttributeMode::face();
    let heads = mode.heads();
    let blur = confidence_scores_item(&[0.9, 0.0, 0.0, 0.0, 0.0, 0.9], 2, 3).unwrap();
    let occlusion = confidence_scores_item(&[0.0, 0.9, 0.0, 0.0, 0.9, 0.0], 2, 3).unwrap();
    let head_scores = vec![blur, occlusion];
    assert_eq!(resolve_attributes(&head_scores, &heads, 0).unwrap(), vec![0, 1]);
    assert_eq!(resolve_attributes(&head_scores, &heads, 1).unwrap(), vec![2, 1]);
    assert!(resolve_attributes(&head_scores, &heads, 2).is_err());
    assert!(resolve_attributes(&head_scores[..1], &heads, 0).is_err());
}
