use clap::Parser;
use detout::{
    AttributeMode, CodeType, DetOutError, Detection, DetectionInputs, DetectionOutput,
    DetectionOutputConfig, DetectionTable, NmsConfig, TensorView,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "detout CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON run configuration.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for the layer stages.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CodeTypeConfig {
    Corner,
    CenterSize,
    CornerSize,
}

impl From<CodeTypeConfig> for CodeType {
    fn from(value: CodeTypeConfig) -> Self {
        match value {
            CodeTypeConfig::Corner => CodeType::Corner,
            CodeTypeConfig::CenterSize => CodeType::CenterSize,
            CodeTypeConfig::CornerSize => CodeType::CornerSize,
        }
    }
}

fn default_attribute_width() -> usize {
    3
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum AttributesConfig {
    #[default]
    None,
    Face {
        #[serde(default = "default_attribute_width")]
        blur_width: usize,
        #[serde(default = "default_attribute_width")]
        occlusion_width: usize,
    },
    LicensePlate {
        chinese_width: usize,
        english_width: usize,
        letter_width: usize,
    },
}

impl From<AttributesConfig> for AttributeMode {
    fn from(value: AttributesConfig) -> Self {
        match value {
            AttributesConfig::None => AttributeMode::None,
            AttributesConfig::Face {
                blur_width,
                occlusion_width,
            } => AttributeMode::Face {
                blur_width,
                occlusion_width,
            },
            AttributesConfig::LicensePlate {
                chinese_width,
                english_width,
                letter_width,
            } => AttributeMode::LicensePlate {
                chinese_width,
                english_width,
                letter_width,
            },
        }
    }
}

/// Negative values mean "unbounded".
fn bound(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NmsConfigJson {
    nms_threshold: f32,
    eta: f32,
    top_k: i64,
}

impl Default for NmsConfigJson {
    fn default() -> Self {
        let cfg = NmsConfig::default();
        Self {
            nms_threshold: cfg.nms_threshold,
            eta: cfg.eta,
            top_k: -1,
        }
    }
}

impl From<NmsConfigJson> for NmsConfig {
    fn from(value: NmsConfigJson) -> Self {
        Self {
            nms_threshold: value.nms_threshold,
            eta: value.eta,
            top_k: bound(value.top_k),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LayerConfigJson {
    num_classes: Option<usize>,
    attributes: AttributesConfig,
    share_location: bool,
    background_label_id: i32,
    code_type: CodeTypeConfig,
    variance_encoded_in_target: bool,
    keep_top_k: i64,
    confidence_threshold: f32,
    nms: NmsConfigJson,
    parallel: bool,
}

impl Default for LayerConfigJson {
    fn default() -> Self {
        let cfg = DetectionOutputConfig::default();
        Self {
            num_classes: None,
            attributes: AttributesConfig::None,
            share_location: cfg.share_location,
            background_label_id: cfg.background_label_id,
            code_type: CodeTypeConfig::Corner,
            variance_encoded_in_target: cfg.variance_encoded_in_target,
            keep_top_k: -1,
            confidence_threshold: cfg.confidence_threshold,
            nms: NmsConfigJson::default(),
            parallel: cfg.parallel,
        }
    }
}

impl From<LayerConfigJson> for DetectionOutputConfig {
    fn from(value: LayerConfigJson) -> Self {
        Self {
            num_classes: value.num_classes,
            attributes: value.attributes.into(),
            share_location: value.share_location,
            background_label_id: value.background_label_id,
            code_type: value.code_type.into(),
            variance_encoded_in_target: value.variance_encoded_in_target,
            keep_top_k: bound(value.keep_top_k),
            confidence_threshold: value.confidence_threshold,
            nms: value.nms.into(),
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TensorJson {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl TensorJson {
    fn view(&self) -> Result<TensorView<'_>, DetOutError> {
        TensorView::from_dims(&self.data, self.shape)
    }
}

#[derive(Debug, Deserialize)]
struct InputsJson {
    loc: TensorJson,
    conf: TensorJson,
    prior: TensorJson,
    #[serde(default)]
    attributes: Vec<TensorJson>,
}

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    layer: LayerConfigJson,
    inputs: InputsJson,
    #[serde(default)]
    output_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    image_id: usize,
    label: i32,
    score: f32,
    bbox: [f32; 4],
    attributes: Vec<usize>,
}

impl From<&Detection> for DetectionRecord {
    fn from(value: &Detection) -> Self {
        Self {
            image_id: value.image_id,
            label: value.label,
            score: value.score,
            bbox: [
                value.bbox.xmin,
                value.bbox.ymin,
                value.bbox.xmax,
                value.bbox.ymax,
            ],
            attributes: value.attributes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    shape: [usize; 4],
    rows: Vec<Vec<f32>>,
    detections: Vec<DetectionRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("detout=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;

    let layer = DetectionOutput::new(config.layer.into())?;
    let attributes = config
        .inputs
        .attributes
        .iter()
        .map(TensorJson::view)
        .collect::<Result<Vec<_>, _>>()?;
    let inputs = DetectionInputs::new(
        config.inputs.loc.view()?,
        config.inputs.conf.view()?,
        config.inputs.prior.view()?,
    )
    .with_attributes(attributes);

    let per_image = layer.detect(&inputs)?;
    let table = DetectionTable::assemble(&per_image, layer.row_width())?;
    let detections: Vec<DetectionRecord> = per_image
        .iter()
        .flatten()
        .map(DetectionRecord::from)
        .collect();
    tracing::info!(
        rows = table.num_rows(),
        detections = detections.len(),
        "detection output done"
    );

    let output = Output {
        shape: table.shape(),
        rows: table.rows().map(<[f32]>::to_vec).collect(),
        detections,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
