//! Python bindings for the detout detection output layer.
//!
//! Exposes the layer configuration, the layer itself, and the swish
//! activation to Python via PyO3. Tensors cross the boundary as float32
//! numpy arrays.

use numpy::{PyArray1, PyArray2, PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use detout::{
    AttributeMode, CodeType, DetOutError, Detection as RustDetection, DetectionInputs,
    DetectionOutput as RustDetectionOutput, DetectionOutputConfig as RustDetectionOutputConfig,
    DetectionTable, NmsConfig, Swish, TensorShape, TensorView,
};

/// Convert a DetOutError to a Python exception.
fn to_py_err(err: DetOutError) -> PyErr {
    match err {
        DetOutError::Configuration { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Negative values mean "unbounded".
fn bound(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

fn unbound(value: Option<usize>) -> i64 {
    value.map_or(-1, |v| v as i64)
}

/// Pads a numpy shape of rank <= 4 to `[n, c, h, w]` with trailing ones.
fn blob_shape(shape: &[usize]) -> PyResult<TensorShape> {
    if shape.is_empty() || shape.len() > 4 {
        return Err(PyValueError::new_err(
            "tensors must have between 1 and 4 dimensions",
        ));
    }
    let mut dims = [1usize; 4];
    dims[..shape.len()].copy_from_slice(shape);
    Ok(TensorShape::new(dims[0], dims[1], dims[2], dims[3]))
}

fn view<'a>(array: &'a PyReadonlyArrayDyn<'_, f32>) -> PyResult<TensorView<'a>> {
    let shape = blob_shape(array.shape())?;
    let data = array.as_slice()?;
    TensorView::new(data, shape).map_err(to_py_err)
}

/// One kept detection.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Index of the image within the batch.
    #[pyo3(get)]
    pub image_id: usize,
    #[pyo3(get)]
    pub label: i32,
    #[pyo3(get)]
    pub score: f32,
    /// Box as (xmin, ymin, xmax, ymax) in normalized coordinates.
    #[pyo3(get)]
    pub bbox: (f32, f32, f32, f32),
    /// Arg-max category per attribute head, in head order.
    #[pyo3(get)]
    pub attributes: Vec<usize>,
}

#[pymethods]
impl Detection {
    fn __repr__(&self) -> String {
        let (xmin, ymin, xmax, ymax) = self.bbox;
        format!(
            "Detection(image_id={}, label={}, score={:.4}, bbox=({:.3}, {:.3}, {:.3}, {:.3}), attributes={:?})",
            self.image_id, self.label, self.score, xmin, ymin, xmax, ymax, self.attributes
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            image_id: d.image_id,
            label: d.label,
            score: d.score,
            bbox: (d.bbox.xmin, d.bbox.ymin, d.bbox.xmax, d.bbox.ymax),
            attributes: d.attributes,
        }
    }
}

fn parse_code_type(code_type: &str) -> PyResult<CodeType> {
    match code_type.to_lowercase().as_str() {
        "corner" => Ok(CodeType::Corner),
        "center_size" => Ok(CodeType::CenterSize),
        "corner_size" => Ok(CodeType::CornerSize),
        _ => Err(PyValueError::new_err(
            "code_type must be 'corner', 'center_size' or 'corner_size'",
        )),
    }
}

fn code_type_name(code_type: CodeType) -> &'static str {
    match code_type {
        CodeType::Corner => "corner",
        CodeType::CenterSize => "center_size",
        CodeType::CornerSize => "corner_size",
    }
}

fn parse_attributes(mode: &str, widths: Option<Vec<usize>>) -> PyResult<AttributeMode> {
    match (mode.to_lowercase().as_str(), widths.as_deref()) {
        ("none", None) => Ok(AttributeMode::None),
        ("face", None) => Ok(AttributeMode::face()),
        ("face", Some(&[blur_width, occlusion_width])) => Ok(AttributeMode::Face {
            blur_width,
            occlusion_width,
        }),
        ("license_plate", Some(&[chinese_width, english_width, letter_width])) => {
            Ok(AttributeMode::LicensePlate {
                chinese_width,
                english_width,
                letter_width,
            })
        }
        ("none" | "face" | "license_plate", _) => Err(PyValueError::new_err(
            "attribute_widths must be [blur, occlusion] for 'face' and \
             [chinese, english, letter] for 'license_plate'",
        )),
        _ => Err(PyValueError::new_err(
            "attributes must be 'none', 'face' or 'license_plate'",
        )),
    }
}

fn attributes_name(mode: AttributeMode) -> &'static str {
    match mode {
        AttributeMode::None => "none",
        AttributeMode::Face { .. } => "face",
        AttributeMode::LicensePlate { .. } => "license_plate",
    }
}

/// Configuration for the detection output layer.
#[pyclass]
#[derive(Clone)]
pub struct DetectionOutputConfig {
    inner: RustDetectionOutputConfig,
}

#[pymethods]
impl DetectionOutputConfig {
    /// Create a new DetectionOutputConfig.
    ///
    /// Args:
    ///     num_classes: Number of classes including background
    ///     attributes: "none", "face" or "license_plate" (default: "none")
    ///     attribute_widths: Category count per head kind (default: face [3, 3])
    ///     share_location: One set of offsets for every class (default: True)
    ///     background_label_id: Class excluded from output (default: 0)
    ///     code_type: "corner", "center_size" or "corner_size" (default: "corner")
    ///     variance_encoded_in_target: Offsets already scaled by variance (default: False)
    ///     keep_top_k: Detections kept per image, -1 for all (default: -1)
    ///     confidence_threshold: Scores at or below are dropped (default: lowest float)
    ///     nms_threshold: IoU suppression threshold (default: 0.3)
    ///     eta: Adaptive threshold decay in (0, 1] (default: 1.0)
    ///     top_k: Candidates per class before NMS, -1 for all (default: -1)
    ///     parallel: Process images in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        num_classes,
        attributes = "none",
        attribute_widths = None,
        share_location = true,
        background_label_id = 0,
        code_type = "corner",
        variance_encoded_in_target = false,
        keep_top_k = -1,
        confidence_threshold = f32::MIN,
        nms_threshold = 0.3,
        eta = 1.0,
        top_k = -1,
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        num_classes: usize,
        attributes: &str,
        attribute_widths: Option<Vec<usize>>,
        share_location: bool,
        background_label_id: i32,
        code_type: &str,
        variance_encoded_in_target: bool,
        keep_top_k: i64,
        confidence_threshold: f32,
        nms_threshold: f32,
        eta: f32,
        top_k: i64,
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustDetectionOutputConfig {
            num_classes: Some(num_classes),
            attributes: parse_attributes(attributes, attribute_widths)?,
            share_location,
            background_label_id,
            code_type: parse_code_type(code_type)?,
            variance_encoded_in_target,
            keep_top_k: bound(keep_top_k),
            confidence_threshold,
            nms: NmsConfig {
                nms_threshold,
                eta,
                top_k: bound(top_k),
            },
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map(|_| ()).map_err(to_py_err)
    }

    /// Width of one output row: 7, 9 (face) or 14 (license plate).
    #[getter]
    fn row_width(&self) -> usize {
        self.inner.attributes.row_width()
    }

    fn __repr__(&self) -> String {
        format!(
            "DetectionOutputConfig(num_classes={:?}, attributes='{}', code_type='{}', keep_top_k={}, nms_threshold={}, top_k={})",
            self.inner.num_classes,
            attributes_name(self.inner.attributes),
            code_type_name(self.inner.code_type),
            unbound(self.inner.keep_top_k),
            self.inner.nms.nms_threshold,
            unbound(self.inner.nms.top_k)
        )
    }
}

/// SSD detection output layer.
#[pyclass]
pub struct DetectionOutput {
    inner: RustDetectionOutput,
}

impl DetectionOutput {
    fn run(
        &self,
        loc: &PyReadonlyArrayDyn<'_, f32>,
        conf: &PyReadonlyArrayDyn<'_, f32>,
        prior: &PyReadonlyArrayDyn<'_, f32>,
        attributes: &[PyReadonlyArrayDyn<'_, f32>],
    ) -> PyResult<Vec<Vec<RustDetection>>> {
        let heads = attributes.iter().map(view).collect::<PyResult<Vec<_>>>()?;
        let inputs = DetectionInputs::new(view(loc)?, view(conf)?, view(prior)?)
            .with_attributes(heads);
        self.inner.detect(&inputs).map_err(to_py_err)
    }
}

#[pymethods]
impl DetectionOutput {
    /// Create a layer from a validated configuration.
    #[new]
    fn new(config: DetectionOutputConfig) -> PyResult<Self> {
        let inner = RustDetectionOutput::new(config.inner).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Run the layer and return the output table.
    ///
    /// Args:
    ///     loc: float32 array [N, P * L * 4]
    ///     conf: float32 array [N, P * num_classes]
    ///     prior: float32 array [N, 2, P * 4]
    ///     attributes: list of float32 arrays [N, P * width] in head order
    ///
    /// Returns:
    ///     float32 array [rows, row_width]; sentinel rows when nothing is kept
    #[pyo3(signature = (loc, conf, prior, attributes = None))]
    fn forward<'py>(
        &self,
        py: Python<'py>,
        loc: PyReadonlyArrayDyn<'py, f32>,
        conf: PyReadonlyArrayDyn<'py, f32>,
        prior: PyReadonlyArrayDyn<'py, f32>,
        attributes: Option<Vec<PyReadonlyArrayDyn<'py, f32>>>,
    ) -> PyResult<Bound<'py, PyArray2<f32>>> {
        let per_image = self.run(&loc, &conf, &prior, attributes.as_deref().unwrap_or(&[]))?;
        let table = DetectionTable::assemble(&per_image, self.inner.row_width())
            .map_err(to_py_err)?;
        let rows: Vec<Vec<f32>> = table.rows().map(<[f32]>::to_vec).collect();
        PyArray2::from_vec2(py, &rows).map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Run the layer and return typed detections, images in batch order.
    #[pyo3(signature = (loc, conf, prior, attributes = None))]
    fn detections<'py>(
        &self,
        loc: PyReadonlyArrayDyn<'py, f32>,
        conf: PyReadonlyArrayDyn<'py, f32>,
        prior: PyReadonlyArrayDyn<'py, f32>,
        attributes: Option<Vec<PyReadonlyArrayDyn<'py, f32>>>,
    ) -> PyResult<Vec<Detection>> {
        let per_image = self.run(&loc, &conf, &prior, attributes.as_deref().unwrap_or(&[]))?;
        Ok(per_image
            .into_iter()
            .flatten()
            .map(Detection::from)
            .collect())
    }

    #[getter]
    fn num_classes(&self) -> usize {
        self.inner.num_classes()
    }

    #[getter]
    fn row_width(&self) -> usize {
        self.inner.row_width()
    }

    fn __repr__(&self) -> String {
        format!(
            "DetectionOutput(num_classes={}, row_width={})",
            self.inner.num_classes(),
            self.inner.row_width()
        )
    }
}

/// Swish activation `x * sigmoid(beta * x)` over a float32 array.
///
/// Args:
///     x: float32 array of any shape
///     beta: gate scale (default: 1.0)
///
/// Returns:
///     Flat float32 array of the same length
#[pyfunction]
#[pyo3(signature = (x, beta = 1.0))]
fn swish<'py>(
    py: Python<'py>,
    x: PyReadonlyArrayDyn<'py, f32>,
    beta: f32,
) -> PyResult<Bound<'py, PyArray1<f32>>> {
    let out = Swish::new(beta).forward_vec(x.as_slice()?);
    Ok(PyArray1::from_vec(py, out))
}

/// Python module for the detout detection output layer.
#[pymodule]
fn _detout(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<DetectionOutputConfig>()?;
    m.add_class::<DetectionOutput>()?;
    m.add_function(wrap_pyfunction!(swish, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
