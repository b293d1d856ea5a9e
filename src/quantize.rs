//! Quantization pass: dense layers to sign/magnitude vectors.

use rayon::prelude::*;

use crate::error::{ElementLocation, Error, Result, TensorRole};
use crate::fixed::{self, FixedPoint};
use crate::model::LayerRecord;
use crate::tensor::Tensor;

/// Tensors with at least this many elements are encoded on the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 1 << 14;

/// A flattened tensor in sign/magnitude form. Both vectors are row-major
/// and have the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuantizedTensor {
    pub magnitudes: Vec<u64>,
    pub signs: Vec<u8>,
}

impl QuantizedTensor {
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<FixedPoint> {
        Some(FixedPoint {
            sign: *self.signs.get(index)?,
            magnitude: *self.magnitudes.get(index)?,
        })
    }

    fn from_values(values: Vec<FixedPoint>) -> Self {
        let (magnitudes, signs) = values.into_iter().map(|v| (v.magnitude, v.sign)).unzip();
        Self { magnitudes, signs }
    }
}

/// A dense layer with every weight encoded at `scale`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantizedLayer {
    pub name: String,
    pub kernel: QuantizedTensor,
    /// (rows, cols) = (input size, output size).
    pub kernel_shape: (usize, usize),
    pub bias: QuantizedTensor,
    pub bias_len: usize,
    pub scale: u32,
}

impl QuantizedLayer {
    pub fn input_size(&self) -> usize {
        self.kernel_shape.0
    }

    pub fn output_size(&self) -> usize {
        self.kernel_shape.1
    }
}

/// Encode every kernel and bias element of every layer.
///
/// Aborts on the first unrepresentable element in (layer, kernel then bias,
/// flat index) order. The parallel path reports the same element as the
/// sequential one.
pub fn quantize(layers: &[LayerRecord], scale: u32) -> Result<Vec<QuantizedLayer>> {
    quantize_with_threshold(layers, scale, PARALLEL_THRESHOLD)
}

pub(crate) fn quantize_with_threshold(
    layers: &[LayerRecord],
    scale: u32,
    threshold: usize,
) -> Result<Vec<QuantizedLayer>> {
    let mut out = Vec::with_capacity(layers.len());
    for layer in layers {
        let kernel = quantize_tensor(&layer.kernel, scale, threshold)
            .map_err(|(index, e)| e.at(location(layer, TensorRole::Kernel, index)))?;
        let bias = quantize_tensor(&layer.bias, scale, threshold)
            .map_err(|(index, e)| e.at(location(layer, TensorRole::Bias, index)))?;
        out.push(QuantizedLayer {
            name: layer.name.clone(),
            kernel,
            kernel_shape: (layer.input_size(), layer.output_size()),
            bias,
            bias_len: layer.output_size(),
            scale,
        });
    }
    log::info!("quantized {} layers at scale {}", out.len(), scale);
    Ok(out)
}

fn location(layer: &LayerRecord, tensor: TensorRole, index: usize) -> ElementLocation {
    ElementLocation {
        layer: layer.name.clone(),
        tensor,
        index,
    }
}

/// Encode a tensor in row-major order, returning the first failing index.
fn quantize_tensor(
    tensor: &Tensor,
    scale: u32,
    threshold: usize,
) -> Result<QuantizedTensor, (usize, Error)> {
    let data = tensor.data();
    let encoded: Vec<Result<FixedPoint>> = if data.len() >= threshold {
        data.par_iter().map(|&x| fixed::encode(x, scale)).collect()
    } else {
        data.iter().map(|&x| fixed::encode(x, scale)).collect()
    };
    let mut values = Vec::with_capacity(encoded.len());
    for (i, r) in encoded.into_iter().enumerate() {
        values.push(r.map_err(|e| (i, e))?);
    }
    Ok(QuantizedTensor::from_values(values))
}
