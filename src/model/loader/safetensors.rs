//! Safetensors model files.
//!
//! Tensor names follow the Keras export convention `<layer>/.../<param>` with
//! an optional `:0` suffix; `<layer>.<param>` is accepted as well. Layers are
//! ordered by the position of their data in the file unless the header
//! metadata carries a comma-separated `layers` entry.

use std::collections::HashMap;

use ::safetensors::tensor::{Dtype, TensorInfo};
use ::safetensors::{SafeTensorError, SafeTensors};

use crate::model::{Model, ModelLayer};
use crate::tensor::Tensor;

use super::{LoadFailure, ModelLoader};

const NAME: &str = "safetensors";

/// Metadata key that pins the layer order.
pub const LAYER_ORDER_KEY: &str = "layers";

pub struct SafetensorsLoader;

/// A parameter tensor located in the file, before decoding.
struct ParamEntry<'a> {
    name: String,
    param: String,
    info: &'a TensorInfo,
}

impl ModelLoader for SafetensorsLoader {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load(&self, bytes: &[u8]) -> Result<Model, LoadFailure> {
        let invalid = |e: SafeTensorError| LoadFailure::new(NAME, format!("{:?}", e));
        let (_, metadata) = SafeTensors::read_metadata(bytes).map_err(invalid)?;
        let st = SafeTensors::deserialize(bytes).map_err(invalid)?;

        // Group parameters by layer.
        let mut groups: HashMap<String, Vec<ParamEntry<'_>>> = HashMap::new();
        for (name, info) in metadata.tensors() {
            let (layer, param) = split_tensor_name(&name);
            groups.entry(layer).or_default().push(ParamEntry {
                param,
                name,
                info,
            });
        }
        for params in groups.values_mut() {
            params.sort_by_key(|p| (param_rank(&p.param), p.info.data_offsets.0));
        }

        let pinned = metadata
            .metadata()
            .as_ref()
            .and_then(|m| m.get(LAYER_ORDER_KEY))
            .map(|order| parse_layer_order(order))
            .unwrap_or_default();
        let order = layer_order(&groups, &pinned)?;

        let mut layers = Vec::with_capacity(order.len());
        for layer_name in order {
            let params = groups.get(&layer_name).map(Vec::as_slice).unwrap_or(&[]);
            let mut tensors = Vec::with_capacity(params.len());
            for p in params {
                let view = st
                    .tensor(&p.name)
                    .map_err(|e| LoadFailure::new(NAME, format!("{}: {:?}", p.name, e)))?;
                let data = decode_values(view.dtype(), view.data())
                    .map_err(|reason| LoadFailure::new(NAME, format!("{}: {}", p.name, reason)))?;
                let tensor = Tensor::new(view.shape().to_vec(), data)
                    .map_err(|reason| LoadFailure::new(NAME, format!("{}: {}", p.name, reason)))?;
                tensors.push(tensor);
            }
            layers.push(ModelLayer::new(layer_name, tensors));
        }
        Ok(Model::new(layers))
    }
}

/// `dense_1/kernel:0` -> (`dense_1`, `kernel`).
///
/// Keras nests weights under the layer group (`dense_1/dense_1/kernel:0`),
/// so the layer is the first path segment and the parameter the last.
fn split_tensor_name(name: &str) -> (String, String) {
    let trimmed = name.strip_suffix(":0").unwrap_or(name);
    if let (Some((layer, _)), Some((_, param))) =
        (trimmed.split_once('/'), trimmed.rsplit_once('/'))
    {
        return (layer.to_string(), param.to_string());
    }
    match trimmed.rsplit_once('.') {
        Some((layer, param)) => (layer.to_string(), param.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

/// Kernels sort before biases; anything else keeps its file position.
fn param_rank(param: &str) -> u8 {
    match param {
        "kernel" | "weight" => 0,
        "bias" => 1,
        _ => 2,
    }
}

fn parse_layer_order(order: &str) -> Vec<String> {
    order
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pinned layers first (in pinned order), then the rest by file position.
fn layer_order(
    groups: &HashMap<String, Vec<ParamEntry<'_>>>,
    pinned: &[String],
) -> Result<Vec<String>, LoadFailure> {
    for name in pinned {
        if !groups.contains_key(name) {
            return Err(LoadFailure::new(
                NAME,
                format!("metadata lists layer '{}' which has no tensors", name),
            ));
        }
    }
    let mut rest: Vec<(&String, usize)> = groups
        .iter()
        .filter(|(name, _)| !pinned.contains(name))
        .map(|(name, params)| {
            let first = params.iter().map(|p| p.info.data_offsets.0).min().unwrap_or(0);
            (name, first)
        })
        .collect();
    rest.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut order: Vec<String> = pinned.to_vec();
    order.extend(rest.into_iter().map(|(name, _)| name.clone()));
    Ok(order)
}

/// Little-endian element bytes to f64. Every supported dtype widens exactly.
fn decode_values(dtype: Dtype, data: &[u8]) -> Result<Vec<f64>, String> {
    let values = match dtype {
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|c| f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|c| half::f16::from_bits(u16::from_le_bytes([c[0], c[1]])).to_f64())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|c| half::bf16::from_bits(u16::from_le_bytes([c[0], c[1]])).to_f64())
            .collect(),
        other => return Err(format!("unsupported dtype {:?}", other)),
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::safetensors::tensor::TensorView;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Serialize named f32 tensors in the given order.
    fn build(
        tensors: &[(&str, Vec<usize>, Vec<f32>)],
        meta: Option<HashMap<String, String>>,
    ) -> Vec<u8> {
        let buffers: Vec<Vec<u8>> = tensors.iter().map(|(_, _, v)| f32_bytes(v)).collect();
        let views: Vec<(String, TensorView<'_>)> = tensors
            .iter()
            .zip(&buffers)
            .map(|((name, shape, _), buf)| {
                (
                    name.to_string(),
                    TensorView::new(Dtype::F32, shape.clone(), buf).unwrap(),
                )
            })
            .collect();
        ::safetensors::serialize(views, &meta).unwrap()
    }

    #[test]
    fn test_split_tensor_name() {
        assert_eq!(
            split_tensor_name("dense_1/kernel:0"),
            ("dense_1".to_string(), "kernel".to_string())
        );
        assert_eq!(
            split_tensor_name("dense_1/dense_1/bias:0"),
            ("dense_1".to_string(), "bias".to_string())
        );
        assert_eq!(
            split_tensor_name("fc1.weight"),
            ("fc1".to_string(), "weight".to_string())
        );
        assert_eq!(split_tensor_name("lonely"), ("lonely".to_string(), String::new()));
    }

    #[test]
    fn test_load_two_dense_layers() {
        let bytes = build(
            &[
                ("dense/kernel:0", vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
                ("dense/bias:0", vec![3], vec![0.1, 0.2, 0.3]),
                ("dense_1/kernel:0", vec![3, 1], vec![-1.0, 0.0, 1.0]),
                ("dense_1/bias:0", vec![1], vec![0.5]),
            ],
            None,
        );
        let model = SafetensorsLoader.load(&bytes).unwrap();
        let names: Vec<&str> = model.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["dense", "dense_1"]);
        let dense = &model.layers[0];
        assert_eq!(dense.params[0].shape(), &[2, 3]);
        assert_eq!(dense.params[0].data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(dense.params[1].shape(), &[3]);
        assert_eq!(dense.params[1].data()[0], f64::from(0.1f32));
    }

    #[test]
    fn test_metadata_pins_layer_order() {
        let mut meta = HashMap::new();
        meta.insert(LAYER_ORDER_KEY.to_string(), "b, a".to_string());
        let bytes = build(
            &[
                ("a/kernel", vec![1, 1], vec![1.0]),
                ("a/bias", vec![1], vec![0.0]),
                ("b/kernel", vec![1, 1], vec![2.0]),
                ("b/bias", vec![1], vec![0.0]),
            ],
            Some(meta),
        );
        let model = SafetensorsLoader.load(&bytes).unwrap();
        assert_eq!(model.layers[0].name, "b");
        assert_eq!(model.layers[1].name, "a");
    }

    #[test]
    fn test_unknown_pinned_layer_fails() {
        let mut meta = HashMap::new();
        meta.insert(LAYER_ORDER_KEY.to_string(), "ghost".to_string());
        let bytes = build(&[("a/kernel", vec![1, 1], vec![1.0])], Some(meta));
        let err = SafetensorsLoader.load(&bytes).unwrap_err();
        assert!(err.reason.contains("ghost"));
    }

    #[test]
    fn test_kernel_sorts_before_bias() {
        let bytes = build(
            &[
                ("dense/bias", vec![2], vec![0.5, 0.5]),
                ("dense/kernel", vec![1, 2], vec![1.0, 2.0]),
            ],
            None,
        );
        let model = SafetensorsLoader.load(&bytes).unwrap();
        assert_eq!(model.layers[0].params[0].rank(), 2);
        assert_eq!(model.layers[0].params[1].rank(), 1);
    }

    #[test]
    fn test_decode_half_precision() {
        let bits = half::f16::from_f32(-0.5).to_bits().to_le_bytes();
        assert_eq!(decode_values(Dtype::F16, &bits).unwrap(), vec![-0.5]);
        let bits = half::bf16::from_f32(2.0).to_bits().to_le_bytes();
        assert_eq!(decode_values(Dtype::BF16, &bits).unwrap(), vec![2.0]);
        assert!(decode_values(Dtype::I32, &[0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = SafetensorsLoader.load(b"{\"layers\": []}").unwrap_err();
        assert_eq!(err.loader, "safetensors");
    }
}
