//! JSON weight dumps.
//!
//! ```json
//! {"layers": [
//!   {"name": "flatten", "weights": []},
//!   {"name": "dense", "weights": [
//!     {"shape": [2, 1], "data": [1.005, -2.0]},
//!     {"shape": [1], "data": [0.5]}
//!   ]}
//! ]}
//! ```
//!
//! `data` is row-major and may be flat or nested (as produced by
//! `ndarray.tolist()`).

use serde::Deserialize;
use serde_json::Value;

use crate::model::{Model, ModelLayer};
use crate::tensor::Tensor;

use super::{LoadFailure, ModelLoader};

const NAME: &str = "json";

pub struct JsonLoader;

#[derive(Deserialize)]
struct JsonModel {
    layers: Vec<JsonLayer>,
}

#[derive(Deserialize)]
struct JsonLayer {
    name: String,
    #[serde(default)]
    weights: Vec<JsonTensor>,
}

#[derive(Deserialize)]
struct JsonTensor {
    shape: Vec<usize>,
    data: Value,
}

impl ModelLoader for JsonLoader {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load(&self, bytes: &[u8]) -> Result<Model, LoadFailure> {
        let parsed: JsonModel =
            serde_json::from_slice(bytes).map_err(|e| LoadFailure::new(NAME, e.to_string()))?;

        let mut layers = Vec::with_capacity(parsed.layers.len());
        for layer in parsed.layers {
            let mut params = Vec::with_capacity(layer.weights.len());
            for (i, w) in layer.weights.into_iter().enumerate() {
                let mut data = Vec::new();
                let fail = |reason: String| {
                    LoadFailure::new(
                        NAME,
                        format!("layer '{}' weight {}: {}", layer.name, i, reason),
                    )
                };
                flatten_numbers(&w.data, &mut data).map_err(fail)?;
                let tensor = Tensor::new(w.shape, data).map_err(fail)?;
                params.push(tensor);
            }
            layers.push(ModelLayer::new(layer.name, params));
        }
        Ok(Model::new(layers))
    }
}

/// Depth-first flatten of nested number arrays, preserving row-major order.
fn flatten_numbers(value: &Value, out: &mut Vec<f64>) -> Result<(), String> {
    match value {
        Value::Number(n) => {
            let x = n.as_f64().ok_or_else(|| format!("number {} is not representable", n))?;
            out.push(x);
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                flatten_numbers(item, out)?;
            }
            Ok(())
        }
        other => Err(format!("expected a number or an array, found {}", other)),
    }
}
