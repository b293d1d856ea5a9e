use crate::error::{Error, Result};
use crate::tensor::Tensor;

use super::Model;

/// A dense layer with exactly one kernel and one bias.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRecord {
    pub name: String,
    /// Rank 2: input_size x output_size.
    pub kernel: Tensor,
    /// Rank 1: output_size.
    pub bias: Tensor,
}

impl LayerRecord {
    /// Build a record, checking that kernel and bias line up.
    pub fn new(name: impl Into<String>, kernel: Tensor, bias: Tensor) -> Result<Self> {
        let name = name.into();
        let fits = kernel.rank() == 2
            && bias.rank() == 1
            && kernel.shape().iter().all(|&d| d > 0)
            && kernel.shape()[1] == bias.shape()[0];
        if !fits {
            return Err(Error::ShapeMismatch {
                layer: name,
                kernel_shape: kernel.shape().to_vec(),
                bias_shape: bias.shape().to_vec(),
            });
        }
        Ok(Self { name, kernel, bias })
    }

    pub fn input_size(&self) -> usize {
        self.kernel.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.kernel.shape()[1]
    }
}

/// Walk the model's layers in declared order and keep the dense ones.
///
/// Layers without parameters, or with a parameter count other than two,
/// are skipped. The order of the result is load-bearing: the generated
/// module numbers and chains layers in this order.
pub fn extract(model: &Model) -> Result<Vec<LayerRecord>> {
    let mut records = Vec::new();
    for layer in &model.layers {
        match layer.params.as_slice() {
            [] => {
                log::debug!("skipping layer '{}': no parameters", layer.name);
            }
            [kernel, bias] => {
                records.push(LayerRecord::new(
                    layer.name.clone(),
                    kernel.clone(),
                    bias.clone(),
                )?);
            }
            params => {
                log::debug!(
                    "skipping layer '{}': {} parameter tensors, expected kernel and bias",
                    layer.name,
                    params.len()
                );
            }
        }
    }
    log::info!(
        "extracted {} dense layers out of {}",
        records.len(),
        model.layers.len()
    );
    Ok(records)
}
