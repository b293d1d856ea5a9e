//! Move code generation for quantized dense graphs.
//!
//! `generate` validates the layers, builds a [`ir::MoveModule`] and prints
//! it. The same input always yields byte-identical text, so generated
//! modules can be checksummed before they are published.

pub mod builder;
pub mod emit;
pub mod ir;

use std::collections::HashSet;

use crate::error::{Error, Result, TensorRole};
use crate::quantize::{QuantizedLayer, QuantizedTensor};

pub use builder::build_module;
pub use emit::emit_module;
pub use ir::MoveModule;

/// Validate the layers and build the module IR.
pub fn lower(layers: &[QuantizedLayer], scale: u32) -> Result<MoveModule> {
    if layers.is_empty() {
        return Err(Error::EmptyModel);
    }
    let mut seen = HashSet::new();
    for layer in layers {
        validate_layer_name(&layer.name)?;
        if !seen.insert(layer.name.as_str()) {
            return Err(Error::InvalidIdentifier {
                name: layer.name.clone(),
                reason: "duplicate layer name".to_string(),
            });
        }
        validate_layer_shape(layer)?;
        if layer.scale != scale {
            return Err(Error::ScaleMismatch {
                layer: layer.name.clone(),
                layer_scale: layer.scale,
                scale,
            });
        }
    }
    Ok(build_module(layers, scale))
}

/// Generate the full Move module source.
pub fn generate(layers: &[QuantizedLayer], scale: u32) -> Result<String> {
    let module = lower(layers, scale)?;
    let source = emit_module(&module);
    log::info!(
        "generated module {}::{} ({} layers, {} bytes)",
        module.address,
        module.name,
        layers.len(),
        source.len()
    );
    Ok(source)
}

/// The declared shape must be non-empty and agree with every weight vector.
pub fn validate_layer_shape(layer: &QuantizedLayer) -> Result<()> {
    let (rows, cols) = layer.kernel_shape;
    if rows == 0 || cols == 0 || layer.bias_len != cols {
        return Err(Error::ShapeMismatch {
            layer: layer.name.clone(),
            kernel_shape: vec![rows, cols],
            bias_shape: vec![layer.bias_len],
        });
    }
    check_lengths(layer, TensorRole::Kernel, &layer.kernel, rows * cols)?;
    check_lengths(layer, TensorRole::Bias, &layer.bias, cols)
}

fn check_lengths(
    layer: &QuantizedLayer,
    tensor: TensorRole,
    values: &QuantizedTensor,
    expected: usize,
) -> Result<()> {
    if values.magnitudes.len() == expected && values.signs.len() == expected {
        return Ok(());
    }
    Err(Error::LengthMismatch {
        layer: layer.name.clone(),
        tensor,
        expected,
        magnitudes: values.magnitudes.len(),
        signs: values.signs.len(),
    })
}

/// Layer names become `b"..."` literals and parts of `let` bindings, so
/// they must be plain ASCII identifiers.
pub fn validate_layer_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier {
            name: String::new(),
            reason: "empty name".to_string(),
        });
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(Error::InvalidIdentifier {
            name: name.to_string(),
            reason: format!("character {:?} is not allowed", c),
        });
    }
    Ok(())
}
