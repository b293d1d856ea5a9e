//! Loaded models and the dense layers extracted from them.

pub mod extract;
pub mod loader;

pub use extract::{extract, LayerRecord};
pub use loader::{
    default_loaders, load_model, JsonLoader, LoadFailure, ModelLoader, SafetensorsLoader,
};

use crate::tensor::Tensor;

/// A layer as reported by the model: a name and its parameter tensors in
/// the order the model stores them.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelLayer {
    pub name: String,
    pub params: Vec<Tensor>,
}

impl ModelLayer {
    pub fn new(name: impl Into<String>, params: Vec<Tensor>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Opaque handle to a loaded model: layers in declared order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub layers: Vec<ModelLayer>,
}

impl Model {
    pub fn new(layers: Vec<ModelLayer>) -> Self {
        Self { layers }
    }

    pub fn layer(&self, name: &str) -> Option<&ModelLayer> {
        self.layers.iter().find(|l| l.name == name)
    }
}
