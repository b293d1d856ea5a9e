//! Public pipeline entry points.
//!
//! `extract -> quantize -> generate`, each stage consuming the whole output
//! of the previous one. Nothing touches the filesystem until every piece of
//! text has been produced.

use std::path::Path;

use crate::codegen;
use crate::config::Config;
use crate::error::Result;
use crate::model::{self, Model};
use crate::package::{self, PackageResult};
use crate::quantize::{self, QuantizedLayer};

/// Output of the in-memory pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compiled {
    pub layers: Vec<QuantizedLayer>,
    pub source: String,
    /// BLAKE3 of `source` (hex).
    pub digest: String,
}

/// Quantize a loaded model and generate its Move module.
pub fn compile_model(model: &Model, scale: u32) -> Result<Compiled> {
    let records = model::extract(model)?;
    let layers = quantize::quantize(&records, scale)?;
    let source = codegen::generate(&layers, scale)?;
    let digest = package::module_digest(&source);
    Ok(Compiled {
        layers,
        source,
        digest,
    })
}

/// Load a model file with the default loaders, then compile it.
pub fn compile_file(path: &Path, scale: u32) -> Result<Compiled> {
    let model = model::load_model(path, &model::default_loaders())?;
    compile_model(&model, scale)
}

/// Full pipeline from configuration to a Move package on disk.
pub fn build_package(config: &Config) -> Result<PackageResult> {
    let compiled = compile_file(&config.model_path, config.scale)?;
    let move_toml = package::generate_move_toml(&config.network);
    package::write_package(&config.output_dir, &move_toml, &compiled.source)
}
