use std::path::PathBuf;

use clap::Args;

use opengraph::model::{default_loaders, extract, load_model};

use super::fail;

#[derive(Args)]
pub struct InspectArgs {
    /// Model file (.safetensors or .json)
    pub model: PathBuf,
}

pub fn cmd_inspect(args: InspectArgs) {
    let model = match load_model(&args.model, &default_loaders()) {
        Ok(m) => m,
        Err(e) => fail(&e, None),
    };
    let records = match extract(&model) {
        Ok(r) => r,
        Err(e) => fail(&e, None),
    };

    eprintln!(
        "{}: {} layers, {} dense",
        args.model.display(),
        model.layers.len(),
        records.len()
    );
    for layer in &model.layers {
        match records.iter().find(|r| r.name == layer.name) {
            Some(record) => println!(
                "{:<24} {:>6} x {:<6} bias {:?}",
                record.name,
                record.input_size(),
                record.output_size(),
                record.bias.shape()
            ),
            None => println!(
                "{:<24} skipped ({} parameter tensors)",
                layer.name,
                layer.params.len()
            ),
        }
    }
}
