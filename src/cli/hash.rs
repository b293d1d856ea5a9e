use std::path::PathBuf;

use clap::Args;

use super::fail;

#[derive(Args)]
pub struct HashArgs {
    /// Model file (.safetensors or .json)
    pub model: PathBuf,
    /// Decimal scale
    #[arg(long)]
    pub scale: u32,
}

pub fn cmd_hash(args: HashArgs) {
    let compiled = match opengraph::compile_file(&args.model, args.scale) {
        Ok(c) => c,
        Err(e) => fail(&e, None),
    };
    let elements: usize = compiled
        .layers
        .iter()
        .map(|l| l.kernel.len() + l.bias.len())
        .sum();
    eprintln!(
        "{} layers, {} weights, {} bytes of Move",
        compiled.layers.len(),
        elements,
        compiled.source.len()
    );
    println!("{} {}", compiled.digest, args.model.display());
}
