use std::path::{Path, PathBuf};

use clap::Args;

use opengraph::config::{Config, Overrides};

use super::{fail, load_config};

#[derive(Args)]
pub struct BuildArgs {
    /// Config file with MODEL_PATH and SCALE (default: ./config.txt)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Model file (.safetensors or .json); overrides MODEL_PATH
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,
    /// Decimal scale; overrides SCALE
    #[arg(long)]
    pub scale: Option<u32>,
    /// Sui network for the framework dependency; overrides NETWORK
    #[arg(long)]
    pub network: Option<String>,
    /// Package output directory; overrides OUTPUT_DIR
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

pub fn cmd_build(args: BuildArgs) {
    let BuildArgs {
        config,
        model,
        scale,
        network,
        output,
    } = args;
    let overrides = Overrides {
        model_path: model,
        scale,
        network,
        output_dir: output,
    };

    // An explicit --config must exist; the default one is optional.
    let explicit = config.is_some();
    let config_path = config.unwrap_or_else(|| PathBuf::from("config.txt"));
    let from_file = explicit || config_path.exists();
    let cfg = if from_file {
        load_config(&config_path, &overrides)
    } else {
        match Config::parse_with("", Path::new(""), &overrides) {
            Ok(cfg) => cfg,
            Err(e) => fail(&e, None),
        }
    };

    log::info!(
        "building {} at scale {} for {}",
        cfg.model_path.display(),
        cfg.scale,
        cfg.network
    );
    let config_ref = from_file.then_some(config_path.as_path());
    match opengraph::build_package(&cfg) {
        Ok(result) => {
            eprintln!("Generated -> {}", result.module_path.display());
            eprintln!("  {}", result.manifest_path.display());
            println!("{}", result.module_digest);
        }
        Err(e) => fail(&e, config_ref),
    }
}
