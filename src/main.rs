use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(
    name = "opengraph",
    version,
    about = "Quantize dense network weights and generate a Sui Move graph module"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Quantize a model and write a Move package
    Build(cli::build::BuildArgs),
    /// List the dense layers a model file contains
    Inspect(cli::inspect::InspectArgs),
    /// Print the digest of the module a model would generate
    Hash(cli::hash::HashArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Inspect(args) => cli::inspect::cmd_inspect(args),
        Command::Hash(args) => cli::hash::cmd_hash(args),
    }
}
