pub mod build;
pub mod hash;
pub mod inspect;

use std::path::Path;
use std::process;

use opengraph::config::{Config, Overrides};
use opengraph::Error;

/// Report an error and exit with status 1.
///
/// Config errors that point into the config file are rendered against its
/// source; everything else prints as a plain diagnostic.
pub fn fail(err: &Error, config_path: Option<&Path>) -> ! {
    let diag = err.to_diagnostic();
    match (err, config_path) {
        (Error::Config(_), Some(path)) if !diag.span.is_dummy() => {
            match std::fs::read_to_string(path) {
                Ok(source) => diag.render(&path.display().to_string(), &source),
                Err(_) => diag.print(),
            }
        }
        _ => diag.print(),
    }
    process::exit(1);
}

/// Load a config file with command-line overrides applied, or exit.
pub fn load_config(path: &Path, overrides: &Overrides) -> Config {
    match Config::load_with(path, overrides) {
        Ok(config) => config,
        Err(e) => fail(&e, Some(path)),
    }
}
