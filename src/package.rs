//! Packaging: lay out a Move package for the generated graph module.
//!
//! `<out>/Move.toml` declares the Sui framework and `tensorflowsui`
//! dependencies; `<out>/sources/model.move` holds the generated module.
//! The BLAKE3 digest of the module text is returned so it can be compared
//! against what ends up published.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const MODULE_FILE: &str = "model.move";
pub const MANIFEST_FILE: &str = "Move.toml";

const SUI_GIT: &str = "https://github.com/MystenLabs/sui.git";
const SUI_SUBDIR: &str = "crates/sui-framework/packages/sui-framework";
const GRAPH_LIB_GIT: &str = "https://github.com/depinity/tensorflowsui.git";
const GRAPH_LIB_SUBDIR: &str = "tensorflowSuiLib/v.1.0.1";

/// Result of writing a package.
#[derive(Clone, Debug)]
pub struct PackageResult {
    pub package_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub module_path: PathBuf,
    /// BLAKE3 of the module source (hex).
    pub module_digest: String,
}

/// Move.toml contents for a given Sui network.
pub fn generate_move_toml(network: &str) -> String {
    let mut out = String::new();
    out.push_str("[package]\n");
    out.push_str("name = \"Model\"\n");
    out.push_str("edition = \"2024.beta\"\n");
    out.push('\n');
    out.push_str("[dependencies]\n");
    out.push_str(&format!(
        "Sui = {{ git = \"{}\", subdir = \"{}\", rev = \"framework/{}\" }}\n",
        SUI_GIT, SUI_SUBDIR, network
    ));
    out.push_str(&format!(
        "tensorflowsui = {{ git = \"{}\", subdir = \"{}\", rev = \"main\" }}\n",
        GRAPH_LIB_GIT, GRAPH_LIB_SUBDIR
    ));
    out.push('\n');
    out.push_str("[addresses]\n");
    out.push_str("models = \"0x0\"\n");
    out.push('\n');
    out.push_str("[dev-dependencies]\n");
    out.push('\n');
    out.push_str("[dev-addresses]\n");
    out
}

/// BLAKE3 hex digest of the module source.
pub fn module_digest(source: &str) -> String {
    blake3::hash(source.as_bytes()).to_hex().to_string()
}

/// Write `Move.toml` and `sources/model.move` under `package_dir`.
///
/// Both files are staged next to their targets and renamed into place,
/// module first. A failure removes whatever was staged, so the manifest
/// never appears without its module.
pub fn write_package(
    package_dir: &Path,
    move_toml: &str,
    module_source: &str,
) -> Result<PackageResult> {
    let sources = package_dir.join("sources");
    std::fs::create_dir_all(&sources).map_err(|e| io_error(&sources, e))?;

    let manifest_path = package_dir.join(MANIFEST_FILE);
    let module_path = sources.join(MODULE_FILE);
    let manifest_tmp = staging_path(&manifest_path);
    let module_tmp = staging_path(&module_path);

    let written = stage(&module_tmp, module_source)
        .and_then(|()| stage(&manifest_tmp, move_toml))
        .and_then(|()| commit(&module_tmp, &module_path))
        .and_then(|()| commit(&manifest_tmp, &manifest_path));
    if let Err(e) = written {
        for tmp in [&module_tmp, &manifest_tmp] {
            let _ = std::fs::remove_file(tmp);
        }
        return Err(e);
    }

    log::info!("wrote package to {}", package_dir.display());
    Ok(PackageResult {
        package_dir: package_dir.to_path_buf(),
        manifest_path,
        module_path,
        module_digest: module_digest(module_source),
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

fn stage(tmp: &Path, contents: &str) -> Result<()> {
    std::fs::write(tmp, contents).map_err(|e| io_error(tmp, e))
}

fn commit(tmp: &Path, target: &Path) -> Result<()> {
    std::fs::rename(tmp, target).map_err(|e| io_error(target, e))
}

fn io_error(path: &Path, e: std::io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
