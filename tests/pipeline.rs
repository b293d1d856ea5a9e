use std::path::Path;

use opengraph::config::Config;
use opengraph::{build_package, compile_file, Error};
use safetensors::tensor::{Dtype, TensorView};

/// Kernel/bias values exactly representable in f32, so the JSON and
/// safetensors exports of the same model agree bit for bit.
const DENSE_KERNEL: [f32; 6] = [0.5, -0.25, 1.0, -1.5, 0.0, 2.25];
const DENSE_BIAS: [f32; 3] = [0.125, -0.125, 0.0];
const OUT_KERNEL: [f32; 3] = [1.0, -0.75, 0.0625];
const OUT_BIAS: [f32; 1] = [-0.5];

fn json_list(values: &[f32]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{}", v)).collect();
    format!("[{}]", items.join(", "))
}

fn write_json_model(path: &Path) {
    let json = format!(
        r#"{{
  "layers": [
    {{ "name": "flatten", "weights": [] }},
    {{ "name": "dense", "weights": [
      {{ "shape": [2, 3], "data": {} }},
      {{ "shape": [3], "data": {} }}
    ] }},
    {{ "name": "dropout" }},
    {{ "name": "dense_1", "weights": [
      {{ "shape": [3, 1], "data": {} }},
      {{ "shape": [1], "data": {} }}
    ] }}
  ]
}}"#,
        json_list(&DENSE_KERNEL),
        json_list(&DENSE_BIAS),
        json_list(&OUT_KERNEL),
        json_list(&OUT_BIAS)
    );
    std::fs::write(path, json).unwrap();
}

fn write_safetensors_model(path: &Path) {
    let tensors: Vec<(&str, Vec<usize>, Vec<u8>)> = vec![
        ("dense/kernel:0", vec![2, 3], le_bytes(&DENSE_KERNEL)),
        ("dense/bias:0", vec![3], le_bytes(&DENSE_BIAS)),
        ("dense_1/kernel:0", vec![3, 1], le_bytes(&OUT_KERNEL)),
        ("dense_1/bias:0", vec![1], le_bytes(&OUT_BIAS)),
    ];
    let views: Vec<(String, TensorView<'_>)> = tensors
        .iter()
        .map(|(name, shape, buf)| {
            (
                name.to_string(),
                TensorView::new(Dtype::F32, shape.clone(), buf).unwrap(),
            )
        })
        .collect();
    let mut meta = std::collections::HashMap::new();
    meta.insert("layers".to_string(), "dense,dense_1".to_string());
    let bytes = safetensors::serialize(views, &Some(meta)).unwrap();
    std::fs::write(path, bytes).unwrap();
}

fn le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn config(model_path: &Path, out: &Path) -> Config {
    Config {
        model_path: model_path.to_path_buf(),
        scale: 4,
        network: "testnet".to_string(),
        output_dir: out.to_path_buf(),
    }
}

#[test]
fn test_build_package_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.json");
    write_json_model(&model);
    let out = dir.path().join("pkg");

    let result = build_package(&config(&model, &out)).unwrap();
    let source = std::fs::read_to_string(out.join("sources/model.move")).unwrap();
    let manifest = std::fs::read_to_string(out.join("Move.toml")).unwrap();

    assert!(source.starts_with("module models::model {\n"));
    assert!(source.contains("let wdense_mag = vector[5000, 2500, 10000, 15000, 0, 22500];"));
    assert!(source.contains("let wdense_sign = vector[0, 1, 0, 1, 0, 0];"));
    assert!(source.contains("let bdense_1_mag = vector[5000];"));
    assert!(source.contains("let bdense_1_sign = vector[1];"));
    assert!(!source.contains("flatten"));
    assert!(!source.contains("dropout"));
    assert!(manifest.contains("rev = \"framework/testnet\""));
    assert_eq!(result.module_digest, opengraph::package::module_digest(&source));
}

#[test]
fn test_json_and_safetensors_agree() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("model.json");
    let st = dir.path().join("model.safetensors");
    write_json_model(&json);
    write_safetensors_model(&st);

    let a = compile_file(&json, 4).unwrap();
    let b = compile_file(&st, 4).unwrap();
    assert_eq!(a.source, b.source);
    assert_eq!(a.digest, b.digest);
}

#[test]
fn test_rebuild_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.safetensors");
    write_safetensors_model(&model);

    let first = build_package(&config(&model, &dir.path().join("a"))).unwrap();
    let second = build_package(&config(&model, &dir.path().join("b"))).unwrap();
    assert_eq!(first.module_digest, second.module_digest);
    assert_eq!(
        std::fs::read(&first.module_path).unwrap(),
        std::fs::read(&second.module_path).unwrap()
    );
}

#[test]
fn test_config_file_drives_build() {
    let dir = tempfile::tempdir().unwrap();
    write_json_model(&dir.path().join("model.json"));
    let config_path = dir.path().join("config.txt");
    std::fs::write(
        &config_path,
        "MODEL_PATH = \"model.json\";\nSCALE = 2\nNETWORK = devnet\nOUTPUT_DIR = move_pkg\n",
    )
    .unwrap();

    let cfg = Config::load(&config_path).unwrap();
    let result = build_package(&cfg).unwrap();
    assert_eq!(result.package_dir, dir.path().join("move_pkg"));
    let source = std::fs::read_to_string(&result.module_path).unwrap();
    assert!(source.contains("create_model_signed_fixed(&mut graph, 2);"));
    let manifest = std::fs::read_to_string(&result.manifest_path).unwrap();
    assert!(manifest.contains("rev = \"framework/devnet\""));
}

#[test]
fn test_unreadable_model_reports_every_loader() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.h5");
    std::fs::write(&model, b"\x89HDF\r\n\x1a\n").unwrap();
    match compile_file(&model, 2) {
        Err(err @ Error::ModelLoad { .. }) => {
            let diag = err.to_diagnostic();
            assert_eq!(diag.notes.len(), 2);
            assert!(diag.help.unwrap().contains("HDF5"));
        }
        other => panic!("expected ModelLoad, got {:?}", other.map(|c| c.digest)),
    }
}

#[test]
fn test_partial_config_completed_by_overrides() {
    use opengraph::config::Overrides;

    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.json");
    write_json_model(&model);
    let config_path = dir.path().join("config.txt");
    std::fs::write(&config_path, "NETWORK = devnet\nOUTPUT_DIR = pkg\n").unwrap();

    let overrides = Overrides {
        model_path: Some(model),
        scale: Some(4),
        ..Overrides::default()
    };
    let cfg = Config::load_with(&config_path, &overrides).unwrap();
    let result = build_package(&cfg).unwrap();
    assert_eq!(result.package_dir, dir.path().join("pkg"));
    let manifest = std::fs::read_to_string(&result.manifest_path).unwrap();
    assert!(manifest.contains("rev = \"framework/devnet\""));
}

#[test]
fn test_missing_model_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = compile_file(&dir.path().join("absent.json"), 2);
    assert!(matches!(result, Err(Error::ModelLoad { .. })));
}
