//! Model loading strategies.
//!
//! A model file is handed to a ranked list of loaders. The first loader that
//! understands the bytes wins; if none does, every loader's reason is kept
//! so the user can see why each format was rejected.

mod json;
mod safetensors;

pub use self::json::JsonLoader;
pub use self::safetensors::SafetensorsLoader;

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

use super::Model;

/// Why a loader rejected a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    pub loader: &'static str,
    pub reason: String,
}

impl LoadFailure {
    pub fn new(loader: &'static str, reason: impl Into<String>) -> Self {
        Self {
            loader,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loader, self.reason)
    }
}

/// One way of turning raw file bytes into a [`Model`].
pub trait ModelLoader {
    /// Short loader name used in failure notes (e.g. "safetensors").
    fn name(&self) -> &'static str;
    fn load(&self, bytes: &[u8]) -> Result<Model, LoadFailure>;
}

/// Loaders in the order they are tried.
pub fn default_loaders() -> Vec<Box<dyn ModelLoader>> {
    vec![Box::new(SafetensorsLoader), Box::new(JsonLoader)]
}

/// Try each loader in turn on the bytes of `path`.
pub fn load_model(path: &Path, loaders: &[Box<dyn ModelLoader>]) -> Result<Model> {
    let bytes = std::fs::read(path).map_err(|e| Error::ModelLoad {
        path: path.display().to_string(),
        notes: vec![e.to_string()],
    })?;
    load_bytes(&bytes, &path.display().to_string(), loaders)
}

/// Try each loader in turn on an in-memory model.
pub fn load_bytes(bytes: &[u8], origin: &str, loaders: &[Box<dyn ModelLoader>]) -> Result<Model> {
    let mut failures = Vec::new();
    for loader in loaders {
        match loader.load(bytes) {
            Ok(model) => {
                log::info!(
                    "loaded '{}' with the {} loader ({} layers)",
                    origin,
                    loader.name(),
                    model.layers.len()
                );
                return Ok(model);
            }
            Err(failure) => {
                log::debug!("{} rejected '{}': {}", failure.loader, origin, failure.reason);
                failures.push(failure);
            }
        }
    }
    Err(Error::ModelLoad {
        path: origin.to_string(),
        notes: failures.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelLayer;

    struct Fails;

    impl ModelLoader for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }
        fn load(&self, _bytes: &[u8]) -> Result<Model, LoadFailure> {
            Err(LoadFailure::new("fails", "never works"))
        }
    }

    struct Named(&'static str);

    impl ModelLoader for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn load(&self, _bytes: &[u8]) -> Result<Model, LoadFailure> {
            Ok(Model::new(vec![ModelLayer::new(self.0, vec![])]))
        }
    }

    #[test]
    fn test_first_success_wins() {
        let loaders: Vec<Box<dyn ModelLoader>> =
            vec![Box::new(Fails), Box::new(Named("first")), Box::new(Named("second"))];
        let model = load_bytes(b"", "mem", &loaders).unwrap();
        assert_eq!(model.layers[0].name, "first");
    }

    #[test]
    fn test_all_failures_are_reported() {
        let model = load_bytes(b"not a model", "mem", &default_loaders());
        match model {
            Err(Error::ModelLoad { path, notes }) => {
                assert_eq!(path, "mem");
                assert_eq!(notes.len(), 2);
                assert!(notes[0].starts_with("safetensors: "));
                assert!(notes[1].starts_with("json: "));
            }
            other => panic!("expected ModelLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.safetensors");
        assert!(matches!(
            load_model(&missing, &default_loaders()),
            Err(Error::ModelLoad { .. })
        ));
    }
}
