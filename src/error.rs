//! Pipeline errors.
//!
//! Every stage fails fast: the first error aborts the whole run and nothing
//! is written. Variants carry enough context (layer, tensor, flat index,
//! value) to locate the cause without re-running.

use std::fmt;
use std::path::Path;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Which parameter tensor of a layer an element belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorRole {
    Kernel,
    Bias,
}

impl fmt::Display for TensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorRole::Kernel => write!(f, "kernel"),
            TensorRole::Bias => write!(f, "bias"),
        }
    }
}

/// Position of an element inside a model: layer, tensor and flat index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementLocation {
    pub layer: String,
    pub tensor: TensorRole,
    pub index: usize,
}

impl fmt::Display for ElementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer '{}' {}[{}]", self.layer, self.tensor, self.index)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Non-finite input to the fixed-point codec.
    InvalidValue {
        value: f64,
        location: Option<ElementLocation>,
    },
    /// Quantized magnitude does not fit in a u64.
    MagnitudeOverflow {
        value: f64,
        scale: u32,
        location: Option<ElementLocation>,
    },
    /// Kernel/bias shapes of a layer do not line up.
    ShapeMismatch {
        layer: String,
        kernel_shape: Vec<usize>,
        bias_shape: Vec<usize>,
    },
    /// A quantized tensor's vectors disagree with the layer shape.
    LengthMismatch {
        layer: String,
        tensor: TensorRole,
        expected: usize,
        magnitudes: usize,
        signs: usize,
    },
    /// The model file could not be turned into a model by any loader.
    ModelLoad { path: String, notes: Vec<String> },
    /// Layer name unusable as a Move identifier or byte string.
    InvalidIdentifier { name: String, reason: String },
    /// No dense layers left to generate code for.
    EmptyModel,
    /// A layer was quantized at a different scale than the module uses.
    ScaleMismatch {
        layer: String,
        layer_scale: u32,
        scale: u32,
    },
    /// Malformed or incomplete configuration.
    Config(Diagnostic),
    /// Filesystem failure while writing the package.
    Io { path: String, message: String },
}

impl Error {
    /// Attach an element location to a codec error.
    pub fn at(self, loc: ElementLocation) -> Self {
        match self {
            Error::InvalidValue { value, .. } => Error::InvalidValue {
                value,
                location: Some(loc),
            },
            Error::MagnitudeOverflow { value, scale, .. } => Error::MagnitudeOverflow {
                value,
                scale,
                location: Some(loc),
            },
            other => other,
        }
    }

    /// Convert into a diagnostic for CLI rendering.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Error::Config(diag) => diag.clone(),
            Error::ModelLoad { path, notes } => {
                let mut diag = Diagnostic::error(self.to_string(), Span::dummy());
                for note in notes {
                    diag = diag.with_note(note.clone());
                }
                if is_hdf5_path(path) {
                    diag.with_help(
                        "HDF5 (.h5) models cannot be read directly; re-export the weights \
                         with `safetensors.tensorflow.save_file` or as a JSON weight dump"
                            .to_string(),
                    )
                } else {
                    diag.with_help(
                        "export the model as .safetensors or as a JSON weight dump".to_string(),
                    )
                }
            }
            Error::MagnitudeOverflow { .. } => {
                Diagnostic::error(self.to_string(), Span::dummy())
                    .with_help("lower SCALE so every |weight| * 10^SCALE fits in u64".to_string())
            }
            Error::InvalidIdentifier { .. } => {
                Diagnostic::error(self.to_string(), Span::dummy()).with_help(
                    "rename the layer to use only ASCII letters, digits and '_'".to_string(),
                )
            }
            _ => Diagnostic::error(self.to_string(), Span::dummy()),
        }
    }
}

fn is_hdf5_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("h5") || ext.eq_ignore_ascii_case("hdf5"))
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidValue { value, location } => {
                write!(f, "invalid value {} (not finite)", value)?;
                if let Some(loc) = location {
                    write!(f, " at {}", loc)?;
                }
                Ok(())
            }
            Error::MagnitudeOverflow {
                value,
                scale,
                location,
            } => {
                write!(
                    f,
                    "magnitude of {} at scale {} overflows u64",
                    value, scale
                )?;
                if let Some(loc) = location {
                    write!(f, " at {}", loc)?;
                }
                Ok(())
            }
            Error::ShapeMismatch {
                layer,
                kernel_shape,
                bias_shape,
            } => write!(
                f,
                "shape mismatch in layer '{}': kernel {:?} does not match bias {:?}",
                layer, kernel_shape, bias_shape
            ),
            Error::LengthMismatch {
                layer,
                tensor,
                expected,
                magnitudes,
                signs,
            } => write!(
                f,
                "layer '{}' {} has {} magnitudes and {} signs, expected {}",
                layer, tensor, magnitudes, signs, expected
            ),
            Error::ModelLoad { path, .. } => write!(f, "cannot load model '{}'", path),
            Error::InvalidIdentifier { name, reason } => {
                write!(f, "invalid layer name {:?}: {}", name, reason)
            }
            Error::EmptyModel => write!(f, "model has no dense layers with a kernel and a bias"),
            Error::ScaleMismatch {
                layer,
                layer_scale,
                scale,
            } => write!(
                f,
                "layer '{}' was quantized at scale {} but the module uses scale {}",
                layer, layer_scale, scale
            ),
            Error::Config(diag) => write!(f, "{}", diag.message),
            Error::Io { path, message } => write!(f, "cannot write '{}': {}", path, message),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> ElementLocation {
        ElementLocation {
            layer: "dense_1".to_string(),
            tensor: TensorRole::Bias,
            index: 3,
        }
    }

    #[test]
    fn test_at_annotates_codec_errors() {
        let err = Error::InvalidValue {
            value: f64::NAN,
            location: None,
        }
        .at(loc());
        assert_eq!(
            err.to_string(),
            "invalid value NaN (not finite) at layer 'dense_1' bias[3]"
        );
    }

    #[test]
    fn test_at_leaves_other_errors_alone() {
        let err = Error::EmptyModel.at(loc());
        assert_eq!(err, Error::EmptyModel);
    }

    #[test]
    fn test_overflow_message() {
        let err = Error::MagnitudeOverflow {
            value: 1e30,
            scale: 2,
            location: Some(loc()),
        };
        let msg = err.to_string();
        assert!(msg.contains("scale 2"));
        assert!(msg.contains("bias[3]"));
        assert!(err.to_diagnostic().help.is_some());
    }

    #[test]
    fn test_model_load_notes_become_diagnostic_notes() {
        let err = Error::ModelLoad {
            path: "m.bin".to_string(),
            notes: vec!["safetensors: bad header".to_string(), "json: eof".to_string()],
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.message, "cannot load model 'm.bin'");
        assert_eq!(diag.notes.len(), 2);
        assert!(!diag.help.unwrap().contains("HDF5"));
    }

    #[test]
    fn test_h5_model_gets_export_help() {
        for path in ["models/mnist.h5", "weights.HDF5"] {
            let err = Error::ModelLoad {
                path: path.to_string(),
                notes: vec!["json: expected value".to_string()],
            };
            let help = err.to_diagnostic().help.unwrap();
            assert!(help.contains("HDF5"), "{}", path);
            assert!(help.contains("safetensors"));
        }
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = Error::LengthMismatch {
            layer: "dense".to_string(),
            tensor: TensorRole::Kernel,
            expected: 4,
            magnitudes: 3,
            signs: 1,
        };
        assert_eq!(
            err.to_string(),
            "layer 'dense' kernel has 3 magnitudes and 1 signs, expected 4"
        );
    }
}
