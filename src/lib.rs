pub mod api;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod fixed;
pub mod model;
pub mod package;
pub mod quantize;
pub mod span;
pub mod tensor;

// Public API: `opengraph::compile_model()` etc.
pub use api::*;
pub use error::{Error, Result};
pub use fixed::FixedPoint;
