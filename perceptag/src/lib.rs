pub mod corpus;
pub mod error;
pub mod extractor;
pub mod perceptron;
pub mod tagset;
pub mod trainer;
pub mod weights;

pub use error::{Error, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}
