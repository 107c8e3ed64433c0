pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod kind;
pub mod matcher;
pub mod paths;
pub mod render;
pub mod review;
pub mod tree;
pub mod validation;

pub use error::{Error, Result};
