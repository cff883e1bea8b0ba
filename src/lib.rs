pub mod configuration;
pub mod depgraph;
pub mod discovery;
pub mod emit;
pub mod environment;
pub mod error;
pub mod fileutils;
pub mod generation;
pub mod manifest;
pub mod naming;
pub mod ninja;
pub mod rules;
pub mod types;

pub use error::{Error, Result};
