//! Toolchain project-file writers.

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::generation::ResolvedProject;
use crate::ninja::NinjaEmitter;
use crate::types::{ProjectReference, ToolchainType};

/// What happened to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    Written,
    Unchanged,
    /// The toolchain does not build this project.
    Skipped,
}

impl Emitted {
    pub fn from_written(written: bool) -> Self {
        if written {
            Emitted::Written
        } else {
            Emitted::Unchanged
        }
    }
}

/// Writes one toolchain's project files.
pub trait Emitter {
    fn emit_project(&self, project: &ResolvedProject) -> Result<Emitted>;
    fn emit_solution(&self, solution: &str, projects: &[ProjectReference]) -> Result<Emitted>;
}

pub fn emitter_for(environment: &Environment, force: bool) -> Result<Box<dyn Emitter>> {
    match environment.toolchain {
        ToolchainType::Ninja => Ok(Box::new(NinjaEmitter::new(environment.clone(), force))),
        other => Err(Error::UnsupportedToolchain(other)),
    }
}
