//! The supported core backends, and the registry used to pick one by name.

use thiserror::Error;

use crate::engine::EngineError;
use crate::target::Target;

pub mod picorv32;
pub mod ri5cy;
mod slot;

pub use picorv32::PicoRv32;
pub use ri5cy::Ri5cy;

/// Errors raised while constructing a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unrecognized core: {0}")]
    UnknownCore(String),
    #[error("failed to construct execution engine")]
    Engine(#[from] EngineError),
}

/// A registered backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendEntry {
    pub name: &'static str,
    pub construct: fn() -> Result<Box<dyn Target>, EngineError>,
}

/// Every backend the server knows about.
pub const BACKENDS: &[BackendEntry] = &[
    BackendEntry {
        name: picorv32::NAME,
        construct: new_picorv32,
    },
    BackendEntry {
        name: ri5cy::NAME,
        construct: new_ri5cy,
    },
];

fn new_picorv32() -> Result<Box<dyn Target>, EngineError> {
    Ok(Box::new(PicoRv32::new()?))
}

fn new_ri5cy() -> Result<Box<dyn Target>, EngineError> {
    Ok(Box::new(Ri5cy::new()?))
}

/// Look up a backend by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<&'static BackendEntry> {
    BACKENDS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

/// Names of every registered backend, for help text.
pub fn names() -> impl Iterator<Item = &'static str> {
    BACKENDS.iter().map(|b| b.name)
}

/// Construct the backend called `name`.
pub fn new_target(name: &str) -> Result<Box<dyn Target>, BackendError> {
    let entry = lookup(name).ok_or_else(|| BackendError::UnknownCore(name.to_string()))?;
    Ok((entry.construct)()?)
}
