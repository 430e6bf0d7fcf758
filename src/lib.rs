#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod engine;
mod error;
mod graph;
mod params;
mod registry;
mod store;
mod task;
mod utils;

pub use crate::engine::Pipeline;
pub use crate::error::{GraphError, RegistryError, RunError, TaskmillError};
pub use crate::params::Params;
pub use crate::registry::{Registry, TaskDef};
pub use crate::store::{Store, Value};
pub use crate::task::{Outcome, TaskKind, TaskResult};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
