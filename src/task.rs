use std::fmt::Debug;
use std::sync::Arc;

use crate::params::Params;
use crate::store::{Store, Value};

/// Result from a single executed task body.
pub type TaskResult<T> = anyhow::Result<T, anyhow::Error>;

/// What a task body reports back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The body did its work. Every provided key must now hold a value, and
    /// all of them are recorded as changed for this pass.
    Ran,
    /// The body decided there was nothing to do. Provided keys are left
    /// untouched and not recorded as changed.
    Skipped,
}

/// Category tag for grouping and reporting. Has no effect on scheduling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskKind {
    #[default]
    Misc,
    Framework,
    Backend,
    Toolchain,
    Target,
    Frontend,
    Opt,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Misc => "misc",
            TaskKind::Framework => "framework",
            TaskKind::Backend => "backend",
            TaskKind::Toolchain => "toolchain",
            TaskKind::Target => "target",
            TaskKind::Frontend => "frontend",
            TaskKind::Opt => "opt",
        }
    }
}

/// A single input key of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: Box<str>,
    /// Hard requirements are checked before the body runs; the engine fails
    /// fast when one is unset. Soft requirements are simply absent.
    pub hard: bool,
}

/// Task body function pointer. Receives the shared store, the concrete
/// parameter combination for this variant, and the `rebuild` flag signalling
/// that an upstream key changed during the current pass.
pub(crate) type TaskFnPtr =
    Arc<dyn Fn(&mut Store, &Params, bool) -> TaskResult<Outcome> + Send + Sync>;

/// Validator predicate deciding whether one parameter combination is legal
/// given the current store contents.
pub(crate) type ValidatorFnPtr = Arc<dyn Fn(&Store, &Params) -> bool + Send + Sync>;

/// A named unit of work with declared inputs, outputs and parameter axes.
///
/// Registered once through [`Registry::task`](crate::Registry::task) and
/// never mutated afterwards.
pub(crate) struct Task {
    pub name: Box<str>,
    pub kind: TaskKind,
    /// Required keys, in declaration order.
    pub requires: Vec<Requirement>,
    /// Keys this task is responsible for producing.
    pub provides: Vec<Box<str>>,
    /// Parameter axes, in declaration order. Axes compose via cartesian
    /// product into the task's variant set.
    pub axes: Vec<(Box<str>, Vec<Value>)>,
    pub validator: Option<ValidatorFnPtr>,
    pub body: TaskFnPtr,
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({})", self.name)
    }
}
