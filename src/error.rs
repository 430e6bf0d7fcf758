use thiserror::Error;

/// Top-level error type covering every way a pipeline can fail.
#[derive(Debug, Error)]
pub enum TaskmillError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("Failed to serialize the store:\n{0}")]
    Store(#[from] serde_json::Error),
}

/// Registration-time errors. These indicate a programming mistake in how
/// tasks were declared and are never recovered automatically.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Key '{key}' is already provided by task '{existing}', task '{incoming}' cannot provide it as well")]
    ProviderConflict {
        key: Box<str>,
        existing: Box<str>,
        incoming: Box<str>,
    },

    #[error("Task '{0}' is already registered")]
    DuplicateTask(Box<str>),
}

/// Errors raised while deriving the dependency graph or its execution order.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Unable to resolve dependency '{key}' required by task '{task}'")]
    UnresolvedDependency { task: Box<str>, key: Box<str> },

    #[error("Cycle detected in the task graph at task '{0}'")]
    Cycle(Box<str>),
}

/// Errors raised while executing a pass. The first one aborts the run; the
/// store and change set keep whatever completed before the failure.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Task '{task}' needs the value of '{key}' which is not set")]
    MissingInput { task: Box<str>, key: Box<str> },

    #[error("Task '{task}' did not set the value of '{key}'")]
    ContractViolation { task: Box<str>, key: Box<str> },

    /// A task body failed. The original error is carried unchanged.
    #[error("Task '{0}':\n{1}")]
    Task(String, anyhow::Error),
}
