use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::Pipeline;
use crate::error::{GraphError, RegistryError};
use crate::params::Params;
use crate::store::{Store, Value};
use crate::task::{Outcome, Requirement, Task, TaskKind, TaskResult, ValidatorFnPtr};

/// The set of registered tasks for one pipeline.
///
/// `Registry` is used to declare the tasks of your pipeline and wire them
/// together through the keys they require and provide. Once every task is
/// registered, convert it into a [`Pipeline`] with [`finish`](Self::finish)
/// to execute the graph.
///
/// # Example
///
/// ```rust,no_run
/// use taskmill::{Outcome, Registry};
///
/// let mut registry = Registry::new();
/// registry
///     .task("clone")
///     .provides(["repo.dir"])
///     .run(|store, _params, _rebuild| {
///         store.set("repo.dir", "/tmp/checkout");
///         Ok(Outcome::Ran)
///     })?;
/// # Ok::<(), taskmill::RegistryError>(())
/// ```
#[derive(Default)]
pub struct Registry {
    /// Registered tasks, in registration order.
    pub(crate) tasks: Vec<Task>,
    /// Maps each provided key to the index of its owning task.
    providers: BTreeMap<Box<str>, usize>,
    /// Initial inputs seeded by the caller, in seeding order.
    seeds: Vec<(Box<str>, Value)>,
}

impl Registry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an initial input value into the pipeline's store.
    ///
    /// Seeded keys count as externally provided, so tasks may require them
    /// without any registered task providing them. Seeds are not recorded in
    /// the change set.
    pub fn seed(&mut self, key: impl Into<Box<str>>, value: impl Into<Value>) {
        self.seeds.push((key.into(), value.into()));
    }

    /// Opens a fluent definition for a new task. Registration happens when
    /// [`TaskDef::run`] is called with the task body.
    pub fn task(&mut self, name: impl Into<Box<str>>) -> TaskDef<'_> {
        TaskDef {
            registry: self,
            name: name.into(),
            kind: TaskKind::default(),
            requires: Vec::new(),
            provides: Vec::new(),
            axes: Vec::new(),
            validator: None,
        }
    }

    /// Index of the task providing `key`, if one is registered.
    pub(crate) fn provider_index(&self, key: &str) -> Option<usize> {
        self.providers.get(key).copied()
    }

    /// Whether `key` was seeded by the caller.
    pub(crate) fn is_seeded(&self, key: &str) -> bool {
        self.seeds.iter().any(|(seeded, _)| seeded.as_ref() == key)
    }

    /// Seeded (key, value) pairs, in seeding order.
    pub(crate) fn seeds(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.seeds
            .iter()
            .map(|(key, value)| (key.as_ref(), value))
    }

    /// Derives the dependency graph, computes the execution order once and
    /// returns a runnable [`Pipeline`].
    pub fn finish(self) -> Result<Pipeline, GraphError> {
        Pipeline::new(self)
    }

    fn add_task(&mut self, task: Task) -> Result<(), RegistryError> {
        if self.tasks.iter().any(|existing| existing.name == task.name) {
            return Err(RegistryError::DuplicateTask(task.name));
        }

        for key in &task.provides {
            if let Some(&existing) = self.providers.get(key) {
                return Err(RegistryError::ProviderConflict {
                    key: key.clone(),
                    existing: self.tasks[existing].name.clone(),
                    incoming: task.name,
                });
            }
        }

        let index = self.tasks.len();
        for key in &task.provides {
            self.providers.insert(key.clone(), index);
        }
        self.tasks.push(task);

        Ok(())
    }
}

/// Fluent builder for a single task definition.
///
/// Calls may be chained in any order; [`run`](Self::run) finalizes the
/// registration. Repeated [`requires`](Self::requires) or
/// [`param`](Self::param) calls extend the declaration rather than replace
/// it.
pub struct TaskDef<'a> {
    registry: &'a mut Registry,
    name: Box<str>,
    kind: TaskKind,
    requires: Vec<Requirement>,
    provides: Vec<Box<str>>,
    axes: Vec<(Box<str>, Vec<Value>)>,
    validator: Option<ValidatorFnPtr>,
}

impl<'a> TaskDef<'a> {
    /// Category tag used for grouping and reporting.
    pub fn category(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    /// Declares hard input keys. The engine refuses to invoke the body while
    /// any of them is unset.
    pub fn requires<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.requires.extend(keys.into_iter().map(|key| Requirement {
            key: key.into(),
            hard: true,
        }));
        self
    }

    /// Declares soft input keys. They still wire a dependency edge, but a
    /// missing value is simply absent from the store when the body runs.
    pub fn optional<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.requires.extend(keys.into_iter().map(|key| Requirement {
            key: key.into(),
            hard: false,
        }));
        self
    }

    /// Declares the keys this task is responsible for producing. Every key
    /// may have at most one provider across the registry.
    pub fn provides<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.provides.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Adds one parameter axis. Multiple axes compose via cartesian product
    /// into the task's variant set.
    pub fn param<I, V>(mut self, flag: impl Into<Box<str>>, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.axes.push((
            flag.into(),
            options.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Attaches a validator predicate deciding whether one parameter
    /// combination is legal given the current store contents. Rejected
    /// combinations are pruned silently.
    pub fn validate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Store, &Params) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(predicate));
        self
    }

    /// Finalizes the registration with the executable body.
    pub fn run<F>(self, body: F) -> Result<(), RegistryError>
    where
        F: Fn(&mut Store, &Params, bool) -> TaskResult<Outcome> + Send + Sync + 'static,
    {
        self.registry.add_task(Task {
            name: self.name,
            kind: self.kind,
            requires: self.requires,
            provides: self.provides,
            axes: self.axes,
            validator: self.validator,
            body: Arc::new(body),
        })
    }
}
