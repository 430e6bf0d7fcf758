use std::time::Instant;

use console::style;
use indicatif::ProgressBar;
use tracing::info;

use crate::error::{GraphError, RunError};
use crate::graph::TaskGraph;
use crate::params::{self, Params};
use crate::registry::Registry;
use crate::store::Store;
use crate::task::{Outcome, Task, TaskKind};

/// Drives the ordered task list.
///
/// A `Pipeline` is created from a [`Registry`] via
/// [`Registry::finish`](crate::Registry::finish), which derives the
/// dependency graph and computes the execution order exactly once. The
/// pipeline owns the shared [`Store`] and the change set, both of which
/// persist across passes within a session.
pub struct Pipeline {
    registry: Registry,
    /// Execution order, as indices into the registry's task list.
    order: Vec<usize>,
    store: Store,
    /// Keys rewritten by successful invocations, in first-write order.
    changed: Vec<Box<str>>,
}

impl Pipeline {
    pub(crate) fn new(registry: Registry) -> Result<Self, GraphError> {
        let graph = TaskGraph::build(&registry)?;
        let order = graph.execution_order(&registry)?;

        let mut store = Store::new();
        for (key, value) in registry.seeds() {
            store.set(key, value.clone());
        }

        Ok(Self {
            registry,
            order,
            store,
            changed: Vec::new(),
        })
    }

    /// Read access to the shared store, e.g. to inspect final outputs.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Write access to the shared store, e.g. to reseed inputs between
    /// passes.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Keys written successfully during the current session, in first-write
    /// order.
    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(|key| key.as_ref())
    }

    /// Clears the change set, so that the next pass starts with a clean
    /// slate. Typically called between passes of a multi-pass session.
    pub fn reset_changes(&mut self) {
        self.changed.clear();
    }

    /// Task names in execution order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(|&index| self.registry.tasks[index].name.as_ref())
    }

    /// Registered tasks with their category, in execution order.
    pub fn tasks(&self) -> impl Iterator<Item = (&str, TaskKind)> {
        self.order.iter().map(|&index| {
            let task = &self.registry.tasks[index];
            (task.name.as_ref(), task.kind)
        })
    }

    /// Runs a single pass over every task in topological order.
    ///
    /// With `progress` enabled a visual counter advances once per (task,
    /// variant) pair; otherwise a log line is emitted per pair. The first
    /// failure aborts the pass; the store and change set keep whatever
    /// completed before it.
    ///
    /// Returns the keys recorded as changed, in first-write order.
    pub fn run_all(&mut self, progress: bool) -> Result<Vec<String>, RunError> {
        let s = Instant::now();

        if progress {
            eprintln!(
                "Running {} over {} tasks.",
                style("taskmill").red(),
                self.order.len()
            );
        }

        for &index in &self.order {
            run_task(
                &self.registry.tasks[index],
                &mut self.store,
                &mut self.changed,
                progress,
            )?;
        }

        if progress {
            eprintln!("Finished all tasks {}", crate::utils::as_overhead(s));
        } else {
            info!(changed = self.changed.len(), "finished all tasks");
        }

        Ok(self.changed.iter().map(|key| key.to_string()).collect())
    }
}

fn variant_label(task: &Task, params: &Params) -> String {
    if params.is_empty() {
        task.name.to_string()
    } else {
        format!("{}[{params}]", task.name)
    }
}

/// Runs every valid variant of one task against the shared store.
fn run_task(
    task: &Task,
    store: &mut Store,
    changed: &mut Vec<Box<str>>,
    progress: bool,
) -> Result<(), RunError> {
    let combos = params::filter_valid(task, params::expand(task), store);

    if combos.is_empty() {
        info!(
            task = %task.name,
            category = task.kind.as_str(),
            "no valid parameter variants, skipping"
        );
        return Ok(());
    }

    let bar = progress.then(|| {
        ProgressBar::new(combos.len() as u64).with_style(crate::utils::PROGRESS_STYLE.clone())
    });

    for params in &combos {
        let label = variant_label(task, params);

        match &bar {
            Some(bar) => bar.set_message(label.clone()),
            None => info!(category = task.kind.as_str(), "Processing task: {label}"),
        }

        let rebuild = task
            .requires
            .iter()
            .any(|requirement| changed.contains(&requirement.key));

        // A task must never observe a stale provided value from a previous
        // pass while deciding what to (re)compute.
        for key in &task.provides {
            store.unset(key);
        }

        for requirement in &task.requires {
            if requirement.hard && !store.is_set(&requirement.key) {
                return Err(RunError::MissingInput {
                    task: task.name.clone(),
                    key: requirement.key.clone(),
                });
            }
        }

        let outcome =
            (task.body)(store, params, rebuild).map_err(|err| RunError::Task(label, err))?;

        if outcome == Outcome::Ran {
            for key in &task.provides {
                if !store.is_set(key) {
                    return Err(RunError::ContractViolation {
                        task: task.name.clone(),
                        key: key.clone(),
                    });
                }
                if !changed.contains(key) {
                    changed.push(key.clone());
                }
            }
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    Ok(())
}
