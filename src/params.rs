use std::fmt::Display;

use crate::store::{Store, Value};
use crate::task::Task;

/// One concrete parameter combination under which a task body runs.
///
/// Entries keep the axis declaration order, so variant labels and parameter
/// lookups are reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(Box<str>, Value)>,
}

impl Params {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// The concrete option chosen for `flag` in this combination.
    pub fn get(&self, flag: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_ref() == flag)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over (flag, value) pairs in axis declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(flag, value)| (flag.as_ref(), value))
    }
}

impl Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (flag, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{flag}={value}")?;
        }
        Ok(())
    }
}

/// Computes the cartesian product of the task's declared option lists.
///
/// A task without parameter axes yields exactly one empty combination, which
/// the engine runs under the task's own name.
pub(crate) fn expand(task: &Task) -> Vec<Params> {
    let mut combos = vec![Params::empty()];

    for (flag, options) in &task.axes {
        let mut next = Vec::with_capacity(combos.len() * options.len());

        for combo in &combos {
            for option in options {
                let mut entries = combo.entries.clone();
                entries.push((flag.clone(), option.clone()));
                next.push(Params { entries });
            }
        }

        combos = next;
    }

    combos
}

/// Drops combinations rejected by the task's validator.
///
/// Pruned combinations are expected, not errors; they are logged at debug
/// level and otherwise silently skipped.
pub(crate) fn filter_valid(task: &Task, combos: Vec<Params>, store: &Store) -> Vec<Params> {
    let Some(validator) = &task.validator else {
        return combos;
    };

    combos
        .into_iter()
        .filter(|combo| {
            let keep = validator(store, combo);
            if !keep {
                tracing::debug!(task = %task.name, params = %combo, "pruned parameter combination");
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::task::{Outcome, Task, TaskKind};

    fn make_task(axes: Vec<(&str, Vec<Value>)>) -> Task {
        Task {
            name: "probe".into(),
            kind: TaskKind::Misc,
            requires: vec![],
            provides: vec![],
            axes: axes
                .into_iter()
                .map(|(flag, options)| (flag.into(), options))
                .collect(),
            validator: None,
            body: Arc::new(|_, _, _| Ok(Outcome::Ran)),
        }
    }

    #[test]
    fn test_expand_no_axes() {
        let task = make_task(vec![]);
        let combos = expand(&task);

        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn test_expand_product() {
        let task = make_task(vec![
            ("a", vec![Value::Int(1), Value::Int(2)]),
            ("b", vec![Value::Int(3), Value::Int(4)]),
        ]);

        let combos = expand(&task);
        assert_eq!(combos.len(), 4);

        // Every pairing is distinct.
        for (i, left) in combos.iter().enumerate() {
            for right in &combos[i + 1..] {
                assert_ne!(left, right);
            }
        }

        // Axis declaration order is preserved in every combination.
        for combo in &combos {
            let flags: Vec<_> = combo.iter().map(|(flag, _)| flag).collect();
            assert_eq!(flags, ["a", "b"]);
        }
    }

    #[test]
    fn test_expand_empty_axis() {
        let task = make_task(vec![("a", vec![])]);
        assert!(expand(&task).is_empty());
    }

    #[test]
    fn test_filter_rejects_combination() {
        let mut task = make_task(vec![
            ("a", vec![Value::Int(1), Value::Int(2)]),
            ("b", vec![Value::Int(3), Value::Int(4)]),
        ]);
        task.validator = Some(Arc::new(|_, params| {
            !(params.get("a") == Some(&Value::Int(1)) && params.get("b") == Some(&Value::Int(3)))
        }));

        let store = Store::new();
        let combos = filter_valid(&task, expand(&task), &store);

        assert_eq!(combos.len(), 3);
        assert!(
            combos
                .iter()
                .all(|c| !(c.get("a") == Some(&Value::Int(1))
                    && c.get("b") == Some(&Value::Int(3))))
        );
    }

    #[test]
    fn test_filter_reads_store() {
        let mut task = make_task(vec![("vext", vec![Value::Bool(false), Value::Bool(true)])]);
        task.validator = Some(Arc::new(|store, params| {
            params.get("vext") != Some(&Value::Bool(true)) || store.is_set("target.has_vext")
        }));

        let mut store = Store::new();
        assert_eq!(filter_valid(&task, expand(&task), &store).len(), 1);

        store.set("target.has_vext", true);
        assert_eq!(filter_valid(&task, expand(&task), &store).len(), 2);
    }

    #[test]
    fn test_params_display() {
        let task = make_task(vec![
            ("dbg", vec![Value::Bool(true)]),
            ("target", vec![Value::Str("esp32".into())]),
        ]);

        let combos = expand(&task);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].to_string(), "dbg=true, target=esp32");
    }
}
