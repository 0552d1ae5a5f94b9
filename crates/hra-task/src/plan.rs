//! Assessment plans and their static validation.
//!
//! A [`Plan`] is an ordered list of steps: tasks (a [`RasterOp`] plus
//! the earlier tasks it depends on) and barriers. Dependencies can only
//! point backwards, so every plan is acyclic by construction.
//! [`validate_plan`] checks, before any raster is touched, that each
//! input will exist and will be ready when its reader runs.

use crate::op::RasterOp;
use hra_core::RasterKey;
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use thiserror::Error;

/// Index of a task within its [`Plan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanIndex(pub usize);

/// One task of a plan.
pub struct PlannedTask {
    /// The operation.
    pub op: Box<dyn RasterOp>,
    /// Tasks that must complete first.
    pub deps: SmallVec<[PlanIndex; 4]>,
}

/// A plan step.
pub enum PlanStep {
    /// Schedule a task.
    Task(PlannedTask),
    /// Wait for every task scheduled so far.
    Barrier,
}

/// An ordered list of tasks and barriers.
#[derive(Default)]
pub struct Plan {
    steps: Vec<PlanStep>,
    tasks: usize,
}

impl Plan {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task depending on `deps`; returns its index.
    pub fn add(&mut self, op: impl RasterOp, deps: &[PlanIndex]) -> PlanIndex {
        self.add_boxed(Box::new(op), deps)
    }

    /// Append an already boxed task.
    pub fn add_boxed(&mut self, op: Box<dyn RasterOp>, deps: &[PlanIndex]) -> PlanIndex {
        let index = PlanIndex(self.tasks);
        self.steps.push(PlanStep::Task(PlannedTask {
            op,
            deps: deps.iter().copied().collect(),
        }));
        self.tasks += 1;
        index
    }

    /// Append a barrier.
    pub fn barrier(&mut self) {
        self.steps.push(PlanStep::Barrier);
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks
    }

    /// True if the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks == 0
    }

    /// Steps in order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Consume the plan, yielding its steps.
    pub fn into_steps(self) -> Vec<PlanStep> {
        self.steps
    }

    /// Tasks in order, with the number of barriers preceding each.
    fn tasks_with_epoch(&self) -> impl Iterator<Item = (usize, &PlannedTask)> {
        self.steps.iter().scan(0usize, |epoch, step| match step {
            PlanStep::Barrier => {
                *epoch += 1;
                Some(None)
            }
            PlanStep::Task(t) => Some(Some((*epoch, t))),
        })
        .flatten()
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Two tasks writing the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConflict {
    /// The contested key.
    pub key: RasterKey,
    /// Name of the earlier writer.
    pub first_writer: String,
    /// Name of the later writer.
    pub second_writer: String,
}

/// Errors from plan validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The plan has no tasks.
    #[error("plan has no tasks")]
    EmptyPlan,
    /// Keys written by more than one task.
    #[error("output conflicts: {}", describe_conflicts(.0))]
    OutputConflict(Vec<OutputConflict>),
    /// A task declares no outputs.
    #[error("task '{task}' declares no outputs")]
    NoOutputs {
        /// The task.
        task: String,
    },
    /// A dependency points at the task itself or a later task.
    #[error("task '{task}' depends on task #{dependency}, which is not scheduled before it")]
    ForwardDependency {
        /// The task.
        task: String,
        /// Index of the offending dependency.
        dependency: usize,
    },
    /// A task reads a key nothing provides.
    #[error("task '{task}' reads undefined layer '{key}'")]
    UndefinedInput {
        /// The reader.
        task: String,
        /// The missing key.
        key: RasterKey,
    },
    /// A task reads a key it also writes.
    #[error("task '{task}' reads its own output '{key}'")]
    SelfRead {
        /// The task.
        task: String,
        /// The key.
        key: RasterKey,
    },
    /// A task reads a key produced by a task it neither depends on nor
    /// follows across a barrier.
    #[error("task '{task}' reads '{key}' from '{producer}' without depending on it")]
    UnorderedRead {
        /// The reader.
        task: String,
        /// The key.
        key: RasterKey,
        /// The producing task.
        producer: String,
    },
}

fn describe_conflicts(conflicts: &[OutputConflict]) -> String {
    conflicts
        .iter()
        .map(|c| {
            format!(
                "'{}' written by '{}' and '{}'",
                c.key, c.first_writer, c.second_writer
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Validation ─────────────────────────────────────────────────────

/// Validate a plan against the layers that exist before it runs.
///
/// Checks performed:
///
/// 1. The plan has at least one task and every task declares outputs.
/// 2. No key is written by two tasks.
/// 3. Dependencies point to earlier tasks.
/// 4. Every read is either in `available` or written by a task that is
///    ordered before the reader, through a dependency chain or a
///    barrier between them.
///
/// Returns the producing task of every key the plan writes.
pub fn validate_plan(
    plan: &Plan,
    available: &IndexSet<RasterKey>,
) -> Result<IndexMap<RasterKey, PlanIndex>, PlanError> {
    if plan.is_empty() {
        return Err(PlanError::EmptyPlan);
    }

    let tasks: Vec<(usize, &PlannedTask)> = plan.tasks_with_epoch().collect();

    let mut producers: IndexMap<RasterKey, PlanIndex> = IndexMap::new();
    let mut conflicts = Vec::new();
    for (i, (_, task)) in tasks.iter().enumerate() {
        let writes = task.op.writes();
        if writes.is_empty() {
            return Err(PlanError::NoOutputs {
                task: task.op.name().to_string(),
            });
        }
        for key in writes {
            if let Some(&PlanIndex(j)) = producers.get(&key) {
                conflicts.push(OutputConflict {
                    key: key.clone(),
                    first_writer: tasks[j].1.op.name().to_string(),
                    second_writer: task.op.name().to_string(),
                });
            } else {
                producers.insert(key, PlanIndex(i));
            }
        }
    }
    if !conflicts.is_empty() {
        return Err(PlanError::OutputConflict(conflicts));
    }

    // ancestors[i][j]: task j completes before task i starts.
    let n = tasks.len();
    let mut ancestors: Vec<Vec<bool>> = Vec::with_capacity(n);
    for (i, (_, task)) in tasks.iter().enumerate() {
        let mut mine = vec![false; n];
        for &PlanIndex(d) in &task.deps {
            if d >= i {
                return Err(PlanError::ForwardDependency {
                    task: task.op.name().to_string(),
                    dependency: d,
                });
            }
            mine[d] = true;
            for (slot, &inherited) in mine.iter_mut().zip(&ancestors[d]) {
                *slot |= inherited;
            }
        }
        ancestors.push(mine);
    }

    for (i, (epoch, task)) in tasks.iter().enumerate() {
        let name = task.op.name();
        let writes = task.op.writes();
        for key in task.op.reads() {
            if writes.contains(&key) {
                return Err(PlanError::SelfRead {
                    task: name.to_string(),
                    key,
                });
            }
            match producers.get(&key) {
                Some(&PlanIndex(p)) => {
                    let ordered = ancestors[i][p] || tasks[p].0 < *epoch;
                    if !ordered {
                        return Err(PlanError::UnorderedRead {
                            task: name.to_string(),
                            key,
                            producer: tasks[p].1.op.name().to_string(),
                        });
                    }
                }
                None if available.contains(&key) => {}
                None => {
                    return Err(PlanError::UndefinedInput {
                        task: name.to_string(),
                        key,
                    })
                }
            }
        }
    }

    Ok(producers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OpContext;
    use hra_core::OpError;
    use proptest::prelude::*;

    struct Stub {
        name: &'static str,
        reads: Vec<&'static str>,
        writes: Vec<&'static str>,
    }

    impl RasterOp for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn reads(&self) -> Vec<RasterKey> {
            self.reads.iter().map(|k| RasterKey::new(*k)).collect()
        }
        fn writes(&self) -> Vec<RasterKey> {
            self.writes.iter().map(|k| RasterKey::new(*k)).collect()
        }
        fn run(&self, _ctx: &mut OpContext<'_>) -> Result<(), OpError> {
            Ok(())
        }
    }

    fn stub(name: &'static str, reads: &[&'static str], writes: &[&'static str]) -> Stub {
        Stub {
            name,
            reads: reads.to_vec(),
            writes: writes.to_vec(),
        }
    }

    fn available(keys: &[&str]) -> IndexSet<RasterKey> {
        keys.iter().map(|k| RasterKey::new(*k)).collect()
    }

    #[test]
    fn empty_plan_fails() {
        assert_eq!(
            validate_plan(&Plan::new(), &available(&[])),
            Err(PlanError::EmptyPlan)
        );
    }

    #[test]
    fn chained_plan_validates() {
        let mut plan = Plan::new();
        let dist = plan.add(stub("dist", &["stressor"], &["dist"]), &[]);
        let num = plan.add(stub("num", &["habitat", "dist"], &["num"]), &[dist]);
        plan.add(stub("score", &["num", "dist"], &["score"]), &[num]);
        let producers = validate_plan(&plan, &available(&["stressor", "habitat"])).unwrap();
        assert_eq!(producers[&RasterKey::new("score")], PlanIndex(2));
        assert_eq!(producers.len(), 3);
    }

    #[test]
    fn output_conflicts_are_all_reported() {
        let mut plan = Plan::new();
        plan.add(stub("a", &[], &["x", "y"]), &[]);
        plan.add(stub("b", &[], &["x"]), &[]);
        plan.add(stub("c", &[], &["y"]), &[]);
        match validate_plan(&plan, &available(&[])) {
            Err(PlanError::OutputConflict(c)) => {
                assert_eq!(c.len(), 2);
                assert_eq!(c[0].first_writer, "a");
                assert_eq!(c[1].second_writer, "c");
            }
            other => panic!("expected OutputConflict, got {other:?}"),
        }
    }

    #[test]
    fn undefined_input_is_named() {
        let mut plan = Plan::new();
        plan.add(stub("num", &["habitat"], &["num"]), &[]);
        assert_eq!(
            validate_plan(&plan, &available(&[])),
            Err(PlanError::UndefinedInput {
                task: "num".into(),
                key: "habitat".into()
            })
        );
    }

    #[test]
    fn read_without_dependency_is_unordered() {
        let mut plan = Plan::new();
        plan.add(stub("dist", &[], &["dist"]), &[]);
        plan.add(stub("num", &["dist"], &["num"]), &[]);
        assert!(matches!(
            validate_plan(&plan, &available(&[])),
            Err(PlanError::UnorderedRead { ref producer, .. }) if producer == "dist"
        ));
    }

    #[test]
    fn barrier_orders_reads() {
        let mut plan = Plan::new();
        plan.add(stub("dist", &[], &["dist"]), &[]);
        plan.barrier();
        plan.add(stub("num", &["dist"], &["num"]), &[]);
        assert!(validate_plan(&plan, &available(&[])).is_ok());
    }

    #[test]
    fn transitive_dependency_orders_reads() {
        let mut plan = Plan::new();
        let a = plan.add(stub("a", &[], &["a"]), &[]);
        let b = plan.add(stub("b", &["a"], &["b"]), &[a]);
        plan.add(stub("c", &["a", "b"], &["c"]), &[b]);
        assert!(validate_plan(&plan, &available(&[])).is_ok());
    }

    #[test]
    fn forward_dependency_and_self_read() {
        let mut plan = Plan::new();
        plan.add(stub("a", &[], &["a"]), &[PlanIndex(0)]);
        assert!(matches!(
            validate_plan(&plan, &available(&[])),
            Err(PlanError::ForwardDependency { dependency: 0, .. })
        ));

        let mut plan = Plan::new();
        plan.add(stub("a", &["a"], &["a"]), &[]);
        assert!(matches!(
            validate_plan(&plan, &available(&["a"])),
            Err(PlanError::SelfRead { .. })
        ));
    }

    #[test]
    fn task_without_outputs_is_rejected() {
        let mut plan = Plan::new();
        plan.add(stub("noop", &[], &[]), &[]);
        assert_eq!(
            validate_plan(&plan, &available(&[])),
            Err(PlanError::NoOutputs { task: "noop".into() })
        );
    }

    // ── Random plans ───────────────────────────────────────────────

    struct Node {
        name: String,
        reads: Vec<RasterKey>,
    }

    impl RasterOp for Node {
        fn name(&self) -> &str {
            &self.name
        }
        fn reads(&self) -> Vec<RasterKey> {
            self.reads.clone()
        }
        fn writes(&self) -> Vec<RasterKey> {
            vec![RasterKey::new(self.name.clone())]
        }
        fn run(&self, _ctx: &mut OpContext<'_>) -> Result<(), OpError> {
            Ok(())
        }
    }

    /// Parents of each node: earlier nodes whose mask bit is set.
    fn parents(masks: &[Vec<bool>]) -> Vec<Vec<usize>> {
        masks
            .iter()
            .enumerate()
            .map(|(i, mask)| (0..i).filter(|&j| mask[j]).collect())
            .collect()
    }

    /// One task per node reading its parents, with dependency edges on
    /// the parents when `with_deps` and a barrier after every task when
    /// `with_barriers`.
    fn plan_of(parents: &[Vec<usize>], with_deps: bool, with_barriers: bool) -> Plan {
        let mut plan = Plan::new();
        for (i, ps) in parents.iter().enumerate() {
            let node = Node {
                name: format!("n{i}"),
                reads: ps.iter().map(|j| RasterKey::new(format!("n{j}"))).collect(),
            };
            let deps: Vec<PlanIndex> = if with_deps {
                ps.iter().map(|&j| PlanIndex(j)).collect()
            } else {
                Vec::new()
            };
            plan.add(node, &deps);
            if with_barriers {
                plan.barrier();
            }
        }
        plan
    }

    fn masks() -> impl Strategy<Value = Vec<Vec<bool>>> {
        prop::collection::vec(prop::collection::vec(any::<bool>(), 16), 1..16)
    }

    proptest! {
        #[test]
        fn reads_along_dependencies_validate(masks in masks()) {
            let ps = parents(&masks);
            let producers = validate_plan(&plan_of(&ps, true, false), &available(&[])).unwrap();
            prop_assert_eq!(producers.len(), ps.len());
            for i in 0..ps.len() {
                prop_assert_eq!(producers[&RasterKey::new(format!("n{i}"))], PlanIndex(i));
            }
        }

        #[test]
        fn barriers_stand_in_for_dependencies(masks in masks()) {
            let ps = parents(&masks);
            prop_assert!(validate_plan(&plan_of(&ps, false, true), &available(&[])).is_ok());
        }

        #[test]
        fn reads_without_ordering_are_rejected(masks in masks()) {
            let ps = parents(&masks);
            let result = validate_plan(&plan_of(&ps, false, false), &available(&[]));
            if ps.iter().all(Vec::is_empty) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(
                    matches!(result, Err(PlanError::UnorderedRead { .. })),
                    "{:?}",
                    result
                );
            }
        }
    }
}
