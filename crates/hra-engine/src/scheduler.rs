//! Dependency-aware task graph executed on a bounded worker pool.
//!
//! Tasks are [`RasterOp`]s identified by their declared outputs. A task
//! is dispatched once every dependency is done:
//!
//! ```text
//! add_task ──deps done──▶ job queue ──worker──▶ Running ──▶ Done | Failed
//!     │                                                        │
//!     └──deps pending──▶ Pending ◀──last dependency finishes───┘
//! ```
//!
//! With zero workers every ready task runs inline in the thread that
//! made it ready. After the first failure no further task is started;
//! [`TaskGraph::join`] reports that failure.
//!
//! Every task carries a fingerprint of its name, keys and parameters,
//! chained through the fingerprints of its inputs. A task whose outputs
//! are all stored under its own fingerprint is skipped; any other stored
//! output is stale and is replaced when the task runs.

use crate::worker::{worker_loop, Job};
use crossbeam_channel::Sender;
use hra_core::{Fingerprint, Geoprocessor, OpError, RasterKey, RasterStore};
use hra_task::{OpContext, RasterOp};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Handle to a task in a [`TaskGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

/// Lifecycle of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for dependencies or a worker.
    Pending,
    /// Executing.
    Running,
    /// Finished successfully, or its outputs were already up to date.
    Done,
    /// `run()` returned an error.
    Failed,
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from building or executing a [`TaskGraph`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ScheduleError {
    /// A task's `run()` failed. The first failure aborts the run.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        /// Name of the failing task.
        task: String,
        /// The operation's error.
        source: OpError,
    },
    /// A new task's outputs partially overlap an existing task's.
    #[error("task '{task}' writes '{key}', already claimed by '{existing}'")]
    OutputConflict {
        /// The new task.
        task: String,
        /// The contested key.
        key: RasterKey,
        /// The task that claimed it first.
        existing: String,
    },
    /// A dependency handle does not belong to this graph.
    #[error("task '{task}' depends on unknown task #{dependency}")]
    UnknownDependency {
        /// The new task.
        task: String,
        /// The unknown handle.
        dependency: usize,
    },
    /// A task declares no outputs and so cannot be identified.
    #[error("task '{task}' declares no outputs")]
    NoOutputs {
        /// The task.
        task: String,
    },
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {reason}")]
    WorkerSpawn {
        /// The OS error.
        reason: String,
    },
    /// The graph was closed.
    #[error("task graph is closed")]
    Closed,
}

// ── Shared state ───────────────────────────────────────────────────

struct TaskEntry {
    op: Arc<dyn RasterOp>,
    outputs: Vec<RasterKey>,
    fingerprint: u64,
    dependents: SmallVec<[TaskId; 4]>,
    remaining: usize,
    state: TaskState,
}

#[derive(Default)]
struct GraphState {
    tasks: Vec<TaskEntry>,
    by_output: IndexMap<RasterKey, TaskId>,
    /// Content fingerprints of inputs no task produced.
    sources: IndexMap<RasterKey, u64>,
    /// Tasks queued or running.
    outstanding: usize,
    failure: Option<ScheduleError>,
    closed: bool,
}

pub(crate) struct Shared {
    state: Mutex<GraphState>,
    idle: Condvar,
    store: Arc<dyn RasterStore>,
    geo: Arc<dyn Geoprocessor>,
    jobs: Option<Sender<Job>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand ready tasks to the pool, or run them here when there is none.
    pub(crate) fn dispatch(&self, ready: Vec<TaskId>) {
        match &self.jobs {
            Some(jobs) => {
                for id in ready {
                    if jobs.send(Job::Run(id)).is_err() {
                        // Pool already gone: the task will never run.
                        self.abandon(id);
                    }
                }
            }
            None => {
                let mut queue = ready;
                while let Some(id) = queue.pop() {
                    queue.extend(self.execute(id));
                }
            }
        }
    }

    fn abandon(&self, id: TaskId) {
        let mut state = self.lock();
        state.outstanding -= 1;
        if state.failure.is_none() {
            state.failure = Some(ScheduleError::Closed);
        }
        debug!(task = id.0, "task abandoned, pool closed");
        self.idle.notify_all();
    }

    /// Run one queued task; returns the tasks it made ready.
    pub(crate) fn execute(&self, id: TaskId) -> Vec<TaskId> {
        let (op, outputs, fingerprint) = {
            let mut state = self.lock();
            if state.failure.is_some() {
                state.outstanding -= 1;
                self.idle.notify_all();
                return Vec::new();
            }
            let entry = &mut state.tasks[id.0];
            entry.state = TaskState::Running;
            (Arc::clone(&entry.op), entry.outputs.clone(), entry.fingerprint)
        };

        for key in &outputs {
            if self.store.remove(key).is_some() {
                debug!(task = op.name(), key = %key, "replacing stale output");
            }
        }
        debug!(task = op.name(), "running");
        let result = run_op(&*op, &*self.store, &*self.geo);
        if result.is_ok() {
            for key in &outputs {
                self.store.record_fingerprint(key, fingerprint);
            }
        }

        let mut state = self.lock();
        let mut ready = Vec::new();
        match result {
            Ok(()) => {
                state.tasks[id.0].state = TaskState::Done;
                let dependents = state.tasks[id.0].dependents.clone();
                for d in dependents {
                    let dep = &mut state.tasks[d.0];
                    dep.remaining -= 1;
                    if dep.remaining == 0 && dep.state == TaskState::Pending {
                        ready.push(d);
                    }
                }
            }
            Err(source) => {
                warn!(task = op.name(), error = %source, "task failed");
                state.tasks[id.0].state = TaskState::Failed;
                if state.failure.is_none() {
                    state.failure = Some(ScheduleError::TaskFailed {
                        task: op.name().to_string(),
                        source,
                    });
                }
            }
        }
        state.outstanding = state.outstanding + ready.len() - 1;
        self.idle.notify_all();
        ready
    }
}

/// Run `op` against a context built from its own declarations.
///
/// A panic inside `run()` becomes an error so the graph still settles.
fn run_op(
    op: &dyn RasterOp,
    store: &dyn RasterStore,
    geo: &dyn Geoprocessor,
) -> Result<(), OpError> {
    let mut ctx = OpContext::new(store, geo, op.reads(), op.writes());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| op.run(&mut ctx)));
    match outcome {
        Ok(Ok(())) => {
            let unwritten = ctx.unwritten();
            if unwritten.is_empty() {
                Ok(())
            } else {
                Err(OpError::ExecutionFailed {
                    reason: format!("declared outputs not written: {unwritten:?}"),
                })
            }
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(OpError::ExecutionFailed {
            reason: "operation panicked".to_string(),
        }),
    }
}

// ── TaskGraph ──────────────────────────────────────────────────────

/// A dynamic task graph with at-most-once execution per output set.
///
/// Adding a task whose outputs equal an existing task's returns the
/// existing handle. Outputs already stored under the task's fingerprint
/// mark the task done without running it.
pub struct TaskGraph {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskGraph {
    /// Create a graph over `store` with `n_workers` threads.
    ///
    /// `n_workers == 0` runs tasks inline.
    pub fn new(
        store: Arc<dyn RasterStore>,
        geo: Arc<dyn Geoprocessor>,
        n_workers: usize,
    ) -> Result<Self, ScheduleError> {
        let (jobs, receiver) = if n_workers > 0 {
            let (tx, rx) = crossbeam_channel::unbounded();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let shared = Arc::new(Shared {
            state: Mutex::new(GraphState::default()),
            idle: Condvar::new(),
            store,
            geo,
            jobs,
        });

        let mut graph = Self {
            shared,
            workers: Vec::with_capacity(n_workers),
        };
        if let Some(rx) = receiver {
            for i in 0..n_workers {
                let rx = rx.clone();
                let shared = Arc::clone(&graph.shared);
                let handle = thread::Builder::new()
                    .name(format!("hra-worker-{i}"))
                    .spawn(move || worker_loop(rx, shared))
                    .map_err(|e| ScheduleError::WorkerSpawn {
                        reason: e.to_string(),
                    })?;
                graph.workers.push(handle);
            }
        }
        debug!(workers = n_workers, "task graph started");
        Ok(graph)
    }

    /// Number of worker threads (0 when inline).
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Register a task to run after every task in `deps`.
    ///
    /// Returns the existing handle if a task with exactly the same
    /// outputs is already registered.
    pub fn add_task(
        &self,
        op: Box<dyn RasterOp>,
        deps: &[TaskId],
    ) -> Result<TaskId, ScheduleError> {
        let name = op.name().to_string();
        let outputs = op.writes();
        if outputs.is_empty() {
            return Err(ScheduleError::NoOutputs { task: name });
        }

        let (id, ready) = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(ScheduleError::Closed);
            }
            if let Some(existing) = registered(&state, &name, &outputs)? {
                debug!(task = %name, "already registered");
                return Ok(existing);
            }
            if let Some(&TaskId(bad)) = deps.iter().find(|d| d.0 >= state.tasks.len()) {
                return Err(ScheduleError::UnknownDependency {
                    task: name,
                    dependency: bad,
                });
            }

            let store = &*self.shared.store;
            let fingerprint = task_fingerprint(&mut state, store, &*op, &outputs);
            let id = TaskId(state.tasks.len());
            for key in &outputs {
                state.by_output.insert(key.clone(), id);
            }

            if outputs
                .iter()
                .all(|k| store.fingerprint(k) == Some(fingerprint))
            {
                debug!(task = %name, "outputs up to date, marking done");
                state.tasks.push(TaskEntry {
                    op: Arc::from(op),
                    outputs,
                    fingerprint,
                    dependents: SmallVec::new(),
                    remaining: 0,
                    state: TaskState::Done,
                });
                return Ok(id);
            }

            let mut remaining = 0;
            for dep in deps {
                let entry = &mut state.tasks[dep.0];
                if entry.state != TaskState::Done && !entry.dependents.contains(&id) {
                    entry.dependents.push(id);
                    remaining += 1;
                }
            }
            state.tasks.push(TaskEntry {
                op: Arc::from(op),
                outputs,
                fingerprint,
                dependents: SmallVec::new(),
                remaining,
                state: TaskState::Pending,
            });
            if remaining == 0 {
                state.outstanding += 1;
            }
            (id, remaining == 0)
        };
        if ready {
            self.shared.dispatch(vec![id]);
        }
        Ok(id)
    }

    /// Block until every dispatched task has finished.
    ///
    /// Returns the first task failure, if any.
    pub fn join(&self) -> Result<(), ScheduleError> {
        let mut state = self.shared.lock();
        while state.outstanding > 0 {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match &state.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// State of a task.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.shared.lock().tasks.get(id.0).map(|t| t.state)
    }

    /// Declared outputs of a task.
    pub fn outputs(&self, id: TaskId) -> Option<Vec<RasterKey>> {
        self.shared.lock().tasks.get(id.0).map(|t| t.outputs.clone())
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Wait for outstanding work, then stop and join the workers.
    ///
    /// Further [`add_task`](Self::add_task) calls fail with
    /// [`ScheduleError::Closed`].
    pub fn close(mut self) -> Result<(), ScheduleError> {
        let result = self.join();
        self.shutdown();
        result
    }

    fn shutdown(&mut self) {
        self.shared.lock().closed = true;
        if let Some(jobs) = &self.shared.jobs {
            for _ in &self.workers {
                let _ = jobs.send(Job::Stop);
            }
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TaskGraph {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fingerprint of a task: its name, keys and parameters, chained to the
/// fingerprint of every input.
fn task_fingerprint(
    state: &mut GraphState,
    store: &dyn RasterStore,
    op: &dyn RasterOp,
    outputs: &[RasterKey],
) -> u64 {
    let mut fp = Fingerprint::new();
    fp.write_str(op.name());
    let reads = op.reads();
    fp.write_u64(reads.len() as u64);
    for key in &reads {
        let producer = state.by_output.get(key).copied();
        let input = match producer {
            Some(id) => state.tasks[id.0].fingerprint,
            None => source_fingerprint(state, store, key),
        };
        fp.write_key(key).write_u64(input);
    }
    fp.write_u64(outputs.len() as u64);
    for key in outputs {
        fp.write_key(key);
    }
    op.fingerprint(&mut fp);
    fp.finish()
}

/// An input no task in this graph produces: the fingerprint recorded by
/// whichever task wrote it, else a hash of its content.
fn source_fingerprint(state: &mut GraphState, store: &dyn RasterStore, key: &RasterKey) -> u64 {
    if let Some(recorded) = store.fingerprint(key) {
        return recorded;
    }
    if let Some(&cached) = state.sources.get(key) {
        return cached;
    }
    match store.get(key) {
        Some(layer) => {
            let content = Fingerprint::new().write_layer(&layer).finish();
            state.sources.insert(key.clone(), content);
            content
        }
        None => 0,
    }
}

/// Look up a task with exactly `outputs`; error on partial overlap.
fn registered(
    state: &GraphState,
    name: &str,
    outputs: &[RasterKey],
) -> Result<Option<TaskId>, ScheduleError> {
    let owners: SmallVec<[Option<TaskId>; 4]> = outputs
        .iter()
        .map(|k| state.by_output.get(k).copied())
        .collect();
    let Some((i, owner)) = owners
        .iter()
        .enumerate()
        .find_map(|(i, o)| o.map(|o| (i, o)))
    else {
        return Ok(None);
    };
    let owner_entry = &state.tasks[owner.0];
    if owners.iter().all(|o| *o == Some(owner)) && owner_entry.outputs.len() == outputs.len() {
        Ok(Some(owner))
    } else {
        Err(ScheduleError::OutputConflict {
            task: name.to_string(),
            key: outputs[i].clone(),
            existing: owner_entry.op.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hra_core::MemoryStore;
    use hra_test_utils::{grid, ConstOp, CopyOp, FailingOp, NullGeoprocessor};
    use proptest::prelude::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn graph(workers: usize) -> (Arc<MemoryStore>, TaskGraph) {
        let store = Arc::new(MemoryStore::new());
        let g = TaskGraph::new(store.clone(), Arc::new(NullGeoprocessor), workers).unwrap();
        (store, g)
    }

    #[test]
    fn chain_runs_in_dependency_order() {
        for workers in [0, 1, 4] {
            let (store, g) = graph(workers);
            let a = g
                .add_task(Box::new(ConstOp::new("a", "a", grid(2, 2), 1.0)), &[])
                .unwrap();
            let b = g
                .add_task(Box::new(CopyOp::new("b", "a", "b", 1.0)), &[a])
                .unwrap();
            let c = g
                .add_task(Box::new(CopyOp::new("c", "b", "c", 1.0)), &[b])
                .unwrap();
            g.join().unwrap();
            assert_eq!(g.state(c), Some(TaskState::Done));
            assert_eq!(store.float(&"c".into()).unwrap().data(), &[3.0; 4]);
            g.close().unwrap();
        }
    }

    #[test]
    fn identical_outputs_run_once() {
        let (_store, g) = graph(2);
        let op = ConstOp::new("a", "a", grid(1, 1), 1.0).with_delay(Duration::from_millis(5));
        let runs = op.runs();
        let first = g.add_task(Box::new(op), &[]).unwrap();
        let again = g
            .add_task(Box::new(ConstOp::new("a-again", "a", grid(1, 1), 2.0)), &[])
            .unwrap();
        assert_eq!(first, again);
        g.join().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(g.task_count(), 1);
    }

    fn graph_over(store: &Arc<MemoryStore>, workers: usize) -> TaskGraph {
        TaskGraph::new(store.clone(), Arc::new(NullGeoprocessor), workers).unwrap()
    }

    #[test]
    fn up_to_date_outputs_are_not_recomputed() {
        let store = Arc::new(MemoryStore::new());
        let first = graph_over(&store, 0);
        first
            .add_task(Box::new(ConstOp::new("a", "a", grid(1, 1), 1.0)), &[])
            .unwrap();
        first.close().unwrap();

        let second = graph_over(&store, 0);
        let op = ConstOp::new("a", "a", grid(1, 1), 1.0);
        let runs = op.runs();
        let id = second.add_task(Box::new(op), &[]).unwrap();
        assert_eq!(second.state(id), Some(TaskState::Done));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn outputs_without_a_fingerprint_are_replaced() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("a".into(), hra_core::Raster::<f32>::filled(grid(1, 1), 7.0, None).into())
            .unwrap();
        let g = graph_over(&store, 0);
        let op = ConstOp::new("a", "a", grid(1, 1), 1.0);
        let runs = op.runs();
        g.add_task(Box::new(op), &[]).unwrap();
        g.close().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(store.float(&"a".into()).unwrap().data(), &[1.0]);
        assert!(store.fingerprint(&"a".into()).is_some());
    }

    #[test]
    fn changed_parameters_invalidate_downstream_outputs() {
        let store = Arc::new(MemoryStore::new());
        let run = |value: f32| {
            let g = graph_over(&store, 2);
            let a = g
                .add_task(Box::new(ConstOp::new("a", "a", grid(1, 1), value)), &[])
                .unwrap();
            let copy = CopyOp::new("b", "a", "b", 1.0);
            g.add_task(Box::new(copy), &[a]).unwrap();
            g.close().unwrap();
            store.float(&"b".into()).unwrap().data()[0]
        };
        assert_eq!(run(1.0), 2.0);
        // Same copy parameters, but its input changed.
        assert_eq!(run(5.0), 6.0);
        assert_eq!(run(5.0), 6.0);
        assert_eq!(store.keys().len(), 2);
    }

    #[test]
    fn failure_is_reported_with_task_name_and_stops_dependents() {
        for workers in [0, 2] {
            let (store, g) = graph(workers);
            let bad = g
                .add_task(Box::new(FailingOp::new("boom", "x", grid(1, 1), 0)), &[])
                .unwrap();
            let after = g
                .add_task(Box::new(CopyOp::new("after", "x", "y", 0.0)), &[bad])
                .unwrap();
            let err = g.join().unwrap_err();
            assert!(
                matches!(&err, ScheduleError::TaskFailed { task, .. } if task == "boom"),
                "{err}"
            );
            assert_eq!(g.state(bad), Some(TaskState::Failed));
            assert_eq!(g.state(after), Some(TaskState::Pending));
            assert!(!store.contains(&"y".into()));
        }
    }

    #[test]
    fn panicking_op_becomes_failure() {
        struct Panics;
        impl RasterOp for Panics {
            fn name(&self) -> &str {
                "panics"
            }
            fn reads(&self) -> Vec<RasterKey> {
                Vec::new()
            }
            fn writes(&self) -> Vec<RasterKey> {
                vec!["p".into()]
            }
            fn run(&self, _ctx: &mut OpContext<'_>) -> Result<(), OpError> {
                panic!("deliberate");
            }
        }
        let (_store, g) = graph(1);
        g.add_task(Box::new(Panics), &[]).unwrap();
        assert!(matches!(
            g.join(),
            Err(ScheduleError::TaskFailed { task, .. }) if task == "panics"
        ));
    }

    #[test]
    fn partial_overlap_and_unknown_dependency_are_rejected() {
        struct Two;
        impl RasterOp for Two {
            fn name(&self) -> &str {
                "two"
            }
            fn reads(&self) -> Vec<RasterKey> {
                Vec::new()
            }
            fn writes(&self) -> Vec<RasterKey> {
                vec!["a".into(), "b".into()]
            }
            fn run(&self, _ctx: &mut OpContext<'_>) -> Result<(), OpError> {
                Ok(())
            }
        }
        let (_store, g) = graph(0);
        g.add_task(Box::new(ConstOp::new("a", "a", grid(1, 1), 1.0)), &[])
            .unwrap();
        assert!(matches!(
            g.add_task(Box::new(Two), &[]),
            Err(ScheduleError::OutputConflict { .. })
        ));
        assert!(matches!(
            g.add_task(Box::new(ConstOp::new("z", "z", grid(1, 1), 1.0)), &[TaskId(9)]),
            Err(ScheduleError::UnknownDependency { dependency: 9, .. })
        ));
    }

    #[test]
    fn unwritten_output_is_a_failure() {
        struct Lazy;
        impl RasterOp for Lazy {
            fn name(&self) -> &str {
                "lazy"
            }
            fn reads(&self) -> Vec<RasterKey> {
                Vec::new()
            }
            fn writes(&self) -> Vec<RasterKey> {
                vec!["never".into()]
            }
            fn run(&self, _ctx: &mut OpContext<'_>) -> Result<(), OpError> {
                Ok(())
            }
        }
        let (_store, g) = graph(0);
        g.add_task(Box::new(Lazy), &[]).unwrap();
        assert!(matches!(
            g.join(),
            Err(ScheduleError::TaskFailed { task, source: OpError::ExecutionFailed { .. } }) if task == "lazy"
        ));
    }

    #[test]
    fn fan_in_waits_for_every_dependency() {
        let (store, g) = graph(4);
        let mut deps = Vec::new();
        for i in 0..8 {
            let key = format!("in{i}");
            let op = ConstOp::new(key.clone(), key.as_str(), grid(1, 1), i as f32)
                .with_delay(Duration::from_millis(2));
            deps.push(g.add_task(Box::new(op), &[]).unwrap());
        }
        struct Sum;
        impl RasterOp for Sum {
            fn name(&self) -> &str {
                "sum"
            }
            fn reads(&self) -> Vec<RasterKey> {
                (0..8).map(|i| RasterKey::new(format!("in{i}"))).collect()
            }
            fn writes(&self) -> Vec<RasterKey> {
                vec!["sum".into()]
            }
            fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
                let mut total = 0.0;
                for key in self.reads() {
                    total += ctx.float(&key)?.data()[0];
                }
                ctx.put(
                    &"sum".into(),
                    hra_core::Raster::<f32>::filled(grid(1, 1), total, None),
                )
            }
        }
        g.add_task(Box::new(Sum), &deps).unwrap();
        g.close().unwrap();
        assert_eq!(store.float(&"sum".into()).unwrap().data(), &[28.0]);
    }

    #[test]
    fn closed_graph_rejects_tasks() {
        let (_store, mut g) = graph(1);
        g.shutdown();
        assert_eq!(
            g.add_task(Box::new(ConstOp::new("a", "a", grid(1, 1), 1.0)), &[]),
            Err(ScheduleError::Closed)
        );
    }

    // ── Random graphs ──────────────────────────────────────────────

    /// Writes 1 plus the sum of its inputs.
    struct SumOp {
        inputs: Vec<RasterKey>,
        output: RasterKey,
    }

    impl RasterOp for SumOp {
        fn name(&self) -> &str {
            self.output.as_str()
        }
        fn reads(&self) -> Vec<RasterKey> {
            self.inputs.clone()
        }
        fn writes(&self) -> Vec<RasterKey> {
            vec![self.output.clone()]
        }
        fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
            let mut total = 1.0;
            for key in &self.inputs {
                total += ctx.float(key)?.data()[0];
            }
            ctx.put(
                &self.output,
                hra_core::Raster::<f32>::filled(grid(1, 1), total, None),
            )
        }
    }

    fn node(i: usize) -> RasterKey {
        RasterKey::new(format!("n{i}"))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_graphs_match_sequential_evaluation(
            masks in prop::collection::vec(prop::collection::vec(any::<bool>(), 12), 1..12),
            workers in 0usize..4,
        ) {
            let (store, g) = graph(workers);
            let mut ids = Vec::new();
            let mut expected: Vec<f32> = Vec::new();
            for (i, mask) in masks.iter().enumerate() {
                let parents: Vec<usize> = (0..i).filter(|&j| mask[j]).collect();
                let op = SumOp {
                    inputs: parents.iter().map(|&j| node(j)).collect(),
                    output: node(i),
                };
                let deps: Vec<TaskId> = parents.iter().map(|&j| ids[j]).collect();
                ids.push(g.add_task(Box::new(op), &deps).unwrap());
                let value = 1.0 + parents.iter().map(|&j| expected[j]).sum::<f32>();
                expected.push(value);
            }
            g.close().unwrap();
            for (i, want) in expected.iter().enumerate() {
                prop_assert_eq!(store.float(&node(i)).unwrap().data()[0], *want);
            }
        }
    }
}
