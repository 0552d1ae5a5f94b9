//! Reusable operation fixtures for plan and scheduler tests.
//!
//! - [`ConstOp`]: writes a constant raster (no reads).
//! - [`CopyOp`]: copies one float raster to another key.
//! - [`FailingOp`]: fails deterministically after N calls.

use hra_core::{Fingerprint, GridSpec, OpError, Raster, RasterKey, FLOAT_NODATA};
use hra_task::{OpContext, RasterOp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Writes a constant float raster to `output`.
///
/// Counts its runs through a shared counter so tests can check a task
/// ran exactly once. An optional delay widens race windows in
/// scheduler tests.
pub struct ConstOp {
    pub name: String,
    pub output: RasterKey,
    pub grid: GridSpec,
    pub value: f32,
    pub delay: Option<Duration>,
    runs: Arc<AtomicUsize>,
}

impl ConstOp {
    pub fn new(
        name: impl Into<String>,
        output: impl Into<RasterKey>,
        grid: GridSpec,
        value: f32,
    ) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            grid,
            value,
            delay: None,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep for `delay` before writing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the run counter; stays valid after the op is boxed.
    pub fn runs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }
}

impl RasterOp for ConstOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        Vec::new()
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_grid(&self.grid).write_f64(f64::from(self.value));
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        ctx.put(
            &self.output,
            Raster::filled(self.grid, self.value, Some(FLOAT_NODATA)),
        )
    }
}

/// Copies a float raster, adding `offset` to every valid cell.
pub struct CopyOp {
    pub name: String,
    pub input: RasterKey,
    pub output: RasterKey,
    pub offset: f32,
}

impl CopyOp {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
        offset: f32,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            output: output.into(),
            offset,
        }
    }
}

impl RasterOp for CopyOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.input.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(f64::from(self.offset));
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let input = ctx.float(&self.input)?;
        let mut out = (*input).clone();
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if let Some(v) = input.valid_at(i) {
                *cell = v + self.offset;
            }
        }
        ctx.put(&self.output, out)
    }
}

/// Fails after `succeed_count` successful calls.
///
/// Uses `AtomicUsize` for the call counter so it satisfies `Sync`.
pub struct FailingOp {
    pub name: String,
    pub output: RasterKey,
    pub grid: GridSpec,
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingOp {
    /// Create an op that succeeds `succeed_count` times then fails.
    pub fn new(
        name: impl Into<String>,
        output: impl Into<RasterKey>,
        grid: GridSpec,
        succeed_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            grid,
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `run()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl RasterOp for FailingOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        Vec::new()
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(OpError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        ctx.put(
            &self.output,
            Raster::filled(self.grid, n as f32, Some(FLOAT_NODATA)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid, run_op, NullGeoprocessor};
    use hra_core::{MemoryStore, RasterStore};

    #[test]
    fn const_op_counts_runs() {
        let store = MemoryStore::new();
        let op = ConstOp::new("c", "out", grid(2, 2), 4.0);
        let runs = op.runs();
        run_op(&store, &NullGeoprocessor, &op).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(store.float(&"out".into()).unwrap().data(), &[4.0; 4]);
    }

    #[test]
    fn copy_op_offsets_valid_cells() {
        let store = MemoryStore::new();
        store
            .put(
                "in".into(),
                crate::float_raster(1, 2, &[1.0, FLOAT_NODATA]).into(),
            )
            .unwrap();
        run_op(&store, &NullGeoprocessor, &CopyOp::new("cp", "in", "out", 0.5)).unwrap();
        assert_eq!(
            store.float(&"out".into()).unwrap().data(),
            &[1.5, FLOAT_NODATA]
        );
    }

    #[test]
    fn failing_op_fails_after_budget() {
        let store = MemoryStore::new();
        let op = FailingOp::new("f", "out", grid(1, 1), 0);
        assert!(matches!(
            run_op(&store, &NullGeoprocessor, &op),
            Err(OpError::ExecutionFailed { .. })
        ));
        assert_eq!(op.calls(), 1);
    }
}
