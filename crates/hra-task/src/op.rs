//! The [`RasterOp`] trait.
//!
//! Raster operations are stateless units of work scheduled as tasks.
//! Each declares the layers it reads and the layers it writes, so the
//! engine can validate a plan before running it and deduplicate tasks by
//! their outputs.

use crate::context::OpContext;
use hra_core::{Fingerprint, OpError, RasterKey};

/// A unit of raster work in an assessment plan.
///
/// # Contract
///
/// - `run()` MUST be deterministic: same inputs produce identical outputs.
/// - `&self`: operations are stateless; results go through the store.
/// - `run()` writes every key in `writes()` exactly once, and nothing else.
/// - `reads()` and `writes()` are called when the plan is built, not per run.
/// - `fingerprint()` feeds every parameter, other than the keys, that
///   changes what `run()` writes. Two ops with equal names, keys and
///   fingerprints must write identical layers from identical inputs.
///
/// # Object safety
///
/// This trait is object-safe; plans hold operations as
/// `Box<dyn RasterOp>` and the scheduler shares them across worker
/// threads.
///
/// # Examples
///
/// An operation filling one float raster with a constant:
///
/// ```
/// use hra_core::{GridSpec, OpError, Raster, RasterKey};
/// use hra_task::{OpContext, RasterOp};
///
/// struct Fill {
///     out: RasterKey,
///     grid: GridSpec,
///     value: f32,
/// }
///
/// impl RasterOp for Fill {
///     fn name(&self) -> &str { "fill" }
///
///     fn reads(&self) -> Vec<RasterKey> { Vec::new() }
///
///     fn writes(&self) -> Vec<RasterKey> { vec![self.out.clone()] }
///
///     fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
///         ctx.put(&self.out, Raster::filled(self.grid, self.value, None))
///     }
/// }
///
/// let op = Fill { out: "ones".into(), grid: GridSpec::new(2, 2, 1.0).unwrap(), value: 1.0 };
/// assert_eq!(op.writes(), vec![RasterKey::new("ones")]);
/// ```
pub trait RasterOp: Send + Sync + 'static {
    /// Human-readable name for error reporting and logs.
    fn name(&self) -> &str;

    /// Layers this operation reads.
    fn reads(&self) -> Vec<RasterKey>;

    /// Layers this operation writes. Non-empty; identifies the task.
    fn writes(&self) -> Vec<RasterKey>;

    /// Execute the operation.
    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError>;

    /// Feed the operation's parameters into `fp`.
    ///
    /// The scheduler already folds in the name, the declared keys and the
    /// fingerprints of every input. Operations with no other parameters
    /// keep the default.
    fn fingerprint(&self, _fp: &mut Fingerprint) {}
}
