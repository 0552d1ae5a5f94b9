//! Risk composition: pairwise risk, habitat totals and reclassification.

use crate::grid_helpers::{float_output, GridGuard};
use crate::risk::{max_risk_score, pair_risk, reclassify};
use hra_core::{Fingerprint, GridSpec, OpError, Raster, RasterKey, RiskEquation};
use hra_task::{OpContext, RasterOp};
use tracing::debug;

// ── PairRiskOp ──────────────────────────────────────────────────

/// Risk of one stressor to one habitat, where both exposure and
/// consequence are valid.
#[derive(Debug)]
pub struct PairRiskOp {
    name: String,
    exposure: RasterKey,
    consequence: RasterKey,
    output: RasterKey,
    equation: RiskEquation,
}

impl PairRiskOp {
    /// Create the operation.
    pub fn new(
        exposure: impl Into<RasterKey>,
        consequence: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
        equation: RiskEquation,
    ) -> Self {
        let output = output.into();
        Self {
            name: format!("PairRiskOp({output})"),
            exposure: exposure.into(),
            consequence: consequence.into(),
            output,
            equation,
        }
    }
}

impl RasterOp for PairRiskOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.exposure.clone(), self.consequence.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_u64(self.equation as u64);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let exposure = ctx.float(&self.exposure)?;
        let guard = GridGuard::new(&self.exposure, exposure.grid());
        let consequence = guard.float(ctx, &self.consequence)?;

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if let (Some(e), Some(c)) = (exposure.valid_at(i), consequence.valid_at(i)) {
                *cell = pair_risk(f64::from(e), f64::from(c), self.equation) as f32;
            }
        }
        ctx.put(&self.output, out)
    }
}

// ── TotalRiskOp ─────────────────────────────────────────────────

/// Cumulative risk to a habitat: the sum of its valid pair risks, 0
/// where none applies, nodata outside the habitat.
#[derive(Debug)]
pub struct TotalRiskOp {
    name: String,
    habitat: RasterKey,
    pair_risks: Vec<RasterKey>,
    output: RasterKey,
}

impl TotalRiskOp {
    /// Create the operation.
    pub fn new(
        habitat: impl Into<RasterKey>,
        pair_risks: Vec<RasterKey>,
        output: impl Into<RasterKey>,
    ) -> Self {
        let output = output.into();
        Self {
            name: format!("TotalRiskOp({output})"),
            habitat: habitat.into(),
            pair_risks,
            output,
        }
    }
}

impl RasterOp for TotalRiskOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        let mut keys = vec![self.habitat.clone()];
        keys.extend(self.pair_risks.iter().cloned());
        keys
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let habitat = ctx.byte(&self.habitat)?;
        let guard = GridGuard::new(&self.habitat, habitat.grid());
        let risks = self
            .pair_risks
            .iter()
            .map(|k| guard.float(ctx, k))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if habitat.is_present(i) {
                let total: f64 = risks
                    .iter()
                    .filter_map(|r| r.valid_at(i))
                    .map(f64::from)
                    .sum();
                *cell = total as f32;
            }
        }
        ctx.put(&self.output, out)
    }
}

// ── MaxRiskScoreOp ──────────────────────────────────────────────

/// The theoretical maximum risk score, from the largest stressor
/// overlap count in the study area.
///
/// Written as a 1x1 float layer so the score flows through the store
/// like any other task output. No valid overlap gives a score of 0.
#[derive(Debug)]
pub struct MaxRiskScoreOp {
    overlap: RasterKey,
    output: RasterKey,
    max_rating: f64,
    equation: RiskEquation,
}

impl MaxRiskScoreOp {
    /// Create the operation.
    pub fn new(
        overlap: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
        max_rating: f64,
        equation: RiskEquation,
    ) -> Self {
        Self {
            overlap: overlap.into(),
            output: output.into(),
            max_rating,
            equation,
        }
    }

    /// Read a score written by this operation.
    pub fn read_score(raster: &Raster<f32>) -> Option<f64> {
        raster.valid_at(0).map(f64::from)
    }
}

impl RasterOp for MaxRiskScoreOp {
    fn name(&self) -> &str {
        "MaxRiskScoreOp"
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.overlap.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.max_rating).write_u64(self.equation as u64);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let overlap = ctx.byte(&self.overlap)?;
        let max_overlap = overlap.max_valid().map_or(0.0, f64::from);
        let score = max_risk_score(max_overlap, self.max_rating, self.equation);
        debug!(max_overlap, score, "max risk score");

        let grid = GridSpec::new(1, 1, overlap.grid().pixel_size()).map_err(|e| {
            OpError::ExecutionFailed {
                reason: e.to_string(),
            }
        })?;
        ctx.put(&self.output, Raster::filled(grid, score as f32, None))
    }
}

// ── ReclassifyRiskOp ────────────────────────────────────────────

/// Habitat risk classes `[0, 3]` from a total risk raster and the score
/// written by [`MaxRiskScoreOp`].
#[derive(Debug)]
pub struct ReclassifyRiskOp {
    name: String,
    total_risk: RasterKey,
    max_score: RasterKey,
    output: RasterKey,
}

impl ReclassifyRiskOp {
    /// Create the operation.
    pub fn new(
        total_risk: impl Into<RasterKey>,
        max_score: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
    ) -> Self {
        let output = output.into();
        Self {
            name: format!("ReclassifyRiskOp({output})"),
            total_risk: total_risk.into(),
            max_score: max_score.into(),
            output,
        }
    }
}

impl RasterOp for ReclassifyRiskOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.total_risk.clone(), self.max_score.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let max_raster = ctx.float(&self.max_score)?;
        let max_score = MaxRiskScoreOp::read_score(&max_raster).unwrap_or(0.0);
        let total = ctx.float(&self.total_risk)?;

        let mut out = float_output(*total.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if let Some(r) = total.valid_at(i) {
                *cell = reclassify(f64::from(r), max_score) as f32;
            }
        }
        ctx.put(&self.output, out)
    }
}
