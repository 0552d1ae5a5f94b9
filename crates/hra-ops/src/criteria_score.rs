//! Per-pair exposure and consequence scores, and their habitat totals.
//!
//! A pair score is computed in two tasks. [`PairNumeratorOp`] spreads the
//! pair's numerator over the stressor's buffer, adding spatial criteria
//! per pixel and applying distance decay. [`PairScoreOp`] divides by the
//! denominator and fills the rest of the habitat with 0.
//! [`TotalScoreOp`] then sums the numerators of every stressor touching a
//! habitat.

use crate::decay::decay;
use crate::grid_helpers::{float_output, write_spatial, GridGuard};
use hra_core::{DecayEquation, Fingerprint, OpError, Raster, RasterKey};
use hra_criteria::SpatialCriterion;
use hra_task::{OpContext, RasterOp};
use std::sync::Arc;

// ── PairNumeratorOp ─────────────────────────────────────────────

/// Decayed score numerator for one habitat and stressor.
///
/// Where the habitat is present and the distance to the stressor is
/// within `buffer`, the output is `numerator` plus every spatial
/// criterion's pixel contribution, decayed by distance. Elsewhere it is
/// nodata.
#[derive(Debug)]
pub struct PairNumeratorOp {
    name: String,
    habitat: RasterKey,
    distance: RasterKey,
    output: RasterKey,
    numerator: f64,
    spatial: Vec<SpatialCriterion>,
    buffer: f64,
    decay: DecayEquation,
}

/// Builder for [`PairNumeratorOp`].
pub struct PairNumeratorOpBuilder {
    habitat: Option<RasterKey>,
    distance: Option<RasterKey>,
    output: Option<RasterKey>,
    numerator: f64,
    spatial: Vec<SpatialCriterion>,
    buffer: Option<f64>,
    decay: DecayEquation,
}

impl PairNumeratorOp {
    /// Create a new builder.
    pub fn builder() -> PairNumeratorOpBuilder {
        PairNumeratorOpBuilder {
            habitat: None,
            distance: None,
            output: None,
            numerator: 0.0,
            spatial: Vec::new(),
            buffer: None,
            decay: DecayEquation::None,
        }
    }
}

impl PairNumeratorOpBuilder {
    /// Aligned habitat presence raster.
    pub fn habitat(mut self, key: impl Into<RasterKey>) -> Self {
        self.habitat = Some(key.into());
        self
    }

    /// Distance-to-stressor raster, in projection units.
    pub fn distance(mut self, key: impl Into<RasterKey>) -> Self {
        self.distance = Some(key.into());
        self
    }

    /// Key to write.
    pub fn output(mut self, key: impl Into<RasterKey>) -> Self {
        self.output = Some(key.into());
        self
    }

    /// Fixed-rating numerator.
    pub fn numerator(mut self, numerator: f64) -> Self {
        self.numerator = numerator;
        self
    }

    /// Add a spatially explicit criterion.
    pub fn spatial(mut self, criterion: SpatialCriterion) -> Self {
        self.spatial.push(criterion);
        self
    }

    /// Stressor buffer, in projection units.
    pub fn buffer(mut self, buffer: f64) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Decay applied inside the buffer.
    pub fn decay(mut self, decay: DecayEquation) -> Self {
        self.decay = decay;
        self
    }

    /// Build the operation.
    ///
    /// Returns an error if a key or the buffer is missing, or the buffer
    /// is negative or non-finite.
    pub fn build(self) -> Result<PairNumeratorOp, String> {
        let habitat = self.habitat.ok_or("habitat is required")?;
        let distance = self.distance.ok_or("distance is required")?;
        let output = self.output.ok_or("output is required")?;
        let buffer = self.buffer.ok_or("buffer is required")?;
        if !buffer.is_finite() || buffer < 0.0 {
            return Err(format!("buffer must be finite and >= 0, got {buffer}"));
        }
        if !self.numerator.is_finite() {
            return Err(format!("numerator must be finite, got {}", self.numerator));
        }
        Ok(PairNumeratorOp {
            name: format!("PairNumeratorOp({output})"),
            habitat,
            distance,
            output,
            numerator: self.numerator,
            spatial: self.spatial,
            buffer,
            decay: self.decay,
        })
    }
}

impl RasterOp for PairNumeratorOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        let mut keys = vec![self.habitat.clone(), self.distance.clone()];
        keys.extend(self.spatial.iter().map(|s| s.raster.clone()));
        keys
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.numerator)
            .write_f64(self.buffer)
            .write_u64(self.decay as u64);
        write_spatial(fp, &self.spatial);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let habitat = ctx.byte(&self.habitat)?;
        let guard = GridGuard::new(&self.habitat, habitat.grid());
        let distance = guard.float(ctx, &self.distance)?;
        let spatial = self
            .spatial
            .iter()
            .map(|s| guard.float(ctx, &s.raster).map(|r| (s, r)))
            .collect::<Result<Vec<(&SpatialCriterion, Arc<Raster<f32>>)>, OpError>>()?;

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if !habitat.is_present(i) {
                continue;
            }
            let Some(d) = distance.valid_at(i).map(f64::from) else {
                continue;
            };
            if d > self.buffer {
                continue;
            }
            let mut n = self.numerator;
            for (criterion, raster) in &spatial {
                if let Some(v) = raster.valid_at(i) {
                    n += criterion.pixel_contribution(f64::from(v));
                }
            }
            *cell = decay(n, d, self.buffer, self.decay) as f32;
        }
        ctx.put(&self.output, out)
    }
}

// ── PairScoreOp ─────────────────────────────────────────────────

/// Final exposure or consequence score for one habitat and stressor.
///
/// Inside the habitat the score is `numerator / denominator` where the
/// stressor is present (distance 0) or within the open buffer
/// (`0 < d < buffer`) and the numerator is valid, and 0 everywhere else
/// in the habitat. Outside the habitat it is nodata.
#[derive(Debug)]
pub struct PairScoreOp {
    name: String,
    habitat: RasterKey,
    distance: RasterKey,
    numerator: RasterKey,
    output: RasterKey,
    denominator: f64,
    buffer: f64,
}

/// Builder for [`PairScoreOp`].
pub struct PairScoreOpBuilder {
    habitat: Option<RasterKey>,
    distance: Option<RasterKey>,
    numerator: Option<RasterKey>,
    output: Option<RasterKey>,
    denominator: Option<f64>,
    buffer: Option<f64>,
}

impl PairScoreOp {
    /// Create a new builder.
    pub fn builder() -> PairScoreOpBuilder {
        PairScoreOpBuilder {
            habitat: None,
            distance: None,
            numerator: None,
            output: None,
            denominator: None,
            buffer: None,
        }
    }
}

impl PairScoreOpBuilder {
    /// Aligned habitat presence raster.
    pub fn habitat(mut self, key: impl Into<RasterKey>) -> Self {
        self.habitat = Some(key.into());
        self
    }

    /// Distance-to-stressor raster.
    pub fn distance(mut self, key: impl Into<RasterKey>) -> Self {
        self.distance = Some(key.into());
        self
    }

    /// Numerator raster written by [`PairNumeratorOp`].
    pub fn numerator(mut self, key: impl Into<RasterKey>) -> Self {
        self.numerator = Some(key.into());
        self
    }

    /// Key to write.
    pub fn output(mut self, key: impl Into<RasterKey>) -> Self {
        self.output = Some(key.into());
        self
    }

    /// Score denominator.
    pub fn denominator(mut self, denominator: f64) -> Self {
        self.denominator = Some(denominator);
        self
    }

    /// Stressor buffer, in projection units.
    pub fn buffer(mut self, buffer: f64) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Build the operation.
    ///
    /// The denominator must be finite and positive.
    pub fn build(self) -> Result<PairScoreOp, String> {
        let habitat = self.habitat.ok_or("habitat is required")?;
        let distance = self.distance.ok_or("distance is required")?;
        let numerator = self.numerator.ok_or("numerator is required")?;
        let output = self.output.ok_or("output is required")?;
        let denominator = self.denominator.ok_or("denominator is required")?;
        let buffer = self.buffer.ok_or("buffer is required")?;
        if !denominator.is_finite() || denominator <= 0.0 {
            return Err(format!(
                "denominator must be finite and positive, got {denominator}"
            ));
        }
        if !buffer.is_finite() || buffer < 0.0 {
            return Err(format!("buffer must be finite and >= 0, got {buffer}"));
        }
        Ok(PairScoreOp {
            name: format!("PairScoreOp({output})"),
            habitat,
            distance,
            numerator,
            output,
            denominator,
            buffer,
        })
    }
}

impl RasterOp for PairScoreOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![
            self.habitat.clone(),
            self.distance.clone(),
            self.numerator.clone(),
        ]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.denominator).write_f64(self.buffer);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let habitat = ctx.byte(&self.habitat)?;
        let guard = GridGuard::new(&self.habitat, habitat.grid());
        let distance = guard.float(ctx, &self.distance)?;
        let numerator = guard.float(ctx, &self.numerator)?;

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if !habitat.is_present(i) {
                continue;
            }
            let in_zone = distance
                .valid_at(i)
                .map(f64::from)
                .is_some_and(|d| d == 0.0 || (d > 0.0 && d < self.buffer));
            *cell = match numerator.valid_at(i) {
                Some(n) if in_zone => (f64::from(n) / self.denominator) as f32,
                _ => 0.0,
            };
        }
        ctx.put(&self.output, out)
    }
}

// ── TotalScoreOp ────────────────────────────────────────────────

/// Habitat-wide exposure or consequence: the sum of the given numerator
/// rasters divided by the summed denominator.
///
/// The sum starts at 0 wherever the habitat is present and skips nodata
/// numerator pixels. Outside the habitat the output is nodata.
#[derive(Debug)]
pub struct TotalScoreOp {
    name: String,
    habitat: RasterKey,
    numerators: Vec<RasterKey>,
    output: RasterKey,
    denominator: f64,
}

impl TotalScoreOp {
    /// Create the operation. Fails if `denominator` is not finite and
    /// positive.
    pub fn new(
        habitat: impl Into<RasterKey>,
        numerators: Vec<RasterKey>,
        output: impl Into<RasterKey>,
        denominator: f64,
    ) -> Result<Self, String> {
        if !denominator.is_finite() || denominator <= 0.0 {
            return Err(format!(
                "denominator must be finite and positive, got {denominator}"
            ));
        }
        let output = output.into();
        Ok(Self {
            name: format!("TotalScoreOp({output})"),
            habitat: habitat.into(),
            numerators,
            output,
            denominator,
        })
    }
}

impl RasterOp for TotalScoreOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        let mut keys = vec![self.habitat.clone()];
        keys.extend(self.numerators.iter().cloned());
        keys
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.denominator);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let habitat = ctx.byte(&self.habitat)?;
        let guard = GridGuard::new(&self.habitat, habitat.grid());
        let numerators = self
            .numerators
            .iter()
            .map(|k| guard.float(ctx, k))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if !habitat.is_present(i) {
                continue;
            }
            let total: f64 = numerators
                .iter()
                .filter_map(|r| r.valid_at(i))
                .map(f64::from)
                .sum();
            *cell = (total / self.denominator) as f32;
        }
        ctx.put(&self.output, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hra_core::{MemoryStore, RasterStore, FLOAT_NODATA};
    use hra_test_utils::{float_raster, grid, presence, run_op, NullGeoprocessor};

    fn numerator_op(buffer: f64, decay: DecayEquation) -> PairNumeratorOp {
        PairNumeratorOp::builder()
            .habitat("hab")
            .distance("dist")
            .output("num")
            .numerator(3.0)
            .buffer(buffer)
            .decay(decay)
            .build()
            .unwrap()
    }

    fn store_1x4(distances: &[f32]) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put("hab".into(), presence(1, 4, &[(0, 0), (0, 1), (0, 2)]).into())
            .unwrap();
        store
            .put("dist".into(), float_raster(1, 4, distances).into())
            .unwrap();
        store
    }

    #[test]
    fn builder_requires_keys_and_buffer() {
        let err = PairNumeratorOp::builder().build().unwrap_err();
        assert!(err.contains("habitat"), "{err}");
        let err = PairNumeratorOp::builder()
            .habitat("h")
            .distance("d")
            .output("o")
            .buffer(-1.0)
            .build()
            .unwrap_err();
        assert!(err.contains("buffer"), "{err}");
    }

    #[test]
    fn numerator_linear_decay_and_buffer_cut() {
        let store = store_1x4(&[0.0, 5.0, 20.0, 0.0]);
        run_op(&store, &NullGeoprocessor, &numerator_op(10.0, DecayEquation::Linear)).unwrap();
        let out = store.float(&"num".into()).unwrap();
        // Full value on the stressor, half at mid-buffer, nodata past the
        // buffer and outside the habitat.
        assert_eq!(out.data(), &[3.0, 1.5, FLOAT_NODATA, FLOAT_NODATA]);
    }

    #[test]
    fn numerator_adds_spatial_contribution_where_valid() {
        let store = store_1x4(&[0.0, 0.0, 0.0, 0.0]);
        store
            .put(
                "rating".into(),
                float_raster(1, 4, &[2.0, FLOAT_NODATA, 4.0, 1.0]).into(),
            )
            .unwrap();
        let op = PairNumeratorOp::builder()
            .habitat("hab")
            .distance("dist")
            .output("num")
            .numerator(1.0)
            .spatial(SpatialCriterion {
                raster: "rating".into(),
                dq: 2.0,
                weight: 1.0,
            })
            .buffer(0.0)
            .build()
            .unwrap();
        assert!(op.reads().contains(&"rating".into()));
        run_op(&store, &NullGeoprocessor, &op).unwrap();
        let out = store.float(&"num".into()).unwrap();
        assert_eq!(out.data(), &[2.0, 1.0, 3.0, FLOAT_NODATA]);
    }

    #[test]
    fn numerator_rejects_mismatched_grids() {
        let store = MemoryStore::new();
        store.put("hab".into(), presence(2, 2, &[]).into()).unwrap();
        store
            .put("dist".into(), float_raster(1, 4, &[0.0; 4]).into())
            .unwrap();
        let err = run_op(&store, &NullGeoprocessor, &numerator_op(1.0, DecayEquation::None))
            .unwrap_err();
        assert_eq!(
            err,
            OpError::GridMismatch {
                key: "dist".into(),
                reference: "hab".into(),
            }
        );
    }

    #[test]
    fn score_is_zero_in_habitat_outside_buffer() {
        let store = store_1x4(&[0.0, 5.0, 10.0, 0.0]);
        run_op(&store, &NullGeoprocessor, &numerator_op(10.0, DecayEquation::None)).unwrap();
        let op = PairScoreOp::builder()
            .habitat("hab")
            .distance("dist")
            .numerator("num")
            .output("score")
            .denominator(1.5)
            .buffer(10.0)
            .build()
            .unwrap();
        run_op(&store, &NullGeoprocessor, &op).unwrap();
        let out = store.float(&"score".into()).unwrap();
        // d == buffer is outside the open buffer interval.
        assert_eq!(out.data(), &[2.0, 2.0, 0.0, FLOAT_NODATA]);
    }

    #[test]
    fn score_builder_rejects_zero_denominator() {
        let err = PairScoreOp::builder()
            .habitat("h")
            .distance("d")
            .numerator("n")
            .output("o")
            .denominator(0.0)
            .buffer(1.0)
            .build()
            .unwrap_err();
        assert!(err.contains("denominator"), "{err}");
    }

    #[test]
    fn total_sums_valid_numerators() {
        let store = MemoryStore::new();
        store
            .put("hab".into(), presence(1, 3, &[(0, 0), (0, 1)]).into())
            .unwrap();
        store
            .put("a".into(), float_raster(1, 3, &[1.0, FLOAT_NODATA, 5.0]).into())
            .unwrap();
        store
            .put("b".into(), float_raster(1, 3, &[3.0, 2.0, 5.0]).into())
            .unwrap();
        let op = TotalScoreOp::new("hab", vec!["a".into(), "b".into()], "tot", 2.0).unwrap();
        run_op(&store, &NullGeoprocessor, &op).unwrap();
        let out = store.float(&"tot".into()).unwrap();
        assert_eq!(out.data(), &[2.0, 1.0, FLOAT_NODATA]);
    }

    #[test]
    fn total_rejects_bad_denominator() {
        assert!(TotalScoreOp::new("hab", vec![], "tot", f64::NAN).is_err());
    }
}
