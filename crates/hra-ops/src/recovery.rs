//! Habitat recovery potential.

use crate::grid_helpers::{float_output, write_spatial, GridGuard};
use crate::risk::recovery_class;
use hra_core::{Fingerprint, OpError, RasterKey};
use hra_criteria::SpatialCriterion;
use hra_task::{OpContext, RasterOp};

/// Resilience numerator over a habitat: the fixed numerator plus spatial
/// contributions, nodata outside the habitat.
#[derive(Debug)]
pub struct RecoveryNumeratorOp {
    name: String,
    habitat: RasterKey,
    output: RasterKey,
    numerator: f64,
    spatial: Vec<SpatialCriterion>,
}

impl RecoveryNumeratorOp {
    /// Create the operation.
    pub fn new(
        habitat: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
        numerator: f64,
        spatial: Vec<SpatialCriterion>,
    ) -> Self {
        let output = output.into();
        Self {
            name: format!("RecoveryNumeratorOp({output})"),
            habitat: habitat.into(),
            output,
            numerator,
            spatial,
        }
    }
}

impl RasterOp for RecoveryNumeratorOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        let mut keys = vec![self.habitat.clone()];
        keys.extend(self.spatial.iter().map(|s| s.raster.clone()));
        keys
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.numerator);
        write_spatial(fp, &self.spatial);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let habitat = ctx.byte(&self.habitat)?;
        let guard = GridGuard::new(&self.habitat, habitat.grid());
        let mut spatial = Vec::with_capacity(self.spatial.len());
        for criterion in &self.spatial {
            spatial.push((criterion, guard.float(ctx, &criterion.raster)?));
        }

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if !habitat.is_present(i) {
                continue;
            }
            let mut n = self.numerator;
            for (criterion, raster) in &spatial {
                if let Some(v) = raster.valid_at(i) {
                    n += criterion.pixel_contribution(f64::from(v));
                }
            }
            *cell = n as f32;
        }
        ctx.put(&self.output, out)
    }
}

/// Recovery class `[0, 3]` wherever the recovery numerator is valid.
///
/// 0 is fully resilient, 3 is least able to recover.
#[derive(Debug)]
pub struct RecoveryOp {
    name: String,
    numerator: RasterKey,
    output: RasterKey,
    denominator: f64,
    max_rating: f64,
}

impl RecoveryOp {
    /// Create the operation. Fails unless `denominator` and `max_rating`
    /// are finite and positive.
    pub fn new(
        numerator: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
        denominator: f64,
        max_rating: f64,
    ) -> Result<Self, String> {
        if !denominator.is_finite() || denominator <= 0.0 {
            return Err(format!(
                "denominator must be finite and positive, got {denominator}"
            ));
        }
        if !max_rating.is_finite() || max_rating <= 0.0 {
            return Err(format!(
                "max_rating must be finite and positive, got {max_rating}"
            ));
        }
        let output = output.into();
        Ok(Self {
            name: format!("RecoveryOp({output})"),
            numerator: numerator.into(),
            output,
            denominator,
            max_rating,
        })
    }
}

impl RasterOp for RecoveryOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.numerator.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.denominator).write_f64(self.max_rating);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let numerator = ctx.float(&self.numerator)?;
        let mut out = float_output(*numerator.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if let Some(n) = numerator.valid_at(i) {
                *cell =
                    recovery_class(f64::from(n), self.denominator, self.max_rating) as f32;
            }
        }
        ctx.put(&self.output, out)
    }
}
