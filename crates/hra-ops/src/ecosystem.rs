//! Study-area layers that span every habitat.

use crate::grid_helpers::{float_output, GridGuard};
use crate::risk::reclassify;
use crate::risk_ops::MaxRiskScoreOp;
use hra_core::{OpError, Raster, RasterKey, BYTE_NODATA};
use hra_task::{OpContext, RasterOp};

/// Number of habitats present at each pixel.
///
/// Pixels with no valid habitat value count 0; the output is never
/// nodata.
#[derive(Debug)]
pub struct EcosystemCountOp {
    habitats: Vec<RasterKey>,
    output: RasterKey,
}

impl EcosystemCountOp {
    /// Create the operation. `habitats` must not be empty.
    pub fn new(habitats: Vec<RasterKey>, output: impl Into<RasterKey>) -> Result<Self, String> {
        if habitats.is_empty() {
            return Err("at least one habitat raster is required".to_string());
        }
        Ok(Self {
            habitats,
            output: output.into(),
        })
    }
}

impl RasterOp for EcosystemCountOp {
    fn name(&self) -> &str {
        "EcosystemCountOp"
    }

    fn reads(&self) -> Vec<RasterKey> {
        self.habitats.clone()
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let first = ctx.byte(&self.habitats[0])?;
        let guard = GridGuard::new(&self.habitats[0], first.grid());
        let mut rasters = vec![first];
        for key in &self.habitats[1..] {
            rasters.push(guard.byte(ctx, key)?);
        }

        let mut out = Raster::<u8>::filled(guard.grid(), 0, Some(BYTE_NODATA));
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            let count = rasters.iter().filter(|r| r.is_present(i)).count();
            *cell = saturate(count);
        }
        ctx.put(&self.output, out)
    }
}

/// Number of stressors present at each pixel of the ecosystem, nodata
/// where no habitat is present.
#[derive(Debug)]
pub struct StressorOverlapOp {
    ecosystem: RasterKey,
    stressors: Vec<RasterKey>,
    output: RasterKey,
}

impl StressorOverlapOp {
    /// Create the operation.
    pub fn new(
        ecosystem: impl Into<RasterKey>,
        stressors: Vec<RasterKey>,
        output: impl Into<RasterKey>,
    ) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            stressors,
            output: output.into(),
        }
    }
}

impl RasterOp for StressorOverlapOp {
    fn name(&self) -> &str {
        "StressorOverlapOp"
    }

    fn reads(&self) -> Vec<RasterKey> {
        let mut keys = vec![self.ecosystem.clone()];
        keys.extend(self.stressors.iter().cloned());
        keys
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let ecosystem = ctx.byte(&self.ecosystem)?;
        let guard = GridGuard::new(&self.ecosystem, ecosystem.grid());
        let stressors = self
            .stressors
            .iter()
            .map(|k| guard.byte(ctx, k))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Raster::<u8>::nodata_filled(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            if ecosystem.valid_at(i).is_some_and(|n| n > 0) {
                *cell = saturate(stressors.iter().filter(|r| r.is_present(i)).count());
            }
        }
        ctx.put(&self.output, out)
    }
}

/// Ecosystem risk class: the mean habitat risk class over the habitats
/// present at each pixel, reclassified into `[0, 3]` against the score
/// written by [`MaxRiskScoreOp`].
///
/// Nodata where no habitat is present.
#[derive(Debug)]
pub struct EcosystemRiskOp {
    ecosystem: RasterKey,
    habitat_risks: Vec<RasterKey>,
    max_score: RasterKey,
    output: RasterKey,
}

impl EcosystemRiskOp {
    /// Create the operation.
    pub fn new(
        ecosystem: impl Into<RasterKey>,
        habitat_risks: Vec<RasterKey>,
        max_score: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
    ) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            habitat_risks,
            max_score: max_score.into(),
            output: output.into(),
        }
    }
}

impl RasterOp for EcosystemRiskOp {
    fn name(&self) -> &str {
        "EcosystemRiskOp"
    }

    fn reads(&self) -> Vec<RasterKey> {
        let mut keys = vec![self.ecosystem.clone(), self.max_score.clone()];
        keys.extend(self.habitat_risks.iter().cloned());
        keys
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        let max_raster = ctx.float(&self.max_score)?;
        let max_score = MaxRiskScoreOp::read_score(&max_raster).unwrap_or(0.0);
        let ecosystem = ctx.byte(&self.ecosystem)?;
        let guard = GridGuard::new(&self.ecosystem, ecosystem.grid());
        let risks = self
            .habitat_risks
            .iter()
            .map(|k| guard.float(ctx, k))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = float_output(guard.grid());
        for (i, cell) in out.data_mut().iter_mut().enumerate() {
            let Some(count) = ecosystem.valid_at(i).filter(|&n| n > 0) else {
                continue;
            };
            let sum: f64 = risks
                .iter()
                .filter_map(|r| r.valid_at(i))
                .map(f64::from)
                .sum();
            *cell = reclassify(sum / f64::from(count), max_score) as f32;
        }
        ctx.put(&self.output, out)
    }
}

/// Counts above 254 would collide with the byte nodata value.
fn saturate(count: usize) -> u8 {
    count.min(usize::from(BYTE_NODATA - 1)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use hra_core::{MemoryStore, RasterStore, FLOAT_NODATA};
    use hra_test_utils::{float_raster, presence, run_op, NullGeoprocessor};

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put("h1".into(), presence(1, 4, &[(0, 0), (0, 1)]).into())
            .unwrap();
        store
            .put("h2".into(), presence(1, 4, &[(0, 1), (0, 2)]).into())
            .unwrap();
        store
            .put("s1".into(), presence(1, 4, &[(0, 1), (0, 3)]).into())
            .unwrap();
        store
            .put("s2".into(), presence(1, 4, &[(0, 1), (0, 2)]).into())
            .unwrap();
        store
    }

    #[test]
    fn counts_and_overlap() {
        let store = seeded();
        let count = EcosystemCountOp::new(vec!["h1".into(), "h2".into()], "eco").unwrap();
        run_op(&store, &NullGeoprocessor, &count).unwrap();
        assert_eq!(store.byte(&"eco".into()).unwrap().data(), &[1, 2, 1, 0]);

        let overlap = StressorOverlapOp::new("eco", vec!["s1".into(), "s2".into()], "ov");
        run_op(&store, &NullGeoprocessor, &overlap).unwrap();
        // Stressor s1 at column 3 lies outside every habitat.
        assert_eq!(
            store.byte(&"ov".into()).unwrap().data(),
            &[0, 2, 1, BYTE_NODATA]
        );
    }

    #[test]
    fn ecosystem_risk_averages_present_habitats() {
        let store = seeded();
        run_op(
            &store,
            &NullGeoprocessor,
            &EcosystemCountOp::new(vec!["h1".into(), "h2".into()], "eco").unwrap(),
        )
        .unwrap();
        store
            .put(
                "r1".into(),
                float_raster(1, 4, &[1.0, 3.0, FLOAT_NODATA, FLOAT_NODATA]).into(),
            )
            .unwrap();
        store
            .put(
                "r2".into(),
                float_raster(1, 4, &[FLOAT_NODATA, 2.0, 2.0, FLOAT_NODATA]).into(),
            )
            .unwrap();
        store
            .put("max".into(), float_raster(1, 1, &[3.0]).into())
            .unwrap();
        let op = EcosystemRiskOp::new("eco", vec!["r1".into(), "r2".into()], "max", "eco_risk");
        run_op(&store, &NullGeoprocessor, &op).unwrap();
        // Column 1: (3 + 2) / 2 = 2.5, which rounds up to class 3.
        assert_eq!(
            store.float(&"eco_risk".into()).unwrap().data(),
            &[1.0, 3.0, 2.0, FLOAT_NODATA]
        );
    }

    #[test]
    fn ecosystem_risk_uses_the_max_risk_score() {
        let store = seeded();
        run_op(
            &store,
            &NullGeoprocessor,
            &EcosystemCountOp::new(vec!["h1".into(), "h2".into()], "eco").unwrap(),
        )
        .unwrap();
        store
            .put(
                "r1".into(),
                float_raster(1, 4, &[2.0, 3.0, FLOAT_NODATA, FLOAT_NODATA]).into(),
            )
            .unwrap();
        store
            .put(
                "r2".into(),
                float_raster(1, 4, &[FLOAT_NODATA, 3.0, 0.0, FLOAT_NODATA]).into(),
            )
            .unwrap();
        store
            .put("max".into(), float_raster(1, 1, &[9.0]).into())
            .unwrap();
        let op = EcosystemRiskOp::new("eco", vec!["r1".into(), "r2".into()], "max", "eco_risk");
        run_op(&store, &NullGeoprocessor, &op).unwrap();
        // Classes are divided by 9 / 3: ceil(2 / 3) = 1, ceil(3 / 3) = 1.
        assert_eq!(
            store.float(&"eco_risk".into()).unwrap().data(),
            &[1.0, 1.0, 0.0, FLOAT_NODATA]
        );
    }

    #[test]
    fn empty_habitat_list_is_rejected() {
        assert!(EcosystemCountOp::new(vec![], "eco").is_err());
    }

    #[test]
    fn saturate_stays_below_nodata() {
        assert_eq!(saturate(3), 3);
        assert_eq!(saturate(1000), 254);
    }
}
