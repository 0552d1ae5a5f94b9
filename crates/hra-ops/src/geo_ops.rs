//! Operations that delegate to the [`Geoprocessor`](hra_core::Geoprocessor).
//!
//! Each one claims its outputs through the context before handing the
//! keys to the collaborator, so undeclared writes are caught even though
//! the collaborator writes to the store directly.

use hra_core::{
    BoundingPolicy, BurnMode, Fingerprint, OpError, RasterKey, Resample, VectorLayer, ZonalStats, ZoneMeans,
};
use hra_task::{OpContext, RasterOp};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Zone name used when the zone layer carries no names.
pub const UNNAMED_ZONE: &str = "AOI";

// ── RasterizeOp ─────────────────────────────────────────────────

/// Burn a vector layer into a raster.
#[derive(Debug)]
pub struct RasterizeOp {
    name: String,
    vector: Arc<VectorLayer>,
    output: RasterKey,
    burn: BurnMode,
}

impl RasterizeOp {
    /// Create the operation.
    pub fn new(vector: Arc<VectorLayer>, output: impl Into<RasterKey>, burn: BurnMode) -> Self {
        let output = output.into();
        Self {
            name: format!("RasterizeOp({output})"),
            vector,
            output,
            burn,
        }
    }
}

impl RasterOp for RasterizeOp {
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
        fp.write_vector(&self.vector).write_u64(self.burn as u64);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        ctx.claim_output(&self.output)?;
        ctx.geo()
            .rasterize(ctx.store(), &self.vector, &self.output, self.burn)?;
        Ok(())
    }
}

// ── AlignOp ─────────────────────────────────────────────────────

/// Resample every input onto one shared grid.
#[derive(Debug)]
pub struct AlignOp {
    inputs: Vec<RasterKey>,
    outputs: Vec<RasterKey>,
    pixel_size: f64,
    bounding: BoundingPolicy,
}

impl AlignOp {
    /// Create the operation. Inputs and outputs pair up by position.
    pub fn new(
        inputs: Vec<RasterKey>,
        outputs: Vec<RasterKey>,
        pixel_size: f64,
        bounding: BoundingPolicy,
    ) -> Result<Self, String> {
        if inputs.len() != outputs.len() {
            return Err(format!(
                "{} inputs but {} outputs",
                inputs.len(),
                outputs.len()
            ));
        }
        if inputs.is_empty() {
            return Err("nothing to align".to_string());
        }
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(format!(
                "pixel_size must be finite and positive, got {pixel_size}"
            ));
        }
        Ok(Self {
            inputs,
            outputs,
            pixel_size,
            bounding,
        })
    }
}

impl RasterOp for AlignOp {
    fn name(&self) -> &str {
        "AlignOp"
    }

    fn reads(&self) -> Vec<RasterKey> {
        self.inputs.clone()
    }

    fn writes(&self) -> Vec<RasterKey> {
        self.outputs.clone()
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.pixel_size).write_u64(self.bounding as u64);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        for key in &self.inputs {
            ctx.check_input(key)?;
        }
        for key in &self.outputs {
            ctx.claim_output(key)?;
        }
        debug!(
            layers = self.inputs.len(),
            pixel_size = self.pixel_size,
            "aligning layers"
        );
        ctx.geo().align_and_resize(
            ctx.store(),
            &self.inputs,
            &self.outputs,
            Resample::Nearest,
            self.pixel_size,
            self.bounding,
            None,
        )?;
        Ok(())
    }
}

// ── DistanceTransformOp ─────────────────────────────────────────

/// Distance from every pixel to the nearest stressor pixel, in
/// projection units.
#[derive(Debug)]
pub struct DistanceTransformOp {
    name: String,
    stressor: RasterKey,
    output: RasterKey,
    sampling_distance: f64,
}

impl DistanceTransformOp {
    /// Create the operation. `sampling_distance` is the pixel side in
    /// projection units.
    pub fn new(
        stressor: impl Into<RasterKey>,
        output: impl Into<RasterKey>,
        sampling_distance: f64,
    ) -> Self {
        let output = output.into();
        Self {
            name: format!("DistanceTransformOp({output})"),
            stressor: stressor.into(),
            output,
            sampling_distance,
        }
    }
}

impl RasterOp for DistanceTransformOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.stressor.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_f64(self.sampling_distance);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        ctx.check_input(&self.stressor)?;
        ctx.claim_output(&self.output)?;
        ctx.geo().distance_transform(
            ctx.store(),
            &self.stressor,
            &self.output,
            self.sampling_distance,
        )?;
        Ok(())
    }
}

// ── ZonalMeanOp ─────────────────────────────────────────────────

/// Mean of a score raster under each named zone.
///
/// Features sharing a name are merged into one zone. When the layer has
/// no names at all, every feature merges into [`UNNAMED_ZONE`]; in a
/// named layer, unnamed features are skipped.
#[derive(Debug)]
pub struct ZonalMeanOp {
    name: String,
    raster: RasterKey,
    zones: Arc<VectorLayer>,
    output: RasterKey,
}

impl ZonalMeanOp {
    /// Create the operation.
    pub fn new(
        raster: impl Into<RasterKey>,
        zones: Arc<VectorLayer>,
        output: impl Into<RasterKey>,
    ) -> Self {
        let output = output.into();
        Self {
            name: format!("ZonalMeanOp({output})"),
            raster: raster.into(),
            zones,
            output,
        }
    }
}

impl RasterOp for ZonalMeanOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> Vec<RasterKey> {
        vec![self.raster.clone()]
    }

    fn writes(&self) -> Vec<RasterKey> {
        vec![self.output.clone()]
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.write_vector(&self.zones);
    }

    fn run(&self, ctx: &mut OpContext<'_>) -> Result<(), OpError> {
        ctx.check_input(&self.raster)?;
        let per_feature = ctx
            .geo()
            .zonal_statistics(ctx.store(), &self.raster, &self.zones)?;

        let named = self.zones.has_names();
        let mut merged: IndexMap<String, ZonalStats> = IndexMap::new();
        for feature in self.zones.features() {
            let Some(stats) = per_feature.get(&feature.fid) else {
                continue;
            };
            let zone = match (&feature.name, named) {
                (Some(name), _) => name.clone(),
                (None, false) => UNNAMED_ZONE.to_string(),
                (None, true) => continue,
            };
            merged.entry(zone).or_default().merge(*stats);
        }
        let means: ZoneMeans = merged
            .into_iter()
            .map(|(zone, stats)| (zone, stats.mean()))
            .collect();
        ctx.put(&self.output, means)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hra_core::{Feature, MemoryStore, RasterStore};
    use hra_geo::GridGeoprocessor;
    use hra_test_utils::{float_raster, grid, presence, run_op};

    #[test]
    fn rasterize_then_distance() {
        let store = MemoryStore::new();
        let geo = GridGeoprocessor::new();
        let vector = Arc::new(VectorLayer::new(
            grid(1, 4),
            vec![Feature::new(0, vec![(0, 0)])],
        ));
        run_op(&store, &geo, &RasterizeOp::new(vector, "s", BurnMode::Presence)).unwrap();
        assert_eq!(store.byte(&"s".into()).unwrap().data(), &[1, 0, 0, 0]);

        run_op(&store, &geo, &DistanceTransformOp::new("s", "d", 2.0)).unwrap();
        assert_eq!(
            store.float(&"d".into()).unwrap().data(),
            &[0.0, 2.0, 4.0, 6.0]
        );
    }

    #[test]
    fn align_writes_every_target() {
        let store = MemoryStore::new();
        let geo = GridGeoprocessor::new();
        store.put("a".into(), presence(2, 2, &[(0, 0)]).into()).unwrap();
        store.put("b".into(), presence(2, 2, &[(1, 1)]).into()).unwrap();
        let op = AlignOp::new(
            vec!["a".into(), "b".into()],
            vec!["a2".into(), "b2".into()],
            1.0,
            BoundingPolicy::Union,
        )
        .unwrap();
        run_op(&store, &geo, &op).unwrap();
        assert_eq!(store.byte(&"a2".into()).unwrap().data(), &[1, 0, 0, 0]);
        assert_eq!(store.byte(&"b2".into()).unwrap().data(), &[0, 0, 0, 1]);
    }

    #[test]
    fn align_rejects_mismatched_lists() {
        assert!(AlignOp::new(vec!["a".into()], vec![], 1.0, BoundingPolicy::Union).is_err());
        assert!(AlignOp::new(vec![], vec![], 1.0, BoundingPolicy::Union).is_err());
    }

    #[test]
    fn zonal_means_merge_by_name() {
        let store = MemoryStore::new();
        let geo = GridGeoprocessor::new();
        store
            .put("score".into(), float_raster(1, 4, &[1.0, 3.0, 2.0, 6.0]).into())
            .unwrap();
        let zones = Arc::new(VectorLayer::new(
            grid(1, 4),
            vec![
                Feature::new(0, vec![(0, 0)]).with_name("bay"),
                Feature::new(1, vec![(0, 1)]).with_name("bay"),
                Feature::new(2, vec![(0, 2), (0, 3)]).with_name("reef"),
            ],
        ));
        run_op(&store, &geo, &ZonalMeanOp::new("score", zones, "stats")).unwrap();
        let stats = store.stats(&"stats".into()).unwrap();
        assert_eq!(stats.get("bay"), Some(&2.0));
        assert_eq!(stats.get("reef"), Some(&4.0));
    }

    #[test]
    fn unnamed_zones_merge_into_aoi() {
        let store = MemoryStore::new();
        let geo = GridGeoprocessor::new();
        store
            .put("score".into(), float_raster(1, 2, &[1.0, 2.0]).into())
            .unwrap();
        let zones = Arc::new(VectorLayer::new(
            grid(1, 2),
            vec![Feature::new(0, vec![(0, 0)]), Feature::new(1, vec![(0, 1)])],
        ));
        run_op(&store, &geo, &ZonalMeanOp::new("score", zones, "stats")).unwrap();
        let stats = store.stats(&"stats".into()).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get(UNNAMED_ZONE), Some(&1.5));
    }
}
