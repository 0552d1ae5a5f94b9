//! Assessment orchestration: from tables and layers to a task plan, and
//! from the plan to results.
//!
//! [`Assessment::prepare`] does every table-level check before any
//! raster is touched. [`Assessment::run`] resolves the layer sources,
//! builds and validates the whole [`Plan`], then executes it on a
//! [`TaskGraph`]:
//!
//! ```text
//! rasterize ─▶ align ─┬▶ distance ─────────────▶ E/C numerator ─▶ E/C score ─▶ pair risk
//!                     ├▶ ecosystem count ─▶ overlap ─▶ max score        │            │
//!                     └▶ recovery numerator ─▶ recovery           total E/C    total risk
//!                                                                            ─▶ reclass ─▶ ecosystem risk
//! ```

use crate::config::{ConfigError, RunConfig, SchedulePolicy};
use crate::layout::KeyLayout;
use crate::scheduler::{ScheduleError, TaskGraph, TaskId};
use crate::stats::CriteriaStats;
use hra_core::{
    BoundingPolicy, BurnMode, Geoprocessor, RasterKey, RasterStore, StoreError, VectorLayer,
};
use hra_criteria::{
    parse_criteria, CriteriaError, CriteriaKind, Inventory, ScoreRecord, ScoreTable,
    SpatialCriterion, Table,
};
use hra_ops::{
    AlignOp, DistanceTransformOp, EcosystemCountOp, EcosystemRiskOp, MaxRiskScoreOp,
    PairNumeratorOp, PairRiskOp, PairScoreOp, RasterizeOp, ReclassifyRiskOp,
    RecoveryNumeratorOp, RecoveryOp, StressorOverlapOp, TotalRiskOp, TotalScoreOp, ZonalMeanOp,
};
use hra_task::{validate_plan, Plan, PlanError, PlanIndex, PlanStep};
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const KINDS: [CriteriaKind; 2] = [CriteriaKind::Exposure, CriteriaKind::Consequence];

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from preparing or running an assessment.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RunError {
    /// Invalid run parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The inventory or criteria table was rejected.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),
    /// The task plan failed static validation.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Scheduling failed or a task failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// A source or result layer could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A layer source is neither in the store nor a supplied vector.
    #[error("layer source '{name}' is neither in the store nor a supplied vector layer")]
    UnresolvedSource {
        /// The source name.
        name: String,
    },
    /// The zone layer has no features.
    #[error("zone layer has no features")]
    EmptyZones,
    /// An operation rejected its parameters.
    #[error("cannot build {task}: {reason}")]
    Build {
        /// The operation being built.
        task: String,
        /// Why it was rejected.
        reason: String,
    },
}

fn build_error(task: impl Into<String>) -> impl FnOnce(String) -> RunError {
    let task = task.into();
    move |reason| RunError::Build { task, reason }
}

// ── Inputs and outputs ─────────────────────────────────────────────

/// Everything an assessment reads besides the raster store.
#[derive(Clone, Debug, Default)]
pub struct AssessmentInputs {
    /// Habitat and stressor layers.
    pub inventory: Inventory,
    /// The criteria ratings table.
    pub criteria: Table,
    /// Vector layers by source name. A source found here is rasterized;
    /// any other source must already be a raster in the store.
    pub vectors: IndexMap<String, VectorLayer>,
    /// Optional zones for per-zone statistics.
    pub zones: Option<VectorLayer>,
}

/// Keys and values produced by a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutputs {
    /// Reclassified risk per habitat.
    pub habitat_risk: IndexMap<String, RasterKey>,
    /// Recovery class per habitat.
    pub recovery: IndexMap<String, RasterKey>,
    /// Total exposure per habitat.
    pub total_exposure: IndexMap<String, RasterKey>,
    /// Total consequence per habitat.
    pub total_consequence: IndexMap<String, RasterKey>,
    /// Total risk per habitat.
    pub total_risk: IndexMap<String, RasterKey>,
    /// Reclassified ecosystem risk.
    pub ecosystem_risk: RasterKey,
    /// Theoretical maximum risk score of the study area.
    pub max_risk_score: f64,
    /// Zone means, when zones were supplied.
    pub criteria_stats: Option<CriteriaStats>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Presence,
    Rating,
}

// ── Assessment ─────────────────────────────────────────────────────

/// A validated assessment, ready to run against a store.
#[derive(Debug)]
pub struct Assessment {
    config: RunConfig,
    inventory: Inventory,
    scores: Arc<ScoreTable>,
    vectors: IndexMap<String, Arc<VectorLayer>>,
    zones: Option<Arc<VectorLayer>>,
    layout: KeyLayout,
}

impl Assessment {
    /// Validate the configuration, inventory and criteria table, and
    /// accumulate the scores.
    pub fn prepare(inputs: AssessmentInputs, config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        inputs.inventory.validate()?;
        let parsed = parse_criteria(&inputs.criteria, &inputs.inventory, config.max_rating)?;
        let scores = ScoreTable::accumulate(&parsed)?;
        if inputs.zones.as_ref().is_some_and(VectorLayer::is_empty) {
            return Err(RunError::EmptyZones);
        }
        info!(
            habitats = inputs.inventory.habitat_count(),
            stressors = inputs.inventory.stressor_count(),
            "criteria accepted"
        );
        let layout = KeyLayout::new(config.output_suffix.as_deref());
        Ok(Self {
            config,
            inventory: inputs.inventory,
            scores: Arc::new(scores),
            vectors: inputs
                .vectors
                .into_iter()
                .map(|(k, v)| (k, Arc::new(v)))
                .collect(),
            zones: inputs.zones.map(Arc::new),
            layout,
        })
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Accumulated scores.
    pub fn scores(&self) -> &ScoreTable {
        &self.scores
    }

    /// Key naming for this run.
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Every distinct layer source with the role it is burned in.
    fn sources(&self) -> IndexMap<String, Role> {
        let mut sources = IndexMap::new();
        for h in self.inventory.habitats() {
            if let Some(src) = self.inventory.habitat_source(h) {
                sources.entry(src.to_string()).or_insert(Role::Presence);
            }
        }
        for s in self.inventory.stressors() {
            if let Some(entry) = self.inventory.stressor(s) {
                sources.entry(entry.source.clone()).or_insert(Role::Presence);
            }
        }
        for key in self.scores.spatial_rasters() {
            sources.entry(key.as_str().to_string()).or_insert(Role::Rating);
        }
        sources
    }

    /// Check every source resolves to a vector or a store raster of the
    /// right kind.
    fn preflight(&self, store: &dyn RasterStore) -> Result<(), RunError> {
        for (source, role) in self.sources() {
            if self.vectors.contains_key(&source) {
                continue;
            }
            let key = RasterKey::new(source.as_str());
            if !store.contains(&key) {
                return Err(RunError::UnresolvedSource { name: source });
            }
            match role {
                Role::Presence => {
                    store.byte(&key)?;
                }
                Role::Rating => {
                    store.float(&key)?;
                }
            }
        }
        Ok(())
    }

    fn habitat_source<'a>(&'a self, habitat: &'a str) -> &'a str {
        self.inventory.habitat_source(habitat).unwrap_or(habitat)
    }

    fn stressor_source<'a>(&'a self, stressor: &'a str) -> &'a str {
        self.inventory
            .stressor(stressor)
            .map_or(stressor, |e| e.source.as_str())
    }

    fn aligned_spatial(&self, record: &ScoreRecord) -> Vec<SpatialCriterion> {
        record
            .spatial
            .values()
            .map(|s| SpatialCriterion {
                raster: self.layout.aligned(s.raster.as_str()),
                ..s.clone()
            })
            .collect()
    }

    /// Resolve sources and build the full task plan.
    ///
    /// Every dependency edge is explicit. Under
    /// [`SchedulePolicy::JoinBarriers`] the plan also carries barriers
    /// between phases.
    pub fn build_plan(&self, store: &dyn RasterStore) -> Result<Plan, RunError> {
        self.preflight(store)?;
        let cfg = &self.config;
        let layout = &self.layout;
        let barriers = cfg.schedule == SchedulePolicy::JoinBarriers;
        let pixel_size = cfg.pixel_size();
        let mut plan = Plan::new();

        // Rasterize vector sources, then align everything.
        let mut burned = Vec::new();
        let mut align_in = Vec::new();
        let mut align_out = Vec::new();
        for (source, role) in self.sources() {
            let input = match self.vectors.get(&source) {
                Some(vector) => {
                    let key = layout.rasterized(&source);
                    let burn = match role {
                        Role::Presence => BurnMode::Presence,
                        Role::Rating => BurnMode::Attribute,
                    };
                    burned.push(plan.add(
                        RasterizeOp::new(Arc::clone(vector), key.clone(), burn),
                        &[],
                    ));
                    key
                }
                None => RasterKey::new(source.as_str()),
            };
            align_in.push(input);
            align_out.push(layout.aligned(&source));
        }
        if barriers && !burned.is_empty() {
            plan.barrier();
        }
        let align = plan.add(
            AlignOp::new(align_in, align_out, pixel_size, BoundingPolicy::Union)
                .map_err(build_error("AlignOp"))?,
            &burned,
        );
        if barriers {
            plan.barrier();
        }

        // Study-area layers.
        let habitats: Vec<&str> = self.inventory.habitats().collect();
        let stressors: Vec<&str> = self.inventory.stressors().collect();
        let mut distance: IndexMap<&str, PlanIndex> = IndexMap::new();
        for &s in &stressors {
            let op = DistanceTransformOp::new(
                layout.aligned(self.stressor_source(s)),
                layout.distance(s),
                pixel_size,
            );
            distance.insert(s, plan.add(op, &[align]));
        }
        let eco_key = layout.ecosystem_count();
        let eco = plan.add(
            EcosystemCountOp::new(
                habitats
                    .iter()
                    .map(|h| layout.aligned(self.habitat_source(h)))
                    .collect(),
                eco_key.clone(),
            )
            .map_err(build_error("EcosystemCountOp"))?,
            &[align],
        );
        let overlap = plan.add(
            StressorOverlapOp::new(
                eco_key.clone(),
                stressors
                    .iter()
                    .map(|s| layout.aligned(self.stressor_source(s)))
                    .collect(),
                layout.stressor_overlap(),
            ),
            &[eco, align],
        );
        let max_score = plan.add(
            MaxRiskScoreOp::new(
                layout.stressor_overlap(),
                layout.max_risk_score(),
                cfg.max_rating,
                cfg.risk_equation,
            ),
            &[overlap],
        );
        if barriers {
            plan.barrier();
        }

        // Per habitat.
        let mut final_tasks = vec![eco];
        for &h in &habitats {
            let hab = layout.aligned(self.habitat_source(h));
            let recovery = self.scores.recovery(h).ok_or_else(|| RunError::Build {
                task: format!("recovery of '{h}'"),
                reason: "no resilience record".to_string(),
            })?;
            let rnum = plan.add(
                RecoveryNumeratorOp::new(
                    hab.clone(),
                    layout.recovery_numerator(h),
                    recovery.numerator,
                    self.aligned_spatial(recovery),
                ),
                &[align],
            );
            let recov = plan.add(
                RecoveryOp::new(
                    layout.recovery_numerator(h),
                    layout.recovery(h),
                    recovery.denominator,
                    cfg.max_rating,
                )
                .map_err(build_error(format!("RecoveryOp({h})")))?,
                &[rnum],
            );
            final_tasks.push(recov);

            let mut numerators: IndexMap<CriteriaKind, (Vec<RasterKey>, Vec<PlanIndex>, f64)> =
                KINDS.iter().map(|&k| (k, (Vec::new(), Vec::new(), 0.0))).collect();
            let mut risks = (Vec::new(), Vec::new());
            for &s in &stressors {
                let pair = self.scores.pair(h, s).ok_or_else(|| RunError::Build {
                    task: format!("pair '{h}'/'{s}'"),
                    reason: "no overlap record".to_string(),
                })?;
                let buffer_m = self.inventory.stressor(s).map_or(0.0, |e| e.buffer_m);
                let buffer = cfg.buffer_in_projection_units(buffer_m);
                let dist = distance[s];
                let mut score_tasks = SmallVec::<[PlanIndex; 2]>::new();
                for kind in KINDS {
                    let record = pair.get(kind);
                    let mut builder = PairNumeratorOp::builder()
                        .habitat(hab.clone())
                        .distance(layout.distance(s))
                        .output(layout.numerator(kind, h, s))
                        .numerator(record.numerator)
                        .buffer(buffer)
                        .decay(cfg.decay_equation);
                    for criterion in self.aligned_spatial(record) {
                        builder = builder.spatial(criterion);
                    }
                    let num = plan.add(
                        builder
                            .build()
                            .map_err(build_error(format!("{kind} numerator {h}/{s}")))?,
                        &[align, dist],
                    );
                    let score = plan.add(
                        PairScoreOp::builder()
                            .habitat(hab.clone())
                            .distance(layout.distance(s))
                            .numerator(layout.numerator(kind, h, s))
                            .output(layout.score(kind, h, s))
                            .denominator(record.denominator)
                            .buffer(buffer)
                            .build()
                            .map_err(build_error(format!("{kind} score {h}/{s}")))?,
                        &[num],
                    );
                    if let Some(zones) = &self.zones {
                        plan.add(
                            ZonalMeanOp::new(
                                layout.score(kind, h, s),
                                Arc::clone(zones),
                                layout.zonal_stats(kind, h, s),
                            ),
                            &[score],
                        );
                    }
                    if let Some(entry) = numerators.get_mut(&kind) {
                        entry.0.push(layout.numerator(kind, h, s));
                        entry.1.push(num);
                        entry.2 += record.denominator;
                    }
                    score_tasks.push(score);
                }
                let risk = plan.add(
                    PairRiskOp::new(
                        layout.score(CriteriaKind::Exposure, h, s),
                        layout.score(CriteriaKind::Consequence, h, s),
                        layout.pair_risk(h, s),
                        cfg.risk_equation,
                    ),
                    &score_tasks,
                );
                risks.0.push(layout.pair_risk(h, s));
                risks.1.push(risk);
            }
            if barriers {
                plan.barrier();
            }

            for (kind, (keys, mut deps, mut denominator)) in numerators {
                let output = match kind {
                    CriteriaKind::Exposure => layout.total_exposure(h),
                    CriteriaKind::Consequence => layout.total_consequence(h),
                };
                let mut keys = keys;
                if kind == CriteriaKind::Consequence {
                    keys.push(layout.recovery_numerator(h));
                    deps.push(rnum);
                    denominator += recovery.denominator;
                }
                deps.push(align);
                plan.add(
                    TotalScoreOp::new(hab.clone(), keys, output, denominator)
                        .map_err(build_error(format!("total {kind} of '{h}'")))?,
                    &deps,
                );
            }
            let mut risk_deps = risks.1;
            risk_deps.push(align);
            let total = plan.add(
                TotalRiskOp::new(hab.clone(), risks.0, layout.total_risk(h)),
                &risk_deps,
            );
            final_tasks.push(plan.add(
                ReclassifyRiskOp::new(
                    layout.total_risk(h),
                    layout.max_risk_score(),
                    layout.habitat_risk(h),
                ),
                &[total, max_score],
            ));
        }
        if barriers {
            plan.barrier();
        }

        final_tasks.push(max_score);
        plan.add(
            EcosystemRiskOp::new(
                eco_key,
                habitats.iter().map(|h| layout.habitat_risk(h)).collect(),
                layout.max_risk_score(),
                layout.ecosystem_risk(),
            ),
            &final_tasks,
        );
        Ok(plan)
    }

    /// Run the assessment.
    ///
    /// The plan is validated against the store's existing layers before
    /// any task starts. The first task failure aborts the run.
    pub fn run(
        &self,
        store: Arc<dyn RasterStore>,
        geo: Arc<dyn Geoprocessor>,
    ) -> Result<RunOutputs, RunError> {
        let plan = self.build_plan(&*store)?;
        let available: IndexSet<RasterKey> = store.keys().into_iter().collect();
        validate_plan(&plan, &available)?;
        info!(tasks = plan.task_count(), "plan validated");

        let workers = self.config.workers.resolved_worker_count();
        let graph = TaskGraph::new(Arc::clone(&store), geo, workers)?;
        let mut ids: Vec<TaskId> = Vec::with_capacity(plan.task_count());
        for step in plan.into_steps() {
            match step {
                PlanStep::Task(task) => {
                    let deps: SmallVec<[TaskId; 4]> =
                        task.deps.iter().map(|d| ids[d.0]).collect();
                    ids.push(graph.add_task(task.op, &deps)?);
                }
                PlanStep::Barrier => {
                    debug!("barrier");
                    graph.join()?;
                }
            }
        }
        graph.close()?;

        let outputs = self.collect(&*store)?;
        info!(max_risk_score = outputs.max_risk_score, "assessment complete");
        Ok(outputs)
    }

    fn collect(&self, store: &dyn RasterStore) -> Result<RunOutputs, RunError> {
        let layout = &self.layout;
        let per_habitat = |f: &dyn Fn(&str) -> RasterKey| -> IndexMap<String, RasterKey> {
            self.inventory
                .habitats()
                .map(|h| (h.to_string(), f(h)))
                .collect()
        };
        let max = store.float(&layout.max_risk_score())?;
        let max_risk_score = MaxRiskScoreOp::read_score(&max).unwrap_or(0.0);

        let criteria_stats = match &self.zones {
            None => None,
            Some(_) => {
                let mut stats = CriteriaStats::new();
                for h in self.inventory.habitats() {
                    for s in self.inventory.stressors() {
                        for kind in KINDS {
                            let means = store.stats(&layout.zonal_stats(kind, h, s))?;
                            stats.insert(h, s, kind, (*means).clone());
                        }
                    }
                }
                Some(stats)
            }
        };

        Ok(RunOutputs {
            habitat_risk: per_habitat(&|h| layout.habitat_risk(h)),
            recovery: per_habitat(&|h| layout.recovery(h)),
            total_exposure: per_habitat(&|h| layout.total_exposure(h)),
            total_consequence: per_habitat(&|h| layout.total_consequence(h)),
            total_risk: per_habitat(&|h| layout.total_risk(h)),
            ecosystem_risk: layout.ecosystem_risk(),
            max_risk_score,
            criteria_stats,
        })
    }
}
