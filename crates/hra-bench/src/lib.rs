//! Benchmark profiles for the habitat risk assessment engine.
//!
//! Provides pre-built assessments with seeded random layers:
//!
//! - [`reference_profile`]: 100x100 grid, 2 habitats, 3 stressors
//! - [`stress_profile`]: 316x316 grid (~100K cells), 4 habitats, 4 stressors
//! - [`criteria_csv`]: a uniform criteria table for any layer names

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::Write;
use std::sync::Arc;

use hra_core::{GridSpec, MemoryStore, Raster, RasterStore};
use hra_criteria::Inventory;
use hra_engine::AssessmentInputs;
use hra_test_utils::{random_presence, table};
use indexmap::IndexMap;

/// An assessment and the raster sources it reads.
pub struct Profile {
    /// Tables and run inputs.
    pub inputs: AssessmentInputs,
    /// Presence rasters by source name.
    pub sources: IndexMap<String, Raster<u8>>,
}

impl Profile {
    /// A fresh store holding every source.
    pub fn store(&self) -> Arc<dyn RasterStore> {
        let store = MemoryStore::new();
        for (name, raster) in &self.sources {
            store
                .put(name.as_str().into(), raster.clone().into())
                .expect("profile sources are distinct");
        }
        Arc::new(store)
    }
}

/// Criteria table rating every habitat 2 on one resilience criterion and
/// every pair 2 (exposure) and 3 (consequence).
pub fn criteria_csv(habitats: &[String], stressors: &[String]) -> String {
    let pad = ",,,".repeat(habitats.len());
    let mut csv = String::from("HABITAT NAME");
    for h in habitats {
        let _ = write!(csv, ",{h},,");
    }
    csv.push_str(",CRITERIA TYPE\nHABITAT RESILIENCE ATTRIBUTES");
    csv.push_str(&",Rating,DQ,Weight".repeat(habitats.len()));
    csv.push_str(",E/C\nrecruitment");
    csv.push_str(&",2,1,1".repeat(habitats.len()));
    let _ = write!(csv, ",C\n{pad}\nHABITAT STRESSOR OVERLAP PROPERTIES{pad}\n");
    for s in stressors {
        csv.push_str(s);
        csv.push_str(&",Rating,DQ,Weight".repeat(habitats.len()));
        csv.push_str(",E/C\nintensity");
        csv.push_str(&",2,1,1".repeat(habitats.len()));
        csv.push_str(",E\ndamage");
        csv.push_str(&",3,1,1".repeat(habitats.len()));
        csv.push_str(",C\n");
    }
    csv
}

fn profile(seed: u64, size: usize, habitats: usize, stressors: usize) -> Profile {
    let grid = GridSpec::new(size, size, 1.0).expect("profile grid is non-empty");
    let habitat_names: Vec<String> = (0..habitats).map(|i| format!("habitat{i}")).collect();
    let stressor_names: Vec<String> = (0..stressors).map(|i| format!("stressor{i}")).collect();

    let mut inventory = Inventory::new();
    let mut sources = IndexMap::new();
    let mut layer_seed = seed;
    for name in &habitat_names {
        let source = format!("{name}.tif");
        inventory = inventory.with_habitat(name.as_str(), source.as_str());
        sources.insert(source, random_presence(layer_seed, grid, 0.6));
        layer_seed += 1;
    }
    for name in &stressor_names {
        let source = format!("{name}.tif");
        inventory = inventory.with_stressor(name.as_str(), source.as_str(), 5.0);
        sources.insert(source, random_presence(layer_seed, grid, 0.02));
        layer_seed += 1;
    }

    Profile {
        inputs: AssessmentInputs {
            inventory,
            criteria: table(&criteria_csv(&habitat_names, &stressor_names)),
            vectors: IndexMap::new(),
            zones: None,
        },
        sources,
    }
}

/// Build a reference benchmark profile: 100x100 grid (10K cells).
pub fn reference_profile(seed: u64) -> Profile {
    profile(seed, 100, 2, 3)
}

/// Build a stress benchmark profile: 316x316 grid (~100K cells).
pub fn stress_profile(seed: u64) -> Profile {
    profile(seed, 316, 4, 4)
}
