//! Per-zone summary of exposure and consequence scores.

use hra_core::ZoneMeans;
use hra_criteria::CriteriaKind;
use indexmap::IndexMap;

/// Zone means of one habitat and stressor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PairStats {
    /// Zone name to mean exposure.
    pub exposure: ZoneMeans,
    /// Zone name to mean consequence.
    pub consequence: ZoneMeans,
}

/// One row of the flattened statistics table.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsRow<'a> {
    /// Habitat name.
    pub habitat: &'a str,
    /// Stressor name.
    pub stressor: &'a str,
    /// Zone name.
    pub zone: &'a str,
    /// Mean exposure, if the zone was measured.
    pub exposure: Option<f64>,
    /// Mean consequence, if the zone was measured.
    pub consequence: Option<f64>,
}

/// Zone means for every habitat and stressor pair, in run order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CriteriaStats {
    pairs: IndexMap<(String, String), PairStats>,
}

impl CriteriaStats {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the zone means of one score.
    pub fn insert(&mut self, habitat: &str, stressor: &str, kind: CriteriaKind, means: ZoneMeans) {
        let entry = self
            .pairs
            .entry((habitat.to_string(), stressor.to_string()))
            .or_default();
        match kind {
            CriteriaKind::Exposure => entry.exposure = means,
            CriteriaKind::Consequence => entry.consequence = means,
        }
    }

    /// Stats of one pair.
    pub fn get(&self, habitat: &str, stressor: &str) -> Option<&PairStats> {
        self.pairs
            .get(&(habitat.to_string(), stressor.to_string()))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if no pair was recorded.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// One row per pair and zone. Zones appear in exposure order, then
    /// any zone seen only in consequence.
    pub fn rows(&self) -> Vec<StatsRow<'_>> {
        let mut rows = Vec::new();
        for ((habitat, stressor), stats) in &self.pairs {
            let zones = stats
                .exposure
                .keys()
                .chain(stats.consequence.keys().filter(|z| !stats.exposure.contains_key(*z)));
            for zone in zones {
                rows.push(StatsRow {
                    habitat,
                    stressor,
                    zone,
                    exposure: stats.exposure.get(zone).copied(),
                    consequence: stats.consequence.get(zone).copied(),
                });
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_join_exposure_and_consequence() {
        let mut stats = CriteriaStats::new();
        stats.insert(
            "kelp",
            "oil",
            CriteriaKind::Exposure,
            [("bay".to_string(), 1.5)].into_iter().collect(),
        );
        stats.insert(
            "kelp",
            "oil",
            CriteriaKind::Consequence,
            [("bay".to_string(), 2.0), ("reef".to_string(), 0.5)]
                .into_iter()
                .collect(),
        );
        assert_eq!(stats.len(), 1);
        let rows = stats.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].zone, "bay");
        assert_eq!((rows[0].exposure, rows[0].consequence), (Some(1.5), Some(2.0)));
        assert_eq!(rows[1].zone, "reef");
        assert_eq!(rows[1].exposure, None);
    }
}
