//! Folding parsed criteria into numerator/denominator score records.
//!
//! A fixed rating `r >= 1` contributes `r / (dq * weight)` to the
//! numerator and `1 / (dq * weight)` to the denominator. A spatial rating
//! contributes only to the denominator here; its numerator share is
//! added per pixel from the raster (`pixel / (dq * weight)`). Ratings
//! below 1 contribute nothing and are logged.

use crate::error::CriteriaError;
use crate::parser::{CriteriaKind, Criterion, ParsedCriteria, Rating};
use hra_core::RasterKey;
use indexmap::IndexMap;
use tracing::warn;

/// Numerator and denominator contributions of a fixed rating, or `None`
/// for ratings below 1.
pub fn contribution(rating: f64, dq: f64, weight: f64) -> Option<(f64, f64)> {
    if rating < 1.0 {
        return None;
    }
    let divisor = dq * weight;
    Some((rating / divisor, 1.0 / divisor))
}

/// A criterion whose rating is read per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialCriterion {
    /// Raster holding the ratings.
    pub raster: RasterKey,
    /// Data quality divisor.
    pub dq: f64,
    /// Importance divisor.
    pub weight: f64,
}

impl SpatialCriterion {
    /// Numerator contribution of one valid pixel.
    pub fn pixel_contribution(&self, value: f64) -> f64 {
        value / (self.dq * self.weight)
    }
}

/// Accumulated criteria for one habitat (recovery) or one habitat,
/// stressor and kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreRecord {
    /// Sum of fixed-rating contributions.
    pub numerator: f64,
    /// Sum of `1 / (dq * weight)` over every counted criterion.
    pub denominator: f64,
    /// Spatial criteria by unique key.
    pub spatial: IndexMap<String, SpatialCriterion>,
}

impl ScoreRecord {
    /// Fold one criterion in. `key` names it if its rating is spatial.
    /// Returns `false` if the criterion was skipped.
    pub fn add(&mut self, key: String, criterion: &Criterion) -> bool {
        let divisor = criterion.dq * criterion.weight;
        match &criterion.rating {
            Rating::Fixed(r) => match contribution(*r, criterion.dq, criterion.weight) {
                Some((num, denom)) => {
                    self.numerator += num;
                    self.denominator += denom;
                    true
                }
                None => false,
            },
            Rating::Spatial(raster) => {
                let mut unique = key.clone();
                let mut n = 1;
                while self.spatial.contains_key(&unique) {
                    n += 1;
                    unique = format!("{key}_{n}");
                }
                self.spatial.insert(
                    unique,
                    SpatialCriterion {
                        raster: raster.clone(),
                        dq: criterion.dq,
                        weight: criterion.weight,
                    },
                );
                self.denominator += 1.0 / divisor;
                true
            }
        }
    }
}

/// Exposure and consequence records of one habitat-stressor pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PairScores {
    /// Exposure criteria.
    pub exposure: ScoreRecord,
    /// Consequence criteria.
    pub consequence: ScoreRecord,
}

impl PairScores {
    /// The record for `kind`.
    pub fn get(&self, kind: CriteriaKind) -> &ScoreRecord {
        match kind {
            CriteriaKind::Exposure => &self.exposure,
            CriteriaKind::Consequence => &self.consequence,
        }
    }

    fn get_mut(&mut self, kind: CriteriaKind) -> &mut ScoreRecord {
        match kind {
            CriteriaKind::Exposure => &mut self.exposure,
            CriteriaKind::Consequence => &mut self.consequence,
        }
    }
}

/// Score records for a whole assessment. Built once, read-only after.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreTable {
    recovery: IndexMap<String, ScoreRecord>,
    pairs: IndexMap<(String, String), PairScores>,
}

impl ScoreTable {
    /// Fold every parsed criterion into records.
    ///
    /// Every habitat and every (habitat, stressor) pair gets a record,
    /// whether or not the table supplied criteria for it. After folding,
    /// all records with a zero denominator are reported in one
    /// `CriteriaError::DegenerateCriteria`.
    pub fn accumulate(parsed: &ParsedCriteria) -> Result<Self, CriteriaError> {
        let mut table = Self::default();
        for h in &parsed.habitats {
            table.recovery.insert(h.clone(), ScoreRecord::default());
            for s in &parsed.stressors {
                table
                    .pairs
                    .insert((h.clone(), s.clone()), PairScores::default());
            }
        }

        for c in &parsed.resilience {
            let Some(record) = table.recovery.get_mut(&c.habitat) else {
                continue;
            };
            if !record.add(format!("{}_{}", c.habitat, c.name), c) {
                warn!(
                    habitat = %c.habitat,
                    criterion = %c.name,
                    "rating below 1, criterion ignored"
                );
            }
        }
        for o in &parsed.overlap {
            let c = &o.criterion;
            let key = (c.habitat.clone(), o.stressor.clone());
            let Some(pair) = table.pairs.get_mut(&key) else {
                continue;
            };
            let spatial_key = format!("{}_{}_{}", c.habitat, o.stressor, c.name);
            if !pair.get_mut(o.kind).add(spatial_key, c) {
                warn!(
                    habitat = %c.habitat,
                    stressor = %o.stressor,
                    criterion = %c.name,
                    kind = %o.kind,
                    "rating below 1, criterion ignored"
                );
            }
        }

        table.check_denominators()?;
        Ok(table)
    }

    fn check_denominators(&self) -> Result<(), CriteriaError> {
        let recovery: Vec<String> = self
            .recovery
            .iter()
            .filter(|(_, r)| r.denominator <= 0.0)
            .map(|(h, _)| h.clone())
            .collect();
        let degenerate = |kind: CriteriaKind| -> Vec<(String, String)> {
            self.pairs
                .iter()
                .filter(|(_, p)| p.get(kind).denominator <= 0.0)
                .map(|(k, _)| k.clone())
                .collect()
        };
        let exposure = degenerate(CriteriaKind::Exposure);
        let consequence = degenerate(CriteriaKind::Consequence);
        if recovery.is_empty() && exposure.is_empty() && consequence.is_empty() {
            Ok(())
        } else {
            Err(CriteriaError::DegenerateCriteria {
                recovery,
                exposure,
                consequence,
            })
        }
    }

    /// Recovery record of a habitat.
    pub fn recovery(&self, habitat: &str) -> Option<&ScoreRecord> {
        self.recovery.get(habitat)
    }

    /// Exposure and consequence records of a pair.
    pub fn pair(&self, habitat: &str, stressor: &str) -> Option<&PairScores> {
        self.pairs.get(&(habitat.to_string(), stressor.to_string()))
    }

    /// Habitats in table order.
    pub fn habitats(&self) -> impl Iterator<Item = &str> {
        self.recovery.keys().map(String::as_str)
    }

    /// Every `(habitat, stressor)` pair in table order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, &PairScores)> {
        self.pairs
            .iter()
            .map(|((h, s), p)| (h.as_str(), s.as_str(), p))
    }

    /// Every raster referenced by a spatial criterion.
    pub fn spatial_rasters(&self) -> Vec<&RasterKey> {
        let mut out: Vec<&RasterKey> = Vec::new();
        let records = self.recovery.values().chain(
            self.pairs
                .values()
                .flat_map(|p| [&p.exposure, &p.consequence]),
        );
        for record in records {
            for s in record.spatial.values() {
                if !out.contains(&&s.raster) {
                    out.push(&s.raster);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::OverlapCriterion;
    use proptest::prelude::*;

    fn criterion(habitat: &str, name: &str, rating: Rating, dq: f64, weight: f64) -> Criterion {
        Criterion {
            name: name.into(),
            habitat: habitat.into(),
            rating,
            dq,
            weight,
        }
    }

    fn overlap(stressor: &str, kind: CriteriaKind, c: Criterion) -> OverlapCriterion {
        OverlapCriterion {
            stressor: stressor.into(),
            kind,
            criterion: c,
        }
    }

    fn parsed() -> ParsedCriteria {
        ParsedCriteria {
            habitats: vec!["H".into()],
            stressors: vec!["S".into()],
            resilience: vec![criterion("H", "recruitment", Rating::Fixed(2.0), 1.0, 2.0)],
            overlap: vec![
                overlap(
                    "S",
                    CriteriaKind::Exposure,
                    criterion("H", "frequency", Rating::Fixed(2.0), 1.0, 1.0),
                ),
                overlap(
                    "S",
                    CriteriaKind::Consequence,
                    criterion("H", "area", Rating::Fixed(3.0), 1.0, 1.0),
                ),
                overlap(
                    "S",
                    CriteriaKind::Consequence,
                    criterion("H", "depth", Rating::Spatial("depth.tif".into()), 2.0, 1.0),
                ),
            ],
            ..ParsedCriteria::default()
        }
    }

    #[test]
    fn repeated_spatial_keys_count_up_from_the_base() {
        let mut record = ScoreRecord::default();
        for source in ["a.tif", "b.tif", "c.tif"] {
            let c = criterion("H", "depth", Rating::Spatial(source.into()), 1.0, 1.0);
            assert!(record.add("depth".into(), &c));
        }
        let keys: Vec<&str> = record.spatial.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["depth", "depth_2", "depth_3"]);
        assert_eq!(record.spatial["depth_3"].raster, RasterKey::new("c.tif"));
    }

    #[test]
    fn folds_fixed_and_spatial() {
        let t = ScoreTable::accumulate(&parsed()).unwrap();
        let rec = t.recovery("H").unwrap();
        assert_eq!((rec.numerator, rec.denominator), (1.0, 0.5));

        let pair = t.pair("H", "S").unwrap();
        assert_eq!((pair.exposure.numerator, pair.exposure.denominator), (2.0, 1.0));
        assert_eq!(pair.consequence.numerator, 3.0);
        assert_eq!(pair.consequence.denominator, 1.5);
        let depth = &pair.consequence.spatial["H_S_depth"];
        assert_eq!(depth.raster, RasterKey::new("depth.tif"));
        assert_eq!(depth.pixel_contribution(3.0), 1.5);
        assert_eq!(t.spatial_rasters(), vec![&RasterKey::new("depth.tif")]);
    }

    #[test]
    fn rating_below_one_is_dropped() {
        let mut p = parsed();
        p.overlap.push(overlap(
            "S",
            CriteriaKind::Exposure,
            criterion("H", "ignored", Rating::Fixed(0.0), 1.0, 1.0),
        ));
        let t = ScoreTable::accumulate(&p).unwrap();
        let e = &t.pair("H", "S").unwrap().exposure;
        assert_eq!((e.numerator, e.denominator), (2.0, 1.0));
    }

    #[test]
    fn zero_denominators_are_all_reported() {
        let mut p = parsed();
        p.habitats.push("K".into());
        p.stressors.push("T".into());
        p.overlap.retain(|o| o.kind == CriteriaKind::Consequence);
        let err = ScoreTable::accumulate(&p).unwrap_err();
        assert_eq!(
            err,
            CriteriaError::DegenerateCriteria {
                recovery: vec!["K".into()],
                exposure: vec![
                    ("H".into(), "S".into()),
                    ("H".into(), "T".into()),
                    ("K".into(), "S".into()),
                    ("K".into(), "T".into()),
                ],
                consequence: vec![
                    ("H".into(), "T".into()),
                    ("K".into(), "S".into()),
                    ("K".into(), "T".into()),
                ],
            }
        );
    }

    #[test]
    fn duplicate_spatial_keys_are_kept_apart() {
        let mut record = ScoreRecord::default();
        let c = criterion("H", "depth", Rating::Spatial("a.tif".into()), 1.0, 1.0);
        assert!(record.add("H_depth".into(), &c));
        assert!(record.add("H_depth".into(), &c));
        assert_eq!(record.spatial.len(), 2);
        assert_eq!(record.denominator, 2.0);
    }

    proptest! {
        #[test]
        fn contribution_is_rating_over_divisor(
            r in 1.0f64..5.0,
            dq in 0.1f64..4.0,
            w in 0.1f64..4.0,
        ) {
            let (num, denom) = contribution(r, dq, w).unwrap();
            prop_assert_eq!(num, r / (dq * w));
            prop_assert_eq!(denom, 1.0 / (dq * w));
        }

        #[test]
        fn below_one_contributes_nothing(r in -5.0f64..0.999, dq in 0.1f64..4.0, w in 0.1f64..4.0) {
            prop_assert!(contribution(r, dq, w).is_none());
        }
    }
}
