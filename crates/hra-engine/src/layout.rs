//! Naming of every intermediate and output layer of a run.
//!
//! All keys carry the run's output suffix, so two runs with different
//! suffixes can share one store.

use hra_core::RasterKey;
use hra_criteria::CriteriaKind;

/// Key builder for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyLayout {
    suffix: String,
}

impl KeyLayout {
    /// Layout with an optional suffix. A non-empty suffix is joined with
    /// `_` unless it already starts with one.
    pub fn new(suffix: Option<&str>) -> Self {
        let suffix = match suffix {
            None | Some("") => String::new(),
            Some(s) if s.starts_with('_') => s.to_string(),
            Some(s) => format!("_{s}"),
        };
        Self { suffix }
    }

    /// The normalised suffix, empty or starting with `_`.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn key(&self, base: String) -> RasterKey {
        RasterKey::new(format!("{base}{}", self.suffix))
    }

    /// A vector source burned into a raster.
    pub fn rasterized(&self, source: &str) -> RasterKey {
        self.key(format!("rasterized_{source}"))
    }

    /// A source resampled onto the shared grid.
    pub fn aligned(&self, source: &str) -> RasterKey {
        self.key(format!("aligned_{source}"))
    }

    /// Distance to a stressor.
    pub fn distance(&self, stressor: &str) -> RasterKey {
        self.key(format!("dist_{stressor}"))
    }

    /// Decayed numerator of one pair score.
    pub fn numerator(&self, kind: CriteriaKind, habitat: &str, stressor: &str) -> RasterKey {
        self.key(format!("{kind}_num_{habitat}_{stressor}"))
    }

    /// Exposure or consequence score of one pair.
    pub fn score(&self, kind: CriteriaKind, habitat: &str, stressor: &str) -> RasterKey {
        self.key(format!("{kind}_{habitat}_{stressor}"))
    }

    /// Risk of one pair.
    pub fn pair_risk(&self, habitat: &str, stressor: &str) -> RasterKey {
        self.key(format!("R_{habitat}_{stressor}"))
    }

    /// Resilience numerator of a habitat.
    pub fn recovery_numerator(&self, habitat: &str) -> RasterKey {
        self.key(format!("RECOV_num_{habitat}"))
    }

    /// Recovery class of a habitat.
    pub fn recovery(&self, habitat: &str) -> RasterKey {
        self.key(format!("recovery_{habitat}"))
    }

    /// Total exposure of a habitat.
    pub fn total_exposure(&self, habitat: &str) -> RasterKey {
        self.key(format!("TOT_E_{habitat}"))
    }

    /// Total consequence of a habitat.
    pub fn total_consequence(&self, habitat: &str) -> RasterKey {
        self.key(format!("TOT_C_{habitat}"))
    }

    /// Total risk of a habitat.
    pub fn total_risk(&self, habitat: &str) -> RasterKey {
        self.key(format!("TOT_R_{habitat}"))
    }

    /// Reclassified risk of a habitat.
    pub fn habitat_risk(&self, habitat: &str) -> RasterKey {
        self.key(format!("risk_{habitat}"))
    }

    /// Habitat count per pixel.
    pub fn ecosystem_count(&self) -> RasterKey {
        self.key("ecosystem_count".to_string())
    }

    /// Stressor count per ecosystem pixel.
    pub fn stressor_overlap(&self) -> RasterKey {
        self.key("stressor_overlap".to_string())
    }

    /// Scalar layer holding the maximum risk score.
    pub fn max_risk_score(&self) -> RasterKey {
        self.key("max_risk_score".to_string())
    }

    /// Reclassified ecosystem risk.
    pub fn ecosystem_risk(&self) -> RasterKey {
        self.key("ecosystem_risk".to_string())
    }

    /// Per-zone means of one pair score.
    pub fn zonal_stats(&self, kind: CriteriaKind, habitat: &str, stressor: &str) -> RasterKey {
        self.key(format!("stats_{kind}_{habitat}_{stressor}"))
    }
}
