//! Run configuration, validation, and error types.
//!
//! [`RunConfig`] holds every run-wide parameter of an assessment. It
//! deserializes from TOML with every field optional;
//! [`validate()`](RunConfig::validate) checks the numeric ranges before
//! any table or raster work starts.

use hra_core::{DecayEquation, RiskEquation};
use serde::Deserialize;
use thiserror::Error;

/// Upper bound on worker threads.
pub const MAX_WORKERS: usize = 64;

// ── WorkerConfig ───────────────────────────────────────────────────

/// Worker pool sizing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Number of worker threads. `None` or `Some(0)` runs every task
    /// inline in the calling thread.
    pub n_workers: Option<usize>,
}

impl WorkerConfig {
    /// Resolve the actual worker count.
    ///
    /// Explicit values are clamped to `[0, 64]`; `None` means inline.
    pub fn resolved_worker_count(&self) -> usize {
        self.n_workers.map_or(0, |n| n.min(MAX_WORKERS))
    }
}

// ── SchedulePolicy ─────────────────────────────────────────────────

/// How the orchestrator sequences aggregation steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Exact N:1 dependency edges; aggregation starts as soon as its own
    /// inputs are ready.
    #[default]
    FanIn,
    /// Dependency edges plus a full join after each preprocessing phase,
    /// after each habitat's pair tasks and before ecosystem aggregation.
    JoinBarriers,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`RunConfig::validate()`] or while parsing TOML.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `max_rating` must be finite and greater than 1.
    #[error("max_rating must be finite and greater than 1, got {value}")]
    InvalidMaxRating {
        /// The rejected value.
        value: f64,
    },
    /// `resolution` must be finite and positive.
    #[error("resolution must be finite and positive, got {value}")]
    InvalidResolution {
        /// The rejected value.
        value: f64,
    },
    /// `linear_unit` must be finite and positive.
    #[error("linear_unit must be finite and positive, got {value}")]
    InvalidLinearUnit {
        /// The rejected value.
        value: f64,
    },
    /// The output suffix may only hold ASCII letters, digits, `-` and `_`.
    #[error("output suffix '{suffix}' may only contain ASCII letters, digits, '-' and '_'")]
    InvalidSuffix {
        /// The rejected suffix.
        suffix: String,
    },
    /// The TOML text could not be read.
    #[error("invalid configuration: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
}

// ── RunConfig ──────────────────────────────────────────────────────

/// Complete configuration for one assessment run.
///
/// Distances in the inventory (stressor buffers) are in meters; raster
/// geometry is in projection units. `linear_unit` is the number of meters
/// per projection unit.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Largest allowed criterion rating. Default: 3.
    pub max_rating: f64,
    /// Pairwise risk equation. Default: Euclidean.
    pub risk_equation: RiskEquation,
    /// Decay of stressor influence inside the buffer. Default: None.
    pub decay_equation: DecayEquation,
    /// Output pixel size in meters. Default: 1.
    pub resolution: f64,
    /// Meters per projection unit. Default: 1.
    pub linear_unit: f64,
    /// Suffix appended to every intermediate and output key.
    pub output_suffix: Option<String>,
    /// Worker pool sizing.
    pub workers: WorkerConfig,
    /// Scheduling policy.
    pub schedule: SchedulePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_rating: 3.0,
            risk_equation: RiskEquation::default(),
            decay_equation: DecayEquation::default(),
            resolution: 1.0,
            linear_unit: 1.0,
            output_suffix: None,
            workers: WorkerConfig::default(),
            schedule: SchedulePolicy::default(),
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all numeric ranges and the suffix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_rating.is_finite() || self.max_rating <= 1.0 {
            return Err(ConfigError::InvalidMaxRating {
                value: self.max_rating,
            });
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ConfigError::InvalidResolution {
                value: self.resolution,
            });
        }
        if !self.linear_unit.is_finite() || self.linear_unit <= 0.0 {
            return Err(ConfigError::InvalidLinearUnit {
                value: self.linear_unit,
            });
        }
        if let Some(suffix) = &self.output_suffix {
            let ok = suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !ok {
                return Err(ConfigError::InvalidSuffix {
                    suffix: suffix.clone(),
                });
            }
        }
        Ok(())
    }

    /// Output pixel size in projection units.
    pub fn pixel_size(&self) -> f64 {
        self.resolution / self.linear_unit
    }

    /// A buffer in meters, converted to projection units.
    pub fn buffer_in_projection_units(&self, buffer_m: f64) -> f64 {
        buffer_m / self.linear_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = RunConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.workers.resolved_worker_count(), 0);
        assert_eq!(c.schedule, SchedulePolicy::FanIn);
    }

    #[test]
    fn parses_full_toml() {
        let c = RunConfig::from_toml_str(
            r#"
            max_rating = 5.0
            risk_equation = "multiplicative"
            decay_equation = "Linear"
            resolution = 250.0
            linear_unit = 0.5
            output_suffix = "run1"
            schedule = "join_barriers"

            [workers]
            n_workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(c.max_rating, 5.0);
        assert_eq!(c.risk_equation, RiskEquation::Multiplicative);
        assert_eq!(c.decay_equation, DecayEquation::Linear);
        assert_eq!(c.pixel_size(), 500.0);
        assert_eq!(c.buffer_in_projection_units(10.0), 20.0);
        assert_eq!(c.schedule, SchedulePolicy::JoinBarriers);
        assert_eq!(c.workers.resolved_worker_count(), 4);
    }

    #[test]
    fn unknown_equation_is_a_parse_error() {
        let err = RunConfig::from_toml_str(r#"risk_equation = "additive""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(RunConfig::from_toml_str("max_ratings = 3").is_err());
    }

    #[test]
    fn invalid_ranges() {
        let mut c = RunConfig {
            max_rating: 1.0,
            ..RunConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidMaxRating { value: 1.0 }));
        c.max_rating = 3.0;
        c.resolution = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidResolution { .. })));
        c.resolution = 1.0;
        c.linear_unit = f64::NAN;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidLinearUnit { .. })));
        c.linear_unit = 1.0;
        c.output_suffix = Some("a/b".into());
        assert!(matches!(c.validate(), Err(ConfigError::InvalidSuffix { .. })));
    }

    #[test]
    fn worker_count_is_clamped() {
        let w = WorkerConfig {
            n_workers: Some(1000),
        };
        assert_eq!(w.resolved_worker_count(), MAX_WORKERS);
    }
}
