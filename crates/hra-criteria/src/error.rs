//! Errors raised while reading the inventory and criteria tables.
//!
//! Every variant is fatal and is detected from the tables alone, before
//! any raster is touched.

use std::fmt;
use thiserror::Error;

/// Where in the criteria table a value came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriterionSite {
    /// Habitat column.
    pub habitat: String,
    /// Stressor block, `None` for resilience criteria.
    pub stressor: Option<String>,
    /// Criterion row label.
    pub criterion: String,
}

impl fmt::Display for CriterionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stressor {
            Some(s) => write!(
                f,
                "habitat '{}', stressor '{s}', criterion '{}'",
                self.habitat, self.criterion
            ),
            None => write!(f, "habitat '{}', criterion '{}'", self.habitat, self.criterion),
        }
    }
}

fn list(items: &[String]) -> String {
    items.join(", ")
}

fn pairs(items: &[(String, String)]) -> String {
    items
        .iter()
        .map(|(h, s)| format!("({h}, {s})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the inventory table, the criteria table grammar, and the
/// score accumulator.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CriteriaError {
    // ── Inventory ───────────────────────────────────────────────
    /// Required inventory columns are absent.
    #[error("inventory table is missing columns: {}", list(.columns))]
    MissingColumns {
        /// Every missing column header.
        columns: Vec<String>,
    },
    /// `TYPE` values other than habitat or stressor.
    #[error("inventory has layers of unknown type (expected habitat or stressor): {}", list(.entries))]
    UnknownLayerType {
        /// `"name: type"` for each offending row.
        entries: Vec<String>,
    },
    /// A stressor's buffer is missing, non-numeric or negative.
    #[error("stressor '{name}' has invalid buffer distance '{value}'")]
    InvalidBuffer {
        /// Stressor name.
        name: String,
        /// The rejected cell text.
        value: String,
    },
    /// The same layer name appears twice.
    #[error("layer name '{name}' appears more than once")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
    /// The inventory lists no layers of a required type.
    #[error("inventory contains no {kind} layers")]
    NoLayers {
        /// `"habitat"` or `"stressor"`.
        kind: &'static str,
    },

    // ── Criteria table grammar ──────────────────────────────────
    /// Required anchor rows are absent.
    #[error("criteria table is missing required rows: {}", list(.labels))]
    MissingRows {
        /// Every missing anchor label.
        labels: Vec<String>,
    },
    /// An anchor row appears where the grammar does not allow it.
    #[error("row {row}: '{label}' is out of order")]
    AnchorOutOfOrder {
        /// Row label.
        label: String,
        /// Zero-based row index.
        row: usize,
    },
    /// The habitat row has no criteria-type marker column.
    #[error("habitat name row has no CRITERIA TYPE column")]
    MissingCriteriaTypeColumn,
    /// A habitat column appears twice in the habitat row.
    #[error("habitat '{name}' appears in more than one column")]
    DuplicateHabitatColumn {
        /// The repeated habitat.
        name: String,
    },
    /// Habitat or stressor names that do not match between the inventory
    /// and the criteria table.
    #[error(
        "names do not match between inventory and criteria table; \
         missing from criteria table: [{}]; missing from inventory: [{}]",
        list(.missing_from_table),
        list(.missing_from_inventory)
    )]
    MissingNames {
        /// Inventory names absent from the table.
        missing_from_table: Vec<String>,
        /// Table names absent from the inventory.
        missing_from_inventory: Vec<String>,
    },
    /// A criterion row appears between the habitat row and the
    /// resilience block.
    #[error("row {row}: criterion '{criterion}' appears before the resilience block")]
    CriterionBeforeResilienceBlock {
        /// Criterion label.
        criterion: String,
        /// Zero-based row index.
        row: usize,
    },
    /// An overlap criterion appears before any stressor row.
    #[error("row {row}: criterion '{criterion}' does not belong to any stressor")]
    CriterionWithoutStressor {
        /// Criterion label.
        criterion: String,
        /// Zero-based row index.
        row: usize,
    },
    /// Criteria type other than E or C.
    #[error("criteria type '{value}' for {site} must be E or C")]
    InvalidCriteriaType {
        /// Where the value was read.
        site: CriterionSite,
        /// The rejected cell text.
        value: String,
    },

    // ── Ranges ──────────────────────────────────────────────────
    /// A DQ or weight cell is not a positive number.
    #[error("{column} '{value}' for {site} must be a positive number")]
    InvalidDqWeight {
        /// `"DQ"` or `"Weight"`.
        column: &'static str,
        /// Where the value was read.
        site: CriterionSite,
        /// The rejected cell text.
        value: String,
    },
    /// A rating cell is empty.
    #[error("rating is missing for {site}")]
    MissingRating {
        /// Where the value was expected.
        site: CriterionSite,
    },
    /// A numeric rating exceeds the run's maximum.
    #[error("rating {rating} for {site} exceeds the maximum rating {max_rating}")]
    RatingAboveMax {
        /// Where the value was read.
        site: CriterionSite,
        /// The rejected rating.
        rating: f64,
        /// The run's maximum rating.
        max_rating: f64,
    },

    // ── Degenerate configuration ────────────────────────────────
    /// Habitats or pairs whose criteria have a zero denominator.
    #[error(
        "no usable criteria; recovery: [{}]; exposure: [{}]; consequence: [{}]",
        list(.recovery),
        pairs(.exposure),
        pairs(.consequence)
    )]
    DegenerateCriteria {
        /// Habitats with no usable resilience criteria.
        recovery: Vec<String>,
        /// `(habitat, stressor)` pairs with no usable exposure criteria.
        exposure: Vec<(String, String)>,
        /// `(habitat, stressor)` pairs with no usable consequence criteria.
        consequence: Vec<(String, String)>,
    },
}
