//! The layer inventory: every habitat and stressor, its data source and,
//! for stressors, the buffer distance.

use crate::error::CriteriaError;
use crate::table::{Table, TableRow};
use indexmap::IndexMap;

/// Name column header.
pub const NAME_COLUMN: &str = "NAME";
/// Data source column header.
pub const PATH_COLUMN: &str = "PATH";
/// Layer type column header.
pub const TYPE_COLUMN: &str = "TYPE";
/// Stressor buffer column header.
pub const BUFFER_COLUMN: &str = "STRESSOR BUFFER (METERS)";

/// A stressor's data source and buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct StressorEntry {
    /// Data source reference.
    pub source: String,
    /// Buffer distance in meters.
    pub buffer_m: f64,
}

/// Habitats and stressors taking part in an assessment, in table order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inventory {
    habitats: IndexMap<String, String>,
    stressors: IndexMap<String, StressorEntry>,
}

impl Inventory {
    /// An empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a habitat layer.
    pub fn with_habitat(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.habitats.insert(name.into(), source.into());
        self
    }

    /// Add a stressor layer with its buffer in meters.
    pub fn with_stressor(
        mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        buffer_m: f64,
    ) -> Self {
        self.stressors.insert(
            name.into(),
            StressorEntry {
                source: source.into(),
                buffer_m,
            },
        );
        self
    }

    /// Read an inventory table: a header row naming the columns, then one
    /// row per layer.
    ///
    /// Header matching ignores ASCII case and column order. All unknown
    /// layer types are reported together.
    pub fn from_table(table: &Table) -> Result<Self, CriteriaError> {
        let mut rows = table.rows().iter().filter(|r| !r.is_blank());
        let header = match rows.next() {
            Some(h) => columns(h),
            None => Vec::new(),
        };
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h.is_some_and(|h| h.eq_ignore_ascii_case(name)))
        };

        let wanted = [NAME_COLUMN, PATH_COLUMN, TYPE_COLUMN, BUFFER_COLUMN];
        let missing: Vec<String> = wanted
            .iter()
            .filter(|c| position(c).is_none())
            .map(|c| c.to_string())
            .collect();
        let (Some(name_col), Some(path_col), Some(type_col), Some(buffer_col)) = (
            position(NAME_COLUMN),
            position(PATH_COLUMN),
            position(TYPE_COLUMN),
            position(BUFFER_COLUMN),
        ) else {
            return Err(CriteriaError::MissingColumns { columns: missing });
        };

        let mut inventory = Self::new();
        let mut unknown = Vec::new();
        for row in rows {
            let cols = columns(row);
            let cell = |i: usize| cols.get(i).copied().flatten();
            let Some(name) = cell(name_col) else {
                continue;
            };
            let source = cell(path_col).unwrap_or_default();
            let kind = cell(type_col).unwrap_or_default();
            if inventory.contains(name) {
                return Err(CriteriaError::DuplicateName {
                    name: name.to_string(),
                });
            }
            if kind.eq_ignore_ascii_case("habitat") {
                inventory = inventory.with_habitat(name, source);
            } else if kind.eq_ignore_ascii_case("stressor") {
                let raw = cell(buffer_col).unwrap_or_default();
                let buffer_m = match raw.parse::<f64>() {
                    Ok(b) if b.is_finite() && b >= 0.0 => b,
                    _ => {
                        return Err(CriteriaError::InvalidBuffer {
                            name: name.to_string(),
                            value: raw.to_string(),
                        })
                    }
                };
                inventory = inventory.with_stressor(name, source, buffer_m);
            } else {
                unknown.push(format!("{name}: {kind}"));
            }
        }
        if !unknown.is_empty() {
            return Err(CriteriaError::UnknownLayerType { entries: unknown });
        }
        inventory.validate()?;
        Ok(inventory)
    }

    /// Check the inventory holds at least one habitat and one stressor.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.habitats.is_empty() {
            return Err(CriteriaError::NoLayers { kind: "habitat" });
        }
        if self.stressors.is_empty() {
            return Err(CriteriaError::NoLayers { kind: "stressor" });
        }
        Ok(())
    }

    /// True if a habitat or stressor is called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.habitats.contains_key(name) || self.stressors.contains_key(name)
    }

    /// Habitat names in table order.
    pub fn habitats(&self) -> impl Iterator<Item = &str> {
        self.habitats.keys().map(String::as_str)
    }

    /// Stressor names in table order.
    pub fn stressors(&self) -> impl Iterator<Item = &str> {
        self.stressors.keys().map(String::as_str)
    }

    /// True if `name` is a stressor.
    pub fn is_stressor(&self, name: &str) -> bool {
        self.stressors.contains_key(name)
    }

    /// True if `name` is a habitat.
    pub fn is_habitat(&self, name: &str) -> bool {
        self.habitats.contains_key(name)
    }

    /// Data source of a habitat.
    pub fn habitat_source(&self, name: &str) -> Option<&str> {
        self.habitats.get(name).map(String::as_str)
    }

    /// Source and buffer of a stressor.
    pub fn stressor(&self, name: &str) -> Option<&StressorEntry> {
        self.stressors.get(name)
    }

    /// Number of habitats.
    pub fn habitat_count(&self) -> usize {
        self.habitats.len()
    }

    /// Number of stressors.
    pub fn stressor_count(&self) -> usize {
        self.stressors.len()
    }
}

fn columns(row: &TableRow) -> Vec<Option<&str>> {
    std::iter::once(row.label.as_deref())
        .chain(row.cells.iter().map(|c| c.as_deref()))
        .collect()
}
