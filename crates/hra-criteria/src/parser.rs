//! The criteria table grammar.
//!
//! The table is read top to bottom by a four-state machine:
//!
//! ```text
//! SeekHabitatRow ──HABITAT NAME──▶ InResilienceBlock
//! InResilienceBlock ──HABITAT STRESSOR OVERLAP PROPERTIES──▶ SeekStressor
//! SeekStressor ──stressor row──▶ InOverlapBlock
//! InOverlapBlock ──stressor row──▶ InOverlapBlock (switch stressor)
//! ```
//!
//! The habitat row fixes the column layout: each habitat names a group of
//! three columns (rating, DQ, weight) and one column carries the criteria
//! type (E or C). Inside the resilience block the `HABITAT RESILIENCE
//! ATTRIBUTES` row must precede the first attribute.
//!
//! A stressor row is one whose label is an inventory stressor, or a
//! sub-header row whose first rating cell reads `Rating`. Sub-header rows
//! naming stressors the inventory does not know are reported with the
//! other mismatched names.

use crate::error::{CriteriaError, CriterionSite};
use crate::inventory::Inventory;
use crate::table::{Table, TableRow};
use hra_core::RasterKey;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::str::FromStr;

/// Label of the habitat-name row.
pub const HABITAT_NAME_ROW: &str = "HABITAT NAME";
/// Label of the row opening the resilience block.
pub const RESILIENCE_ROW: &str = "HABITAT RESILIENCE ATTRIBUTES";
/// Label of the row opening the overlap block.
pub const OVERLAP_ROW: &str = "HABITAT STRESSOR OVERLAP PROPERTIES";
/// Header of the criteria-type column in the habitat row.
pub const CRITERIA_TYPE_COLUMN: &str = "CRITERIA TYPE";

const RATING_HEADER: &str = "RATING";

/// A criterion's rating: a number, or a raster giving a rating per pixel.
#[derive(Clone, Debug, PartialEq)]
pub enum Rating {
    /// One rating for the whole habitat.
    Fixed(f64),
    /// A spatially explicit rating read from a raster.
    Spatial(RasterKey),
}

/// Whether an overlap criterion scores exposure or consequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CriteriaKind {
    /// `E`.
    Exposure,
    /// `C`.
    Consequence,
}

impl FromStr for CriteriaKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "E" | "e" => Ok(Self::Exposure),
            "C" | "c" => Ok(Self::Consequence),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CriteriaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exposure => f.write_str("E"),
            Self::Consequence => f.write_str("C"),
        }
    }
}

/// One (rating, DQ, weight) triple for one habitat.
#[derive(Clone, Debug, PartialEq)]
pub struct Criterion {
    /// Criterion row label.
    pub name: String,
    /// Habitat column.
    pub habitat: String,
    /// The rating.
    pub rating: Rating,
    /// Data quality divisor, positive.
    pub dq: f64,
    /// Importance divisor, positive.
    pub weight: f64,
}

/// A criterion from the overlap block.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlapCriterion {
    /// Stressor block the row belongs to.
    pub stressor: String,
    /// Exposure or consequence.
    pub kind: CriteriaKind,
    /// The triple.
    pub criterion: Criterion,
}

/// Everything the grammar extracts from a criteria table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedCriteria {
    /// Habitats in column order.
    pub habitats: Vec<String>,
    /// Stressors in block order.
    pub stressors: Vec<String>,
    /// Resilience attribute labels in row order.
    pub resilience_attributes: Vec<String>,
    /// Overlap criterion labels per stressor.
    pub stressor_attributes: IndexMap<String, Vec<String>>,
    /// One record per (resilience attribute, habitat).
    pub resilience: Vec<Criterion>,
    /// One record per (overlap criterion, habitat).
    pub overlap: Vec<OverlapCriterion>,
}

/// Parser states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserState {
    /// Before the habitat-name row.
    SeekHabitatRow,
    /// Between the habitat-name row and the overlap marker.
    InResilienceBlock,
    /// After the overlap marker, before the first stressor row.
    SeekStressor,
    /// Inside a stressor's block.
    InOverlapBlock,
}

/// Column positions fixed by the habitat-name row. Indices are into
/// [`TableRow::cells`].
#[derive(Clone, Debug, PartialEq)]
struct ColumnLayout {
    habitats: IndexMap<String, usize>,
    criteria_type: usize,
}

impl ColumnLayout {
    fn from_header(row: &TableRow) -> Result<Self, CriteriaError> {
        let mut habitats = IndexMap::new();
        let mut criteria_type = None;
        for (i, cell) in row.cells.iter().enumerate() {
            let Some(text) = cell.as_deref() else {
                continue;
            };
            if text.eq_ignore_ascii_case(CRITERIA_TYPE_COLUMN) {
                criteria_type = Some(i);
            } else if habitats.insert(text.to_string(), i).is_some() {
                return Err(CriteriaError::DuplicateHabitatColumn {
                    name: text.to_string(),
                });
            }
        }
        let criteria_type = criteria_type.ok_or(CriteriaError::MissingCriteriaTypeColumn)?;
        Ok(Self {
            habitats,
            criteria_type,
        })
    }

    fn first_rating_column(&self) -> Option<usize> {
        self.habitats.values().copied().next()
    }
}

/// Streaming parser over the rows of one criteria table.
#[derive(Debug)]
pub struct CriteriaParser<'a> {
    inventory: &'a Inventory,
    max_rating: f64,
    state: ParserState,
    layout: Option<ColumnLayout>,
    resilience_opened: bool,
    stressor: Option<String>,
    unknown_stressors: IndexSet<String>,
    out: ParsedCriteria,
}

impl<'a> CriteriaParser<'a> {
    /// A parser checking names against `inventory` and numeric ratings
    /// against `max_rating`.
    pub fn new(inventory: &'a Inventory, max_rating: f64) -> Self {
        Self {
            inventory,
            max_rating,
            state: ParserState::SeekHabitatRow,
            layout: None,
            resilience_opened: false,
            stressor: None,
            unknown_stressors: IndexSet::new(),
            out: ParsedCriteria::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Parse a whole table.
    ///
    /// Missing anchor rows are reported together before any row is
    /// interpreted. Habitat names are cross-checked as soon as the habitat
    /// row is read; stressor names once the table ends.
    pub fn parse(mut self, table: &Table) -> Result<ParsedCriteria, CriteriaError> {
        let missing: Vec<String> = [HABITAT_NAME_ROW, RESILIENCE_ROW, OVERLAP_ROW]
            .iter()
            .filter(|a| table.find(a).is_none())
            .map(|a| a.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CriteriaError::MissingRows { labels: missing });
        }
        for (i, row) in table.rows().iter().enumerate() {
            self.feed(i, row)?;
        }
        self.finish()
    }

    /// Advance the state machine by one row.
    pub fn feed(&mut self, index: usize, row: &TableRow) -> Result<(), CriteriaError> {
        let out_of_order = |label: &str| CriteriaError::AnchorOutOfOrder {
            label: label.to_string(),
            row: index,
        };
        match self.state {
            ParserState::SeekHabitatRow => {
                if row.label_is(HABITAT_NAME_ROW) {
                    let layout = ColumnLayout::from_header(row)?;
                    self.check_habitats(&layout)?;
                    self.out.habitats = layout.habitats.keys().cloned().collect();
                    self.layout = Some(layout);
                    self.state = ParserState::InResilienceBlock;
                } else if row.label_is(RESILIENCE_ROW) {
                    return Err(out_of_order(RESILIENCE_ROW));
                } else if row.label_is(OVERLAP_ROW) {
                    return Err(out_of_order(OVERLAP_ROW));
                }
            }
            ParserState::InResilienceBlock => {
                let Some(label) = row.label.as_deref() else {
                    return Ok(());
                };
                if row.label_is(RESILIENCE_ROW) && !self.resilience_opened {
                    self.resilience_opened = true;
                } else if row.label_is(OVERLAP_ROW) {
                    if !self.resilience_opened {
                        return Err(out_of_order(OVERLAP_ROW));
                    }
                    self.state = ParserState::SeekStressor;
                } else if is_anchor(row) {
                    return Err(out_of_order(label));
                } else if !self.resilience_opened {
                    return Err(CriteriaError::CriterionBeforeResilienceBlock {
                        criterion: label.to_string(),
                        row: index,
                    });
                } else {
                    self.resilience_row(label, row)?;
                }
            }
            ParserState::SeekStressor | ParserState::InOverlapBlock => {
                let Some(label) = row.label.as_deref() else {
                    return Ok(());
                };
                if is_anchor(row) {
                    return Err(out_of_order(label));
                }
                if self.is_stressor_row(label, row) {
                    self.open_stressor(label);
                    self.state = ParserState::InOverlapBlock;
                } else if self.state == ParserState::SeekStressor {
                    return Err(CriteriaError::CriterionWithoutStressor {
                        criterion: label.to_string(),
                        row: index,
                    });
                } else {
                    self.overlap_row(label, row)?;
                }
            }
        }
        Ok(())
    }

    /// Finish parsing and cross-check stressor names.
    pub fn finish(mut self) -> Result<ParsedCriteria, CriteriaError> {
        let missing_from_table: Vec<String> = self
            .inventory
            .stressors()
            .filter(|s| !self.out.stressor_attributes.contains_key(*s))
            .map(str::to_string)
            .collect();
        let missing_from_inventory: Vec<String> = self.unknown_stressors.drain(..).collect();
        if !missing_from_table.is_empty() || !missing_from_inventory.is_empty() {
            return Err(CriteriaError::MissingNames {
                missing_from_table,
                missing_from_inventory,
            });
        }
        Ok(self.out)
    }

    fn check_habitats(&self, layout: &ColumnLayout) -> Result<(), CriteriaError> {
        let missing_from_table: Vec<String> = self
            .inventory
            .habitats()
            .filter(|h| !layout.habitats.contains_key(*h))
            .map(str::to_string)
            .collect();
        let missing_from_inventory: Vec<String> = layout
            .habitats
            .keys()
            .filter(|h| !self.inventory.is_habitat(h))
            .cloned()
            .collect();
        if missing_from_table.is_empty() && missing_from_inventory.is_empty() {
            Ok(())
        } else {
            Err(CriteriaError::MissingNames {
                missing_from_table,
                missing_from_inventory,
            })
        }
    }

    fn is_stressor_row(&self, label: &str, row: &TableRow) -> bool {
        if self.inventory.is_stressor(label) {
            return true;
        }
        self.layout
            .as_ref()
            .and_then(ColumnLayout::first_rating_column)
            .and_then(|c| row.cell(c))
            .is_some_and(|c| c.eq_ignore_ascii_case(RATING_HEADER))
    }

    fn open_stressor(&mut self, label: &str) {
        if !self.inventory.is_stressor(label) {
            self.unknown_stressors.insert(label.to_string());
        }
        if !self.out.stressor_attributes.contains_key(label) {
            self.out.stressors.push(label.to_string());
            self.out
                .stressor_attributes
                .insert(label.to_string(), Vec::new());
        }
        self.stressor = Some(label.to_string());
    }

    fn resilience_row(&mut self, label: &str, row: &TableRow) -> Result<(), CriteriaError> {
        let Some(layout) = self.layout.as_ref() else {
            return Ok(());
        };
        let mut records = Vec::with_capacity(layout.habitats.len());
        for (habitat, &col) in &layout.habitats {
            let site = CriterionSite {
                habitat: habitat.clone(),
                stressor: None,
                criterion: label.to_string(),
            };
            records.push(read_triple(row, col, site, self.max_rating)?);
        }
        self.out.resilience_attributes.push(label.to_string());
        self.out.resilience.extend(records);
        Ok(())
    }

    fn overlap_row(&mut self, label: &str, row: &TableRow) -> Result<(), CriteriaError> {
        let (Some(layout), Some(stressor)) = (self.layout.as_ref(), self.stressor.clone()) else {
            return Ok(());
        };
        let mut records = Vec::with_capacity(layout.habitats.len());
        for (habitat, &col) in &layout.habitats {
            let site = CriterionSite {
                habitat: habitat.clone(),
                stressor: Some(stressor.clone()),
                criterion: label.to_string(),
            };
            let raw_kind = row.cell(layout.criteria_type).unwrap_or_default();
            let kind = raw_kind
                .parse::<CriteriaKind>()
                .map_err(|()| CriteriaError::InvalidCriteriaType {
                    site: site.clone(),
                    value: raw_kind.to_string(),
                })?;
            let criterion = read_triple(row, col, site, self.max_rating)?;
            records.push(OverlapCriterion {
                stressor: stressor.clone(),
                kind,
                criterion,
            });
        }
        if let Some(names) = self.out.stressor_attributes.get_mut(&stressor) {
            names.push(label.to_string());
        }
        self.out.overlap.extend(records);
        Ok(())
    }
}

fn is_anchor(row: &TableRow) -> bool {
    row.label_is(HABITAT_NAME_ROW) || row.label_is(RESILIENCE_ROW) || row.label_is(OVERLAP_ROW)
}

fn read_triple(
    row: &TableRow,
    col: usize,
    site: CriterionSite,
    max_rating: f64,
) -> Result<Criterion, CriteriaError> {
    let rating = match row.cell(col) {
        None => return Err(CriteriaError::MissingRating { site }),
        Some(text) => match text.parse::<f64>() {
            Ok(r) if r.is_finite() => {
                if r > max_rating {
                    return Err(CriteriaError::RatingAboveMax {
                        site,
                        rating: r,
                        max_rating,
                    });
                }
                Rating::Fixed(r)
            }
            _ => Rating::Spatial(RasterKey::new(text)),
        },
    };
    let dq = positive(row.cell(col + 1), "DQ", &site)?;
    let weight = positive(row.cell(col + 2), "Weight", &site)?;
    Ok(Criterion {
        name: site.criterion,
        habitat: site.habitat,
        rating,
        dq,
        weight,
    })
}

fn positive(
    cell: Option<&str>,
    column: &'static str,
    site: &CriterionSite,
) -> Result<f64, CriteriaError> {
    match cell.map(str::parse::<f64>) {
        Some(Ok(v)) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(CriteriaError::InvalidDqWeight {
            column,
            site: site.clone(),
            value: cell.unwrap_or("<empty>").to_string(),
        }),
    }
}

/// Parse `table` against `inventory` with a parser rejecting numeric
/// ratings above `max_rating`.
pub fn parse_criteria(
    table: &Table,
    inventory: &Inventory,
    max_rating: f64,
) -> Result<ParsedCriteria, CriteriaError> {
    CriteriaParser::new(inventory, max_rating).parse(table)
}
