//! Two-dimensional string tables as read from the tabular inputs.
//!
//! The byte format (CSV, spreadsheet) is the caller's concern; these
//! types start from rows of cells. The first cell of every row is its
//! label. Cells are trimmed and blank cells become `None`.

/// One table row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableRow {
    /// First cell, `None` if blank.
    pub label: Option<String>,
    /// Remaining cells, `None` where blank.
    pub cells: Vec<Option<String>>,
}

impl TableRow {
    /// Build a row from raw cell text.
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut iter = cells.into_iter().map(|c| normalize(c.as_ref()));
        let label = iter.next().flatten();
        Self {
            label,
            cells: iter.collect(),
        }
    }

    /// Cell `index` (0 is the first cell after the label), if non-blank.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }

    /// True if the label and every cell are blank.
    pub fn is_blank(&self) -> bool {
        self.label.is_none() && self.cells.iter().all(Option::is_none)
    }

    /// True if the label matches `anchor`, ignoring ASCII case.
    pub fn label_is(&self, anchor: &str) -> bool {
        self.label
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(anchor))
    }
}

fn normalize(raw: &str) -> Option<String> {
    let t = raw.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// An ordered list of [`TableRow`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<TableRow>,
}

impl Table {
    /// Build a table from rows of raw cell text.
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows.into_iter().map(TableRow::from_cells).collect(),
        }
    }

    /// The table's rows, in input order.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Index of the first row labelled `anchor` (ASCII case-insensitive).
    pub fn find(&self, anchor: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.label_is(anchor))
    }
}
