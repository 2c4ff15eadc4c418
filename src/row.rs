//! Passive row model produced by chunk reassembly.

use std::collections::BTreeMap;

use bytes::Bytes;

/// One timestamped value of a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    family: String,
    qualifier: Bytes,
    timestamp_micros: i64,
    value: Bytes,
    labels: Vec<String>,
}

impl Cell {
    pub fn new(
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        timestamp_micros: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros,
            value: value.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_labels(self, labels: Vec<String>) -> Self {
        Cell { labels, ..self }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn qualifier(&self) -> &Bytes {
        &self.qualifier
    }

    pub fn timestamp_micros(&self) -> i64 {
        self.timestamp_micros
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Cells of one family, grouped by qualifier. Each list is newest first.
pub type Family = BTreeMap<Bytes, Vec<Cell>>;

/// A complete row. Rows only exist once their commit marker was observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    key: Bytes,
    families: BTreeMap<String, Family>,
}

impl Row {
    /// Build a row from cells in any order.
    pub fn from_cells(key: impl Into<Bytes>, cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut row = Row::empty(key.into());
        for cell in cells {
            row.push_cell(cell);
        }
        row
    }

    pub(crate) fn empty(key: Bytes) -> Self {
        Self {
            key,
            families: BTreeMap::new(),
        }
    }

    /// Insert keeping each column's cells in descending timestamp order. Equal
    /// timestamps keep arrival order.
    pub(crate) fn push_cell(&mut self, cell: Cell) {
        let cells = self
            .families
            .entry(cell.family.clone())
            .or_default()
            .entry(cell.qualifier.clone())
            .or_default();
        let at = cells.partition_point(|c| c.timestamp_micros >= cell.timestamp_micros);
        cells.insert(at, cell);
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn families(&self) -> &BTreeMap<String, Family> {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&Family> {
        self.families.get(name)
    }

    /// Cells of one column, newest first. Empty when the column is absent.
    pub fn cells(&self, family: &str, qualifier: &[u8]) -> &[Cell] {
        self.families
            .get(family)
            .and_then(|columns| columns.get(qualifier))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every cell of the row, family by family, qualifier by qualifier.
    pub fn iter_cells(&self) -> impl Iterator<Item = &Cell> {
        self.families
            .values()
            .flat_map(|columns| columns.values())
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
