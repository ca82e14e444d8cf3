//! Turns raw portal tables into typed rows and meter points.
//!
//! Everything in here is pure: the portal client hands over header and cell
//! text, one page at a time, and receives typed rows and points back.

pub mod coerce;
pub mod points;

pub use coerce::{coerce_cell, CellValue};
pub use points::rows_to_points;

use chrono_tz::Tz;
use futures::{Stream, StreamExt};

/// One page of a paginated table as delivered by the portal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePage {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Rows of all pages of one table, headers taken from the first page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn push_page(&mut self, page: TablePage) {
        if self.headers.is_empty() {
            self.headers = page.headers;
        }
        self.rows.extend(page.rows);
    }

    pub fn to_rows(&self, tz: Tz) -> Vec<TableRow> {
        self.rows
            .iter()
            .map(|cells| TableRow::from_cells(&self.headers, cells, tz))
            .collect()
    }
}

/// Drains a page stream into a single table.
///
/// The first failing page aborts collection; a partially read table is never
/// returned.
pub async fn collect_pages<S, E>(pages: S) -> Result<RawTable, E>
where
    S: Stream<Item = Result<TablePage, E>>,
{
    let mut table = RawTable::default();
    futures::pin_mut!(pages);
    while let Some(page) = pages.next().await {
        table.push_page(page?);
    }
    Ok(table)
}

/// A coerced table row, columns in header order.
///
/// A header seen twice keeps its first position but the value of its last
/// occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    columns: Vec<(String, CellValue)>,
}

impl TableRow {
    pub fn from_cells(headers: &[String], cells: &[String], tz: Tz) -> Self {
        let mut row = Self::default();
        for (index, header) in headers.iter().enumerate() {
            let value = cells
                .get(index)
                .map(|cell| coerce_cell(cell, tz))
                .unwrap_or(CellValue::Null);
            row.insert(header.clone(), value);
        }
        row
    }

    pub fn insert(&mut self, header: String, value: CellValue) {
        match self.columns.iter_mut().find(|(h, _)| *h == header) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((header, value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
    }

    /// Value of the n-th distinct column.
    pub fn column(&self, index: usize) -> Option<&CellValue> {
        self.columns.get(index).map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
