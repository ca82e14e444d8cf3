//! Helper functions for reading the portal's consumption pages.
//!
//! This module provides utility functions for:
//! - Building CSS selectors with typed errors
//! - Reading one page of the consumption table
//! - Detecting whether the paginator offers a further page
//! - Reading the echoed date range inputs

use crate::error::ParseError;
use crate::extract::TablePage;
use scraper::{ElementRef, Html, Selector};

pub const TABLE_SELECTOR: &str = "#consumptionsTable table";
pub const NEXT_PAGE_SELECTOR: &str = "#consumptionsTable_paginator_bottom a.ui-paginator-next";
pub const FROM_INPUT_SELECTOR: &str = "#calendarFromRegion";
pub const TO_INPUT_SELECTOR: &str = "#calendarToRegion";

const DISABLED_CLASS: &str = "ui-state-disabled";

/// Creates a CSS selector from a string.
///
/// # Examples
///
/// Valid selectors:
/// - `"#id"` - ID selector
/// - `"thead th"` - Descendant selector
pub fn html_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::invalid_selector(selector, e))
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Reads headers and row cell texts of the table matched by `selector`.
///
/// Returns `Ok(None)` when the page has no such table, which is how the portal
/// renders a day without published readings.
pub fn parse_table_page(document: &Html, selector: &str) -> Result<Option<TablePage>, ParseError> {
    let table_selector = html_selector(selector)?;
    let Some(table) = document.select(&table_selector).next() else {
        return Ok(None);
    };

    let header_selector = html_selector("thead th")?;
    let row_selector = html_selector("tbody tr")?;
    let cell_selector = html_selector("td")?;

    let headers: Vec<String> = table.select(&header_selector).map(element_text).collect();
    if headers.is_empty() {
        return Err(ParseError::UnexpectedStructure(format!(
            "table '{}' has no header cells",
            selector
        )));
    }

    let rows = table
        .select(&row_selector)
        .map(|tr| tr.select(&cell_selector).map(element_text).collect::<Vec<_>>())
        // PrimeFaces renders a single colspan cell for an empty table
        .filter(|cells| cells.len() > 1)
        .collect();

    Ok(Some(TablePage { headers, rows }))
}

/// Whether the paginator's next-page link exists and is enabled.
pub fn has_next_page(document: &Html) -> Result<bool, ParseError> {
    let selector = html_selector(NEXT_PAGE_SELECTOR)?;
    Ok(document
        .select(&selector)
        .next()
        .map(|link| !link.value().classes().any(|c| c == DISABLED_CLASS))
        .unwrap_or(false))
}

/// The `value` attribute of the first input matched by `selector`.
pub fn input_value(document: &Html, selector: &str) -> Result<Option<String>, ParseError> {
    let selector = html_selector(selector)?;
    Ok(document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(|value| value.trim().to_string()))
}
