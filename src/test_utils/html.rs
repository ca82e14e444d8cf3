//! HTML generation utilities for testing.
//!
//! Renders consumption pages shaped like the portal's PrimeFaces output: the
//! echoed date range inputs, the data table and the bottom paginator.

use chrono::{Duration, NaiveDate, NaiveTime};

const HEADERS: [&str; 3] = ["Datum", "Wert", "Ersatzwert"];

fn page(day: &str, table_body: &str, has_next: bool) -> String {
    let headers: String = HEADERS.iter().map(|h| format!("<th>{}</th>", h)).collect();
    let next_class = if has_next {
        "ui-paginator-next"
    } else {
        "ui-paginator-next ui-state-disabled"
    };
    format!(
        r##"<html><body>
            <form id="consumptionForm">
                <input id="calendarFromRegion" type="text" value="{day}"/>
                <input id="calendarToRegion" type="text" value="{day}"/>
            </form>
            <div id="consumptionsTable">
                <table>
                    <thead><tr>{headers}</tr></thead>
                    <tbody>{table_body}</tbody>
                </table>
            </div>
            <div id="consumptionsTable_paginator_bottom">
                <a class="{next_class}" href="#">Weiter</a>
            </div>
        </body></html>"##
    )
}

/// A consumption page for `day` (portal format) with `(timestamp, value,
/// substitute)` rows.
pub fn consumption_page(day: &str, rows: &[(&str, &str, &str)], has_next: bool) -> String {
    let body: String = rows
        .iter()
        .map(|(time, value, substitute)| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                time, value, substitute
            )
        })
        .collect();
    page(day, &body, has_next)
}

/// The page the portal renders for a day without readings.
pub fn empty_consumption_page(day: &str) -> String {
    page(
        day,
        r#"<tr class="ui-datatable-empty-message"><td colspan="3">Keine Daten vorhanden</td></tr>"#,
        false,
    )
}

/// The 96 quarter-hour rows of a full day, all carrying `value`.
pub fn quarter_hour_rows(date: NaiveDate, value: &str) -> Vec<(String, String, String)> {
    (0..96)
        .map(|slot| {
            let time = date.and_time(NaiveTime::MIN) + Duration::minutes(15 * slot);
            (
                time.format("%d.%m.%Y %H:%M").to_string(),
                value.to_string(),
                String::new(),
            )
        })
        .collect()
}

/// A single page holding a complete day.
pub fn full_day_page(date: NaiveDate, value: &str) -> String {
    let rows = quarter_hour_rows(date, value);
    let refs: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|(t, v, s)| (t.as_str(), v.as_str(), s.as_str()))
        .collect();
    consumption_page(&date.format("%d.%m.%Y").to_string(), &refs, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_hour_rows_cover_the_day() {
        let rows = quarter_hour_rows(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "1");
        assert_eq!(rows.len(), 96);
        assert_eq!(rows[0].0, "01.03.2024 00:00");
        assert_eq!(rows[95].0, "01.03.2024 23:45");
    }

    #[test]
    fn test_consumption_page_marks_last_page() {
        let last = consumption_page("01.03.2024", &[], false);
        assert!(last.contains("ui-state-disabled"));
        let more = consumption_page("01.03.2024", &[], true);
        assert!(!more.contains("ui-state-disabled"));
    }
}
