//! Lazy pagination over the portal's consumption table.
//!
//! The portal renders the quarter-hour table in pages. Pages are exposed as a
//! finite stream that requests the next page only when polled, stops after the
//! last page (or after `max_pages`), and cannot be rewound.

use crate::error::PortalError;
use crate::extract::TablePage;
use crate::model::{Day, Measurement};
use futures::Stream;
use scraper::Html;

use super::client::Session;
use super::html::{
    has_next_page, input_value, parse_table_page, FROM_INPUT_SELECTOR, TABLE_SELECTOR,
    TO_INPUT_SELECTOR,
};

pub const CONSUMPTION_PATH: &str = "/consumption";

/// Parameters of one consumption table request.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub meter_id: String,
    pub day: String,
    pub class: &'static str,
}

impl TableRequest {
    pub fn new(meter_id: &str, day: &Day, measurement: Measurement) -> Self {
        Self {
            meter_id: meter_id.to_string(),
            day: day.to_portal_string(),
            class: portal_class(measurement),
        }
    }

    fn query(&self, page: usize) -> Vec<(&'static str, String)> {
        vec![
            ("meterId", self.meter_id.clone()),
            ("from", self.day.clone()),
            ("to", self.day.clone()),
            ("class", self.class.to_string()),
            ("page", page.to_string()),
        ]
    }
}

/// Portal selector value of the table holding a measurement.
pub fn portal_class(measurement: Measurement) -> &'static str {
    match measurement {
        Measurement::MeteredValues => "energy",
        Measurement::MeteredPeakDemands => "power",
    }
}

/// Streams the pages of one table.
pub fn table_pages(
    session: &Session,
    request: TableRequest,
    max_pages: usize,
) -> impl Stream<Item = Result<TablePage, PortalError>> + '_ {
    futures::stream::try_unfold(Some(1usize), move |next| {
        let request = request.clone();
        async move {
            let Some(page_number) = next else {
                return Ok(None);
            };
            let body = session
                .get(CONSUMPTION_PATH, &request.query(page_number))
                .await?;
            let (page, more) = read_page(&body, &request.day)?;
            let next = (more && page_number < max_pages).then_some(page_number + 1);
            if more && next.is_none() {
                tracing::warn!(
                    day = %request.day,
                    class = request.class,
                    "Stopping pagination at page limit {}",
                    max_pages
                );
            }
            Ok::<_, PortalError>(Some((page, next)))
        }
    })
}

/// Parses one page body into its table rows and whether more pages follow.
fn read_page(body: &str, requested_day: &str) -> Result<(TablePage, bool), PortalError> {
    let document = Html::parse_document(body);
    check_date_range(&document, requested_day)?;
    match parse_table_page(&document, TABLE_SELECTOR)? {
        Some(page) => Ok((page, has_next_page(&document)?)),
        None => Ok((TablePage::default(), false)),
    }
}

/// The portal silently keeps its previous range when it rejects a date, so the
/// echoed range must match the request before any row is trusted.
fn check_date_range(document: &Html, requested_day: &str) -> Result<(), PortalError> {
    let from = input_value(document, FROM_INPUT_SELECTOR)?;
    let to = input_value(document, TO_INPUT_SELECTOR)?;
    match (from, to) {
        (Some(from), Some(to)) if from != requested_day || to != requested_day => {
            Err(PortalError::DateMismatch {
                requested: requested_day.to_string(),
                from,
                to,
            })
        }
        _ => Ok(()),
    }
}
