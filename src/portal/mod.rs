//! Client for the network operator's consumption portal.
//!
//! One day is fetched per authenticated session: log in, page through the
//! energy and power tables, log out.

mod client;
mod html;
mod pagination;
mod source;

pub use client::Client;
pub use source::PortalSource;
