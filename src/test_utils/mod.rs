//! Consolidated test utilities for the smart meter backfill.
//!
//! Config builders pointing at mock servers, HTML pages shaped like the
//! portal's output, and in-process collaborators for the engine.

#![cfg(test)]

pub mod config;
pub mod html;
pub mod mocks;
