//! `credit-risk` library crate.
//!
//! The binary (`risk`) is a thin wrapper around this library so that:
//!
//! - scoring, training and dataset storage are testable without a terminal
//! - the dashboard and the batch commands share one pipeline
//!
//! Flow: applicant input → [`features`] (encode + assemble) → [`math`] (scale)
//! → [`models`] (random forest) → [`io`] (append to the CSV dataset).

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
