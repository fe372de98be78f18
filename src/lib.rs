//! ragnarok - AI-generated lifting sessions with a spreadsheet-style log
//!
//! RAGNARÖK LAB: ask a model for a Push / Pull / Legs session, clean up
//! whatever it sends back, and keep every set in one 11-column log.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod exercises;
pub mod lab;
pub mod mapper;
pub mod normalize;
pub mod prompt;
pub mod tui;

pub use db::{Database, SheetsSink};
pub use error::{LabError, Result};
pub use lab::{Lab, Logbook};
