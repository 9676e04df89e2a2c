//! Logging and run reports

pub mod logger;
pub mod report_writer;

pub use logger::{LogConfig, RunLogger};
pub use report_writer::{write_json_report, write_report, RunReport, RunSummary};
