//! techplot core: turn backtest and signal JSON into chart images.
//!
//! Pipeline, one module per stage:
//! - `data::load`: read the JSON document from a file or stdin
//! - `schema`: validate it into a typed record
//! - `data::align`: join the dated series onto one ascending date index
//! - `data::normalize`: scale value series to start at 1.0
//! - `trade`: classify position entries and pick the drawable ones
//! - `chart`: compose panels into a `Figure` and render it with plotters
//! - `report`: run the stages end to end for one report kind
//!
//! `config` holds the optional TOML settings and `export` writes the aligned
//! table as CSV.

pub mod chart;
pub mod config;
pub mod data;
pub mod export;
pub mod report;
pub mod schema;
pub mod trade;

pub use config::{ConfigError, ReportConfig};
pub use report::{prepare_report, run_report, PreparedReport, ReportError, ReportKind, ReportOptions};
