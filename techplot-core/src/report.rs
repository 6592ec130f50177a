//! Report pipeline: document → typed record → aligned table → figure → image.
//!
//! Two entry points:
//! - [`prepare_report()`]: everything up to the composed figure, no I/O. Every
//!   fatal input problem (schema, dates, degenerate series) surfaces here.
//! - [`run_report()`]: loads the input, prepares, then writes the image (and
//!   optionally the aligned table as CSV).
//!
//! Because all validation happens in `prepare_report()`, a failing input never
//! creates an output file.

use chrono::NaiveDate;
use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::chart::{
    compose_backtest, compose_signal, render, BacktestLayout, BacktestMeta, Figure, ImageFormat,
    RenderError, SignalLayout, SignalMeta,
};
use crate::config::ReportConfig;
use crate::data::{
    align_backtest, align_signal, read_document, AlignError, AlignedTable, InputSource, JoinPolicy,
    LoadError, NormalizeError,
};
use crate::export::{write_table_csv, ExportError};
use crate::schema::{BacktestResult, SchemaError, SignalResult};
use crate::trade::MarkerSet;

/// Errors from the report pipeline.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("schema mismatch")]
    Schema(#[from] SchemaError),
    #[error("schema mismatch")]
    Align(#[from] AlignError),
    #[error(transparent)]
    Degenerate(#[from] NormalizeError),
    #[error("table export failed")]
    Export(#[from] ExportError),
    #[error("render failed")]
    Render(#[from] RenderError),
    #[error("output directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which report to build, with its layout. Dispatched once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Backtest(BacktestLayout),
    Signal(SignalLayout),
}

impl ReportKind {
    /// Filename suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            ReportKind::Backtest(_) => "backtest",
            ReportKind::Signal(_) => "signal",
        }
    }
}

/// Everything a run needs besides the input document.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub kind: ReportKind,
    pub join: JoinPolicy,
    pub markers: MarkerSet,
    pub band_indicators: Vec<String>,
    pub format: ImageFormat,
    pub size: (u32, u32),
    pub output_dir: PathBuf,
    /// Also write the aligned table as CSV here.
    pub export_table: Option<PathBuf>,
}

impl ReportOptions {
    /// Options for `kind` from a loaded config; the layout and join come from
    /// the matching config section.
    pub fn backtest(config: &ReportConfig) -> Self {
        Self::from_config(
            config,
            ReportKind::Backtest(config.backtest.layout),
            config.backtest.join,
        )
    }

    pub fn signal(config: &ReportConfig) -> Self {
        Self::from_config(
            config,
            ReportKind::Signal(config.signal.layout),
            config.signal.join,
        )
    }

    fn from_config(config: &ReportConfig, kind: ReportKind, join: JoinPolicy) -> Self {
        Self {
            kind,
            join,
            markers: config.markers.clone(),
            band_indicators: config.signal.band_indicators.clone(),
            format: config.render.format,
            size: config.size(),
            output_dir: config.render.output_dir.clone(),
            export_table: None,
        }
    }
}

/// Facts about a backtest run, reported alongside the image.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub model_name: String,
    pub total_return: Option<f64>,
    pub volatility: Option<f64>,
    /// Mean and count of the engine's daily returns, when it reported them.
    pub daily_returns: Option<(f64, usize)>,
    /// Symbol of the price series, when the engine named it separately.
    pub price_symbol: Option<String>,
}

/// A composed report, ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub kind: ReportKind,
    pub symbol: String,
    /// Output filename without extension.
    pub file_stem: String,
    pub table: AlignedTable,
    pub figure: Figure,
    pub summary: Option<BacktestSummary>,
}

impl PreparedReport {
    pub fn start_date(&self) -> NaiveDate {
        self.table.start_date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.table.end_date()
    }

    pub fn marker_count(&self) -> usize {
        self.figure.markers().count()
    }

    /// Output path inside `dir` for `format`.
    pub fn output_path(&self, dir: &Path, format: ImageFormat) -> PathBuf {
        dir.join(format!("{}.{}", self.file_stem, format.extension()))
    }

    /// Render to `dir`. A partially written image is removed on failure.
    pub fn write(&self, dir: &Path, format: ImageFormat, size: (u32, u32)) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir).map_err(|source| ReportError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = self.output_path(dir, format);
        if let Err(err) = render(&self.figure, &path, format, size) {
            let _ = std::fs::remove_file(&path);
            return Err(err.into());
        }
        info!("wrote {}", path.display());
        Ok(path)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub path: PathBuf,
    pub report: PreparedReport,
}

/// Validate, align and compose a decoded document.
pub fn prepare_report(document: Value, options: &ReportOptions) -> Result<PreparedReport, ReportError> {
    match options.kind {
        ReportKind::Backtest(layout) => {
            let result = BacktestResult::from_value(document)?;
            let table = align_backtest(&result, options.join)?;
            debug!(
                "aligned {} rows ({} join) for {} {}",
                table.len(),
                options.join,
                result.symbol,
                result.model_name
            );
            let meta = BacktestMeta {
                model_name: &result.model_name,
                symbol: &result.symbol,
            };
            let figure = compose_backtest(&meta, &table, layout, &options.markers)?;
            Ok(PreparedReport {
                kind: options.kind,
                file_stem: file_stem(&result.symbol, &result.model_name, options.kind),
                symbol: result.symbol.clone(),
                summary: Some(BacktestSummary {
                    model_name: result.model_name.clone(),
                    total_return: result.total_return(),
                    volatility: result.performance.volatility,
                    daily_returns: result.performance.mean_daily_return(),
                    price_symbol: result.prices.symbol.clone(),
                }),
                table,
                figure,
            })
        }
        ReportKind::Signal(layout) => {
            let result = SignalResult::from_value(document)?;
            let table = align_signal(&result, options.join)?;
            let layout = layout.resolve(&result.indicator, &options.band_indicators);
            debug!(
                "aligned {} rows for {} {}, {layout} layout",
                table.len(),
                result.symbol,
                result.indicator
            );
            let meta = SignalMeta {
                indicator: &result.indicator,
                symbol: &result.symbol,
            };
            let figure = compose_signal(&meta, &table, layout);
            Ok(PreparedReport {
                kind: ReportKind::Signal(layout),
                file_stem: file_stem(&result.symbol, &result.indicator, options.kind),
                symbol: result.symbol.clone(),
                summary: None,
                table,
                figure,
            })
        }
    }
}

/// Load `source`, prepare, and write the image. The aligned table is
/// exported only once the image is on disk.
pub fn run_report(source: &InputSource, options: &ReportOptions) -> Result<ReportOutcome, ReportError> {
    let document = read_document(source)?;
    let report = prepare_report(document, options)?;
    let path = report.write(&options.output_dir, options.format, options.size)?;
    if let Some(csv_path) = &options.export_table {
        write_table_csv(&report.table, csv_path)?;
        info!("wrote aligned table to {}", csv_path.display());
    }
    Ok(ReportOutcome { path, report })
}

/// `{symbol}_{name}_{backtest|signal}`, with path separators replaced so the
/// file always lands in the output directory.
pub fn file_stem(symbol: &str, name: &str, kind: ReportKind) -> String {
    format!("{symbol}_{name}_{}", kind.suffix())
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}
