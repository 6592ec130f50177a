//! Chart composition: aligned tables → [`Figure`]s.
//!
//! Two report families, each with an explicit layout enum matched once:
//! - backtest: `Split` (portfolio panel over price panel) or `Compact`
//!   (normalized price and portfolio on one panel)
//! - signal: `Superimposed` (price and indicator curves together, signal bars
//!   below) or `Separate` (price, indicator curves, signal bars)

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::figure::{Bar, Figure, Line, Marker, Panel, Tone};
use crate::data::align::{
    AlignedTable, BENCH_PORTVALS, DAILY_PORTVALS, OUTPUT_PREFIX, PRICE, SIGNAL, TRADES,
};
use crate::data::normalize::{normalize, NormalizeError};
use crate::trade::MarkerSet;

/// Indicators whose outputs live on the price scale and are drawn over it.
pub const DEFAULT_BAND_INDICATORS: &[&str] = &["BollingerBands"];

/// Fixed y-limits of the signal bar panel.
pub const SIGNAL_RANGE: (f64, f64) = (-1.0, 1.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacktestLayout {
    /// Portfolio comparison above price with trade markers.
    #[default]
    Split,
    /// Normalized price and portfolio on one panel.
    Compact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalLayout {
    /// Pick from the indicator name.
    #[default]
    Auto,
    Superimposed,
    Separate,
}

impl SignalLayout {
    /// Resolve `Auto`: band-style indicators are superimposed on price.
    pub fn resolve<S: AsRef<str>>(self, indicator: &str, band_indicators: &[S]) -> SignalLayout {
        match self {
            SignalLayout::Auto => {
                if band_indicators.iter().any(|b| b.as_ref() == indicator) {
                    SignalLayout::Superimposed
                } else {
                    SignalLayout::Separate
                }
            }
            fixed => fixed,
        }
    }
}

impl FromStr for BacktestLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(BacktestLayout::Split),
            "compact" => Ok(BacktestLayout::Compact),
            other => Err(format!("unknown backtest layout '{other}' (expected split or compact)")),
        }
    }
}

impl FromStr for SignalLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SignalLayout::Auto),
            "superimposed" => Ok(SignalLayout::Superimposed),
            "separate" => Ok(SignalLayout::Separate),
            other => Err(format!(
                "unknown signal layout '{other}' (expected auto, superimposed or separate)"
            )),
        }
    }
}

impl fmt::Display for SignalLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalLayout::Auto => "auto",
            SignalLayout::Superimposed => "superimposed",
            SignalLayout::Separate => "separate",
        };
        f.write_str(s)
    }
}

/// Record-level facts a backtest figure needs besides the table.
#[derive(Debug, Clone)]
pub struct BacktestMeta<'a> {
    pub model_name: &'a str,
    pub symbol: &'a str,
}

/// Record-level facts a signal figure needs besides the table.
#[derive(Debug, Clone)]
pub struct SignalMeta<'a> {
    pub indicator: &'a str,
    pub symbol: &'a str,
}

/// Compose a backtest figure.
///
/// Fails only when a series to be normalized is degenerate.
pub fn compose_backtest(
    meta: &BacktestMeta<'_>,
    table: &AlignedTable,
    layout: BacktestLayout,
    marker_set: &MarkerSet,
) -> Result<Figure, NormalizeError> {
    let symbol = meta.symbol.to_uppercase();
    let title = format!(
        "{} performance on {} from {} to {}",
        meta.model_name,
        symbol,
        table.start_date().format("%Y-%m-%d"),
        table.end_date().format("%Y-%m-%d"),
    );

    let port = normalize("performance.daily_portvals", column(table, DAILY_PORTVALS))?;

    let panels = match layout {
        BacktestLayout::Split => {
            let bench = normalize("benchmark.daily_portvals", column(table, BENCH_PORTVALS))?;

            let mut port_panel = Panel::new(None);
            port_panel.lines.push(line(table, "Benchmark portfolio value", 0, &bench));
            port_panel.lines.push(line(table, "Portfolio value", 1, &port));
            port_panel.legend = true;
            port_panel.fit_y_range();

            let price = column(table, PRICE);
            let mut price_panel = Panel::new(None);
            price_panel.lines.push(line(table, &format!("{symbol} price"), 0, price));
            price_panel.legend = true;
            price_panel.fit_y_range();
            price_panel.markers = trade_markers(table, price, price_panel.y_range.0, marker_set);

            vec![port_panel, price_panel]
        }
        BacktestLayout::Compact => {
            let price = normalize("prices.map", column(table, PRICE))?;

            let mut panel = Panel::new(None);
            panel.lines.push(line(table, &format!("{symbol} price (normalized)"), 0, &price));
            panel.lines.push(line(table, "Portfolio value", 1, &port));
            panel.legend = true;
            panel.fit_y_range();
            panel.markers = trade_markers(table, &price, panel.y_range.0, marker_set);

            vec![panel]
        }
    };

    let figure = Figure {
        title,
        x_range: (table.start_date(), table.end_date()),
        panels,
    };
    debug!(
        "composed {layout:?} backtest figure: {} panels, {} markers",
        figure.panels.len(),
        figure.markers().count()
    );
    Ok(figure)
}

/// One vertical marker per drawable trade, from `bottom` up to the value of
/// `heights` on that date. Drawable trades on dates without a height are
/// skipped.
pub fn trade_markers(
    table: &AlignedTable,
    heights: &[Option<f64>],
    bottom: f64,
    marker_set: &MarkerSet,
) -> Vec<Marker> {
    let Some(labels) = table.labels(TRADES) else {
        return Vec::new();
    };

    let mut markers = Vec::new();
    for ((date, label), height) in table.dates().iter().zip(labels).zip(heights) {
        let Some(direction) = label.as_ref().and_then(|l| marker_set.direction(l)) else {
            continue;
        };
        match height {
            Some(top) => markers.push(Marker {
                date: *date,
                bottom,
                top: *top,
                direction,
            }),
            None => warn!("no price on {date} for {direction:?} trade, marker skipped"),
        }
    }
    markers
}

/// Compose a signal figure. `layout` must already be resolved; `Auto` is
/// treated as `Separate`.
pub fn compose_signal(meta: &SignalMeta<'_>, table: &AlignedTable, layout: SignalLayout) -> Figure {
    let symbol = meta.symbol.to_uppercase();
    let price = column(table, PRICE);
    let outputs = table.output_names();

    let mut price_panel = Panel::new(Some(format!("{symbol} price")));
    price_panel.lines.push(line(table, "price", 0, price));

    let mut panels = match layout {
        SignalLayout::Superimposed => {
            price_panel.title = Some(format!("{symbol} price and {}", meta.indicator));
            for (i, name) in outputs.iter().enumerate() {
                price_panel.lines.push(output_line(table, name, i + 1));
            }
            price_panel.legend = true;
            price_panel.fit_y_range();
            vec![price_panel]
        }
        SignalLayout::Separate | SignalLayout::Auto => {
            price_panel.fit_y_range();
            let mut panels = vec![price_panel];
            if outputs.is_empty() {
                warn!("{} has no indicator outputs, skipping its panel", meta.indicator);
            } else {
                let mut ta_panel = Panel::new(Some(meta.indicator.to_string()));
                for (i, name) in outputs.iter().enumerate() {
                    ta_panel.lines.push(output_line(table, name, i));
                }
                ta_panel.legend = true;
                ta_panel.fit_y_range();
                panels.push(ta_panel);
            }
            panels
        }
    };
    panels.push(signal_panel(table));

    Figure {
        title: format!("{symbol} {} signals", meta.indicator),
        x_range: (table.start_date(), table.end_date()),
        panels,
    }
}

/// Bars of the signal column: red below zero, green otherwise, fixed [-1, 1].
fn signal_panel(table: &AlignedTable) -> Panel {
    let mut panel = Panel::new(Some("Bullish/bearish signals".into()));
    panel.bars = table
        .dates()
        .iter()
        .zip(column(table, SIGNAL))
        .filter_map(|(date, v)| {
            v.map(|value| Bar {
                date: *date,
                value,
                tone: if value < 0.0 { Tone::Bearish } else { Tone::Bullish },
            })
        })
        .collect();
    panel.y_range = SIGNAL_RANGE;
    panel
}

fn output_line(table: &AlignedTable, name: &str, tone: usize) -> Line {
    line(table, name, tone, column(table, &format!("{OUTPUT_PREFIX}{name}")))
}

fn line(table: &AlignedTable, label: &str, tone: usize, values: &[Option<f64>]) -> Line {
    Line {
        label: Some(label.to_string()),
        tone: Tone::Cycle(tone),
        points: dates_with(table.dates(), values),
    }
}

fn dates_with(dates: &[NaiveDate], values: &[Option<f64>]) -> Vec<(NaiveDate, Option<f64>)> {
    dates.iter().copied().zip(values.iter().copied()).collect()
}

/// Numeric column the aligners always create; absent columns read as empty.
fn column<'t>(table: &'t AlignedTable, name: &str) -> &'t [Option<f64>] {
    table.values(name).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::align::{Aligner, JoinPolicy};
    use crate::trade::{Direction, TradeLabel};

    fn meta() -> BacktestMeta<'static> {
        BacktestMeta {
            model_name: "Manual",
            symbol: "jpm",
        }
    }

    fn table(labels: Vec<(&'static str, TradeLabel)>) -> AlignedTable {
        let dates: Vec<&str> = labels.iter().map(|(d, _)| *d).collect();
        let prices: Vec<(&str, f64)> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, 50.0 + i as f64))
            .collect();
        let vals: Vec<(&str, f64)> = dates.iter().map(|d| (*d, 100.0)).collect();
        Aligner::new(JoinPolicy::Outer)
            .labels(TRADES, labels)
            .unwrap()
            .values(DAILY_PORTVALS, vals.clone())
            .unwrap()
            .values(BENCH_PORTVALS, vals)
            .unwrap()
            .values(PRICE, prices)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn only_directional_labels_get_markers() {
        let t = table(vec![
            ("2020-01-02", TradeLabel::Out),
            ("2020-01-03", TradeLabel::Action("Long".into())),
            ("2020-01-06", TradeLabel::Hold),
            ("2020-01-07", TradeLabel::Action("Short".into())),
            ("2020-01-08", TradeLabel::Opaque("Flat".into())),
            ("2020-01-09", TradeLabel::Action("Rebalance".into())),
        ]);
        let fig = compose_backtest(&meta(), &t, BacktestLayout::Split, &MarkerSet::default()).unwrap();

        let markers: Vec<_> = fig.markers().collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].direction, Direction::Long);
        assert_eq!(markers[0].top, 51.0);
        assert_eq!(markers[1].direction, Direction::Short);
        assert_eq!(markers[1].top, 53.0);
        // markers rise from the price panel's bottom limit
        assert_eq!(markers[0].bottom, fig.panels[1].y_range.0);
    }

    #[test]
    fn split_layout_panels() {
        let t = table(vec![
            ("2020-01-02", TradeLabel::Out),
            ("2020-01-03", TradeLabel::Hold),
        ]);
        let fig = compose_backtest(&meta(), &t, BacktestLayout::Split, &MarkerSet::default()).unwrap();

        assert_eq!(fig.title, "Manual performance on JPM from 2020-01-02 to 2020-01-03");
        assert_eq!(fig.panels.len(), 2);
        assert!(fig.panels[0].line("Benchmark portfolio value").is_some());
        assert!(fig.panels[0].line("Portfolio value").is_some());
        assert!(fig.panels[1].line("JPM price").is_some());
        assert!(fig.panels.iter().all(|p| p.legend));
    }

    #[test]
    fn compact_markers_use_normalized_price() {
        let t = table(vec![
            ("2020-01-02", TradeLabel::Out),
            ("2020-01-03", TradeLabel::Action("Long".into())),
        ]);
        let fig = compose_backtest(&meta(), &t, BacktestLayout::Compact, &MarkerSet::default()).unwrap();

        assert_eq!(fig.panels.len(), 1);
        let marker = fig.markers().next().unwrap();
        assert!((marker.top - 51.0 / 50.0).abs() < 1e-12);
        assert_eq!(marker.bottom, fig.panels[0].y_range.0);
    }

    #[test]
    fn layout_resolution() {
        let bands = DEFAULT_BAND_INDICATORS;
        assert_eq!(
            SignalLayout::Auto.resolve("BollingerBands", bands),
            SignalLayout::Superimposed
        );
        assert_eq!(
            SignalLayout::Auto.resolve("RelativeStrengthIndex", bands),
            SignalLayout::Separate
        );
        assert_eq!(
            SignalLayout::Separate.resolve("BollingerBands", bands),
            SignalLayout::Separate
        );
    }

    fn signal_table() -> AlignedTable {
        Aligner::new(JoinPolicy::Outer)
            .values(PRICE, [("2020-03-10", 100.0), ("2020-03-11", 101.0)])
            .unwrap()
            .values(SIGNAL, [("2020-03-10", -0.4), ("2020-03-11", 0.0)])
            .unwrap()
            .values("output.rsi", [("2020-03-10", 30.0), ("2020-03-11", 45.0)])
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn separate_signal_layout() {
        let meta = SignalMeta {
            indicator: "RelativeStrengthIndex",
            symbol: "jpm",
        };
        let fig = compose_signal(&meta, &signal_table(), SignalLayout::Separate);

        assert_eq!(fig.title, "JPM RelativeStrengthIndex signals");
        assert_eq!(fig.panels.len(), 3);
        assert_eq!(fig.panels[0].title.as_deref(), Some("JPM price"));
        assert_eq!(fig.panels[1].title.as_deref(), Some("RelativeStrengthIndex"));
        assert!(fig.panels[1].line("rsi").is_some());

        let bars = &fig.panels[2].bars;
        assert_eq!(fig.panels[2].y_range, (-1.0, 1.0));
        assert_eq!(bars[0].tone, Tone::Bearish);
        assert_eq!(bars[1].tone, Tone::Bullish);
    }

    #[test]
    fn superimposed_signal_layout() {
        let meta = SignalMeta {
            indicator: "BollingerBands",
            symbol: "jpm",
        };
        let fig = compose_signal(&meta, &signal_table(), SignalLayout::Superimposed);

        assert_eq!(fig.panels.len(), 2);
        assert_eq!(fig.panels[0].lines.len(), 2);
        assert!(fig.panels[0].legend);
        assert_eq!(fig.panels[1].bars.len(), 2);
    }
}
