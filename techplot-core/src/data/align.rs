//! Series alignment onto a shared date axis.
//!
//! Each input series keeps its own key set. The row index is either the union
//! (outer join) or the intersection (inner join) of those key sets, sorted
//! ascending. A series without a value on some row gets an absent cell (`None`);
//! nothing is forward-filled or interpolated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::schema::{BacktestResult, SignalResult};
use crate::trade::{classify, TradeLabel};

pub const TRADES: &str = "trades";
pub const DAILY_PORTVALS: &str = "daily_portvals";
pub const BENCH_PORTVALS: &str = "bench_portvals";
pub const PRICE: &str = "price";
pub const SIGNAL: &str = "signal";

/// Prefix for flattened indicator output columns, to keep them apart from
/// `price` and `signal`.
pub const OUTPUT_PREFIX: &str = "output.";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How the row index is derived from the input series' dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    /// Union of all dates; gaps become absent cells.
    #[default]
    Outer,
    /// Only dates present in every series.
    Inner,
}

impl FromStr for JoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outer" => Ok(JoinPolicy::Outer),
            "inner" => Ok(JoinPolicy::Inner),
            other => Err(format!("unknown join policy '{other}' (expected outer or inner)")),
        }
    }
}

impl fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinPolicy::Outer => f.write_str("outer"),
            JoinPolicy::Inner => f.write_str("inner"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("series '{series}': invalid date '{value}'")]
    InvalidDate {
        series: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("series '{series}': date {date} appears more than once")]
    DuplicateDate { series: String, date: NaiveDate },

    #[error("no rows to report: the aligned date index is empty")]
    Empty,
}

/// One named column of an [`AlignedTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Values(Vec<Option<f64>>),
    Labels(Vec<Option<TradeLabel>>),
}

/// Time-indexed table of named series.
///
/// Invariant: `dates` is strictly increasing and every column has exactly
/// `dates.len()` cells.
#[derive(Debug, Clone)]
pub struct AlignedTable {
    dates: Vec<NaiveDate>,
    columns: Vec<(String, Column)>,
}

impl AlignedTable {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First row's date. Tables are never empty once built.
    pub fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    /// Numeric column by name.
    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            Column::Values(v) => Some(v),
            Column::Labels(_) => None,
        }
    }

    /// Label column by name.
    pub fn labels(&self, name: &str) -> Option<&[Option<TradeLabel>]> {
        match self.column(name)? {
            Column::Labels(v) => Some(v),
            Column::Values(_) => None,
        }
    }

    /// Names of the flattened indicator output columns, prefix stripped, in
    /// column order.
    pub fn output_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|(name, _)| name.strip_prefix(OUTPUT_PREFIX))
            .collect()
    }
}

enum Cells {
    Values(BTreeMap<NaiveDate, f64>),
    Labels(BTreeMap<NaiveDate, TradeLabel>),
}

impl Cells {
    fn dates(&self) -> BTreeSet<NaiveDate> {
        match self {
            Cells::Values(m) => m.keys().copied().collect(),
            Cells::Labels(m) => m.keys().copied().collect(),
        }
    }
}

/// Builder collecting keyed series before the join.
pub struct Aligner {
    policy: JoinPolicy,
    series: Vec<(String, Cells)>,
}

impl Aligner {
    pub fn new(policy: JoinPolicy) -> Self {
        Self {
            policy,
            series: Vec::new(),
        }
    }

    /// Add a numeric series. Key order is irrelevant.
    pub fn values<'a, I>(mut self, name: &str, series: I) -> Result<Self, AlignError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let cells = keyed(name, series)?;
        self.series.push((name.to_string(), Cells::Values(cells)));
        Ok(self)
    }

    /// Add a label series.
    pub fn labels<'a, I>(mut self, name: &str, series: I) -> Result<Self, AlignError>
    where
        I: IntoIterator<Item = (&'a str, TradeLabel)>,
    {
        let cells = keyed(name, series)?;
        self.series.push((name.to_string(), Cells::Labels(cells)));
        Ok(self)
    }

    /// Join all series into one table.
    pub fn build(self) -> Result<AlignedTable, AlignError> {
        let mut key_sets = self.series.iter().map(|(_, cells)| cells.dates());
        let index: BTreeSet<NaiveDate> = match key_sets.next() {
            None => BTreeSet::new(),
            Some(first) => key_sets.fold(first, |acc, next| match self.policy {
                JoinPolicy::Outer => acc.union(&next).copied().collect(),
                JoinPolicy::Inner => acc.intersection(&next).copied().collect(),
            }),
        };
        if index.is_empty() {
            return Err(AlignError::Empty);
        }
        let dates: Vec<NaiveDate> = index.into_iter().collect();

        let columns = self
            .series
            .into_iter()
            .map(|(name, cells)| {
                let column = match cells {
                    Cells::Values(m) => {
                        Column::Values(dates.iter().map(|d| m.get(d).copied()).collect())
                    }
                    Cells::Labels(mut m) => {
                        Column::Labels(dates.iter().map(|d| m.remove(d)).collect())
                    }
                };
                (name, column)
            })
            .collect();

        Ok(AlignedTable { dates, columns })
    }
}

/// Parse one ISO `YYYY-MM-DD` date key.
pub fn parse_date(series: &str, value: &str) -> Result<NaiveDate, AlignError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| AlignError::InvalidDate {
        series: series.to_string(),
        value: value.to_string(),
        source,
    })
}

fn keyed<'a, T, I>(series: &str, pairs: I) -> Result<BTreeMap<NaiveDate, T>, AlignError>
where
    I: IntoIterator<Item = (&'a str, T)>,
{
    let mut out = BTreeMap::new();
    for (key, value) in pairs {
        let date = parse_date(series, key)?;
        if out.insert(date, value).is_some() {
            return Err(AlignError::DuplicateDate {
                series: series.to_string(),
                date,
            });
        }
    }
    Ok(out)
}

/// Align a backtest result: trade labels, portfolio values, benchmark values
/// and prices.
pub fn align_backtest(result: &BacktestResult, policy: JoinPolicy) -> Result<AlignedTable, AlignError> {
    Aligner::new(policy)
        .labels(TRADES, result.trades.iter().map(|(d, v)| (d.as_str(), classify(v))))?
        .values(DAILY_PORTVALS, as_pairs(&result.performance.daily_portvals))?
        .values(BENCH_PORTVALS, as_pairs(&result.benchmark.daily_portvals))?
        .values(PRICE, as_pairs(&result.prices.map))?
        .build()
}

/// Align a signal result: price, signal, and one column per indicator output
/// name (`output.<name>`).
pub fn align_signal(result: &SignalResult, policy: JoinPolicy) -> Result<AlignedTable, AlignError> {
    let mut outputs: Vec<(String, Vec<(&str, f64)>)> = Vec::new();
    for (date, entry) in &result.map {
        let Some(output) = &entry.output else {
            continue;
        };
        for (name, value) in output.entries(&result.indicator) {
            match outputs.iter_mut().find(|(n, _)| n == name) {
                Some((_, cells)) => cells.push((date.as_str(), value)),
                None => outputs.push((name.to_string(), vec![(date.as_str(), value)])),
            }
        }
    }

    let mut aligner = Aligner::new(policy)
        .values(PRICE, result.map.iter().map(|(d, e)| (d.as_str(), e.price)))?
        .values(SIGNAL, result.map.iter().map(|(d, e)| (d.as_str(), e.signal)))?;
    for (name, cells) in outputs {
        aligner = aligner.values(&format!("{OUTPUT_PREFIX}{name}"), cells)?;
    }
    aligner.build()
}

fn as_pairs(series: &BTreeMap<String, f64>) -> impl Iterator<Item = (&str, f64)> {
    series.iter().map(|(k, v)| (k.as_str(), *v))
}
