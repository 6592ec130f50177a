//! Typed result records consumed by the report builders.
//!
//! The backtest engine emits two document shapes:
//! - [`BacktestResult`]: trades, portfolio values, benchmark values and prices
//! - [`SignalResult`]: per-date price, bullish/bearish signal and indicator outputs
//!
//! Records are validated once, right after the JSON is decoded: declared key
//! paths are checked for presence first so a missing field is reported by its
//! dotted path, then the whole document is deserialized into the typed struct.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Mapping from ISO date string to a value. Keys are unparsed; the aligner
/// turns them into calendar dates.
pub type DateSeries<T> = BTreeMap<String, T>;

/// Key paths every backtest document must carry.
pub const BACKTEST_KEYS: &[&str] = &[
    "model_name",
    "symbol",
    "trades",
    "performance.daily_portvals",
    "benchmark.daily_portvals",
    "prices.map",
];

/// Key paths every signal document must carry.
pub const SIGNAL_KEYS: &[&str] = &["map", "symbol", "indicator"];

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required key `{0}`")]
    MissingKey(String),

    #[error("invalid {record} record")]
    Shape {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Check that every dotted key path exists in `value`.
pub fn require_keys(value: &Value, paths: &[&str]) -> Result<(), SchemaError> {
    for path in paths {
        let mut node = value;
        for segment in path.split('.') {
            node = node
                .get(segment)
                .ok_or_else(|| SchemaError::MissingKey((*path).to_string()))?;
        }
    }
    Ok(())
}

// ── Backtest document ────────────────────────────────────────────────

/// Output of one backtest run.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestResult {
    pub model_name: String,
    pub symbol: String,
    pub trades: TradeMap,
    pub performance: Performance,
    pub benchmark: Performance,
    pub prices: Prices,
    /// Total return as reported by the engine, if it computed one.
    #[serde(default)]
    pub total_return: Option<f64>,
}

impl BacktestResult {
    /// Validate and convert a decoded JSON document.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        require_keys(&value, BACKTEST_KEYS)?;
        serde_json::from_value(value).map_err(|source| SchemaError::Shape {
            record: "backtest",
            source,
        })
    }

    /// Engine-reported total return, falling back to last/first portfolio value.
    pub fn total_return(&self) -> Option<f64> {
        if self.total_return.is_some() {
            return self.total_return;
        }
        let vals = &self.performance.daily_portvals;
        let first = vals.values().next()?;
        let last = vals.values().next_back()?;
        if *first == 0.0 {
            return None;
        }
        Some(last / first - 1.0)
    }
}

/// Portfolio performance block; the same shape is used for the benchmark.
#[derive(Debug, Clone, Deserialize)]
pub struct Performance {
    pub daily_portvals: DateSeries<f64>,
    #[serde(default)]
    pub daily_returns: Option<DateSeries<f64>>,
    /// Standard deviation of daily returns.
    #[serde(default)]
    pub volatility: Option<f64>,
}

impl Performance {
    /// Mean of the reported daily returns and how many there were.
    pub fn mean_daily_return(&self) -> Option<(f64, usize)> {
        let returns = self.daily_returns.as_ref()?;
        if returns.is_empty() {
            return None;
        }
        let sum: f64 = returns.values().sum();
        Some((sum / returns.len() as f64, returns.len()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prices {
    pub map: DateSeries<f64>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Per-date trade decisions.
///
/// The engine serializes its trade list wrapped in an object
/// (`{"trades": {...}}`); a bare date map is accepted as well. Values are kept
/// as raw JSON and interpreted by [`crate::trade::classify`].
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "TradesRepr")]
pub struct TradeMap(pub DateSeries<Value>);

#[derive(Deserialize)]
#[serde(untagged)]
enum TradesRepr {
    Wrapped { trades: DateSeries<Value> },
    Flat(DateSeries<Value>),
}

impl From<TradesRepr> for TradeMap {
    fn from(repr: TradesRepr) -> Self {
        match repr {
            TradesRepr::Wrapped { trades } => TradeMap(trades),
            TradesRepr::Flat(trades) => TradeMap(trades),
        }
    }
}

impl TradeMap {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Signal document ──────────────────────────────────────────────────

/// Indicator outputs and derived signals for one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalResult {
    pub map: DateSeries<SignalEntry>,
    pub symbol: String,
    pub indicator: String,
}

impl SignalResult {
    /// Validate and convert a decoded JSON document.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        require_keys(&value, SIGNAL_KEYS)?;
        serde_json::from_value(value).map_err(|source| SchemaError::Shape {
            record: "signal",
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalEntry {
    /// Normalized signal in [-1, 1]; negative is bearish.
    pub signal: f64,
    pub price: f64,
    #[serde(default)]
    pub output: Option<IndicatorOutput>,
}

/// Indicator output for one date: a bare value for single-line indicators
/// (RSI) or a name → value map for multi-line ones (bands, MACD).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IndicatorOutput {
    Single(f64),
    Named(BTreeMap<String, f64>),
}

impl IndicatorOutput {
    /// Flatten into `(name, value)` pairs; a bare value is named `indicator`.
    pub fn entries<'a>(&'a self, indicator: &'a str) -> Vec<(&'a str, f64)> {
        match self {
            IndicatorOutput::Single(v) => vec![(indicator, *v)],
            IndicatorOutput::Named(map) => map.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
        }
    }
}
