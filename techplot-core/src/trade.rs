//! Trade classification: raw trade records → event labels → drawable markers.
//!
//! A trade record is one of:
//! - the literal `"Out"` (flat) or `"Hold"` (keep the current position)
//! - a one-key object naming the executed action, e.g. `{"Long": 10}`
//!
//! Classification is total. Shapes that fit neither form become an opaque
//! label and never abort the report; only [`MarkerSet`] decides which labels
//! get drawn.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event label for one trading day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeLabel {
    Out,
    Hold,
    /// Action named by the record's key (`Long`, `Short`, ...).
    Action(String),
    /// A record that is neither a sentinel nor an object with a key.
    Opaque(String),
}

impl TradeLabel {
    pub fn as_str(&self) -> &str {
        match self {
            TradeLabel::Out => "Out",
            TradeLabel::Hold => "Hold",
            TradeLabel::Action(name) | TradeLabel::Opaque(name) => name,
        }
    }
}

impl fmt::Display for TradeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify one trade record.
///
/// Objects with more than one key use the first key in document order.
pub fn classify(record: &Value) -> TradeLabel {
    match record {
        Value::String(s) if s == "Out" => TradeLabel::Out,
        Value::String(s) if s == "Hold" => TradeLabel::Hold,
        Value::Object(map) => match map.keys().next() {
            Some(action) => {
                if map.len() > 1 {
                    warn!(
                        "trade record has {} keys, using the first ({action})",
                        map.len()
                    );
                }
                TradeLabel::Action(action.clone())
            }
            None => {
                warn!("empty trade record, treating as opaque");
                TradeLabel::Opaque("{}".into())
            }
        },
        Value::String(s) => {
            warn!("unrecognized trade literal {s:?}");
            TradeLabel::Opaque(s.clone())
        }
        other => {
            warn!("unrecognized trade record {other}");
            TradeLabel::Opaque(other.to_string())
        }
    }
}

/// Direction of a drawable trade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Drawn green.
    Long,
    /// Drawn red.
    Short,
}

/// Action names that produce a vertical marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    pub long: Vec<String>,
    pub short: Vec<String>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            long: vec!["Long".into()],
            short: vec!["Short".into()],
        }
    }
}

impl MarkerSet {
    /// Marker direction for a label, or `None` when the label is not drawable.
    ///
    /// Only [`TradeLabel::Action`] labels can be drawable; `Out`, `Hold` and
    /// opaque labels never are.
    pub fn direction(&self, label: &TradeLabel) -> Option<Direction> {
        let TradeLabel::Action(name) = label else {
            return None;
        };
        if self.long.iter().any(|n| n == name) {
            Some(Direction::Long)
        } else if self.short.iter().any(|n| n == name) {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinels() {
        assert_eq!(classify(&json!("Out")), TradeLabel::Out);
        assert_eq!(classify(&json!("Hold")), TradeLabel::Hold);
    }

    #[test]
    fn one_key_object_names_the_action() {
        assert_eq!(classify(&json!({"Long": {}})), TradeLabel::Action("Long".into()));
        assert_eq!(classify(&json!({"Short": 25})), TradeLabel::Action("Short".into()));
    }

    #[test]
    fn multi_key_object_uses_first_key() {
        let record: Value = serde_json::from_str(r#"{"Short": 1, "Long": 2}"#).unwrap();
        assert_eq!(classify(&record), TradeLabel::Action("Short".into()));
    }

    #[test]
    fn unknown_shapes_are_opaque() {
        assert_eq!(classify(&json!("Flat")), TradeLabel::Opaque("Flat".into()));
        assert_eq!(classify(&json!({})), TradeLabel::Opaque("{}".into()));
        assert_eq!(classify(&json!(3)), TradeLabel::Opaque("3".into()));
        assert_eq!(classify(&Value::Null), TradeLabel::Opaque("null".into()));
    }

    #[test]
    fn only_directional_actions_are_drawable() {
        let markers = MarkerSet::default();
        assert_eq!(markers.direction(&TradeLabel::Action("Long".into())), Some(Direction::Long));
        assert_eq!(markers.direction(&TradeLabel::Action("Short".into())), Some(Direction::Short));
        assert_eq!(markers.direction(&TradeLabel::Action("Rebalance".into())), None);
        assert_eq!(markers.direction(&TradeLabel::Out), None);
        assert_eq!(markers.direction(&TradeLabel::Hold), None);
        // An opaque label spelled like an action still draws nothing.
        assert_eq!(markers.direction(&TradeLabel::Opaque("Long".into())), None);
    }

    #[test]
    fn custom_marker_names() {
        let markers = MarkerSet {
            long: vec!["Buy".into()],
            short: vec!["Sell".into()],
        };
        assert_eq!(markers.direction(&TradeLabel::Action("Buy".into())), Some(Direction::Long));
        assert_eq!(markers.direction(&TradeLabel::Action("Long".into())), None);
    }
}
