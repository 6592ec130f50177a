//! Backend-independent figure model.
//!
//! The composer produces a [`Figure`] value; the renderer draws it. Every
//! drawing decision (panel order, y-limits, marker extents, colors) is made
//! while composing, so a figure can be inspected in tests without touching a
//! drawing backend.

use chrono::NaiveDate;

use crate::trade::Direction;

/// Color role of a drawn element; the renderer maps roles to concrete colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Index into the line color cycle.
    Cycle(usize),
    Bullish,
    Bearish,
}

impl From<Direction> for Tone {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Tone::Bullish,
            Direction::Short => Tone::Bearish,
        }
    }
}

/// A line over the shared date axis. Absent cells break the line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: Option<String>,
    pub tone: Tone,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl Line {
    /// Present values only.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|(_, v)| *v)
    }
}

/// Vertical line marking a trade, from `bottom` up to `top`.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub date: NaiveDate,
    pub bottom: f64,
    pub top: f64,
    pub direction: Direction,
}

/// One bar of a bar series, rising from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub value: f64,
    pub tone: Tone,
}

/// One subplot. All panels of a figure share the x-axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: Option<String>,
    pub lines: Vec<Line>,
    pub markers: Vec<Marker>,
    pub bars: Vec<Bar>,
    pub legend: bool,
    /// Inclusive y-limits `(bottom, top)`.
    pub y_range: (f64, f64),
}

impl Panel {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            lines: Vec::new(),
            markers: Vec::new(),
            bars: Vec::new(),
            legend: false,
            y_range: (0.0, 1.0),
        }
    }

    /// Fit the y-limits to the panel's lines with a 5% margin.
    pub fn fit_y_range(&mut self) {
        self.y_range = fit_range(self.lines.iter().flat_map(Line::values));
    }

    /// Line by label.
    pub fn line(&self, label: &str) -> Option<&Line> {
        self.lines
            .iter()
            .find(|l| l.label.as_deref() == Some(label))
    }
}

/// A complete figure: a title over vertically stacked panels.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    /// Shared x-axis limits.
    pub x_range: (NaiveDate, NaiveDate),
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.panels.iter().flat_map(|p| p.markers.iter())
    }
}

/// Limits covering every finite value plus a 5% margin each side. Flat series
/// are widened by 10% of their value (or by 1 around zero).
pub fn fit_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        let adjust = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        return (lo - adjust, hi + adjust);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_pads_five_percent() {
        let (lo, hi) = fit_range([10.0, 20.0]);
        assert!((lo - 9.5).abs() < 1e-12);
        assert!((hi - 20.5).abs() < 1e-12);
    }

    #[test]
    fn flat_range_is_widened() {
        let (lo, hi) = fit_range([1.0, 1.0]);
        assert!((lo - 0.9).abs() < 1e-12 && (hi - 1.1).abs() < 1e-12);
        assert_eq!(fit_range([0.0]), (-1.0, 1.0));
    }

    #[test]
    fn empty_range_defaults() {
        assert_eq!(fit_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(fit_range([f64::NAN]), (0.0, 1.0));
    }
}
