//! Draw a [`Figure`] with plotters and write it to an image file.
//!
//! The x-axis is plotted as day offsets from the figure's start date so every
//! panel shares one `f64` coordinate system; tick labels are formatted back
//! into dates.

use chrono::{Duration, NaiveDate};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::figure::{Figure, Panel, Tone};
use crate::trade::Direction;

/// Line color cycle (matplotlib's tab10 order).
const CYCLE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];
const BULLISH: RGBColor = RGBColor(0, 128, 0);
const BEARISH: RGBColor = RGBColor(220, 0, 0);

const FONT: &str = "sans-serif";
const BAR_WIDTH_DAYS: f64 = 0.8;

/// Output image encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(format!("unsupported image format '{other}' (expected png or svg)")),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("figure has no panels")]
    NoPanels,

    #[error("no usable system font for '{0}'")]
    NoFont(&'static str),

    #[error("drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Render `figure` to `path` at `size` pixels.
pub fn render(figure: &Figure, path: &Path, format: ImageFormat, size: (u32, u32)) -> Result<(), RenderError> {
    if figure.panels.is_empty() {
        return Err(RenderError::NoPanels);
    }
    if !font_available() {
        return Err(RenderError::NoFont(FONT));
    }
    debug!("rendering {} panel(s) to {}", figure.panels.len(), path.display());
    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(draw_err)
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(draw_err)
        }
    }
}

/// Whether chart text can be laid out, i.e. a system font for the chart
/// family resolves.
pub fn font_available() -> bool {
    (FONT, 12).into_font().box_size("2020-01-02").is_ok()
}

/// Shared x-axis: day offsets from the figure's start date.
struct TimeAxis {
    start: NaiveDate,
    span: f64,
}

impl TimeAxis {
    fn new(figure: &Figure) -> Self {
        let (start, end) = figure.x_range;
        let days = (end - start).num_days() as f64;
        Self { start, span: days }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64
    }

    fn range(&self) -> std::ops::Range<f64> {
        // Half a bar of room on each side keeps end bars inside the plot.
        -BAR_WIDTH_DAYS..self.span.max(1.0) + BAR_WIDTH_DAYS
    }

    fn label(&self, x: f64) -> String {
        (self.start + Duration::days(x.round() as i64))
            .format("%Y-%m-%d")
            .to_string()
    }
}

fn draw_figure<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<(), RenderError> {
    root.fill(&WHITE).map_err(draw_err)?;
    let body = root
        .titled(&figure.title, (FONT, 22).into_font())
        .map_err(draw_err)?;

    let axis = TimeAxis::new(figure);
    let areas = body.split_evenly((figure.panels.len(), 1));
    let last = figure.panels.len() - 1;
    for (i, (area, panel)) in areas.iter().zip(&figure.panels).enumerate() {
        draw_panel(area, panel, &axis, i == last)?;
    }
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    axis: &TimeAxis,
    show_dates: bool,
) -> Result<(), RenderError> {
    let (y_lo, y_hi) = panel.y_range;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(8)
        .x_label_area_size(if show_dates { 30 } else { 0 })
        .y_label_area_size(60);
    if let Some(title) = &panel.title {
        builder.caption(title, (FONT, 16).into_font());
    }
    let mut chart = builder
        .build_cartesian_2d(axis.range(), y_lo..y_hi)
        .map_err(draw_err)?;

    let x_fmt = |x: &f64| axis.label(*x);
    let y_fmt = |y: &f64| format!("{y:.2}");
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(if show_dates { 6 } else { 0 })
        .y_labels(5)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .draw()
        .map_err(draw_err)?;

    for line in &panel.lines {
        let color = tone_color(line.tone);
        let mut labelled = false;
        for segment in segments(line.points.iter().map(|(d, v)| (axis.x(*d), *v))) {
            let anno = chart
                .draw_series(LineSeries::new(segment, color.stroke_width(2)))
                .map_err(draw_err)?;
            if !labelled {
                if let Some(label) = &line.label {
                    anno.label(label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                }
                labelled = true;
            }
        }
    }

    chart
        .draw_series(panel.markers.iter().map(|m| {
            let x = axis.x(m.date);
            PathElement::new(vec![(x, m.bottom), (x, m.top)], marker_style(m.direction))
        }))
        .map_err(draw_err)?;

    let half = BAR_WIDTH_DAYS / 2.0;
    chart
        .draw_series(panel.bars.iter().map(|b| {
            let x = axis.x(b.date);
            Rectangle::new([(x - half, 0.0), (x + half, b.value)], tone_color(b.tone).filled())
        }))
        .map_err(draw_err)?;

    if panel.legend && panel.lines.iter().any(|l| l.label.is_some()) {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, 12).into_font())
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

/// Split a line at absent cells into drawable runs.
fn segments<I: IntoIterator<Item = (f64, Option<f64>)>>(points: I) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, y) in points {
        match y {
            Some(y) => current.push((x, y)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn tone_color(tone: Tone) -> RGBColor {
    match tone {
        Tone::Cycle(i) => CYCLE[i % CYCLE.len()],
        Tone::Bullish => BULLISH,
        Tone::Bearish => BEARISH,
    }
}

fn direction_color(direction: Direction) -> RGBColor {
    tone_color(direction.into())
}

/// Trade marker stroke, as wide as the line series.
fn marker_style(direction: Direction) -> ShapeStyle {
    direction_color(direction).stroke_width(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::figure::{Line, Marker};

    #[test]
    fn segments_split_on_gaps() {
        let segs = segments(vec![
            (0.0, Some(1.0)),
            (1.0, Some(2.0)),
            (2.0, None),
            (3.0, None),
            (4.0, Some(4.0)),
        ]);
        assert_eq!(segs, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(4.0, 4.0)]]);
    }

    #[test]
    fn colors_follow_direction() {
        assert_eq!(direction_color(Direction::Long), BULLISH);
        assert_eq!(direction_color(Direction::Short), BEARISH);
        assert_eq!(tone_color(Tone::Cycle(11)), CYCLE[1]);
    }

    #[test]
    fn format_parsing() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("svg".parse::<ImageFormat>().unwrap(), ImageFormat::Svg);
        assert!("jpeg".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn empty_figure_is_rejected() {
        let day = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let figure = Figure {
            title: "empty".into(),
            x_range: (day, day),
            panels: vec![],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        assert!(matches!(
            render(&figure, &path, ImageFormat::Png, (640, 480)),
            Err(RenderError::NoPanels)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn markers_are_colored_and_stroked_like_lines() {
        let long = marker_style(Direction::Long);
        assert_eq!(long.stroke_width, 2);
        assert_eq!(long.color, BULLISH.to_rgba());
        assert_eq!(marker_style(Direction::Short).color, BEARISH.to_rgba());
    }

    fn sample_figure() -> Figure {
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();
        let mut panel = Panel::new(Some("price".into()));
        panel.lines.push(Line {
            label: Some("JPM price".into()),
            tone: Tone::Cycle(0),
            points: vec![(d1, Some(50.0)), (d2, Some(51.0))],
        });
        panel.fit_y_range();
        panel.markers.push(Marker {
            date: d2,
            bottom: panel.y_range.0,
            top: 51.0,
            direction: Direction::Long,
        });
        panel.legend = true;
        Figure {
            title: "test".into(),
            x_range: (d1, d2),
            panels: vec![panel],
        }
    }

    #[test]
    fn renders_svg_file() {
        if !font_available() {
            eprintln!("skipping: no system sans-serif font");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.svg");
        render(&sample_figure(), &path, ImageFormat::Svg, (640, 480)).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#008000"), "long marker drawn green");
    }

    #[test]
    fn renders_png_file() {
        if !font_available() {
            eprintln!("skipping: no system sans-serif font");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.png");
        render(&sample_figure(), &path, ImageFormat::Png, (640, 480)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
