//! Chart composition and rendering

pub mod compose;
pub mod figure;
pub mod render;

pub use compose::{
    compose_backtest, compose_signal, trade_markers, BacktestLayout, BacktestMeta, SignalLayout,
    SignalMeta, DEFAULT_BAND_INDICATORS,
};
pub use figure::{Bar, Figure, Line, Marker, Panel, Tone};
pub use render::{font_available, render, ImageFormat, RenderError};
