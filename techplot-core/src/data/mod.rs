//! Data loading, alignment and normalization

pub mod align;
pub mod load;
pub mod normalize;

pub use align::{align_backtest, align_signal, AlignError, AlignedTable, Aligner, Column, JoinPolicy};
pub use load::{parse_document, read_document, InputSource, LoadError};
pub use normalize::{normalize, NormalizeError};
