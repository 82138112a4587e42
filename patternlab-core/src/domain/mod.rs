//! Domain types for PatternLab

pub mod bar;
pub mod equity;
pub mod extremum;
pub mod pattern;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{price_series, Bar, PriceSource};
pub use equity::{equity_values, EquityPoint};
pub use extremum::{Extrema, ExtremumKind, ExtremumPoint};
pub use pattern::{PatternEvent, PatternKind};
pub use position::{OpenPosition, Position};
pub use signal::{check_signals, SignalError, SignalSeries};
pub use trade::{ExitReason, Trade};
