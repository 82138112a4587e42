//! Portfolio simulation and performance metrics

pub mod metrics;
pub mod simulator;

pub use metrics::PerformanceMetrics;
pub use simulator::{
    simulate, simulate_signals, EndOfSeriesPolicy, PortfolioConfig, SimulationError,
    SimulationResult,
};
