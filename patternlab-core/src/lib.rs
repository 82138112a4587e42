//! PatternLab Core — double-top / double-bottom detection and pattern strategy backtesting.
//!
//! This crate contains the engine:
//! - Domain types (bars, extrema, pattern events, signals, positions, trades)
//! - Bar providers and ingestion (CSV, chart-data HTTP API, in-memory)
//! - Extremum detection and double-pattern matching
//! - Strategy trait with built-in pattern strategies and a factory
//! - Single-position portfolio simulator and performance metrics

pub mod data;
pub mod domain;
pub mod patterns;
pub mod portfolio;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine types are Send + Sync so hosts can run
    /// backtests on worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::ExtremumPoint>();
        require_sync::<domain::ExtremumPoint>();
        require_send::<domain::PatternEvent>();
        require_sync::<domain::PatternEvent>();
        require_send::<domain::SignalSeries>();
        require_sync::<domain::SignalSeries>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();

        // Engine types
        require_send::<patterns::ExtremumDetector>();
        require_sync::<patterns::ExtremumDetector>();
        require_send::<patterns::PatternMatchConfig>();
        require_sync::<patterns::PatternMatchConfig>();
        require_send::<portfolio::SimulationResult>();
        require_sync::<portfolio::SimulationResult>();
        require_send::<strategy::BacktestOutcome>();
        require_sync::<strategy::BacktestOutcome>();
        require_send::<strategy::DoubleTopBottomStrategy>();
        require_sync::<strategy::DoubleTopBottomStrategy>();
        require_send::<strategy::DoubleBottomOnlyStrategy>();
        require_sync::<strategy::DoubleBottomOnlyStrategy>();
        require_send::<Box<dyn strategy::Strategy>>();
        require_sync::<Box<dyn strategy::Strategy>>();

        // Providers
        require_send::<data::CsvBarProvider>();
        require_sync::<data::CsvBarProvider>();
        require_send::<data::HttpBarProvider>();
        require_sync::<data::HttpBarProvider>();
    }

    /// Architecture contract: signal generation sees bars and indicator state only.
    #[test]
    fn generate_signals_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            strategy: &dyn strategy::Strategy,
            bars: &[domain::Bar],
            state: &strategy::IndicatorState,
        ) -> domain::SignalSeries {
            strategy.generate_signals(bars, state)
        }
    }
}
