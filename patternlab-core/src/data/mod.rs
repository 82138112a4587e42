//! Bar providers and ingestion

pub mod csv_provider;
pub mod http;
pub mod ingest;
pub mod memory;
pub mod provider;

pub use csv_provider::{parse_timestamp, read_bars_csv, CsvBarProvider};
pub use http::HttpBarProvider;
pub use ingest::{ingest, validate_bars, DataQualityError};
pub use memory::InMemoryBarProvider;
pub use provider::{BarProvider, BarQuery, DataError, DataSource, FetchResult, RawBar, Timeframe};
