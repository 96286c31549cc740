//! Portfolio aggregation

pub mod balance_reader;
pub mod merge;
pub mod portfolio_tracker;
pub mod positions;

pub use balance_reader::ChainBalanceReader;
pub use merge::{build_snapshot, SnapshotInputs, DEFAULT_DUST_THRESHOLD};
pub use portfolio_tracker::{LoadStatus, PortfolioTracker, TrackerHandle, TrackerSettings, TrackerState};
pub use positions::{mock_positions, MockPositionProvider};
