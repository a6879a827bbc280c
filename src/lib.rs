//! Channel recommendation and link analysis for Wi-Fi scan snapshots.
//!
//! [`recommender`] and [`analyzer`] are pure functions over a slice of
//! [`ObservedNetwork`]; everything that touches the host (running
//! `system_profiler`, reading files) lives in [`source`] and [`profiler`].

pub mod analyzer;
pub mod config;
pub mod error;
pub mod network;
pub mod profiler;
pub mod recommender;
pub mod snapshot;
pub mod source;

pub use analyzer::{NetworkAnalysis, NetworkAnalyzer};
pub use error::{WifiOptError, WifiOptResult};
pub use network::{AssociatedInterface, Band, ObservedNetwork, Security};
pub use recommender::{ChannelRecommendation, ChannelRecommender};
pub use snapshot::Snapshot;
pub use source::NetworkSource;
