//! # tpn-core
//!
//! This is an internal crate used by `tpn`.
#![warn(clippy::perf, clippy::style)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// Typed configuration for the extractor, the cut-flow report and the output stage.
pub mod config;
/// Methods for reading and inspecting [`EventSource`](crate::data::EventSource)-based events.
pub mod data;
/// Masks, pass fractions, threshold scans and the cut-flow report.
pub mod efficiency;
/// The per-event feature extractor.
pub mod features;
/// Decay-graph traversal used to locate the recoil electron and the PN photon.
pub mod navigator;
/// The standard battery of histograms handed to the plotting collaborator.
pub mod plots;
/// The column accumulator and its frozen snapshot.
pub mod table;
/// Utility functions, enums, and vectors
pub mod utils;
/// Useful traits for all crate structs
pub mod traits {
    pub use crate::data::EventSource;
}

pub use crate::config::{AnalysisConfig, CutFlowConfig, ExtractorConfig, OutputConfig, ScanConfig};
pub use crate::data::{
    EcalHit, EventData, EventSource, FindableTrack, HcalHit, Particle, ParticleId, TriggerPadHit,
    VetoResult,
};
pub use crate::efficiency::{
    threshold_scan, CutFlow, EfficiencySummary, Mask, PassFraction, ThresholdScan, VetoMasks,
};
pub use crate::features::FeatureExtractor;
pub use crate::navigator::{DecayGraph, TargetRegion};
pub use crate::plots::PlotBattery;
pub use crate::table::{Column, FeatureRow, FeatureTable, FrozenTable};
pub use crate::utils::enums::{Species, VetoChannel};
pub use crate::utils::vectors::Vec3;

/// Value emitted into a column when a feature has no applicable data for an event.
pub const SENTINEL: f64 = -9999.0;

pub type TpnResult<T> = Result<T, TpnError>;

/// The error type used by all `tpn` internal methods
#[derive(Error, Debug)]
pub enum TpnError {
    /// An alias for [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    /// An alias for [`parquet::errors::ParquetError`].
    #[error("Parquet Error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    /// An alias for [`arrow::error::ArrowError`].
    #[error("Arrow Error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    /// An alias for [`shellexpand::LookupError`].
    #[error("Failed to expand path: {0}")]
    LookupError(#[from] shellexpand::LookupError<std::env::VarError>),
    /// An alias for [`serde_json::Error`], raised while decoding event records.
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// An alias for [`toml::de::Error`], raised while reading a configuration file.
    #[error("Config Error: {0}")]
    ConfigError(#[from] toml::de::Error),
    /// The event contains no electron without parents. Every input event is expected to carry
    /// exactly one recoil electron, so this halts the run.
    #[error("No recoil electron found in event {event}")]
    MissingRecoil {
        /// Index of the offending event in processing order
        event: usize,
    },
    /// A parent or daughter index points outside the event's particle arena.
    #[error("Particle {particle} links to particle {link}, but the event only holds {len} particles")]
    DanglingParticleLink {
        /// Index of the particle holding the link
        particle: usize,
        /// The out-of-range index
        link: usize,
        /// Number of particles in the arena
        len: usize,
    },
    /// A veto collection did not contain exactly one record for the event.
    #[error("Expected exactly one {channel} veto record in event {event}, found {found}")]
    VetoRecordCount {
        /// Name of the veto channel
        channel: String,
        /// Index of the offending event in processing order
        event: usize,
        /// Number of records found
        found: usize,
    },
    /// A ratio was requested over an empty input.
    #[error("Cannot compute {context} over an empty input")]
    EmptyDenominator {
        /// What was being computed
        context: String,
    },
    /// A threshold scan was requested with a step that would never reach the upper bound.
    #[error("Threshold scan step must be positive and finite, got {step}")]
    InvalidStep {
        /// The rejected step
        step: f64,
    },
    /// A threshold scan was requested over bounds which are not both finite.
    #[error("Threshold scan bounds must be finite, got ({min}, {max})")]
    InvalidScanRange {
        /// The requested first cut
        min: f64,
        /// The requested last cut
        max: f64,
    },
    /// Histogram binning was requested with zero bins or an empty range.
    #[error("Invalid binning: {bins} bins over ({lower}, {upper})")]
    InvalidBinning {
        /// Number of bins
        bins: usize,
        /// Lower edge
        lower: f64,
        /// Upper edge
        upper: f64,
    },
    /// A persisted table is missing one of the fixed columns.
    #[error("Missing column \"{name}\"")]
    MissingColumn {
        /// Name of the missing column
        name: String,
    },
    /// A persisted column has a non-floating-point type.
    #[error("Column \"{name}\" has unsupported type {datatype}")]
    InvalidColumnType {
        /// Name of the column
        name: String,
        /// The Arrow data type found
        datatype: String,
    },
    /// Two sequences which must have equal length did not.
    #[error("{context}: expected length {expected}, found {actual}")]
    LengthMismatch {
        /// Where the mismatch was detected
        context: String,
        /// The expected length
        expected: usize,
        /// The length found
        actual: usize,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}
