//! `tpn` is a library and command-line tool for the target photo-nuclear (PN) analysis of
//! simulated fixed-target events. Each event is reduced to one row of physics features: the PN
//! photon and its leading products, trigger pad energies, track multiplicities, calorimeter sums
//! and veto decisions. The resulting table drives a battery of diagnostic histograms and a set of
//! veto efficiency summaries.
//!
//! # Table of Contents
//! - [Key Features](#key-features)
//! - [Quick Start](#quick-start)
//! - [Data Format](#data-format)
//! - [Command Line](#command-line)
//!
//! # Key Features
//! * A typed [`EventSource`](crate::traits::EventSource) interface, so any event store can be
//!   analysed by implementing one accessor per collection.
//! * A single-pass [`FeatureExtractor`] which appends complete rows to a [`FeatureTable`], with
//!   optional parallel processing via [`rayon`](https://github.com/rayon-rs/rayon).
//! * Post-processing over a [`FrozenTable`]: [`Mask`]s, [`threshold_scan`]s, an
//!   [`EfficiencySummary`], a [`CutFlow`] report and a [`PlotBattery`] of binned histograms.
//! * Parquet persistence of the feature table via [`arrow`](https://docs.rs/arrow) and
//!   [`parquet`](https://docs.rs/parquet).
//!
//! # Quick Start
//! ```rust
//! use tpn::{data::test_event, EfficiencySummary, FeatureExtractor, FeatureTable};
//!
//! let extractor = FeatureExtractor::default();
//! let mut table = FeatureTable::new();
//! extractor.process(&test_event(), &mut table).unwrap();
//! let table = table.finalize();
//! let summary = EfficiencySummary::from_table(&table).unwrap();
//! print!("{summary}");
//! ```
//!
//! # Data Format
//! Events are read from JSON-lines files, one [`EventData`] per line. Particles reference their
//! parents and daughters by index into the same event's particle list:
//! ```json
//! {"particles": [{"pdg_id": 11, "energy": 4000.0, "mass": 0.511,
//!                 "momentum": {"x": 0.0, "y": 0.0, "z": 4000.0},
//!                 "vertex": {"x": 0.0, "y": 0.0, "z": 0.0}, "daughters": [1]}, ...],
//!  "trigger_pad_hits": [{"edep": 0.4, "position": {"x": 0.0, "y": 0.0, "z": -5.0}}],
//!  "findable_tracks": [{"particle": 0, "is_4s": true}],
//!  "ecal_hits": [{"energy": 1.5}], "hcal_hits": [{"energy": 3.0, "pe": 10.0}],
//!  "ecal_veto": [{"passes": true}], "hcal_veto": [{"passes": false}]}
//! ```
//! The feature table is written to Parquet with one column per aligned feature (see [`Column`]);
//! the two hit-energy pools are written to separate single-column files.
//!
//! # Command Line
//! The `tpn-analysis` binary runs the whole chain:
//! ```shell
//! tpn-analysis run events.jsonl --config analysis.toml --output results/
//! tpn-analysis summarize results/photo_nuclear_analysis.parquet
//! ```
#![warn(clippy::perf, clippy::style, missing_docs)]

/// Methods for reading and inspecting [`EventData`]-based events.
pub mod data {
    pub use tpn_core::data::io::{open_events, read_events, write_events, EventLines};
    pub use tpn_core::data::*;
}
/// The per-event feature extractor and decay-graph navigation.
pub mod features {
    pub use tpn_core::features::*;
    pub use tpn_core::navigator::*;
}
/// The feature accumulator, its frozen snapshot and Parquet persistence.
pub mod table {
    pub use tpn_core::table::io::{
        read_hit_pool_parquet, read_parquet, write_hit_pools_parquet, write_parquet,
        FloatPrecision, WriteOptions,
    };
    pub use tpn_core::table::*;
}
/// Masks, pass fractions, threshold scans and the cut-flow report.
pub mod efficiency {
    pub use tpn_core::efficiency::*;
}
/// The standard histogram battery.
pub mod plots {
    pub use tpn_core::plots::*;
}
/// Typed configuration.
pub mod config {
    pub use tpn_core::config::*;
}
/// Utility functions, enums, and vectors
pub mod utils {
    pub use tpn_core::utils::*;
}
/// Useful traits for all crate structs
pub mod traits {
    pub use tpn_core::traits::*;
}

pub use tpn_core::config::{
    AnalysisConfig, CutFlowConfig, ExtractorConfig, OutputConfig, ScanConfig,
};
pub use tpn_core::data::{
    EcalHit, EventData, FindableTrack, HcalHit, Particle, ParticleId, TriggerPadHit, VetoResult,
};
pub use tpn_core::efficiency::{
    threshold_scan, CutFlow, EfficiencySummary, Mask, PassFraction, ThresholdScan, VetoMasks,
};
pub use tpn_core::features::FeatureExtractor;
pub use tpn_core::navigator::{DecayGraph, TargetRegion};
pub use tpn_core::plots::PlotBattery;
pub use tpn_core::table::{Column, FeatureRow, FeatureTable, FrozenTable};
pub use tpn_core::utils::enums::{Species, VetoChannel};
pub use tpn_core::utils::vectors::Vec3;
pub use tpn_core::SENTINEL;
pub use tpn_core::{TpnError, TpnResult};
