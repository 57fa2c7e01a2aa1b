use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::{
    navigator::{TargetRegion, DEFAULT_TARGET_HALF_LENGTH},
    table::{io::FloatPrecision, Column},
    TpnResult,
};

/// Settings for the per-event [`FeatureExtractor`](crate::features::FeatureExtractor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Half-length of the target region along z (mm).
    #[serde(default = "ExtractorConfig::default_target_half_length")]
    pub target_half_length: f64,
    /// Compare charged-pion candidates against the leading *neutron* kinetic energy, reproducing
    /// the historical behaviour of the analysis. Off by default.
    #[serde(default)]
    pub legacy_pion_comparison: bool,
}

impl ExtractorConfig {
    fn default_target_half_length() -> f64 {
        DEFAULT_TARGET_HALF_LENGTH
    }

    /// The target region used to qualify the PN photon.
    pub fn target_region(&self) -> TargetRegion {
        TargetRegion::new(self.target_half_length)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            target_half_length: Self::default_target_half_length(),
            legacy_pion_comparison: false,
        }
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "OutputConfig::default_directory")]
    pub directory: String,
    #[serde(default = "OutputConfig::default_true")]
    pub write_parquet: bool,
    /// Rows per Parquet record batch.
    #[serde(default = "OutputConfig::default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub precision: FloatPrecision,
    #[serde(default = "OutputConfig::default_true")]
    pub write_histograms: bool,
}

impl OutputConfig {
    fn default_file_prefix() -> String {
        "photo_nuclear_analysis".to_string()
    }
    fn default_directory() -> String {
        ".".to_string()
    }
    fn default_true() -> bool {
        true
    }
    fn default_batch_size() -> usize {
        10_000
    }

    /// Build `<directory>/<file_prefix><suffix>`.
    pub fn path_for(&self, suffix: &str) -> String {
        Path::new(&self.directory)
            .join(format!("{}{}", self.file_prefix, suffix))
            .to_string_lossy()
            .into_owned()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: Self::default_file_prefix(),
            directory: Self::default_directory(),
            write_parquet: true,
            batch_size: Self::default_batch_size(),
            precision: FloatPrecision::default(),
            write_histograms: true,
        }
    }
}

/// Thresholds of the cut-flow report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutFlowConfig {
    /// Events pass when the downstream pad energy is strictly below this (MeV).
    #[serde(default = "CutFlowConfig::default_down_tp_max")]
    pub down_tp_max: f64,
    /// Events pass when the upstream pad energy is strictly below this (MeV).
    #[serde(default = "CutFlowConfig::default_up_tp_max")]
    pub up_tp_max: f64,
    /// Required number of full tracks.
    #[serde(default = "CutFlowConfig::default_track_count")]
    pub track_count: f64,
    /// Maximum number of axial (back-scatter) tracks.
    #[serde(default)]
    pub axial_max: f64,
    /// Maximum number of stubs in the upstream chain.
    #[serde(default)]
    pub stub_max: f64,
    /// Events pass when the HCal photo-electron sum is at most this.
    #[serde(default = "CutFlowConfig::default_hcal_pe_max")]
    pub hcal_pe_max: f64,
}

impl CutFlowConfig {
    fn default_down_tp_max() -> f64 {
        0.75
    }
    fn default_up_tp_max() -> f64 {
        0.5
    }
    fn default_track_count() -> f64 {
        1.0
    }
    fn default_hcal_pe_max() -> f64 {
        8.0
    }
}

impl Default for CutFlowConfig {
    fn default() -> Self {
        Self {
            down_tp_max: Self::default_down_tp_max(),
            up_tp_max: Self::default_up_tp_max(),
            track_count: Self::default_track_count(),
            axial_max: 0.0,
            stub_max: 0.0,
            hcal_pe_max: Self::default_hcal_pe_max(),
        }
    }
}

/// A threshold scan over one aligned column, logged by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub column: Column,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    #[serde(default)]
    pub invert: bool,
}

/// The complete analysis configuration, usually read from a TOML file.
///
/// Every field has a default, so an empty file (or no file) is a valid configuration:
///
/// ```toml
/// [extractor]
/// target_half_length = 0.55
///
/// [output]
/// file_prefix = "photo_nuclear_analysis"
/// precision = "f32"
///
/// [[scans]]
/// column = "down_tp_energy"
/// min = 0.0
/// max = 2.0
/// step = 0.05
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub cutflow: CutFlowConfig,
    #[serde(default)]
    pub scans: Vec<ScanConfig>,
}

impl AnalysisConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> TpnResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration file. Paths may contain `~` and environment variables.
    pub fn load(path: &str) -> TpnResult<Self> {
        let path = crate::data::io::expand_output_path(path)?;
        let text = fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Read a configuration file if it exists, otherwise fall back to defaults. A file that
    /// exists but fails to parse is still an error.
    pub fn load_or_default(path: &str) -> TpnResult<Self> {
        let expanded = crate::data::io::expand_output_path(path)?;
        if expanded.exists() {
            Self::load(path)
        } else {
            info!(path, "configuration file not found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TpnError;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.extractor.target_half_length, 0.550);
        assert!(!config.extractor.legacy_pion_comparison);
        assert_eq!(config.output.file_prefix, "photo_nuclear_analysis");
        assert_eq!(config.output.batch_size, 10_000);
        assert_eq!(config.output.precision, FloatPrecision::F64);
        assert!(config.output.write_parquet);
        assert_eq!(config.cutflow.down_tp_max, 0.75);
        assert_eq!(config.cutflow.up_tp_max, 0.5);
        assert_eq!(config.cutflow.hcal_pe_max, 8.0);
        assert!(config.scans.is_empty());
    }

    #[test]
    fn test_empty_text_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [extractor]
            legacy_pion_comparison = true

            [output]
            precision = "f32"
            directory = "/tmp/out"

            [[scans]]
            column = "down_tp_energy"
            min = 0.0
            max = 2.0
            step = 0.5

            [[scans]]
            column = "total_hcal_pe"
            min = 0.0
            max = 20.0
            step = 1.0
            invert = true
            "#,
        )
        .unwrap();
        assert!(config.extractor.legacy_pion_comparison);
        assert_eq!(config.extractor.target_half_length, 0.550);
        assert_eq!(config.output.precision, FloatPrecision::F32);
        assert_eq!(config.output.file_prefix, "photo_nuclear_analysis");
        assert_eq!(config.scans.len(), 2);
        assert_eq!(config.scans[0].column, Column::DownTpEnergy);
        assert!(!config.scans[0].invert);
        assert!(config.scans[1].invert);
        assert_eq!(
            config.output.path_for("_results.txt"),
            "/tmp/out/photo_nuclear_analysis_results.txt"
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = AnalysisConfig::from_toml_str("[extractor]\ntarget_half_length = \"wide\"");
        assert!(matches!(result, Err(TpnError::ConfigError(_))));
        let result = AnalysisConfig::from_toml_str("[[scans]]\ncolumn = \"nope\"\nmin = 0.0\nmax = 1.0\nstep = 0.1");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default() {
        let missing = std::env::temp_dir().join(format!("tpn_missing_{}.toml", std::process::id()));
        let config = AnalysisConfig::load_or_default(missing.to_str().unwrap()).unwrap();
        assert_eq!(config, AnalysisConfig::default());

        let present = std::env::temp_dir().join(format!("tpn_config_{}.toml", std::process::id()));
        fs::write(&present, "[cutflow]\nhcal_pe_max = 5.0\n").unwrap();
        let config = AnalysisConfig::load_or_default(present.to_str().unwrap()).unwrap();
        assert_eq!(config.cutflow.hcal_pe_max, 5.0);
        assert_eq!(config.cutflow.up_tp_max, 0.5);
        fs::remove_file(present).unwrap();
    }
}
