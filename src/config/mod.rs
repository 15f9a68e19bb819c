//! Configuration types for the repeatability pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for angle label parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngleConfig {
    /// Substring marking the drift baseline run
    #[serde(default = "default_drift_marker")]
    pub drift_marker: String,

    /// Text immediately before the AOA value (note the two spaces)
    #[serde(default = "default_aoa_prefix")]
    pub aoa_prefix: String,

    /// Text immediately after the AOA value
    #[serde(default = "default_aoa_suffix")]
    pub aoa_suffix: String,

    /// Optional regex with a `deg` capture group; replaces the marker parser when set
    #[serde(default)]
    pub pattern: Option<String>,
}

fn default_drift_marker() -> String {
    "Drift Data".to_string()
}

fn default_aoa_prefix() -> String {
    "ATP  at".to_string()
}

fn default_aoa_suffix() -> String {
    "deg AOA".to_string()
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self {
            drift_marker: default_drift_marker(),
            aoa_prefix: default_aoa_prefix(),
            aoa_suffix: default_aoa_suffix(),
            pattern: None,
        }
    }
}

/// Configuration for the angle-widening tolerance band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Band widening per degree of |AOA|
    #[serde(default = "default_slope_per_degree")]
    pub slope_per_degree: f64,

    /// Half-width at AOA 0 for the total pressure channel
    #[serde(default = "default_total_pressure_bound")]
    pub total_pressure_bound: f64,

    /// Half-width at AOA 0 for both static pressure channels
    #[serde(default = "default_static_pressure_bound")]
    pub static_pressure_bound: f64,
}

fn default_slope_per_degree() -> f64 {
    0.0005
}

fn default_total_pressure_bound() -> f64 {
    0.005
}

fn default_static_pressure_bound() -> f64 {
    0.002
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            slope_per_degree: default_slope_per_degree(),
            total_pressure_bound: default_total_pressure_bound(),
            static_pressure_bound: default_static_pressure_bound(),
        }
    }
}

/// Configuration for the persisted schema library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// JSON file mapping schema names to column mappings
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
}

fn default_library_path() -> PathBuf {
    PathBuf::from("knownHeaders.txt")
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            library_path: default_library_path(),
        }
    }
}

/// Configuration for report and plot artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving reports and plots
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Render a PNG next to each report
    #[serde(default = "default_render_plots")]
    pub render_plots: bool,

    #[serde(default = "default_plot_width")]
    pub plot_width: u32,

    #[serde(default = "default_plot_height")]
    pub plot_height: u32,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_render_plots() -> bool {
    true
}

fn default_plot_width() -> u32 {
    640
}

fn default_plot_height() -> u32 {
    480
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            render_plots: default_render_plots(),
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub angle: AngleConfig,

    #[serde(default)]
    pub tolerance: ToleranceConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
