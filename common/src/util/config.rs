use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub visualization: VisualizationConfig,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    /// Benchmark directory or `.aux` file.
    #[serde(default)]
    pub benchmark: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            benchmark: None,
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub blend: BlendWeights,
    #[serde(default)]
    pub rent: RentParams,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            blend: BlendWeights::default(),
            rent: RentParams::default(),
            parallel: default_parallel(),
        }
    }
}

/// Mix between a method's own demand and the shared pin density.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BlendWeights {
    #[serde(default = "default_demand_weight")]
    pub demand_weight: f64,
    #[serde(default = "default_pin_weight")]
    pub pin_weight: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            demand_weight: default_demand_weight(),
            pin_weight: default_pin_weight(),
        }
    }
}

/// Rent's rule `demand = k * fanout^p`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RentParams {
    #[serde(default = "default_rent_k")]
    pub k: f64,
    #[serde(default = "default_rent_p")]
    pub p: f64,
}

impl Default for RentParams {
    fn default() -> Self {
        Self {
            k: default_rent_k(),
            p: default_rent_p(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_hotspot_threshold")]
    pub hotspot_threshold: f64,
    #[serde(default = "default_divergence_top_n")]
    pub divergence_top_n: usize,
    /// Write the summary and correlation tables as timestamped CSV files.
    #[serde(default = "default_write_csv")]
    pub write_csv: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hotspot_threshold: default_hotspot_threshold(),
            divergence_top_n: default_divergence_top_n(),
            write_csv: default_write_csv(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_visualization_enabled")]
    pub enabled: bool,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_visualization_enabled(),
            image_size: default_image_size(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_grid_size() -> f64 {
    10.0
}

fn default_parallel() -> bool {
    true
}

fn default_demand_weight() -> f64 {
    0.6
}

fn default_pin_weight() -> f64 {
    0.4
}

fn default_rent_k() -> f64 {
    0.5
}

fn default_rent_p() -> f64 {
    0.6
}

fn default_hotspot_threshold() -> f64 {
    0.8
}

fn default_divergence_top_n() -> usize {
    100
}

fn default_write_csv() -> bool {
    true
}

fn default_visualization_enabled() -> bool {
    true
}

fn default_image_size() -> u32 {
    1000
}
