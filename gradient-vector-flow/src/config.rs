use anyhow::{anyhow, Context, Result};
use gradient_vector_flow::GvfParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::edge_map::Shape;

/// Synthetic edge map configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeMapConfig {
    pub shape: Shape,
    pub rows: usize,
    pub cols: usize,
    #[serde(default = "default_thickness")]
    pub thickness: usize, // Stroke width in pixels
}

fn default_thickness() -> usize {
    3
}

impl EdgeMapConfig {
    fn validate(&self) -> Result<()> {
        if self.rows < 3 || self.cols < 3 {
            return Err(anyhow!(
                "Edge map must be at least 3x3 (rows={}, cols={})",
                self.rows,
                self.cols
            ));
        }
        if self.thickness == 0 {
            return Err(anyhow!("thickness must be positive"));
        }
        if 2 * self.thickness >= self.rows.min(self.cols) {
            return Err(anyhow!(
                "thickness {} is too large for a {}x{} edge map",
                self.thickness,
                self.rows,
                self.cols
            ));
        }
        Ok(())
    }
}

/// Heatmap output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_image_size")]
    pub image_width: u32,
    #[serde(default = "default_image_size")]
    pub image_height: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            image_width: default_image_size(),
            image_height: default_image_size(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_image_size() -> u32 {
    800
}

impl VisualizationConfig {
    fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub edge_map: EdgeMapConfig,
    #[serde(default)]
    pub solver: GvfParams,
    #[serde(default)]
    pub visualization: VisualizationConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.edge_map.validate()?;
        self.solver
            .validate()
            .context("Invalid [solver] section")?;
        self.visualization.validate()?;

        if self.solver.max_iterations > 100_000 {
            log::warn!(
                "max_iterations = {} is very large, the run may be slow",
                self.solver.max_iterations
            );
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== GVF Configuration ===");
        println!(
            "Edge map: {:?} {}x{} (thickness {})",
            self.edge_map.shape, self.edge_map.rows, self.edge_map.cols, self.edge_map.thickness
        );
        println!(
            "Solver: mu={}, max_iterations={}, tolerance={}, parallel={}",
            self.solver.mu, self.solver.max_iterations, self.solver.tolerance, self.solver.parallel
        );
        println!(
            "Visualization: {}x{} px into '{}'",
            self.visualization.image_width,
            self.visualization.image_height,
            self.visualization.output_dir.display()
        );
        println!("=========================");
    }
}
