use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Region of the complex plane mapped onto the image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub min_re: f64,
    pub max_re: f64,
    pub min_im: f64,
    pub max_im: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            min_re: -2.0,
            max_re: 1.0,
            min_im: -1.2,
            max_im: 1.2,
        }
    }
}

impl Viewport {
    /// Reads a viewport from a JSON file (`{"minRe": .., "maxRe": .., ..}`).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let viewport: Viewport = serde_json::from_str(&text)?;
        viewport.validate()?;
        Ok(viewport)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.min_re, self.max_re, self.min_im, self.max_im]
            .iter()
            .all(|v| v.is_finite());
        anyhow::ensure!(finite, "viewport bounds must be finite");
        anyhow::ensure!(self.min_re < self.max_re, "minRe must be below maxRe");
        anyhow::ensure!(self.min_im < self.max_im, "minIm must be below maxIm");
        Ok(())
    }
}

/// The full image being computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MandelbrotParams {
    pub width: usize,
    pub height: usize,
    pub max_iter: u32,
    pub viewport: Viewport,
}

impl Default for MandelbrotParams {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            max_iter: 200,
            viewport: Viewport::default(),
        }
    }
}

/// Task payload: the whole image description plus the rows to compute.
///
/// Carrying the full parameters (not a pre-scaled sub-viewport) keeps the
/// worker's pixel coordinates bit-identical to a local computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SliceTask {
    pub params: MandelbrotParams,
    pub start_row: usize,
    pub end_row: usize,
}

/// Result payload: escape counts for `start_row..end_row`, row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SliceOutput {
    pub start_row: usize,
    pub end_row: usize,
    pub width: usize,
    pub escape: Vec<u32>,
}
