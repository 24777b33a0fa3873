//! Pre-trained linear detector models.
//!
//! A model is a HOG layout plus one weight per descriptor element and a bias.
//! Models are loaded once at startup and never mutated.
//!
//! File format (JSON):
//!
//! ```json
//! {
//!   "layout": { "window": [64, 128], "block": [16, 16], "block_stride": [8, 8],
//!               "cell": [8, 8], "bins": 9, "gamma_correction": true },
//!   "weights": [ ... ],
//!   "bias": -1.2
//! }
//! ```
//!
//! Descriptor order: blocks column by column (x outer, y inner), cells inside a
//! block in the same order, `bins` orientation bins per cell. When `bias` is
//! omitted and `weights` holds one extra element, that last element is the bias.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of the gradient-histogram descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HogLayout {
    pub window: (u32, u32),
    pub block: (u32, u32),
    pub block_stride: (u32, u32),
    pub cell: (u32, u32),
    pub bins: u32,
    #[serde(default)]
    pub gamma_correction: bool,
}

impl HogLayout {
    /// 64x128 generic person layout.
    pub fn default_people() -> Self {
        Self {
            window: (64, 128),
            block: (16, 16),
            block_stride: (8, 8),
            cell: (8, 8),
            bins: 9,
            gamma_correction: true,
        }
    }

    /// 48x96 Daimler pedestrian layout.
    pub fn daimler_people() -> Self {
        Self {
            window: (48, 96),
            block: (16, 16),
            block_stride: (8, 8),
            cell: (8, 8),
            bins: 9,
            gamma_correction: false,
        }
    }

    pub fn cells_per_block(&self) -> (u32, u32) {
        (self.block.0 / self.cell.0, self.block.1 / self.cell.1)
    }

    pub fn block_len(&self) -> usize {
        let (cx, cy) = self.cells_per_block();
        (cx * cy * self.bins) as usize
    }

    pub fn blocks_per_window(&self) -> (u32, u32) {
        (
            (self.window.0 - self.block.0) / self.block_stride.0 + 1,
            (self.window.1 - self.block.1) / self.block_stride.1 + 1,
        )
    }

    pub fn descriptor_len(&self) -> usize {
        let (bx, by) = self.blocks_per_window();
        (bx * by) as usize * self.block_len()
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("window", self.window),
            ("block", self.block),
            ("block_stride", self.block_stride),
            ("cell", self.cell),
        ];
        for (name, (w, h)) in dims {
            if w == 0 || h == 0 {
                bail!("HOG layout {} must be non-zero, got {}x{}", name, w, h);
            }
        }
        if self.bins == 0 {
            bail!("HOG layout needs at least one orientation bin");
        }
        if self.block.0 % self.cell.0 != 0 || self.block.1 % self.cell.1 != 0 {
            bail!("HOG block size must be a multiple of the cell size");
        }
        if self.block_stride.0 % self.cell.0 != 0 || self.block_stride.1 % self.cell.1 != 0 {
            bail!("HOG block stride must be a multiple of the cell size");
        }
        if self.window.0 < self.block.0 || self.window.1 < self.block.1 {
            bail!("HOG window must hold at least one block");
        }
        if (self.window.0 - self.block.0) % self.block_stride.0 != 0
            || (self.window.1 - self.block.1) % self.block_stride.1 != 0
        {
            bail!("HOG window must tile evenly with the block stride");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    layout: HogLayout,
    weights: Vec<f32>,
    bias: Option<f32>,
}

/// Linear classifier over a HOG descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorModel {
    layout: HogLayout,
    weights: Vec<f32>,
    bias: f32,
}

impl DetectorModel {
    pub fn new(layout: HogLayout, weights: Vec<f32>, bias: f32) -> Result<Self> {
        layout.validate()?;
        if weights.len() != layout.descriptor_len() {
            bail!(
                "model has {} weights, layout needs {}",
                weights.len(),
                layout.descriptor_len()
            );
        }
        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            bail!("model weights must be finite");
        }
        Ok(Self {
            layout,
            weights,
            bias,
        })
    }

    /// Load a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detector model {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid detector model {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(raw)?;
        let mut weights = file.weights;
        let bias = match file.bias {
            Some(bias) => bias,
            None if weights.len() == file.layout.descriptor_len() + 1 => weights
                .pop()
                .ok_or_else(|| anyhow!("model weights are empty"))?,
            None => 0.0,
        };
        Self::new(file.layout, weights, bias)
    }

    /// Uniform positive weights with a bias proportional to the block count.
    ///
    /// Scores a window by how much normalised gradient energy it contains. It is
    /// a placeholder for deployments without trained weights, not a person model:
    /// any strongly textured region covering roughly a third of the window fires.
    pub fn gradient_energy(layout: HogLayout) -> Result<Self> {
        layout.validate()?;
        let (bx, by) = layout.blocks_per_window();
        let bias = -0.8 * (bx * by) as f32;
        Self::new(layout, vec![1.0; layout.descriptor_len()], bias)
    }

    /// Load `path` when configured, otherwise the gradient-energy placeholder.
    pub fn load_or_placeholder(path: Option<&Path>, layout: HogLayout) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                log::warn!(
                    "no trained weights configured for the {}x{} window; using the gradient-energy placeholder",
                    layout.window.0,
                    layout.window.1
                );
                Self::gradient_energy(layout)
            }
        }
    }

    pub fn layout(&self) -> &HogLayout {
        &self.layout
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }
}
