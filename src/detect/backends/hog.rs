use anyhow::{bail, Result};
use image::RgbImage;
use std::f32::consts::PI;

use crate::detect::backend::{ScanParams, WindowClassifier, WindowHit};
use crate::detect::model::{DetectorModel, HogLayout};

/// Per-element clip applied between the two L2 passes of block normalisation.
const L2HYS_CLIP: f32 = 0.2;

/// Gradient-histogram features scored by a linear model.
///
/// Per level the classifier builds one grid of normalised blocks over the
/// padded image and scores every window by summing block dot products, so
/// overlapping windows share the gradient work. Blocks are Gaussian-weighted
/// and votes are interpolated between orientation bins and neighbouring
/// cells, so weights trained on the standard 3780-element people descriptor
/// score the same feature space.
pub struct HogSvmClassifier {
    model: DetectorModel,
}

impl HogSvmClassifier {
    pub fn new(model: DetectorModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &DetectorModel {
        &self.model
    }

    /// Descriptor of an image exactly one window in size.
    pub fn descriptor(&self, window: &RgbImage) -> Result<Vec<f32>> {
        let layout = self.model.layout();
        if window.dimensions() != layout.window {
            bail!(
                "descriptor needs a {}x{} image, got {}x{}",
                layout.window.0,
                layout.window.1,
                window.width(),
                window.height()
            );
        }
        let grid = BlockGrid::compute(window, layout, (0, 0));
        let (wbx, wby) = layout.blocks_per_window();
        let mut out = Vec::with_capacity(layout.descriptor_len());
        for bx in 0..wbx as usize {
            for by in 0..wby as usize {
                out.extend_from_slice(grid.block(bx, by));
            }
        }
        Ok(out)
    }

    fn window_score(&self, grid: &BlockGrid, col0: usize, row0: usize) -> f64 {
        let (wbx, wby) = self.model.layout().blocks_per_window();
        let (wbx, wby) = (wbx as usize, wby as usize);
        let weights = self.model.weights();
        let mut sum = 0.0f64;
        for bx in 0..wbx {
            for by in 0..wby {
                let w = &weights[(bx * wby + by) * grid.block_len..][..grid.block_len];
                let dot: f32 = grid
                    .block(col0 + bx, row0 + by)
                    .iter()
                    .zip(w)
                    .map(|(a, b)| a * b)
                    .sum();
                sum += dot as f64;
            }
        }
        sum + self.model.bias() as f64
    }
}

impl WindowClassifier for HogSvmClassifier {
    fn name(&self) -> &'static str {
        "hog-svm"
    }

    fn window_size(&self) -> (u32, u32) {
        self.model.layout().window
    }

    fn scan_level(&self, level: &RgbImage, scan: &ScanParams) -> Result<Vec<WindowHit>> {
        let layout = self.model.layout();
        let (stride_x, stride_y) = scan.win_stride;
        if stride_x == 0 || stride_y == 0 {
            bail!("window stride must be non-zero");
        }
        if stride_x % layout.block_stride.0 != 0 || stride_y % layout.block_stride.1 != 0 {
            bail!(
                "window stride {:?} must be a multiple of the block stride {:?}",
                scan.win_stride,
                layout.block_stride
            );
        }
        if level.width() == 0 || level.height() == 0 {
            return Ok(Vec::new());
        }

        let padded_w = (level.width() + 2 * scan.padding.0) as usize;
        let padded_h = (level.height() + 2 * scan.padding.1) as usize;
        let (win_w, win_h) = (layout.window.0 as usize, layout.window.1 as usize);
        if padded_w < win_w || padded_h < win_h {
            return Ok(Vec::new());
        }

        let grid = BlockGrid::compute(level, layout, scan.padding);
        let (stride_x, stride_y) = (stride_x as usize, stride_y as usize);
        let step_x = stride_x / layout.block_stride.0 as usize;
        let step_y = stride_y / layout.block_stride.1 as usize;
        let windows_x = (padded_w - win_w) / stride_x + 1;
        let windows_y = (padded_h - win_h) / stride_y + 1;

        let mut hits = Vec::new();
        for wy in 0..windows_y {
            for wx in 0..windows_x {
                let score = self.window_score(&grid, wx * step_x, wy * step_y);
                if score >= scan.hit_threshold {
                    hits.push(WindowHit {
                        x: (wx * stride_x) as i32 - scan.padding.0 as i32,
                        y: (wy * stride_y) as i32 - scan.padding.1 as i32,
                        score,
                    });
                }
            }
        }
        log::trace!(
            "{}: {}x{} level, {} of {} windows hit",
            self.name(),
            level.width(),
            level.height(),
            hits.len(),
            windows_x * windows_y
        );
        Ok(hits)
    }
}

/// Normalised blocks covering a padded level, stored column-major.
struct BlockGrid {
    rows: usize,
    block_len: usize,
    values: Vec<f32>,
}

impl BlockGrid {
    fn compute(level: &RgbImage, layout: &HogLayout, padding: (u32, u32)) -> Self {
        let field = GradientField::compute(level, layout, padding);
        let taps = block_taps(layout);
        let (block_w, block_h) = (layout.block.0 as usize, layout.block.1 as usize);
        let (stride_x, stride_y) = (layout.block_stride.0 as usize, layout.block_stride.1 as usize);
        let cols = if field.width >= block_w { (field.width - block_w) / stride_x + 1 } else { 0 };
        let rows = if field.height >= block_h { (field.height - block_h) / stride_y + 1 } else { 0 };
        let block_len = layout.block_len();

        let mut values = vec![0.0f32; cols * rows * block_len];
        for col in 0..cols {
            for row in 0..rows {
                let out = &mut values[(col * rows + row) * block_len..][..block_len];
                field.vote_block(&taps, layout, col * stride_x, row * stride_y, out);
                normalize_l2hys(out);
            }
        }

        Self {
            rows,
            block_len,
            values,
        }
    }

    fn block(&self, col: usize, row: usize) -> &[f32] {
        &self.values[(col * self.rows + row) * self.block_len..][..self.block_len]
    }
}

/// How one pixel position inside a block feeds the block histogram.
#[derive(Clone, Copy, Debug)]
struct BlockTap {
    /// Gaussian window weight, centred on the block.
    gauss: f32,
    /// Offset of a cell histogram within the block and its bilinear share.
    /// Cells outside the block carry zero weight.
    cells: [(usize, f32); 4],
}

/// Per-pixel taps of a block, row-major.
///
/// The window sigma is a quarter of the mean block side. A pixel's vote is
/// split bilinearly between the up to four cells whose centres surround it.
fn block_taps(layout: &HogLayout) -> Vec<BlockTap> {
    let (block_w, block_h) = (layout.block.0 as usize, layout.block.1 as usize);
    let (cell_w, cell_h) = (layout.cell.0 as f32, layout.cell.1 as f32);
    let (cells_x, cells_y) = layout.cells_per_block();
    let (cells_x, cells_y) = (cells_x as i32, cells_y as i32);
    let bins = layout.bins as usize;

    let sigma = (block_w + block_h) as f32 / 8.0;
    let falloff = 1.0 / (2.0 * sigma * sigma);

    let mut taps = Vec::with_capacity(block_w * block_h);
    for y in 0..block_h {
        for x in 0..block_w {
            let dy = y as f32 - block_h as f32 * 0.5;
            let dx = x as f32 - block_w as f32 * 0.5;
            let gauss = (-(dx * dx + dy * dy) * falloff).exp();

            let cx = (x as f32 + 0.5) / cell_w - 0.5;
            let cy = (y as f32 + 0.5) / cell_h - 0.5;
            let (cx0, cy0) = (cx.floor() as i32, cy.floor() as i32);
            let (fx, fy) = (cx - cx0 as f32, cy - cy0 as f32);

            let mut cells = [(0usize, 0.0f32); 4];
            let corners = [
                (cx0, cy0, (1.0 - fx) * (1.0 - fy)),
                (cx0 + 1, cy0, fx * (1.0 - fy)),
                (cx0, cy0 + 1, (1.0 - fx) * fy),
                (cx0 + 1, cy0 + 1, fx * fy),
            ];
            for (slot, (icx, icy, share)) in cells.iter_mut().zip(corners) {
                if (0..cells_x).contains(&icx) && (0..cells_y).contains(&icy) {
                    *slot = ((icx * cells_y + icy) as usize * bins, share);
                }
            }
            taps.push(BlockTap { gauss, cells });
        }
    }
    taps
}

/// Gradient of every pixel of a padded level, pre-split between its two
/// nearest orientation bins.
struct GradientField {
    width: usize,
    height: usize,
    bins: Vec<[u16; 2]>,
    votes: Vec<[f32; 2]>,
}

impl GradientField {
    /// Pixels take the gradient of whichever colour channel responds most.
    /// Borders are mirrored without repeating the edge pixel.
    fn compute(level: &RgbImage, layout: &HogLayout, padding: (u32, u32)) -> Self {
        let (w, h) = level.dimensions();
        let width = (w + 2 * padding.0) as usize;
        let height = (h + 2 * padding.1) as usize;
        let nbins = layout.bins as usize;
        let mut field = Self {
            width,
            height,
            bins: vec![[0, 0]; width * height],
            votes: vec![[0.0, 0.0]; width * height],
        };
        if w == 0 || h == 0 {
            return field;
        }

        // One extra ring so every padded pixel has a central difference.
        let xmap: Vec<usize> = (0..width + 2)
            .map(|i| reflect101(i as i64 - 1 - padding.0 as i64, w as i64))
            .collect();
        let ymap: Vec<usize> = (0..height + 2)
            .map(|i| reflect101(i as i64 - 1 - padding.1 as i64, h as i64))
            .collect();
        let lut: [f32; 256] = std::array::from_fn(|v| {
            if layout.gamma_correction {
                (v as f32).sqrt()
            } else {
                v as f32
            }
        });

        let raw = level.as_raw();
        let row_len = w as usize * 3;
        let sample = |x: usize, y: usize| -> [f32; 3] {
            let o = ymap[y] * row_len + xmap[x] * 3;
            [lut[raw[o] as usize], lut[raw[o + 1] as usize], lut[raw[o + 2] as usize]]
        };

        let bin_width = PI / nbins as f32;
        for y in 0..height {
            for x in 0..width {
                let (left, right) = (sample(x, y + 1), sample(x + 2, y + 1));
                let (up, down) = (sample(x + 1, y), sample(x + 1, y + 2));

                let (mut gx, mut gy, mut mag2) = (0.0f32, 0.0f32, 0.0f32);
                for c in 0..3 {
                    let dx = right[c] - left[c];
                    let dy = down[c] - up[c];
                    let m = dx * dx + dy * dy;
                    if m > mag2 {
                        gx = dx;
                        gy = dy;
                        mag2 = m;
                    }
                }
                if mag2 == 0.0 {
                    continue;
                }

                let mut angle = gy.atan2(gx);
                if angle < 0.0 {
                    angle += PI;
                }
                if angle >= PI {
                    angle -= PI;
                }
                let pos = angle / bin_width - 0.5;
                let lo = pos.floor();
                let frac = pos - lo;
                let lo_bin = (lo as i32).rem_euclid(nbins as i32) as usize;

                let mag = mag2.sqrt();
                let i = y * width + x;
                field.bins[i] = [lo_bin as u16, ((lo_bin + 1) % nbins) as u16];
                field.votes[i] = [mag * (1.0 - frac), mag * frac];
            }
        }
        field
    }

    /// Raw (unnormalised) histogram of the block whose top-left is `(x0, y0)`.
    fn vote_block(&self, taps: &[BlockTap], layout: &HogLayout, x0: usize, y0: usize, out: &mut [f32]) {
        out.fill(0.0);
        let block_w = layout.block.0 as usize;
        for (k, tap) in taps.iter().enumerate() {
            let i = (y0 + k / block_w) * self.width + x0 + k % block_w;
            let [v0, v1] = self.votes[i];
            if v0 == 0.0 && v1 == 0.0 {
                continue;
            }
            let [b0, b1] = self.bins[i];
            let (v0, v1) = (v0 * tap.gauss, v1 * tap.gauss);
            for &(offset, share) in &tap.cells {
                if share == 0.0 {
                    continue;
                }
                out[offset + b0 as usize] += v0 * share;
                out[offset + b1 as usize] += v1 * share;
            }
        }
    }
}

/// L2 normalise, clip, renormalise.
fn normalize_l2hys(block: &mut [f32]) {
    let sum: f32 = block.iter().map(|v| v * v).sum();
    let scale = 1.0 / (sum.sqrt() + 0.1 * block.len() as f32);
    let mut clipped_sum = 0.0f32;
    for v in block.iter_mut() {
        *v = (*v * scale).min(L2HYS_CLIP);
        clipped_sum += *v * *v;
    }
    let scale = 1.0 / (clipped_sum.sqrt() + 1e-3);
    for v in block.iter_mut() {
        *v *= scale;
    }
}

/// Mirror an out-of-range coordinate without repeating the edge pixel.
fn reflect101(mut i: i64, len: i64) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    i = i.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}
