//! Renderer — turns decoded frames into terminal cell grids.
//!
//! Each cell shows two vertical pixels with an upper half block: the
//! foreground colours the top pixel and the background the bottom one.
//!
//! The compositor honours display tiers: the active frame is painted, staged
//! frames are kept rasterized at the current size so they can be shown
//! without a visible delay, and hidden frames hold no raster at all.

use std::collections::{HashMap, HashSet};

use image::RgbaImage;
use image::imageops;

use crate::types::RenderPlan;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
const OVERLAY_BG: Rgb = Rgb { r: 40, g: 40, b: 40 };
const HALF_BLOCK: char = '\u{2580}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Rgb,
    pub bg: Rgb,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            fg: WHITE,
            bg: BLACK,
            bold: false,
        }
    }
}

pub type Grid = Vec<Vec<Cell>>;

/// Receives a fresh plan after every rotation or load completion. Active
/// frames go on top, staged frames beneath, hidden frames nowhere.
pub trait RenderSink {
    fn present(&mut self, plan: &RenderPlan) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

pub fn blank_grid(width: u16, height: u16) -> Grid {
    vec![vec![Cell::default(); width as usize]; height as usize]
}

/// Scale `image` to fit a `width` x `height` cell canvas, centred, keeping
/// its aspect ratio.
pub fn rasterize(image: &RgbaImage, width: u16, height: u16) -> Grid {
    let mut grid = blank_grid(width, height);
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 || width == 0 || height == 0 {
        return grid;
    }

    let px_w = width as f64;
    let px_h = height as f64 * 2.0;
    let scale = (px_w / iw as f64).min(px_h / ih as f64);
    let tw = ((iw as f64 * scale).round() as u32).clamp(1, width as u32);
    let th = ((ih as f64 * scale).round() as u32).clamp(1, height as u32 * 2);
    let scaled = if (tw, th) == (iw, ih) {
        image.clone()
    } else {
        imageops::thumbnail(image, tw, th)
    };

    let ox = (width as u32 - tw) / 2;
    let oy = (height as u32 * 2 - th) / 2;
    let pixel = |x: u32, y: u32| -> Rgb {
        if x < ox || y < oy || x - ox >= tw || y - oy >= th {
            return BLACK;
        }
        let p = scaled.get_pixel(x - ox, y - oy).0;
        let a = p[3] as u16;
        Rgb {
            r: (p[0] as u16 * a / 255) as u8,
            g: (p[1] as u16 * a / 255) as u8,
            b: (p[2] as u16 * a / 255) as u8,
        }
    };

    for (y, row) in grid.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            let (x, y) = (x as u32, y as u32);
            *cell = Cell {
                ch: HALF_BLOCK,
                fg: pixel(x, y * 2),
                bg: pixel(x, y * 2 + 1),
                bold: false,
            };
        }
    }
    grid
}

/// Draw the loading box with a percentage and a progress bar.
pub fn draw_progress(grid: &mut Grid, percent: u8) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    let box_w = width.min(30);
    let box_h = height.min(5);
    if box_w < 4 || box_h < 3 {
        return;
    }
    let left = (width - box_w) / 2;
    let top = (height - box_h) / 2;

    for row in &mut grid[top..top + box_h] {
        for cell in &mut row[left..left + box_w] {
            *cell = Cell {
                ch: ' ',
                fg: WHITE,
                bg: OVERLAY_BG,
                bold: false,
            };
        }
    }

    let text = format!("Loading: {percent} %");
    put_centered(&mut grid[top + box_h / 2 - 1], left, box_w, &text, true);

    let bar_w = box_w - 4;
    let filled = bar_w * percent.min(100) as usize / 100;
    let bar: String = (0..bar_w)
        .map(|i| if i < filled { '\u{2588}' } else { '\u{2591}' })
        .collect();
    put_centered(&mut grid[top + box_h / 2 + 1], left, box_w, &bar, false);
}

fn put_centered(row: &mut [Cell], left: usize, span: usize, text: &str, bold: bool) {
    let len = text.chars().count().min(span);
    let start = left + (span - len) / 2;
    for (cell, ch) in row[start..start + len].iter_mut().zip(text.chars()) {
        cell.ch = ch;
        cell.bold = bold;
    }
}

/// Compute a cell-level diff between two grids of the same size.
pub fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
    let mut changes = Vec::new();
    for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
        for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
            if prev_cell != next_cell {
                changes.push(CellChange {
                    x: x as u16,
                    y: y as u16,
                    cell: next_cell.clone(),
                });
            }
        }
    }
    changes
}

/// Rasters kept per frame, following the display tiers of each plan.
#[derive(Default)]
pub struct Compositor {
    size: (u16, u16),
    rasters: HashMap<usize, Grid>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn cached(&self) -> usize {
        self.rasters.len()
    }

    /// Produce the grid for `plan`. `frames` holds every decoded frame.
    pub fn compose(
        &mut self,
        plan: &RenderPlan,
        frames: &HashMap<usize, RgbaImage>,
        width: u16,
        height: u16,
    ) -> Grid {
        if self.size != (width, height) {
            self.rasters.clear();
            self.size = (width, height);
        }

        // Staged frames stay rasterized beneath the active one; hidden
        // frames give theirs up.
        let stack = plan.stacking_order();
        let mounted: HashSet<usize> = stack.iter().copied().collect();
        self.rasters.retain(|index, _| mounted.contains(index));
        for index in &stack {
            if let Some(image) = frames.get(index) {
                self.rasters
                    .entry(*index)
                    .or_insert_with(|| rasterize(image, width, height));
            }
        }

        // Only the top of the stack is visible.
        let mut grid = stack
            .last()
            .and_then(|top| self.rasters.get(top))
            .cloned()
            .unwrap_or_else(|| blank_grid(width, height));
        if plan.show_progress {
            draw_progress(&mut grid, plan.percent_loaded);
        }
        grid
    }
}
