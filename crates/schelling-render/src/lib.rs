//! Offscreen PNG rendering for Schelling grids and threshold sweeps.

use image::{ImageBuffer, Rgba};
use schelling_core::{GridState, GroupId, SweepResult};
use std::io::Cursor;
use thiserror::Error;
use tracing::info;

type Canvas = ImageBuffer<Rgba<u8>, Vec<u8>>;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const GRID_LINE: Rgba<u8> = Rgba([220, 220, 220, 255]);
const CURVE_POINT: Rgba<u8> = Rgba([214, 39, 40, 255]);

/// Marker colors for groups 1..=7: blue, red, green, cyan, magenta, yellow, black.
pub const GROUP_PALETTE: [[u8; 4]; 7] = [
    [31, 119, 180, 255],
    [214, 39, 40, 255],
    [44, 160, 44, 255],
    [23, 190, 207, 255],
    [200, 55, 200, 255],
    [230, 200, 30, 255],
    [0, 0, 0, 255],
];

/// Errors produced while rasterising or encoding images.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render settings: {0}")]
    InvalidSettings(&'static str),
    #[error("failed to encode PNG")]
    Encode(#[from] image::ImageError),
}

/// Color used for `group`; groups past the palette wrap around.
#[must_use]
pub fn group_color(group: GroupId) -> [u8; 4] {
    GROUP_PALETTE[group.index() % GROUP_PALETTE.len()]
}

/// Layout of a rendered grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRenderOptions {
    /// Edge length of one cell in pixels.
    pub cell_px: u32,
    /// Marker radius as a fraction of `cell_px`.
    pub marker_scale: f32,
    /// Draw faint lines between cells.
    pub grid_lines: bool,
}

impl Default for GridRenderOptions {
    fn default() -> Self {
        Self {
            cell_px: 12,
            marker_scale: 0.4,
            grid_lines: false,
        }
    }
}

/// Render one disc per agent; row 0 is drawn at the bottom of the image.
pub fn render_grid_png(
    grid: &GridState,
    options: &GridRenderOptions,
) -> Result<Vec<u8>, RenderError> {
    if options.cell_px == 0 {
        return Err(RenderError::InvalidSettings("cell_px must be non-zero"));
    }
    if !(options.marker_scale > 0.0 && options.marker_scale <= 0.5) {
        return Err(RenderError::InvalidSettings(
            "marker_scale must lie in (0, 0.5]",
        ));
    }
    let width = grid
        .width()
        .checked_mul(options.cell_px)
        .ok_or(RenderError::InvalidSettings("image width overflows"))?;
    let height = grid
        .height()
        .checked_mul(options.cell_px)
        .ok_or(RenderError::InvalidSettings("image height overflows"))?;

    let mut image = Canvas::from_pixel(width, height, WHITE);
    let cell = options.cell_px as f32;

    if options.grid_lines && options.cell_px > 2 {
        for x in (0..width).step_by(options.cell_px as usize) {
            for py in 0..height {
                image.put_pixel(x, py, GRID_LINE);
            }
        }
        for y in (0..height).step_by(options.cell_px as usize) {
            for px in 0..width {
                image.put_pixel(px, y, GRID_LINE);
            }
        }
    }

    let radius = cell * options.marker_scale;
    for (at, group) in grid.agents() {
        let center_x = (at.x as f32 + 0.5) * cell;
        let center_y = height as f32 - (at.y as f32 + 0.5) * cell;
        fill_disc(&mut image, center_x, center_y, radius, Rgba(group_color(group)));
    }

    info!(
        width,
        height,
        agents = grid.agent_count(),
        "rendered grid snapshot"
    );
    encode_png(&image)
}

/// Scatter of threshold (x in [0, 1]) against mean similarity (y in [0, 1.1]).
pub fn render_sweep_png(
    sweep: &SweepResult,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RenderError> {
    const MARGIN: u32 = 32;
    const Y_MAX: f64 = 1.1;
    if width <= 2 * MARGIN || height <= 2 * MARGIN {
        return Err(RenderError::InvalidSettings(
            "curve image must exceed twice the margin in each dimension",
        ));
    }
    let mut image = Canvas::from_pixel(width, height, WHITE);
    let plot_w = (width - 2 * MARGIN) as f64;
    let plot_h = (height - 2 * MARGIN) as f64;
    let origin_x = MARGIN;
    let origin_y = height - MARGIN;

    for px in origin_x..=(width - MARGIN) {
        image.put_pixel(px, origin_y, BLACK);
    }
    for py in MARGIN..=origin_y {
        image.put_pixel(origin_x, py, BLACK);
    }
    // Ticks every 0.1 on x, every 0.1 on y.
    for step in 0..=10 {
        let tick_x = origin_x + (plot_w * f64::from(step) / 10.0).round() as u32;
        for py in origin_y..(origin_y + 4).min(height) {
            image.put_pixel(tick_x, py, BLACK);
        }
        let tick_y = origin_y - (plot_h * (f64::from(step) / 10.0) / Y_MAX).round() as u32;
        for px in origin_x.saturating_sub(4)..origin_x {
            image.put_pixel(px, tick_y, BLACK);
        }
    }

    for point in &sweep.points {
        let x = origin_x as f64 + plot_w * point.threshold.clamp(0.0, 1.0);
        let y = origin_y as f64 - plot_h * (point.mean_similarity.clamp(0.0, Y_MAX) / Y_MAX);
        fill_disc(&mut image, x as f32, y as f32, 4.0, CURVE_POINT);
    }

    info!(width, height, points = sweep.len(), "rendered similarity curve");
    encode_png(&image)
}

fn fill_disc(image: &mut Canvas, center_x: f32, center_y: f32, radius: f32, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let x_lo = (center_x - radius).floor().max(0.0) as u32;
    let y_lo = (center_y - radius).floor().max(0.0) as u32;
    let x_hi = ((center_x + radius).ceil().max(0.0) as u32).min(width);
    let y_hi = ((center_y + radius).ceil().max(0.0) as u32).min(height);
    let radius_sq = radius * radius;
    for py in y_lo..y_hi {
        for px in x_lo..x_hi {
            let dx = px as f32 + 0.5 - center_x;
            let dy = py as f32 + 0.5 - center_y;
            if dx * dx + dy * dy <= radius_sq {
                image.put_pixel(px, py, color);
            }
        }
    }
}

fn encode_png(image: &Canvas) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
