//! Decision-boundary rasterization.
//!
//! The classifier is sampled once on an `R x R` grid over `[-1, 1]²`, each
//! grid cell is painted as a translucent block on the render target, and the
//! labelled points are drawn on top as opaque markers.

use crate::classifier::{BinaryClassifier, ClassifierError};
use image::{Rgba, RgbaImage};
use ndarray::{Array2, ArrayView1};
use planefit_helpers::{Float, Point};
use std::path::Path;
use thiserror::Error;

/// Samples per axis used when no resolution is configured.
pub const DEFAULT_RESOLUTION: u32 = 200;
/// Alpha of the overlay blocks, out of 255.
pub const DEFAULT_OVERLAY_ALPHA: u8 = 50;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("classifier returned {found} probabilities for {expected} grid cells")]
    PredictionCount { expected: usize, found: usize },
    #[error("grid resolution must be positive")]
    ZeroResolution,
}

/// The RGBA pixel buffer the boundary and markers are drawn into.
///
/// Drawing functions take it by `&mut`, so a render call owns the buffer
/// until it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    image: RgbaImage,
}

impl RenderTarget {
    /// A fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Raw RGBA bytes, row-major, unpremultiplied.
    pub fn as_rgba(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)
    }
}

/// Appearance of a point marker: a white ring around a class-coloured disc,
/// with a soft drop shadow.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    /// Radius of the ring's centre line.
    pub radius: f32,
    /// Ring width. The coloured disc has radius `radius - border`.
    pub border: f32,
    pub border_color: [u8; 3],
    pub shadow_offset: [f32; 2],
    /// Shadow opacity in `[0, 1]`.
    pub shadow_alpha: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 12.0,
            border: 3.0,
            border_color: [255, 255, 255],
            shadow_offset: [2.0, 2.0],
            shadow_alpha: 0.3,
        }
    }
}

/// Grid resolution, overlay colours and marker style.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryStyle {
    pub resolution: u32,
    /// Colour for cells with probability above 0.5.
    pub positive: [u8; 3],
    /// Colour for cells with probability of 0.5 or below.
    pub negative: [u8; 3],
    pub alpha: u8,
    pub marker: MarkerStyle,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            positive: [255, 0, 0],
            negative: [0, 0, 255],
            alpha: DEFAULT_OVERLAY_ALPHA,
            marker: MarkerStyle::default(),
        }
    }
}

impl BoundaryStyle {
    pub fn cell_color<F: Float>(&self, probability: F) -> Rgba<u8> {
        let [r, g, b] = if probability > F::lit(0.5) {
            self.positive
        } else {
            self.negative
        };
        Rgba([r, g, b, self.alpha])
    }
}

/// Half-open pixel rectangle covered by one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
}

/// Pixel rectangle of grid cell `(i, j)` on a `width` x `height` canvas.
///
/// The cell starts at `floor(i * width / resolution)` and extends by one
/// cell width, clipped to the canvas. When the cell width is fractional,
/// the pixel containing the fractional end is included, so neighbouring
/// cells may share a column but never leave a gap.
pub fn cell_rect(i: u32, j: u32, width: u32, height: u32, resolution: u32) -> CellRect {
    let (x_start, x_end) = cell_span(i, width, resolution);
    let (y_start, y_end) = cell_span(j, height, resolution);
    CellRect {
        x_start,
        x_end,
        y_start,
        y_end,
    }
}

fn cell_span(index: u32, extent: u32, resolution: u32) -> (u32, u32) {
    let scaled = extent as f64 / resolution as f64;
    let start = (index as f64 * scaled).floor();
    let end = (start + scaled).min(extent as f64);
    (start as u32, (end.ceil() as u32).min(extent))
}

/// The batch fed to the classifier: row `i * R + j` is
/// `[(i / R) * 2 - 1, (j / R) * 2 - 1]`.
///
/// The mapping ignores the canvas aspect ratio. On a non-square canvas
/// this does not match [`planefit_helpers::normalize`], which is used for
/// training.
pub fn grid_inputs<F: Float>(resolution: u32) -> Array2<F> {
    let r = resolution as usize;
    let two = F::lit(2.0);
    let denom = F::from_count(r.max(1));
    Array2::from_shape_fn((r * r, 2), |(row, col)| {
        let k = if col == 0 { row / r } else { row % r };
        F::from_count(k) / denom * two - F::one()
    })
}

/// Paints one block per grid cell, overwriting whatever was there.
///
/// # Errors
///
/// Returns `RenderError::PredictionCount` unless there is exactly one
/// probability per grid cell.
pub fn paint_overlay<F: Float>(
    target: &mut RenderTarget,
    probabilities: ArrayView1<F>,
    style: &BoundaryStyle,
) -> Result<(), RenderError> {
    let r = style.resolution;
    if r == 0 {
        return Err(RenderError::ZeroResolution);
    }
    let expected = r as usize * r as usize;
    if probabilities.len() != expected {
        return Err(RenderError::PredictionCount {
            expected,
            found: probabilities.len(),
        });
    }

    let (width, height) = (target.width(), target.height());
    for i in 0..r {
        for j in 0..r {
            let color = style.cell_color(probabilities[i as usize * r as usize + j as usize]);
            let cell = cell_rect(i, j, width, height, r);
            for y in cell.y_start..cell.y_end {
                for x in cell.x_start..cell.x_end {
                    target.image.put_pixel(x, y, color);
                }
            }
        }
    }
    Ok(())
}

/// Samples `classifier` over the grid, paints the overlay and redraws
/// `points` on top.
///
/// The classifier is called once with all `R²` grid inputs. Neither the
/// classifier nor the points are modified.
pub fn render_boundary<C>(
    classifier: &C,
    target: &mut RenderTarget,
    points: &[Point],
    style: &BoundaryStyle,
) -> Result<(), RenderError>
where
    C: BinaryClassifier + ?Sized,
{
    if style.resolution == 0 {
        return Err(RenderError::ZeroResolution);
    }
    let inputs = grid_inputs::<C::Scalar>(style.resolution);
    let probabilities = classifier.predict_batch(inputs.view())?;
    paint_overlay(target, probabilities.view(), style)?;
    draw_points(target, points, &style.marker);
    Ok(())
}

pub fn draw_points(target: &mut RenderTarget, points: &[Point], style: &MarkerStyle) {
    for point in points {
        draw_point(target, point, style);
    }
}

/// Draws one marker: shadow, white ring, then the class-coloured disc.
pub fn draw_point(target: &mut RenderTarget, point: &Point, style: &MarkerStyle) {
    let half = style.border / 2.0;
    let outer = style.radius + half;
    let [dx, dy] = style.shadow_offset;

    fill_annulus(
        target,
        (point.x + dx, point.y + dy),
        (0.0, outer),
        [0, 0, 0],
        style.shadow_alpha,
    );
    fill_annulus(
        target,
        (point.x, point.y),
        (style.radius - half, outer),
        style.border_color,
        1.0,
    );
    fill_annulus(
        target,
        (point.x, point.y),
        (0.0, style.radius - style.border),
        point.class.rgb(),
        1.0,
    );
}

/// Composites `rgb` over every pixel whose centre lies between the two radii.
fn fill_annulus(
    target: &mut RenderTarget,
    (cx, cy): (f32, f32),
    (inner, outer): (f32, f32),
    rgb: [u8; 3],
    alpha: f32,
) {
    if outer <= 0.0 || alpha <= 0.0 {
        return;
    }
    let (width, height) = (target.width(), target.height());
    let x0 = (cx - outer).floor().max(0.0) as u32;
    let y0 = (cy - outer).floor().max(0.0) as u32;
    let x1 = ((cx + outer).ceil().max(0.0) as u32).min(width);
    let y1 = ((cy + outer).ceil().max(0.0) as u32).min(height);
    let (inner2, outer2) = (inner.max(0.0).powi(2), outer * outer);

    for py in y0..y1 {
        for px in x0..x1 {
            let fx = px as f32 + 0.5 - cx;
            let fy = py as f32 + 0.5 - cy;
            let d2 = fx * fx + fy * fy;
            if d2 <= outer2 && d2 >= inner2 {
                blend(target.image.get_pixel_mut(px, py), rgb, alpha);
            }
        }
    }
}

/// Source-over compositing of an unpremultiplied colour.
fn blend(dst: &mut Rgba<u8>, rgb: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha >= 1.0 {
        *dst = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = alpha + dst_a * (1.0 - alpha);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let v = (rgb[c] as f32 * alpha + dst[c] as f32 * dst_a * (1.0 - alpha)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
