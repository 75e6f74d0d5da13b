use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::EdgeMapConfig;

/// Synthetic binary edge maps: 1.0 on the shape, 0.0 elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    UShape, // Open-topped U, the classic GVF concavity test
    Square, // Square outline
    Disk,   // Filled disk
    Line,   // Horizontal bar through the middle
    Dot,    // Small square blob in the centre
}

impl EdgeMapConfig {
    pub fn build(&self) -> Array2<f64> {
        render(self.shape, self.rows, self.cols, self.thickness)
    }
}

pub fn render(shape: Shape, rows: usize, cols: usize, thickness: usize) -> Array2<f64> {
    // Shapes sit inside a frame with a 1/5 margin on every side
    let top = rows / 5;
    let bottom = rows - rows / 5;
    let left = cols / 5;
    let right = cols - cols / 5;
    let t = thickness;

    let in_band = |x: usize, lo: usize, hi: usize| x >= lo && x < hi;

    Array2::from_shape_fn((rows, cols), |(i, k)| {
        let inside = match shape {
            Shape::UShape => {
                in_band(i, top, bottom)
                    && (in_band(k, left, left + t)
                        || in_band(k, right.saturating_sub(t), right)
                        || (in_band(i, bottom.saturating_sub(t), bottom) && in_band(k, left, right)))
            }
            Shape::Square => {
                let rows_band = in_band(i, top, bottom);
                let cols_band = in_band(k, left, right);
                rows_band
                    && cols_band
                    && (i < top + t || i + t >= bottom || k < left + t || k + t >= right)
            }
            Shape::Disk => {
                let ci = (rows as f64 - 1.0) / 2.0;
                let ck = (cols as f64 - 1.0) / 2.0;
                let radius = rows.min(cols) as f64 / 4.0;
                let di = i as f64 - ci;
                let dk = k as f64 - ck;
                di * di + dk * dk <= radius * radius
            }
            Shape::Line => {
                let start = (rows / 2).saturating_sub(t / 2);
                in_band(i, start, start + t)
            }
            Shape::Dot => {
                let start_i = (rows / 2).saturating_sub(t / 2);
                let start_k = (cols / 2).saturating_sub(t / 2);
                in_band(i, start_i, start_i + t) && in_band(k, start_k, start_k + t)
            }
        };
        if inside {
            1.0
        } else {
            0.0
        }
    })
}
