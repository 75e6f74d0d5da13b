use ndarray::Array2;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// How values are mapped onto colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    /// Min..max of the data on a diverging map
    Sequential,
    /// -pi..pi on a cyclic map, for angles
    Cyclic,
}

pub struct FieldVisualiser {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    sequential: Box<dyn colorgrad::Gradient>,
    cyclic: Box<dyn colorgrad::Gradient>,
}

impl FieldVisualiser {
    pub fn new(output_dir: &Path, width: u32, height: u32) -> std::io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            width,
            height,
            sequential: Box::new(colorgrad::preset::rd_yl_bu()),
            cyclic: Box::new(colorgrad::preset::sinebow()),
        })
    }

    /// Writes `data` as a heatmap to `<output_dir>/<name>.png`. Row 0 is drawn
    /// at the top, as in an image.
    pub fn plot_field(
        &self,
        data: &Array2<f64>,
        name: &str,
        title: &str,
        palette: Palette,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let filename = self.output_dir.join(format!("{name}.png"));
        self.draw_heatmap(&filename, data, title, palette)?;
        log::info!("Saved {}", filename.display());
        Ok(filename)
    }

    fn draw_heatmap(
        &self,
        filename: &Path,
        data: &Array2<f64>,
        title: &str,
        palette: Palette,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (rows, cols) = data.dim();
        let (lo, hi) = match palette {
            Palette::Cyclic => (-PI, PI),
            Palette::Sequential => data
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                    (lo.min(x), hi.max(x))
                }),
        };

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(40)
            .build_cartesian_2d(0..cols, 0..rows)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("column")
            .y_desc("row (from bottom)")
            .draw()?;

        let cells = (0..rows).flat_map(|i| (0..cols).map(move |k| (i, k)));
        chart.draw_series(cells.map(|(i, k)| {
            let y = rows - 1 - i;
            let color = self.value_to_color(data[[i, k]], lo, hi, palette);
            Rectangle::new([(k, y), (k + 1, y + 1)], color.filled())
        }))?;

        root.present()?;
        Ok(())
    }

    fn value_to_color(&self, value: f64, min_val: f64, max_val: f64, palette: Palette) -> RGBColor {
        let normalized = if max_val > min_val {
            (value - min_val) / (max_val - min_val)
        } else {
            0.5
        };
        let normalized = normalized.clamp(0.0, 1.0);
        let gradient = match palette {
            Palette::Sequential => &self.sequential,
            Palette::Cyclic => &self.cyclic,
        };
        let color_rgba = gradient.at(normalized as f32).to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}
