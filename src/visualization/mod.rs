//! Visualization of comparison results.
//!
//! A [`ComparisonPlot`] carries everything a renderer needs: the
//! per-angle differences and the four dashed bound curves (upper and lower,
//! for the positive and the negative AOA range). [`BitmapPlotter`] renders it
//! to PNG with plotters.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::processors::comparison::{ComparisonResult, Verdict};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Nothing to plot")]
    EmptyResult,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
pub const DEFAULT_WIDTH: u32 = 640;

/// Default plot height in pixels.
pub const DEFAULT_HEIGHT: u32 = 480;

pub const X_LABEL: &str = "AOA (deg)";
pub const Y_LABEL: &str = "ΔP / q_c";

/// Series and curves for one channel's scatter-plus-band plot.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPlot {
    /// `"<channel label> - <verdict>"`
    pub title: String,
    pub verdict: Verdict,
    /// (AOA, difference)
    pub differences: Vec<(f64, f64)>,
    /// Upper and lower bound over AOA >= 0.
    pub positive_bounds: [Vec<(f64, f64)>; 2],
    /// Upper and lower bound over AOA <= 0.
    pub negative_bounds: [Vec<(f64, f64)>; 2],
}

impl ComparisonPlot {
    pub fn from_result(result: &ComparisonResult) -> Self {
        let verdict = result.verdict();
        let curve = |keep: fn(i32) -> bool, upper: bool| -> Vec<(f64, f64)> {
            result
                .points
                .iter()
                .filter(|p| keep(p.angle))
                .map(|p| (f64::from(p.angle), if upper { p.upper } else { p.lower }))
                .collect()
        };
        let positive = |a: i32| a >= 0;
        let negative = |a: i32| a <= 0;

        Self {
            title: format!("{} - {}", result.channel.title(), verdict),
            verdict,
            differences: result
                .points
                .iter()
                .map(|p| (f64::from(p.angle), p.difference))
                .collect(),
            positive_bounds: [curve(positive, true), curve(positive, false)],
            negative_bounds: [curve(negative, true), curve(negative, false)],
        }
    }

    /// Every plotted coordinate, differences and bounds alike.
    fn all_points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.differences
            .iter()
            .chain(self.positive_bounds.iter().flatten())
            .chain(self.negative_bounds.iter().flatten())
    }
}

/// Rendering collaborator for comparison plots.
pub trait PlotSurface {
    fn render(&self, output_path: &Path, plot: &ComparisonPlot) -> Result<()>;
}

/// PNG renderer built on the plotters bitmap backend.
#[derive(Debug, Clone, Copy)]
pub struct BitmapPlotter {
    pub width: u32,
    pub height: u32,
}

impl Default for BitmapPlotter {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl PlotSurface for BitmapPlotter {
    fn render(&self, output_path: &Path, plot: &ComparisonPlot) -> Result<()> {
        plot_comparison(output_path, plot, (self.width, self.height))
    }
}

/// Plot a channel comparison and save it as PNG.
///
/// Differences are drawn as blue dots, the bound curves as dashed red lines.
pub fn plot_comparison(output_path: &Path, plot: &ComparisonPlot, size: (u32, u32)) -> Result<()> {
    if plot.differences.is_empty() {
        return Err(VisualizationError::EmptyResult);
    }

    let (x_min, x_max, y_min, y_max) = compute_bounds(plot.all_points());
    let x_padding = (x_max - x_min) * 0.05;
    let y_padding = (y_max - y_min) * 0.05;

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (x_min - x_padding)..(x_max + x_padding),
            (y_min - y_padding)..(y_max + y_padding),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .draw_series(
            plot.differences
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    for curve in plot.positive_bounds.iter().chain(plot.negative_bounds.iter()) {
        if curve.len() < 2 {
            continue;
        }
        chart
            .draw_series(DashedLineSeries::new(
                curve.iter().copied(),
                6,
                4,
                RED.stroke_width(1),
            ))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
    }

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Compute the bounds (min/max) for x and y coordinates.
fn compute_bounds<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> (f64, f64, f64, f64) {
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;

    for &(x, y) in points {
        if x < x_min { x_min = x; }
        if x > x_max { x_max = x; }
        if y < y_min { y_min = y; }
        if y > y_max { y_max = y; }
    }

    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 0.001;
        y_max += 0.001;
    }

    (x_min, x_max, y_min, y_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::comparison::{ComparisonPoint, ToleranceBand};
    use crate::processors::reduction::Channel;

    fn result_at(angles: &[i32], difference: f64) -> ComparisonResult {
        let band = ToleranceBand::new(0.002);
        ComparisonResult {
            channel: Channel::StaticPressure1,
            band,
            points: angles
                .iter()
                .map(|&angle| ComparisonPoint {
                    angle,
                    difference,
                    upper: band.upper(angle),
                    lower: band.lower(angle),
                    verdict: if band.accepts(angle, difference) {
                        Verdict::Pass
                    } else {
                        Verdict::Fail
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_plot_title_carries_verdict() {
        let plot = ComparisonPlot::from_result(&result_at(&[-5, 0, 5], 0.0));
        assert_eq!(plot.title, "Static Pressure 1 - PASS");

        let plot = ComparisonPlot::from_result(&result_at(&[-5, 0, 5], 0.003));
        assert_eq!(plot.title, "Static Pressure 1 - FAIL");
    }

    #[test]
    fn test_bound_curves_share_origin() {
        let plot = ComparisonPlot::from_result(&result_at(&[-10, -5, 0, 5, 10], 0.0));

        let xs = |curve: &Vec<(f64, f64)>| curve.iter().map(|p| p.0).collect::<Vec<_>>();
        assert_eq!(xs(&plot.positive_bounds[0]), vec![0.0, 5.0, 10.0]);
        assert_eq!(xs(&plot.negative_bounds[1]), vec![-10.0, -5.0, 0.0]);

        // both ranges meet at the origin bound
        assert_eq!(plot.positive_bounds[0][0], plot.negative_bounds[0][2]);
        assert_eq!(plot.positive_bounds[1][0].1, -0.002);
        assert!((plot.negative_bounds[0][0].1 - 0.007).abs() < 1e-15);
    }

    #[test]
    fn test_compute_bounds_pads_flat_series() {
        let points = [(0.0, 0.0), (0.0, 0.0)];
        let (x_min, x_max, y_min, y_max) = compute_bounds(points.iter());
        assert_eq!((x_min, x_max), (-1.0, 1.0));
        assert!(y_min < 0.0 && y_max > 0.0);
    }

    #[test]
    fn test_plot_rejects_empty_result() {
        let plot = ComparisonPlot::from_result(&result_at(&[], 0.0));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            plot_comparison(
                &dir.path().join("empty.png"),
                &plot,
                (DEFAULT_WIDTH, DEFAULT_HEIGHT)
            ),
            Err(VisualizationError::EmptyResult)
        ));
    }
}
