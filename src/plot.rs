//! Interactive HTML plots of a calibration, rendered with plotly.

use std::path::Path;

use log::info;
use ndarray::ArrayView2;
use plotly::common::color::Rgba;
use plotly::common::{Marker, MarkerSymbol, Mode};
use plotly::layout::{Axis, GridPattern, LayoutGrid};
use plotly::{Histogram, Layout, Plot, Scatter};

use crate::error::{Error, Result};
use crate::model::{Compartment, Trajectory};

/// First three Tableau10 colors.
fn palette(index: usize) -> Rgba {
    match index % 3 {
        0 => Rgba::new(78, 121, 167, 0.9),
        1 => Rgba::new(242, 142, 43, 0.9),
        _ => Rgba::new(225, 87, 89, 0.9),
    }
}

fn write(plot: &Plot, path: &Path) -> Result<()> {
    std::fs::write(path, plot.to_html())?;
    info!("saved plot to {}", path.display());
    Ok(())
}

/// Overlays the observed series (markers) with a model trajectory (lines).
pub fn data_model_plot<P: AsRef<Path>>(model: &Trajectory, data: &Trajectory, path: P) -> Result<()> {
    let mut plot = Plot::new();
    for (i, compartment) in Compartment::ALL.into_iter().enumerate() {
        let name = compartment.name();
        plot.add_trace(
            Scatter::new(data.days.clone(), data.values(compartment).to_vec())
                .mode(Mode::Markers)
                .name(format!("{name} (data)"))
                .marker(Marker::new().color(palette(i)).size(5)),
        );
        plot.add_trace(
            Scatter::new(model.days.clone(), model.values(compartment).to_vec())
                .mode(Mode::Lines)
                .name(format!("{name} (model)"))
                .marker(Marker::new().color(palette(i))),
        );
    }

    let layout = Layout::new()
        .title("Data and model")
        .x_axis(Axis::new().title("day"))
        .y_axis(Axis::new().title("cases"))
        .show_legend(true)
        .width(1000)
        .height(600);
    plot.set_layout(layout);
    write(&plot, path.as_ref())
}

/// plotly names the first axis pair `x`/`y`, then `x2`/`y2`, ...
fn axis_id(prefix: &str, index: usize) -> String {
    if index == 1 {
        prefix.to_string()
    } else {
        format!("{prefix}{index}")
    }
}

/**
Triangle plot of a posterior sample: one histogram per parameter on the
diagonal, and a scatter of every pair of parameters below it.

`truths`, when given, is drawn as a star in every scatter panel.
*/
pub fn corner_plot<P: AsRef<Path>>(
    sample: ArrayView2<f64>,
    labels: &[String],
    truths: Option<&[f64]>,
    path: P,
) -> Result<()> {
    let ndim = sample.ncols();
    if labels.len() != ndim {
        return Err(Error::DimensionMismatch {
            what: "corner plot labels",
            expected: ndim,
            got: labels.len(),
        });
    }
    if let Some(truths) = truths {
        if truths.len() != ndim {
            return Err(Error::DimensionMismatch {
                what: "corner plot truths",
                expected: ndim,
                got: truths.len(),
            });
        }
    }

    let mut plot = Plot::new();
    for row in 0..ndim {
        for col in 0..=row {
            let panel = row * ndim + col + 1;
            let (x_axis, y_axis) = (axis_id("x", panel), axis_id("y", panel));
            if row == col {
                plot.add_trace(
                    Histogram::new(sample.column(col).to_vec())
                        .name(labels[col].as_str())
                        .x_axis(&x_axis)
                        .y_axis(&y_axis)
                        .marker(Marker::new().color(palette(0)))
                        .show_legend(false),
                );
                continue;
            }
            plot.add_trace(
                Scatter::new(sample.column(col).to_vec(), sample.column(row).to_vec())
                    .mode(Mode::Markers)
                    .name(format!("{} / {}", labels[col], labels[row]))
                    .x_axis(&x_axis)
                    .y_axis(&y_axis)
                    .marker(Marker::new().color(palette(0)).size(2).opacity(0.3))
                    .show_legend(false),
            );
            if let Some(truths) = truths {
                plot.add_trace(
                    Scatter::new(vec![truths[col]], vec![truths[row]])
                        .mode(Mode::Markers)
                        .name("truth")
                        .x_axis(&x_axis)
                        .y_axis(&y_axis)
                        .marker(
                            Marker::new()
                                .color(palette(2))
                                .size(12)
                                .symbol(MarkerSymbol::Star),
                        )
                        .show_legend(false),
                );
            }
        }
    }

    let layout = Layout::new()
        .title(labels.join(", ").as_str())
        .grid(
            LayoutGrid::new()
                .rows(ndim)
                .columns(ndim)
                .pattern(GridPattern::Independent),
        )
        .width(250 * ndim.max(2))
        .height(250 * ndim.max(2));
    plot.set_layout(layout);
    write(&plot, path.as_ref())
}
