//! SVG charts of training history and confusion matrices.

use std::fs;
use std::path::Path;

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde_json::json;

use crate::error::{Error, Result};
use crate::evaluation::ConfusionMatrix;
use crate::logging;
use crate::training::{Granularity, TrainingHistory};

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

const LIGHTEST: (u8, u8, u8) = (247, 251, 255);
const DARKEST: (u8, u8, u8) = (8, 48, 107);

/// Plots accuracy and loss against iteration index.
///
/// Validation curves are drawn only for [`Granularity::Epoch`], since batch
/// records carry no validation metrics.
pub fn plot_history<P: AsRef<Path>>(
    history: &TrainingHistory,
    granularity: Granularity,
    path: P,
) -> Result<()> {
    let series = history.series(granularity);
    if series.is_empty() {
        return Err(Error::plot(format!("no {granularity} records to plot")));
    }
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut curves = vec![
        ("acc", &series.accuracy, RED),
        ("loss", &series.loss, GREEN),
    ];
    if granularity == Granularity::Epoch {
        curves.push(("val_acc", &series.val_accuracy, BLUE));
        curves.push(("val_loss", &series.val_loss, BLACK));
    }

    draw_history(path, granularity, series.len(), &curves)
        .map_err(|err| Error::plot(format!("{}: {err}", path.display())))?;
    log_plot(path, &format!("history_{granularity}"));
    Ok(())
}

fn draw_history(
    path: &Path,
    granularity: Granularity,
    len: usize,
    curves: &[(&str, &Vec<Option<f32>>, RGBColor)],
) -> DrawResult {
    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = curves
        .iter()
        .flat_map(|(_, values, _)| values.iter().flatten().copied())
        .filter(|v| v.is_finite())
        .fold(1.0f32, f32::max);

    let mut chart = ChartBuilder::on(&root)
        .caption("model train vs validation", ("sans-serif", 20).into_font().color(&BLACK))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0i32..len as i32, 0f32..y_max * 1.05)?;
    chart
        .configure_mesh()
        .x_desc(granularity.to_string())
        .y_desc("acc-loss")
        .draw()?;

    for &(label, values, color) in curves {
        chart
            .draw_series(LineSeries::new(
                values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|v| (i as i32, v))),
                ShapeStyle::from(&color).stroke_width(2),
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Heatmap of a confusion matrix with one annotation per cell.
///
/// With `normalize` each row is divided by its sum and cells are annotated
/// with two decimals; otherwise raw counts are shown.
pub fn plot_confusion_matrix<P: AsRef<Path>>(
    matrix: &ConfusionMatrix,
    class_names: &[String],
    normalize: bool,
    title: &str,
    path: P,
) -> Result<()> {
    let classes = matrix.class_count();
    if classes == 0 {
        return Err(Error::plot("confusion matrix has no classes"));
    }
    if class_names.len() != classes {
        return Err(Error::plot(format!(
            "{} class names for a {classes}x{classes} matrix",
            class_names.len()
        )));
    }
    let path = path.as_ref();
    ensure_parent(path)?;

    draw_confusion(path, matrix, class_names, normalize, title)
        .map_err(|err| Error::plot(format!("{}: {err}", path.display())))?;
    log_plot(path, "confusion_matrix");
    Ok(())
}

fn draw_confusion(
    path: &Path,
    matrix: &ConfusionMatrix,
    class_names: &[String],
    normalize: bool,
    title: &str,
) -> DrawResult {
    let n = matrix.class_count() as i32;
    let values = matrix.values(normalize);
    let max = values.iter().copied().fold(0.0f64, f64::max);
    let threshold = max / 2.0;

    let root = SVGBackend::new(path, (700, 640)).into_drawing_area();
    root.fill(&WHITE)?;

    // Row 0 is drawn at the top.
    let name_at = |value: &SegmentValue<i32>, flip: bool| match value {
        SegmentValue::CenterOf(i) => {
            let index = if flip { n - 1 - i } else { *i };
            class_names
                .get(index as usize)
                .cloned()
                .unwrap_or_default()
        }
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20).into_font().color(&BLACK))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(110)
        .build_cartesian_2d((0i32..n).into_segmented(), (0i32..n).into_segmented())?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n as usize)
        .y_labels(n as usize)
        .x_label_formatter(&|v| name_at(v, false))
        .y_label_formatter(&|v| name_at(v, true))
        .x_desc("Predicted label")
        .y_desc("True label")
        .draw()?;

    for (row, cells) in values.rows().into_iter().enumerate() {
        let y = n - 1 - row as i32;
        for (col, &value) in cells.iter().enumerate() {
            let x = col as i32;
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                ],
                ramp(if max > 0.0 { value / max } else { 0.0 }).filled(),
            )))?;

            let text = if normalize {
                format!("{value:.2}")
            } else {
                format!("{}", value as usize)
            };
            let color = if value > threshold { WHITE } else { BLACK };
            let style = ("sans-serif", 16)
                .into_font()
                .color(&color)
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart.draw_series(std::iter::once(Text::new(
                text,
                (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                style,
            )))?;
        }
    }
    root.present()?;
    Ok(())
}

/// White-to-blue colour for an intensity in `[0, 1]`.
pub fn ramp(intensity: f64) -> RGBColor {
    let t = intensity.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    RGBColor(
        mix(LIGHTEST.0, DARKEST.0),
        mix(LIGHTEST.1, DARKEST.1),
        mix(LIGHTEST.2, DARKEST.2),
    )
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn log_plot(path: &Path, kind: &str) {
    logging::record(
        "plot_written",
        &json!({ "plot": kind, "path": path.display().to_string() }),
    );
}
