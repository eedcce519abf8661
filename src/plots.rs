use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::full_palette;
use tracing::info;

use crate::fit::FitResult;
use crate::observations::ObservationTable;

const COLORS: [RGBColor; 5] = [
    full_palette::BLUE,
    full_palette::GREEN,
    full_palette::ORANGE,
    full_palette::PURPLE,
    full_palette::CYAN,
];

const CURVE_SAMPLES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax<T> {
    pub min: T,
    pub max: T,
}

pub fn find_max_min<T: std::cmp::PartialOrd + Copy>(
    mut data: impl Iterator<Item = T>,
) -> Option<MinMax<T>> {
    let init = data.next()?;
    let mut min_max = MinMax {
        min: init,
        max: init,
    };

    for x in data {
        min_max = MinMax {
            min: if x < min_max.min { x } else { min_max.min },
            max: if x > min_max.max { x } else { min_max.max },
        };
    }

    Some(min_max)
}

/// Axis range around the data with 5% margin on each side.
pub fn padded_range(data: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    match find_max_min(data.filter(|v| v.is_finite())) {
        Some(MinMax { min, max }) if max > min => {
            let pad = (max - min) * 0.05;
            (min - pad)..(max + pad)
        }
        Some(MinMax { min, .. }) => (min - 1.)..(min + 1.),
        None => 0f64..1f64,
    }
}

pub fn linspace(range: &std::ops::Range<f64>, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![range.start],
        _ => (0..n)
            .map(|i| range.start + (range.end - range.start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Scatter of the observations with every fitted curve drawn over it.
pub fn plot_fit_overlay<DB>(
    table: &ObservationTable,
    fits: &[(&str, &FitResult)],
    caption: &str,
    drawing_area: &DrawingArea<DB, Shift>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    <DB as DrawingBackend>::ErrorType: 'static,
{
    drawing_area.fill(&WHITE)?;

    let x_range = padded_range(table.x.iter().cloned());
    let grid = linspace(&x_range, CURVE_SAMPLES);

    let curves: Vec<Vec<(f64, f64)>> = fits
        .iter()
        .map(|(_, fit)| grid.iter().cloned().zip(fit.predict(&grid)).collect())
        .collect();

    let y_range = padded_range(
        table
            .y
            .iter()
            .cloned()
            .chain(curves.iter().flatten().map(|&(_, y)| y)),
    );

    let mut chart_builder = ChartBuilder::on(drawing_area);

    let mut chart_context = chart_builder
        .caption(caption, ("Arial", 20))
        .set_all_label_area_size(60)
        .margin(30)
        .build_cartesian_2d(x_range, y_range)?;

    chart_context
        .configure_mesh()
        .x_labels(10)
        .x_desc(table.x_name.as_str())
        .y_labels(10)
        .y_desc(table.y_name.as_str())
        .draw()?;

    chart_context
        .draw_series(
            table
                .points()
                .map(|point| Circle::new(point, 4, full_palette::RED.filled())),
        )?
        .label("observations")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, full_palette::RED.filled()));

    for (i, ((label, _), curve)) in fits.iter().zip(curves).enumerate() {
        let color = COLORS[i % COLORS.len()];

        chart_context
            .draw_series(LineSeries::new(curve, color.stroke_width(2)))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart_context
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .border_style(BLACK)
        .background_style(WHITE)
        .draw()?;

    Ok(())
}

/// Residual of every observation against the fit, around a zero line.
pub fn plot_residuals<DB>(
    table: &ObservationTable,
    fit: &FitResult,
    drawing_area: &DrawingArea<DB, Shift>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    <DB as DrawingBackend>::ErrorType: 'static,
{
    drawing_area.fill(&WHITE)?;

    let residuals = fit.residuals(table);

    let x_range = padded_range(table.x.iter().cloned());
    let y_range = padded_range(residuals.iter().cloned().chain(std::iter::once(0.)));

    let mut chart_builder = ChartBuilder::on(drawing_area);

    let mut chart_context = chart_builder
        .caption("Residuals", ("Arial", 20))
        .set_all_label_area_size(60)
        .margin(30)
        .build_cartesian_2d(x_range.clone(), y_range)?;

    chart_context
        .configure_mesh()
        .x_labels(10)
        .x_desc(table.x_name.as_str())
        .y_labels(10)
        .y_desc("residual")
        .y_label_formatter(&|y| format!("{:.1e}", y))
        .draw()?;

    chart_context.draw_series(LineSeries::new(
        vec![(x_range.start, 0.), (x_range.end, 0.)],
        BLACK.mix(0.5),
    ))?;

    chart_context.draw_series(
        table
            .x
            .iter()
            .cloned()
            .zip(residuals)
            .map(|point| Circle::new(point, 4, BLUE.filled())),
    )?;

    Ok(())
}

pub fn write_fit_svg(
    path: impl AsRef<Path>,
    table: &ObservationTable,
    fits: &[(&str, &FitResult)],
    caption: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let drawing_area = SVGBackend::new(path, (800, 600)).into_drawing_area();

    plot_fit_overlay(table, fits, caption, &drawing_area)?;

    drawing_area.present()?;

    info!(path = %path.display(), "fit plot written");

    Ok(())
}

pub fn write_residuals_svg(
    path: impl AsRef<Path>,
    table: &ObservationTable,
    fit: &FitResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let drawing_area = SVGBackend::new(path, (800, 400)).into_drawing_area();

    plot_residuals(table, fit, &drawing_area)?;

    drawing_area.present()?;

    info!(path = %path.display(), "residual plot written");

    Ok(())
}
