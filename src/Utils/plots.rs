use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// 5% margin on each side; a zero-width range gets a unit one
fn padded(range: (f64, f64)) -> (f64, f64) {
    let (lo, hi) = range;
    let span = hi - lo;
    if span > 0.0 {
        (lo - 0.05 * span, hi + 0.05 * span)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

/// Line plot of several named (x, y) series into one png.
/// Points with a non-finite coordinate are dropped.
pub fn plot_series(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[(String, Vec<(f64, f64)>)],
    filename: &Path,
) -> Result<(), Box<dyn Error>> {
    let points: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|(_, data)| {
            data.iter()
                .copied()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .collect()
        })
        .collect();
    let (x_min, x_max) = finite_range(points.iter().flatten().map(|p| p.0))
        .map(padded)
        .ok_or("nothing to plot: no finite points")?;
    let (y_min, y_max) = finite_range(points.iter().flatten().map(|p| p.1))
        .map(padded)
        .ok_or("nothing to plot: no finite points")?;

    let root_area = BitMapBackend::new(filename, (800, 600)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    for (col, ((name, _), data)) in series.iter().zip(points).enumerate() {
        chart
            .draw_series(LineSeries::new(data, &Palette99::pick(col)))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(col)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root_area.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_range_skips_nan() {
        let values = vec![1.0, f64::NAN, -2.0, f64::INFINITY, 4.0];
        assert_eq!(finite_range(values.into_iter()), Some((-2.0, 4.0)));
        assert_eq!(finite_range(vec![f64::NAN].into_iter()), None);
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded((0.0, 10.0)), (-0.5, 10.5));
        assert_eq!(padded((3.0, 3.0)), (2.0, 4.0));
    }

    #[test]
    fn test_plot_without_finite_points_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let series = vec![("nan".to_string(), vec![(f64::NAN, 1.0)])];
        assert!(plot_series("t", "x", "y", &series, &path).is_err());
        assert!(!path.exists());
    }
}
