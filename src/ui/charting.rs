/// Compute X (month index) and Y (score) bounds for the progress chart.
/// The Y bound is rounded up to the next multiple of ten so the line
/// never touches the top edge.
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let highest = points.iter().map(|&(_, y)| y).fold(0.0, f64::max);

    let mut last_x = points.last().map(|p| p.0).unwrap_or(1.0);
    if last_x < 1.0 {
        last_x = 1.0;
    }

    let top = ((highest / 10.0).floor() + 1.0) * 10.0;
    (last_x, top)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

/// Text bar for percentage style metrics, `width` cells wide
pub fn meter(value: u64, max: u64, width: usize) -> String {
    if max == 0 || width == 0 {
        return String::new();
    }
    let filled = ((value.min(max) as f64 / max as f64) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        let (x, y) = compute_chart_params(&[]);
        assert_eq!(x, 1.0);
        assert_eq!(y, 10.0);
    }

    #[test]
    fn test_compute_chart_params_scores() {
        let (x, y) = compute_chart_params(&[(1.0, 85.0), (2.0, 79.0), (3.0, 90.0)]);
        assert_eq!(x, 3.0);
        assert_eq!(y, 100.0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }

    #[test]
    fn test_meter() {
        assert_eq!(meter(50, 100, 4), "██░░");
        assert_eq!(meter(150, 100, 2), "██");
        assert_eq!(meter(1, 0, 4), "");
    }
}
