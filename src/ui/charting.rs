use flick::time_series::HitPoint;

/// Compute X (seconds) and Y (hits) bounds for the results chart
pub fn compute_chart_params(points: &[HitPoint], run_seconds: f64) -> (f64, f64) {
    let most_hits = points.iter().map(|p| p.hits).fold(0.0, f64::max);

    let last = points.last().map_or(0.0, |p| p.t);
    let overall_duration = last.max(run_seconds).max(1.0);

    (overall_duration, most_hits.max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
