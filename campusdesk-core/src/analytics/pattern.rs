use super::TimeSeriesPoint;

/// Trailing simple moving average. The first `window - 1` points average
/// over what is available so the output has one value per input point.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        out.push(sum / (i + 1).min(window) as f64);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremumKind {
    Peak,
    Trough,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub index: usize,
    pub value: f64,
    pub kind: ExtremumKind,
}

/// Flag interior points strictly above (peak) or below (trough) both
/// neighbours. Endpoints are never flagged.
pub fn find_extrema(values: &[f64]) -> Vec<Extremum> {
    values
        .windows(3)
        .enumerate()
        .filter_map(|(i, w)| {
            let kind = if w[1] > w[0] && w[1] > w[2] {
                ExtremumKind::Peak
            } else if w[1] < w[0] && w[1] < w[2] {
                ExtremumKind::Trough
            } else {
                return None;
            };
            Some(Extremum {
                index: i + 1,
                value: w[1],
                kind,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Smoothed series plus flagged extrema for the analytics line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternAnalysis {
    pub smoothed: Vec<f64>,
    pub extrema: Vec<Extremum>,
    pub direction: TrendDirection,
}

/// Changes under this many percentage points count as stable.
const STABLE_THRESHOLD: f64 = 1.0;

pub fn analyze(points: &[TimeSeriesPoint], window: usize) -> PatternAnalysis {
    let rates: Vec<f64> = points.iter().map(|p| p.rate).collect();
    let smoothed = moving_average(&rates, window);
    let extrema = find_extrema(&rates);

    let direction = match (smoothed.first(), smoothed.last()) {
        (Some(first), Some(last)) if last - first > STABLE_THRESHOLD => TrendDirection::Improving,
        (Some(first), Some(last)) if first - last > STABLE_THRESHOLD => TrendDirection::Declining,
        _ => TrendDirection::Stable,
    };

    PatternAnalysis {
        smoothed,
        extrema,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn moving_average_trailing_window() {
        let avg = moving_average(&[90.0, 80.0, 70.0, 100.0], 3);
        assert_eq!(avg[0], 90.0);
        assert_eq!(avg[1], 85.0);
        assert_eq!(avg[2], 80.0);
        assert!((avg[3] - 250.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn extrema_by_neighbour_comparison() {
        let extrema = find_extrema(&[90.0, 95.0, 85.0, 85.0, 80.0, 88.0]);
        let flagged: Vec<_> = extrema.iter().map(|e| (e.index, e.kind)).collect();
        assert_eq!(flagged, vec![(1, ExtremumKind::Peak), (4, ExtremumKind::Trough)]);
    }

    #[test]
    fn short_series_has_no_extrema() {
        assert!(find_extrema(&[1.0, 2.0]).is_empty());
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn direction_from_smoothed_ends() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let points: Vec<_> = [80.0, 82.0, 85.0, 88.0, 90.0]
            .iter()
            .enumerate()
            .map(|(i, rate)| TimeSeriesPoint {
                date: start + Duration::days(i as i64),
                rate: *rate,
                present: 0,
                absent: 0,
                late: 0,
            })
            .collect();
        assert_eq!(analyze(&points, 2).direction, TrendDirection::Improving);
        assert_eq!(analyze(&points[..1], 2).direction, TrendDirection::Stable);
    }
}
