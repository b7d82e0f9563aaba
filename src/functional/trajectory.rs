//! Trajectory characterization over the composite series.
//!
//! The composite series has one point per date: the mean normalized value of
//! every sample taken that day, across scales. Pattern, trend and rate are all
//! read from it.

use chrono::NaiveDate;

use crate::models::{RateClass, TrajectoryPattern, TrendShape};

use super::types::{FunctionalScoreSample, Trajectory};

/// Steps smaller than this are flat when judging trend shape.
const FLAT_STEP: f64 = 5.0;

/// Mean normalized value per date, in date order. Input must be date-sorted.
pub fn composite_series(samples: &[FunctionalScoreSample]) -> Vec<(NaiveDate, f64)> {
    let mut series: Vec<(NaiveDate, f64, usize)> = Vec::new();
    for sample in samples {
        match series.last_mut() {
            Some((date, sum, n)) if *date == sample.timestamp => {
                *sum += sample.normalized_value;
                *n += 1;
            }
            _ => series.push((sample.timestamp, sample.normalized_value, 1)),
        }
    }
    series
        .into_iter()
        .map(|(date, sum, n)| (date, sum / n as f64))
        .collect()
}

/// Characterize a composite series. None below two points.
///
/// `stability_threshold` is both the net change under which the record is
/// STABLE and the step size under which a change is noise.
pub fn characterize(series: &[(NaiveDate, f64)], stability_threshold: f64, samples: usize) -> Option<Trajectory> {
    let (first_date, first) = *series.first()?;
    let (last_date, last) = *series.last()?;
    if series.len() < 2 {
        return None;
    }

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let steps: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let net = last - first;
    let pattern = pattern(net, &steps, stability_threshold);
    let trend = trend(&values, &steps, pattern, stability_threshold);

    let duration_days = (last_date - first_date).num_days();
    let points_per_week = net.abs() / duration_days.max(1) as f64 * 7.0;

    Some(Trajectory {
        pattern,
        trend,
        rate: rate(points_per_week),
        overall_change: net,
        duration_days,
        points_per_week,
        confidence: (0.4 + 0.15 * samples as f32).min(1.0),
    })
}

fn pattern(net: f64, steps: &[f64], threshold: f64) -> TrajectoryPattern {
    if net.abs() < threshold {
        return TrajectoryPattern::Stable;
    }
    let material: Vec<f64> = steps.iter().copied().filter(|s| s.abs() >= threshold).collect();
    let up = material.iter().any(|s| *s > 0.0);
    let down = material.iter().any(|s| *s < 0.0);
    match (up, down) {
        (true, true) => TrajectoryPattern::Fluctuating,
        (true, false) => TrajectoryPattern::Improving,
        (false, true) => TrajectoryPattern::Declining,
        (false, false) if net > 0.0 => TrajectoryPattern::Improving,
        (false, false) => TrajectoryPattern::Declining,
    }
}

fn trend(values: &[f64], steps: &[f64], pattern: TrajectoryPattern, threshold: f64) -> TrendShape {
    let first = values[0];
    let last = values[values.len() - 1];
    let interior = &values[1..values.len() - 1];

    let min = interior.iter().copied().fold(f64::INFINITY, f64::min);
    if first - min >= threshold && last - min >= threshold {
        return TrendShape::UShaped;
    }
    let max = interior.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - first >= threshold && max - last >= threshold {
        return TrendShape::InvertedU;
    }

    let last_step = steps.last().copied().unwrap_or(0.0);
    if pattern == TrajectoryPattern::Stable || (steps.len() > 1 && last_step.abs() < FLAT_STEP) {
        return TrendShape::Plateau;
    }

    let has_material = steps.iter().any(|s| s.abs() >= threshold);
    let has_flat = steps.iter().any(|s| s.abs() < FLAT_STEP);
    if has_material && has_flat {
        TrendShape::Stepwise
    } else {
        TrendShape::Linear
    }
}

/// Rapid >2, gradual 0.5–2, slow <0.5 points per week.
pub fn rate(points_per_week: f64) -> RateClass {
    if points_per_week > 2.0 {
        RateClass::Rapid
    } else if points_per_week >= 0.5 {
        RateClass::Gradual
    } else {
        RateClass::Slow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn series(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + chrono::Days::new(i as u64 * 3), *v))
            .collect()
    }

    #[test]
    fn improving_series() {
        let t = characterize(&series(&[60.0, 55.0, 70.0, 85.0]), 10.0, 4).unwrap();
        assert_eq!(t.pattern, TrajectoryPattern::Improving);
        assert_eq!(t.trend, TrendShape::Linear);
        assert_eq!(t.overall_change, 25.0);
        assert_eq!(t.duration_days, 9);
        assert_eq!(t.rate, RateClass::Rapid);
        assert!((t.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn small_net_change_is_stable_plateau() {
        let t = characterize(&series(&[50.0, 54.0, 52.0]), 10.0, 3).unwrap();
        assert_eq!(t.pattern, TrajectoryPattern::Stable);
        assert_eq!(t.trend, TrendShape::Plateau);
    }

    #[test]
    fn mixed_material_changes_fluctuate() {
        let t = characterize(&series(&[40.0, 70.0, 45.0, 80.0]), 10.0, 4).unwrap();
        assert_eq!(t.pattern, TrajectoryPattern::Fluctuating);
    }

    #[test]
    fn noise_is_ignored_for_direction() {
        // Net +20, every step under 10: direction comes from the net sign.
        let t = characterize(&series(&[40.0, 48.0, 45.0, 52.0, 60.0]), 10.0, 5).unwrap();
        assert_eq!(t.pattern, TrajectoryPattern::Improving);
    }

    #[test]
    fn trend_shapes() {
        assert_eq!(characterize(&series(&[70.0, 40.0, 75.0]), 10.0, 3).unwrap().trend, TrendShape::UShaped);
        assert_eq!(characterize(&series(&[40.0, 80.0, 60.0]), 10.0, 3).unwrap().trend, TrendShape::InvertedU);
        assert_eq!(characterize(&series(&[40.0, 60.0, 62.0]), 10.0, 3).unwrap().trend, TrendShape::Plateau);
        assert_eq!(characterize(&series(&[40.0, 42.0, 60.0, 75.0]), 10.0, 4).unwrap().trend, TrendShape::Stepwise);
        assert_eq!(characterize(&series(&[40.0, 60.0]), 10.0, 2).unwrap().trend, TrendShape::Linear);
    }

    #[test]
    fn rate_bands() {
        assert_eq!(rate(2.5), RateClass::Rapid);
        assert_eq!(rate(2.0), RateClass::Gradual);
        assert_eq!(rate(0.5), RateClass::Gradual);
        assert_eq!(rate(0.4), RateClass::Slow);
    }

    #[test]
    fn single_point_has_no_trajectory() {
        assert!(characterize(&series(&[50.0]), 10.0, 1).is_none());
        assert!(characterize(&[], 10.0, 0).is_none());
    }

    proptest! {
        #[test]
        fn confidence_and_duration_bounds(values in prop::collection::vec(0.0f64..=100.0, 2..12)) {
            let s = series(&values);
            let t = characterize(&s, 10.0, values.len()).unwrap();
            prop_assert!((0.0..=1.0).contains(&t.confidence));
            prop_assert!(t.duration_days >= 0);
            prop_assert!(t.points_per_week >= 0.0);
            if t.overall_change.abs() < 10.0 {
                prop_assert_eq!(t.pattern, TrajectoryPattern::Stable);
            }
        }
    }
}
