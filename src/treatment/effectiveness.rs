//! Response classification and effectiveness scoring.

use crate::models::ResponseClass;

use super::types::{Effectiveness, EffectivenessBreakdown};

const MAX_POINTS: f64 = 25.0;
const SIDE_EFFECT_DEDUCTION: f64 = 10.0;
const RECURRENCE_DURABILITY: f64 = 10.0;

/// Keyword buckets, checked in this order; the first hit wins.
const BUCKETS: &[(ResponseClass, &[&str])] = &[
    (
        ResponseClass::Partial,
        &["partial", "somewhat improved", "slowly improving"],
    ),
    (
        ResponseClass::Worsened,
        &["worse", "deteriorat", "progress", "declin"],
    ),
    (ResponseClass::NoChange, &["no change", "unchanged", "persist"]),
    (ResponseClass::Stable, &["stable", "stabiliz"]),
    (
        ResponseClass::Improved,
        &["resolved", "resolving", "resolution", "improved", "improving", "improvement", "recover", "better"],
    ),
];

/// Classify outcome text by keyword bucket. None when no bucket matches.
pub fn classify_response(text: &str) -> Option<ResponseClass> {
    let lower = text.to_lowercase();
    BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(class, _)| *class)
}

/// Faster response, more points.
pub fn speed_points(days_to_response: i64) -> f64 {
    match days_to_response {
        i64::MIN..=1 => 25.0,
        2..=3 => 20.0,
        4..=7 => 15.0,
        8..=14 => 10.0,
        _ => 5.0,
    }
}

pub fn completeness_points(class: ResponseClass) -> f64 {
    match class {
        ResponseClass::Improved => 25.0,
        ResponseClass::Partial => 15.0,
        ResponseClass::Stable => 10.0,
        ResponseClass::NoChange => 5.0,
        ResponseClass::Worsened => 0.0,
    }
}

/// Full points when nothing recurred after the outcome; none for a worsened response.
pub fn durability_points(class: ResponseClass, recurred: bool) -> f64 {
    match (class, recurred) {
        (ResponseClass::Worsened, _) => 0.0,
        (_, true) => RECURRENCE_DURABILITY,
        (_, false) => MAX_POINTS,
    }
}

/// 25 minus 10 per observed adverse effect, floored at 0.
pub fn side_effect_points(observed: usize) -> f64 {
    (MAX_POINTS - SIDE_EFFECT_DEDUCTION * observed as f64).max(0.0)
}

/// Inputs to one effectiveness score.
#[derive(Debug, Clone, Copy)]
pub struct ResponseObservation {
    pub class: ResponseClass,
    /// Days from intervention to outcome. None for an absence-of-complication
    /// outcome, which scores full speed.
    pub days_to_response: Option<i64>,
    pub recurred: bool,
    pub adverse_effects: usize,
}

pub fn score(observation: ResponseObservation) -> Effectiveness {
    let speed = match (observation.class, observation.days_to_response) {
        (ResponseClass::Worsened, _) => 0.0,
        (_, None) => MAX_POINTS,
        (_, Some(days)) => speed_points(days),
    };
    EffectivenessBreakdown {
        speed,
        completeness: completeness_points(observation.class),
        durability: durability_points(observation.class, observation.recurred),
        side_effects: side_effect_points(observation.adverse_effects),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bucket_order_is_respected() {
        assert_eq!(classify_response("partially resolved"), Some(ResponseClass::Partial));
        assert_eq!(classify_response("worsened"), Some(ResponseClass::Worsened));
        assert_eq!(classify_response("no change"), Some(ResponseClass::NoChange));
        assert_eq!(classify_response("persistent"), Some(ResponseClass::NoChange));
        assert_eq!(classify_response("stabilized"), Some(ResponseClass::Stable));
        assert_eq!(classify_response("Resolved"), Some(ResponseClass::Improved));
        assert_eq!(classify_response("recovering"), Some(ResponseClass::Improved));
        assert_eq!(classify_response("seen by neurology"), None);
    }

    #[test]
    fn speed_table() {
        assert_eq!(speed_points(0), 25.0);
        assert_eq!(speed_points(1), 25.0);
        assert_eq!(speed_points(2), 20.0);
        assert_eq!(speed_points(5), 15.0);
        assert_eq!(speed_points(14), 10.0);
        assert_eq!(speed_points(30), 5.0);
    }

    #[test]
    fn full_recovery_in_two_days() {
        let e = score(ResponseObservation {
            class: ResponseClass::Improved,
            days_to_response: Some(2),
            recurred: false,
            adverse_effects: 0,
        });
        assert_eq!(e.breakdown.speed, 20.0);
        assert_eq!(e.score, 95.0);
    }

    #[test]
    fn worsened_scores_only_side_effects() {
        let e = score(ResponseObservation {
            class: ResponseClass::Worsened,
            days_to_response: Some(1),
            recurred: true,
            adverse_effects: 1,
        });
        assert_eq!(e.breakdown.speed, 0.0);
        assert_eq!(e.breakdown.durability, 0.0);
        assert_eq!(e.score, 15.0);
    }

    #[test]
    fn side_effects_floor_at_zero() {
        assert_eq!(side_effect_points(0), 25.0);
        assert_eq!(side_effect_points(2), 5.0);
        assert_eq!(side_effect_points(5), 0.0);
    }

    fn any_class() -> impl Strategy<Value = ResponseClass> {
        prop::sample::select(ResponseClass::all().to_vec())
    }

    proptest! {
        #[test]
        fn score_always_within_bounds(
            class in any_class(),
            days in proptest::option::of(-5i64..60),
            recurred in any::<bool>(),
            adverse in 0usize..10,
        ) {
            let e = score(ResponseObservation { class, days_to_response: days, recurred, adverse_effects: adverse });
            prop_assert!((0.0..=100.0).contains(&e.score));
            for part in [e.breakdown.speed, e.breakdown.completeness, e.breakdown.durability, e.breakdown.side_effects] {
                prop_assert!((0.0..=25.0).contains(&part));
            }
        }
    }
}
